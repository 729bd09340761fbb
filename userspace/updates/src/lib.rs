// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update domain library (staged-image sniffing + recovery arming)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests per module + integration tests (via tests/updates_host)
//!   - hex field decoding (proptest round-trip)
//!   - chunked reads over fragmenting/stalling collaborators
//!   - cpio first-entry parsing and malformed-header rejection
//!   - marker validation and recovery arming
//!
//! PUBLIC API:
//!   - ImageValidator: one-shot check of a staged `.swu` image
//!   - parse_first_entry(): cpio "new ASCII" first header + name
//!   - ChunkedReader/ReadCursor: exact-length reads over StagingFs
//!   - RecoveryTrigger/detect_autoupdate(): boot-time recovery arming
//!   - FileBootEnv (std): TOML-backed boot environment
//!
//! DEPENDENCIES:
//!   - storage: filesystem collaborator
//!   - thiserror: error types
//!   - log: diagnostics
//!   - toml (std): boot environment persistence

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod bounded;
pub mod cpio;
#[cfg(feature = "std")]
pub mod env_file;
pub mod hexfield;
pub mod reader;
pub mod recovery;
pub mod validator;

pub use bounded::BoundedName;
pub use cpio::{
    parse_first_entry, CpioEntryHeader, EntryName, HeaderError, ParseError, HEADER_LEN,
    MAX_NAME_LEN, NEWC_CRC_MAGIC,
};
#[cfg(feature = "std")]
pub use env_file::FileBootEnv;
pub use hexfield::{HexFieldError, HexValue};
pub use reader::{ChunkedReader, ReadCursor, ReadError};
pub use recovery::{
    detect_autoupdate, BootEnv, BootEnvError, Detection, MemBootEnv, RecoveryTrigger,
};
pub use validator::{
    ImageValidator, StagingConfig, ValidationError, ValidationOutcome, DEFAULT_IMAGE_NAME,
    SW_DESCRIPTION_FILENAME,
};
