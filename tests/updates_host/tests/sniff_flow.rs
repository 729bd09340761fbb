// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Integration tests for staged-image sniffing and recovery arming
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 12 tests
//!
//! TEST_SCOPE:
//!   - Marker-first archives accepted, others rejected with the found name
//!   - Precondition failures (missing, empty) before any read
//!   - Truncated and fragmented staging media
//!   - Malformed headers (magic, oversized name)
//!   - Host directory backend + TOML boot environment end to end
//!
//! TEST_SCENARIOS:
//!   - test_minimal_stream_is_valid(): hand-laid header + sw-description
//!   - test_minimal_stream_other_name(): other-file.bin reported
//!   - test_packaged_archive_is_valid(): padded multi-entry archive
//!   - test_marker_not_first(): sw-description second is rejected
//!   - test_empty_image_is_too_small(): size 0, no reads
//!   - test_missing_image_is_not_found(): no reads
//!   - test_stall_mid_header_is_io_error(): cursor bounded by stall offset
//!   - test_byte_at_a_time_media(): fragment size 1 still validates
//!   - test_wrong_magic_reads_header_only(): old newc magic
//!   - test_oversized_name_reads_header_only(): namesize 0x100
//!   - test_detect_arms_file_env(): host dir + FileBootEnv
//!   - test_detect_rejects_and_keeps_image(): env untouched, image left

use std::fs;

use storage::{DeviceSpec, HostDirFs, MemStagingFs};
use tempfile::TempDir;
use updates::{
    detect_autoupdate, BootEnv, Detection, FileBootEnv, HeaderError, ImageValidator, ReadError,
    RecoveryTrigger, StagingConfig, ValidationError, DEFAULT_IMAGE_NAME, HEADER_LEN,
};
use updates_host::{byte_sum, minimal_stream, ArchiveBuilder};

fn mem_fs(bytes: Vec<u8>) -> MemStagingFs {
    let mut fs = MemStagingFs::new(DeviceSpec::sdcard());
    fs.insert(DEFAULT_IMAGE_NAME, bytes);
    fs
}

fn validate(fs: &MemStagingFs) -> Result<updates::CpioEntryHeader, ValidationError> {
    let config = StagingConfig::default();
    ImageValidator::new(fs, &config).validate_staged()
}

#[test]
fn test_minimal_stream_is_valid() {
    let fs = mem_fs(minimal_stream(b"sw-description\0"));
    let header = validate(&fs).expect("valid image");
    assert_eq!(header.name, "sw-description");
    assert_eq!(header.file_size, 0x10);
    assert_eq!(header.name_size, 0x0F);
    assert_eq!(header.checksum, 0);
}

#[test]
fn test_minimal_stream_other_name() {
    let fs = mem_fs(minimal_stream(b"other-file.bin\0"));
    let err = validate(&fs).expect_err("wrong first entry");
    assert_eq!(
        err,
        ValidationError::UnexpectedFirstEntry {
            found: "other-file.bin".to_string(),
            expected: "sw-description".to_string(),
        }
    );
}

#[test]
fn test_packaged_archive_is_valid() {
    let description: &[u8] = b"software = { version = \"1.0\"; };\n";
    let image = ArchiveBuilder::new()
        .entry("sw-description", description)
        .entry("rootfs.ext4.gz", &[0x1F; 300])
        .build();
    let fs = mem_fs(image);
    let header = validate(&fs).expect("valid image");
    assert_eq!(header.file_size, description.len() as u64);
    assert_eq!(header.checksum, u64::from(byte_sum(description)));
}

#[test]
fn test_marker_not_first() {
    let image = ArchiveBuilder::new()
        .entry("rootfs.ext4.gz", &[0x1F; 64])
        .entry("sw-description", b"software = {};\n")
        .build();
    let err = validate(&mem_fs(image)).expect_err("marker not first");
    assert!(matches!(
        err,
        ValidationError::UnexpectedFirstEntry { found, .. } if found == "rootfs.ext4.gz"
    ));
}

#[test]
fn test_empty_image_is_too_small() {
    let fs = mem_fs(Vec::new());
    let err = validate(&fs).expect_err("empty image");
    assert!(matches!(err, ValidationError::TooSmall { .. }));
    assert_eq!(fs.read_calls(), 0);
}

#[test]
fn test_missing_image_is_not_found() {
    let fs = MemStagingFs::new(DeviceSpec::sdcard());
    let err = validate(&fs).expect_err("missing image");
    assert!(matches!(err, ValidationError::NotFound { .. }));
    assert_eq!(fs.read_calls(), 0);
}

#[test]
fn test_stall_mid_header_is_io_error() {
    let fs = mem_fs(minimal_stream(b"sw-description\0"))
        .with_max_fragment(32)
        .with_stall_at(64);
    let err = validate(&fs).expect_err("stalled read");
    assert!(err.failing_offset().is_some_and(|offset| offset <= 64));
    assert_eq!(
        err,
        ValidationError::Io(ReadError::Truncated { offset: 64, outstanding: HEADER_LEN - 64 })
    );
    assert_eq!(fs.read_calls(), 3);
}

#[test]
fn test_byte_at_a_time_media() {
    let fs = mem_fs(minimal_stream(b"sw-description\0")).with_max_fragment(1);
    validate(&fs).expect("valid image");
    assert_eq!(fs.read_calls(), HEADER_LEN + 15);
}

#[test]
fn test_wrong_magic_reads_header_only() {
    let mut image = minimal_stream(b"sw-description\0");
    image[..6].copy_from_slice(b"070701");
    let fs = mem_fs(image);
    let err = validate(&fs).expect_err("bad magic");
    assert!(matches!(
        err,
        ValidationError::MalformedHeader(HeaderError::BadMagic { .. })
    ));
    assert_eq!(fs.read_calls(), 1);
}

#[test]
fn test_oversized_name_reads_header_only() {
    let mut image = minimal_stream(b"sw-description\0");
    image[94..102].copy_from_slice(b"00000100");
    let fs = mem_fs(image);
    let err = validate(&fs).expect_err("name too long");
    assert!(matches!(
        err,
        ValidationError::MalformedHeader(HeaderError::NameTooLong { name_size: 256, .. })
    ));
    assert_eq!(fs.read_calls(), 1);
}

#[test]
fn test_detect_arms_file_env() {
    let card = TempDir::new().expect("card dir");
    let state = TempDir::new().expect("state dir");
    let image = ArchiveBuilder::new().entry("sw-description", b"software = {};\n").build();
    fs::write(card.path().join("swupdate-image.swu"), image).expect("stage image");

    let config = StagingConfig::default();
    let mut host = HostDirFs::new();
    host.mount(&config.device, card.path());
    let env_path = state.path().join("uboot-env.toml");
    let mut env = FileBootEnv::open(&env_path).expect("open env");
    env.set("mmcargs", "setenv bootargs ${jh_clk} console=${console}").expect("seed");

    let trigger = RecoveryTrigger::default();
    let outcome = detect_autoupdate(&host, &mut env, &config, &trigger, true).expect("detect");
    assert_eq!(outcome, Detection::Armed);

    let reopened = FileBootEnv::open(&env_path).expect("reopen env");
    assert!(trigger.is_armed(&reopened));
    assert_eq!(
        reopened.get("mmcargs"),
        Some("setenv bootargs ${jh_clk} console=${console} sdfwupdate")
    );
}

#[test]
fn test_detect_rejects_and_keeps_image() {
    let card = TempDir::new().expect("card dir");
    let state = TempDir::new().expect("state dir");
    let image = ArchiveBuilder::new().entry("zImage", &[0xAA; 64]).build();
    let image_path = card.path().join("swupdate-image.swu");
    fs::write(&image_path, &image).expect("stage image");

    let config = StagingConfig::default();
    let mut host = HostDirFs::new();
    host.mount(&config.device, card.path());
    let env_path = state.path().join("uboot-env.toml");
    let mut env = FileBootEnv::open(&env_path).expect("open env");

    let trigger = RecoveryTrigger::default();
    let outcome = detect_autoupdate(&host, &mut env, &config, &trigger, true).expect("detect");
    assert!(matches!(
        outcome,
        Detection::Rejected(ValidationError::UnexpectedFirstEntry { .. })
    ));
    assert!(!env_path.exists());
    assert_eq!(fs::read(&image_path).expect("image kept"), image);
}
