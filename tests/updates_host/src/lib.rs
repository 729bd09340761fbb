// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host integration test fixtures for the updates library
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Stable
//! TEST_COVERAGE: Used by tests/sniff_flow.rs

/// Regular file, rw-r--r--.
pub const MODE_FILE: u32 = 0o100644;

/// One archive member.
#[derive(Clone)]
pub struct EntryFixture {
    pub name: String,
    pub data: Vec<u8>,
}

impl EntryFixture {
    pub fn new(name: &str, data: &[u8]) -> Self {
        Self { name: name.to_string(), data: data.to_vec() }
    }
}

/// Builds "new ASCII" CRC (`070702`) cpio archives the way update packagers do:
/// header, NUL-terminated name and data, each padded to 4 bytes, closed by a
/// `TRAILER!!!` entry.
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<EntryFixture>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(EntryFixture::new(name, data));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (ino, entry) in self.entries.iter().enumerate() {
            append_entry(&mut out, ino as u32 + 1, MODE_FILE, &entry.name, &entry.data);
        }
        append_entry(&mut out, 0, 0, "TRAILER!!!", &[]);
        out
    }
}

/// Sum of data bytes, as the CRC format defines its check field.
pub fn byte_sum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, b| acc.wrapping_add(u32::from(*b)))
}

fn append_entry(out: &mut Vec<u8>, ino: u32, mode: u32, name: &str, data: &[u8]) {
    let name_size = name.len() as u32 + 1;
    let fields = [
        ino,
        mode,
        0, // uid
        0, // gid
        1, // nlink
        0, // mtime
        data.len() as u32,
        0, // devmajor
        0, // devminor
        0, // rdevmajor
        0, // rdevminor
        name_size,
        byte_sum(data),
    ];
    out.extend_from_slice(b"070702");
    for field in fields {
        out.extend_from_slice(format!("{field:08X}").as_bytes());
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    pad4(out);
    out.extend_from_slice(data);
    pad4(out);
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// The minimal stream used to describe the format: magic, filesize 0x10,
/// namesize 0x0F, zero check, zero padding fields, then the 15 name bytes.
pub fn minimal_stream(name: &[u8; 15]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"070702");
    for _ in 0..6 {
        out.extend_from_slice(b"00000000");
    }
    out.extend_from_slice(b"00000010");
    for _ in 0..4 {
        out.extend_from_slice(b"00000000");
    }
    out.extend_from_slice(b"0000000F");
    out.extend_from_slice(b"00000000");
    out.extend_from_slice(name);
    out.extend_from_slice(&[0x5A; 16]);
    out
}
