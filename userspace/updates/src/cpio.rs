// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: First-entry header parsing for "new ASCII" (CRC) cpio streams
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: Unit tests below + host tests (tests/updates_host)
//!
//! Header layout (110 bytes, all numbers 8 hex ASCII digits):
//!   magic[6] ino mode uid gid nlink mtime filesize
//!   devmajor devminor rdevmajor rdevminor namesize check
//! followed directly by `namesize` bytes of NUL-terminated name.

use core::ops::Range;

use log::{debug, warn};
use storage::StagingFs;
use thiserror::Error;

use crate::bounded::BoundedName;
use crate::hexfield::{self, HexFieldError};
use crate::reader::{ChunkedReader, ReadCursor, ReadError};

/// Magic of the CRC flavour of the new ASCII format.
pub const NEWC_CRC_MAGIC: &[u8; 6] = b"070702";

/// Fixed header length.
pub const HEADER_LEN: usize = 110;

/// Working buffer size; `namesize` must stay below it.
pub const MAX_NAME_LEN: usize = 256;

const FIELD_WIDTH: usize = 8;
const MAGIC: Range<usize> = 0..6;

const fn field(index: usize) -> Range<usize> {
    let start = MAGIC.end + index * FIELD_WIDTH;
    start..start + FIELD_WIDTH
}

const FILESIZE: Range<usize> = field(6);
const NAMESIZE: Range<usize> = field(11);
const CHECK: Range<usize> = field(12);

/// Name storage for a parsed entry.
pub type EntryName = BoundedName<MAX_NAME_LEN>;

/// Metadata of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpioEntryHeader {
    pub magic: [u8; 6],
    pub file_size: u64,
    /// Length of the name including its NUL.
    pub name_size: u64,
    /// Decoded but never checked against content.
    pub checksum: u64,
    pub name: EntryName,
}

/// Structural problems with the header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("cpio format not recognized: magic {found:?}")]
    BadMagic { found: [u8; 6] },
    #[error("cpio field {field} cannot be parsed: {source}")]
    Field { field: &'static str, source: HexFieldError },
    #[error("cpio name length too big: {name_size} >= {max} (max)")]
    NameTooLong { name_size: u64, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Io(#[from] ReadError),
    #[error(transparent)]
    Malformed(#[from] HeaderError),
}

/// Decodes the fixed part of a header.
pub fn parse_header(bytes: &[u8; HEADER_LEN]) -> Result<(u64, u64, u64), HeaderError> {
    if &bytes[MAGIC] != NEWC_CRC_MAGIC {
        let mut found = [0u8; 6];
        found.copy_from_slice(&bytes[MAGIC]);
        return Err(HeaderError::BadMagic { found });
    }
    let file_size = decode_field(bytes, "filesize", FILESIZE)?;
    let name_size = decode_field(bytes, "namesize", NAMESIZE)?;
    let checksum = decode_field(bytes, "check", CHECK)?;
    Ok((file_size, name_size, checksum))
}

fn decode_field(
    bytes: &[u8; HEADER_LEN],
    name: &'static str,
    range: Range<usize>,
) -> Result<u64, HeaderError> {
    let decoded = hexfield::decode_hex(&bytes[range])
        .map_err(|source| HeaderError::Field { field: name, source })?;
    if decoded.overflowed {
        warn!("cpio: {name} out of range, keeping partial value {:#x}", decoded.value);
    }
    Ok(decoded.value)
}

/// Reads and decodes the entry starting at `cursor`, leaving the cursor just
/// past its name.
pub fn read_entry_header<F: StagingFs + ?Sized>(
    reader: &ChunkedReader<'_, F>,
    cursor: &mut ReadCursor,
) -> Result<CpioEntryHeader, ParseError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read(cursor, &mut header)?;

    let mut magic = [0u8; 6];
    magic.copy_from_slice(&header[MAGIC]);
    let (file_size, name_size, checksum) = parse_header(&header)?;

    if name_size >= MAX_NAME_LEN as u64 {
        return Err(HeaderError::NameTooLong { name_size, max: MAX_NAME_LEN }.into());
    }

    let mut name = EntryName::new();
    let name_len = name_size as usize;
    if name_len > 0 {
        let mut buf = [0u8; MAX_NAME_LEN];
        let raw = &mut buf[..name_len];
        reader.read(cursor, raw)?;
        raw[name_len - 1] = 0;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(name_len);
        if name.copy_truncating(&raw[..end]) {
            warn!("cpio: entry name truncated to {} bytes", EntryName::CAPACITY);
        }
    }
    debug!("cpio: entry {:?} size {} check {:#010x}", name, file_size, checksum);

    Ok(CpioEntryHeader { magic, file_size, name_size, checksum, name })
}

/// Parses the first entry of the archive.
pub fn parse_first_entry<F: StagingFs + ?Sized>(
    reader: &ChunkedReader<'_, F>,
) -> Result<CpioEntryHeader, ParseError> {
    let mut cursor = ReadCursor::new();
    read_entry_header(reader, &mut cursor)
}

/// Builds a header for unit tests. Unused numeric fields are zero.
#[cfg(test)]
pub(crate) fn encode_header(file_size: u32, name_size: u32, checksum: u32) -> [u8; HEADER_LEN] {
    let mut out = [b'0'; HEADER_LEN];
    out[MAGIC].copy_from_slice(NEWC_CRC_MAGIC);
    write_hex(&mut out[FILESIZE], file_size);
    write_hex(&mut out[NAMESIZE], name_size);
    write_hex(&mut out[CHECK], checksum);
    out
}

#[cfg(test)]
fn write_hex(out: &mut [u8], value: u32) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    for (i, slot) in out.iter_mut().rev().enumerate() {
        *slot = DIGITS[((value >> (i * 4)) & 0xF) as usize];
    }
}
