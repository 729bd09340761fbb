// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Fixed-capacity byte string for names read from untrusted headers
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: Unit tests below

use alloc::borrow::Cow;
use alloc::string::String;
use core::fmt;

/// Byte string that can never hold more than `N` bytes.
#[derive(Clone)]
pub struct BoundedName<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> BoundedName<N> {
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        Self { buf: [0u8; N], len: 0 }
    }

    /// Replaces the contents with as much of `bytes` as fits.
    /// Returns true if anything was cut off.
    pub fn copy_truncating(&mut self, bytes: &[u8]) -> bool {
        let len = bytes.len().min(N);
        self.buf[..len].copy_from_slice(&bytes[..len]);
        self.len = len;
        len < bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// UTF-8 view, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl<const N: usize> Default for BoundedName<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for BoundedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundedName({:?})", self.to_string_lossy())
    }
}

impl<const N: usize> fmt::Display for BoundedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl<const N: usize> PartialEq for BoundedName<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const N: usize> Eq for BoundedName<N> {}

impl<const N: usize> PartialEq<str> for BoundedName<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const N: usize> PartialEq<&str> for BoundedName<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_is_not_a_cut() {
        let mut name = BoundedName::<7>::new();
        assert!(!name.copy_truncating(b"sw-desc"));
        assert_eq!(name, "sw-desc");
        assert_eq!(name.len(), 7);
    }

    #[test]
    fn equality_ignores_stale_bytes() {
        let mut reused = BoundedName::<8>::new();
        reused.copy_truncating(b"rootfs");
        reused.copy_truncating(b"sw");
        let mut fresh = BoundedName::<8>::new();
        fresh.copy_truncating(b"sw");
        assert_eq!(reused, fresh);
    }

    #[test]
    fn truncating_copy_reports_cut() {
        let mut name = BoundedName::<4>::new();
        assert!(name.copy_truncating(b"sw-description"));
        assert_eq!(name.as_bytes(), b"sw-d");
        assert!(!name.copy_truncating(b"ab"));
        assert_eq!(name, "ab");
    }

    #[test]
    fn comparison_is_exact_and_case_sensitive() {
        let mut name = BoundedName::<16>::new();
        name.copy_truncating(b"sw-description");
        assert_eq!(name, "sw-description");
        assert_ne!(name, "SW-DESCRIPTION");
        assert_ne!(name, "sw-description.sig");
        assert_ne!(name, "./sw-description");
    }

    #[test]
    fn lossy_display() {
        let mut name = BoundedName::<4>::new();
        name.copy_truncating(&[b'a', 0xFF]);
        assert_eq!(alloc::format!("{name}"), "a\u{FFFD}");
        assert!(BoundedName::<4>::default().is_empty());
    }
}
