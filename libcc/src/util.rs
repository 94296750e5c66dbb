// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// Convert a `u32` to a `usize`.
///
/// On the targets we care about, `usize` is always at least as large as `u32`.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn u32_to_usize(v: u32) -> usize {
    v.try_into().expect("size of usize is smaller than u32")
}

/// Convert a `usize` to a `u64`.
///
/// On the targets we care about, `u64` is always at least as large as `usize`.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    v.try_into().expect("size of u64 is smaller than usize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_to_usize() {
        assert_eq!(u32_to_usize(u32::MAX), 4_294_967_295);
    }

    #[test]
    fn test_usize_to_u64() {
        assert_eq!(usize_to_u64(30), 30);
    }
}
