// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This module provides [`CcEvent`], an event record in the format
//! expected by the CC measurement protocol.
//!
//! The record is variably sized: a fixed header is followed by the
//! event data, which for the events created here is a null-terminated
//! description string. The layout (all fields little-endian, no
//! padding) is:
//!
//! | offset | field          | type  |
//! |--------|----------------|-------|
//! | 0      | size           | `u32` |
//! | 4      | header size    | `u32` |
//! | 8      | header version | `u16` |
//! | 10     | MR index       | `u32` |
//! | 14     | event type     | `u32` |
//! | 18     | description    | bytes |
//!
//! The size field covers the entire record, including the description
//! and its null terminator.

use crate::cc::MeasureError;
use crate::uefi::{FfiCcEvent, FfiCcEventHeader, MrIndex};
use crate::util::u32_to_usize;
use alloc::vec::Vec;
use core::mem::{offset_of, size_of};
use log::debug;
use uefi::proto::tcg::EventType;

/// Version of the event header layout.
pub const CC_EVENT_HEADER_VERSION: u16 = 1;

/// Size of the event header. This does not include the size field
/// that precedes it.
#[allow(clippy::cast_possible_truncation)]
const HEADER_SIZE: u32 = size_of::<FfiCcEventHeader>() as u32;

/// Size of the record excluding the event data.
const FIXED_SIZE: usize = size_of::<FfiCcEvent>();

const HEADER_OFFSET: usize = offset_of!(FfiCcEvent, header);
const HEADER_VERSION_OFFSET: usize = HEADER_OFFSET + offset_of!(FfiCcEventHeader, header_version);
const MR_INDEX_OFFSET: usize = HEADER_OFFSET + offset_of!(FfiCcEventHeader, mr_index);
const EVENT_TYPE_OFFSET: usize = HEADER_OFFSET + offset_of!(FfiCcEventHeader, event_type);

#[cfg(not(test))]
type EventBuffer = Vec<u8>;
#[cfg(test)]
type EventBuffer = tracking::TrackedBuffer;

/// A complete CC event record. The record cannot be modified after
/// creation; the memory is released when the event is dropped.
#[derive(Debug)]
pub struct CcEvent {
    buf: EventBuffer,
}

impl CcEvent {
    /// Create an event for register `mr_index` whose event data is
    /// `description` followed by a null terminator.
    ///
    /// An error is returned if `description` contains a null byte, if
    /// the record would not fit in a `u32` size, or if the allocation
    /// fails.
    pub fn new(
        mr_index: MrIndex,
        event_type: EventType,
        description: &str,
    ) -> Result<Self, MeasureError> {
        let description = description.as_bytes();

        // The terminator must be the only null in the event data.
        if description.contains(&0) {
            return Err(MeasureError::InvalidDescription);
        }

        let num_bytes = FIXED_SIZE
            .checked_add(description.len())
            .and_then(|n| n.checked_add(1))
            .ok_or(MeasureError::EventTooLarge(description.len()))?;
        let size = u32::try_from(num_bytes)
            .map_err(|_| MeasureError::EventTooLarge(description.len()))?;

        let mut buf = allocate_event_buffer(num_bytes)?;
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&HEADER_SIZE.to_le_bytes());
        buf.extend_from_slice(&CC_EVENT_HEADER_VERSION.to_le_bytes());
        buf.extend_from_slice(&mr_index.0.to_le_bytes());
        buf.extend_from_slice(&event_type.0.to_le_bytes());
        buf.extend_from_slice(description);
        buf.push(0);

        // The firmware trusts the size field, so it must describe the
        // buffer exactly.
        debug_assert_eq!(buf.len(), num_bytes);

        debug!("created CC event: {num_bytes} bytes, MR {}", mr_index.0);

        Ok(Self { buf })
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buf[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    /// Total size of the record in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.read_u32(offset_of!(FfiCcEvent, size))
    }

    #[must_use]
    pub fn header_size(&self) -> u32 {
        self.read_u32(HEADER_OFFSET)
    }

    #[must_use]
    pub fn header_version(&self) -> u16 {
        u16::from_le_bytes([
            self.buf[HEADER_VERSION_OFFSET],
            self.buf[HEADER_VERSION_OFFSET + 1],
        ])
    }

    #[must_use]
    pub fn mr_index(&self) -> MrIndex {
        MrIndex(self.read_u32(MR_INDEX_OFFSET))
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        EventType(self.read_u32(EVENT_TYPE_OFFSET))
    }

    /// Event data: the description, including its null terminator.
    #[must_use]
    pub fn event_data(&self) -> &[u8] {
        &self.buf[FIXED_SIZE..]
    }

    /// The whole record as raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        debug_assert_eq!(self.buf.len(), u32_to_usize(self.size()));
        &self.buf
    }

    /// Pointer to the record for passing to the firmware. The pointer
    /// is valid for as long as `self` is borrowed.
    #[must_use]
    pub fn as_ffi_ptr(&self) -> *const FfiCcEvent {
        self.as_bytes().as_ptr().cast()
    }
}

impl Drop for CcEvent {
    fn drop(&mut self) {
        debug!("releasing CC event ({} bytes)", self.buf.len());
    }
}

/// Reserve exactly `num_bytes` for an event without aborting if memory
/// is exhausted.
fn allocate_event_buffer(num_bytes: usize) -> Result<EventBuffer, MeasureError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(num_bytes)
        .map_err(|_| MeasureError::EventAllocationFailed(num_bytes))?;
    Ok(EventBuffer::from(buf))
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Test the exact byte layout of an event.
    #[test]
    fn test_event_bytes() {
        let event = CcEvent::new(MrIndex(2), EventType::IPL, "grub").unwrap();
        assert_eq!(
            event.as_bytes(),
            [
                23, 0, 0, 0, // size
                14, 0, 0, 0, // header size
                1, 0, // header version
                2, 0, 0, 0, // MR index
                0x0d, 0, 0, 0, // event type
                b'g', b'r', b'u', b'b', 0, // description
            ]
        );
    }

    #[test]
    fn test_event_accessors() {
        let event = CcEvent::new(MrIndex(3), EventType::IPL, "grub_kernel").unwrap();
        assert_eq!(event.size(), 30);
        assert_eq!(event.header_size(), 14);
        assert_eq!(event.header_version(), CC_EVENT_HEADER_VERSION);
        assert_eq!(event.mr_index(), MrIndex(3));
        assert_eq!(event.event_type(), EventType::IPL);
        assert_eq!(event.event_data(), b"grub_kernel\0");
    }

    /// Test that the size field equals the fixed size plus the
    /// description and terminator for a range of description lengths,
    /// and that the event data always ends in a null.
    #[test]
    fn test_event_size_invariant() {
        let text = "x".repeat(300);
        for len in 0..=text.len() {
            let event = CcEvent::new(MrIndex(1), EventType::IPL, &text[..len]).unwrap();
            assert_eq!(u32_to_usize(event.size()), 18 + len + 1);
            assert_eq!(event.as_bytes().len(), u32_to_usize(event.size()));
            assert_eq!(event.event_data().len(), len + 1);
            assert_eq!(event.event_data().last(), Some(&0));
        }
    }

    /// Test that an empty description produces a single null byte of
    /// event data.
    #[test]
    fn test_event_empty_description() {
        let event = CcEvent::new(MrIndex(0), EventType::IPL, "").unwrap();
        assert_eq!(event.size(), 19);
        assert_eq!(event.event_data(), [0]);
    }

    /// Test that a description with an embedded null is rejected.
    #[test]
    fn test_event_interior_null() {
        tracking::reset();
        assert_eq!(
            CcEvent::new(MrIndex(0), EventType::IPL, "grub\0kernel").unwrap_err(),
            MeasureError::InvalidDescription
        );
        assert_eq!(tracking::counts(), (0, 0));
    }

    /// Test that an impossible allocation fails with an error rather
    /// than aborting.
    #[test]
    fn test_allocate_event_buffer_failure() {
        tracking::reset();
        assert_eq!(
            allocate_event_buffer(usize::MAX).unwrap_err(),
            MeasureError::EventAllocationFailed(usize::MAX)
        );
        // Nothing was allocated, so nothing is released.
        assert_eq!(tracking::counts(), (0, 0));
    }

    #[test]
    fn test_allocate_event_buffer() {
        let buf = allocate_event_buffer(64).unwrap();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 64);
    }

    /// Test that dropping an event is recorded as a release.
    #[test]
    fn test_event_release() {
        tracking::reset();
        let event = CcEvent::new(MrIndex(0), EventType::IPL, "abc").unwrap();
        assert_eq!(tracking::counts(), (1, 0));
        drop(event);
        assert_eq!(tracking::counts(), (1, 1));
        assert_eq!(tracking::live(), 0);
    }
}
