// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Raw interface of the EFI CC (Confidential Computing) measurement
//! protocol.
//!
//! Confidential guests (TDX, SEV-SNP) have no TPM of their own. Instead
//! the firmware exposes this protocol, which hashes data into one of the
//! guest's measurement registers (MRs) and appends an event to the CC
//! event log. It is the CC equivalent of the TCG2 protocol.
//!
//! See the UEFI specification, section "EFI_CC_MEASUREMENT_PROTOCOL".

use crate::uefi::MrIndex;
use core::ffi::c_void;
use uefi::data_types::PhysicalAddress;
use uefi::proto::unsafe_protocol;
use uefi::{Status, StatusExt};

/// Header of a CC event. The firmware expects this packed.
#[repr(C, packed)]
pub struct FfiCcEventHeader {
    pub header_size: u32,
    pub header_version: u16,
    pub mr_index: u32,
    pub event_type: u32,
}

/// Fixed-size portion of a CC event.
///
/// The event data (a null-terminated description in our case)
/// immediately follows the header. `size` covers the whole record,
/// including the event data.
#[repr(C, packed)]
pub struct FfiCcEvent {
    pub size: u32,
    pub header: FfiCcEventHeader,
    pub event: [u8; 0],
}

#[derive(Debug)]
#[repr(C)]
#[unsafe_protocol("96751a3d-72f4-41a6-a794-ed5d0e67ae6b")]
pub struct CcMeasurementProtocol {
    // Capability and event log access are not used by the bootloader,
    // so the pointee types are left opaque.
    pub get_capability:
        unsafe extern "efiapi" fn(this: *mut Self, capability: *mut c_void) -> Status,
    pub get_event_log: unsafe extern "efiapi" fn(
        this: *mut Self,
        event_log_format: u32,
        event_log_location: *mut PhysicalAddress,
        event_log_last_entry: *mut PhysicalAddress,
        event_log_truncated: *mut u8,
    ) -> Status,
    pub hash_log_extend_event: unsafe extern "efiapi" fn(
        this: *mut Self,
        flags: u64,
        data_to_hash: PhysicalAddress,
        data_to_hash_len: u64,
        event: *const FfiCcEvent,
    ) -> Status,
    pub map_pcr_to_mr_index:
        unsafe extern "efiapi" fn(this: *mut Self, pcr_index: u32, mr_index: *mut u32) -> Status,
}

impl CcMeasurementProtocol {
    /// Get the measurement register that corresponds to TPM PCR
    /// `pcr_index`.
    pub fn map_pcr_to_mr_index(&mut self, pcr_index: u32) -> uefi::Result<MrIndex> {
        let mut mr_index = 0;
        // SAFETY: `self` is a valid protocol instance and `mr_index` is
        // a valid output location for the duration of the call.
        unsafe { (self.map_pcr_to_mr_index)(self, pcr_index, &mut mr_index) }
            .to_result_with_val(|| MrIndex(mr_index))
    }

    /// Hash `data_to_hash`, extend the event's MR with the digest, and
    /// append `event` to the CC event log.
    ///
    /// # Safety
    ///
    /// `data_to_hash` must point to `data_to_hash_len` readable bytes,
    /// and `event` must point to a complete event record whose `size`
    /// field matches its allocation. Both must stay valid for the
    /// duration of the call.
    pub unsafe fn hash_log_extend_event(
        &mut self,
        flags: u64,
        data_to_hash: PhysicalAddress,
        data_to_hash_len: u64,
        event: *const FfiCcEvent,
    ) -> uefi::Result {
        unsafe { (self.hash_log_extend_event)(self, flags, data_to_hash, data_to_hash_len, event) }
            .to_result()
    }
}
