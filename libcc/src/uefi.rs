// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod cc_protocol;

use crate::cc_event::CcEvent;
use crate::util::usize_to_u64;
use alloc::boxed::Box;
use log::warn;
use uefi::boot::{self, ScopedProtocol};
use uefi::data_types::PhysicalAddress;
use uefi::proto::tcg::PcrIndex;
use uefi::Status;

pub use cc_protocol::{CcMeasurementProtocol, FfiCcEvent, FfiCcEventHeader};

/// Measurement register index, in the numbering scheme of the CC
/// measurement protocol. This is not necessarily equal to the PCR
/// index it was mapped from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MrIndex(pub u32);

/// Interface for finding the firmware's CC measurement protocol.
///
/// The implementation used at runtime is normally `CcFirmwareImpl`;
/// unit tests can use `MockCcFirmware` instead.
#[cfg_attr(any(test, feature = "test_util"), mockall::automock)]
pub trait CcFirmware {
    /// Look up the CC measurement protocol. Returns `None` if the
    /// firmware does not provide it.
    fn locate_cc_measurement(&self) -> Option<Box<dyn CcMeasurement>>;
}

/// Interface to an open CC measurement protocol.
#[cfg_attr(any(test, feature = "test_util"), mockall::automock)]
pub trait CcMeasurement {
    fn map_pcr_to_mr_index(&mut self, pcr_index: PcrIndex) -> uefi::Result<MrIndex>;

    /// Hash `data`, extend the register named in `event` with the
    /// digest, and append `event` to the log.
    fn hash_log_extend_event(
        &mut self,
        flags: u64,
        data: &[u8],
        event: &CcEvent,
    ) -> uefi::Result<()>;
}

pub struct CcFirmwareImpl;

impl CcFirmware for CcFirmwareImpl {
    fn locate_cc_measurement(&self) -> Option<Box<dyn CcMeasurement>> {
        let handle = match boot::get_handle_for_protocol::<CcMeasurementProtocol>() {
            Ok(handle) => handle,
            Err(err) => {
                // Most platforms are not confidential guests, so a
                // missing protocol is the common case.
                if err.status() != Status::NOT_FOUND {
                    warn!(
                        "unexpected error getting CC measurement handle: {}",
                        err.status()
                    );
                }
                return None;
            }
        };

        match boot::open_protocol_exclusive::<CcMeasurementProtocol>(handle) {
            Ok(protocol) => Some(Box::new(protocol)),
            Err(err) => {
                warn!(
                    "failed to open the CC measurement protocol: {}",
                    err.status()
                );
                None
            }
        }
    }
}

impl CcMeasurement for ScopedProtocol<CcMeasurementProtocol> {
    fn map_pcr_to_mr_index(&mut self, pcr_index: PcrIndex) -> uefi::Result<MrIndex> {
        let protocol: &mut CcMeasurementProtocol = self;
        protocol.map_pcr_to_mr_index(pcr_index.0)
    }

    fn hash_log_extend_event(
        &mut self,
        flags: u64,
        data: &[u8],
        event: &CcEvent,
    ) -> uefi::Result<()> {
        let protocol: &mut CcMeasurementProtocol = self;
        // SAFETY: `data` and `event` are borrowed for the duration of
        // the call, and `CcEvent` guarantees that its size field
        // matches its allocation.
        unsafe {
            protocol.hash_log_extend_event(
                flags,
                data.as_ptr() as PhysicalAddress,
                usize_to_u64(data.len()),
                event.as_ffi_ptr(),
            )
        }
    }
}
