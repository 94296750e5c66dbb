// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This module provides an interface for measuring data into the
//! measurement registers of a confidential computing (CC) guest.
//!
//! On a confidential guest there is usually no TPM; the firmware
//! instead provides the CC measurement protocol. Each measurement has
//! the same two effects as a TPM measurement:
//!
//! 1. A new event is appended to the CC event log. The event records
//!    the measurement register (MR) index, the event type, and a
//!    description of what was measured.
//! 2. The MR is extended with a digest of the measured data. Extending
//!    is the only allowed write operation, so the register value can
//!    only be reset by resetting the guest.
//!
//! Callers name registers by TPM PCR index. The firmware maps each PCR
//! to one of its own MRs, and that mapping is queried for every
//! measurement rather than assumed.
//!
//! If the firmware does not provide the protocol at all, measuring is a
//! no-op that reports success. Whether a measurement failure is fatal
//! is decided by the caller.

use crate::cc_event::CcEvent;
use crate::uefi::{CcFirmware, CcFirmwareImpl};
use log::{debug, info};
use uefi::proto::tcg::{EventType, PcrIndex};
use uefi::Status;

/// All events created here describe a loaded image or blob.
const EVENT_TYPE: EventType = EventType::IPL;

/// No flags are defined for `hash_log_extend_event`.
const HASH_LOG_EXTEND_FLAGS: u64 = 0;

/// Broad category of a [`MeasureError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MeasureErrorKind {
    /// The measurement device malfunctioned.
    Io,

    /// The firmware rejected the request.
    BadArgument,

    /// The event record could not be allocated.
    OutOfMemory,

    /// No usable measurement backend, or an unrecognized status.
    UnknownDevice,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MeasureError {
    /// The firmware returned `DEVICE_ERROR`.
    #[error("measurement command failed")]
    CommandFailed,

    /// The firmware returned `INVALID_PARAMETER`.
    #[error("invalid parameter")]
    InvalidParameter,

    /// The firmware returned `BUFFER_TOO_SMALL`.
    #[error("output buffer too small")]
    BufferTooSmall,

    /// The firmware returned `NOT_FOUND`.
    #[error("measurement device unavailable")]
    DeviceUnavailable,

    /// The firmware returned a status with no specific meaning here.
    #[error("unknown measurement error: {0}")]
    Unknown(Status),

    /// Failed to allocate the event record.
    #[error("cannot allocate CC event buffer ({0} bytes)")]
    EventAllocationFailed(usize),

    /// The description is too long for the event size field.
    #[error("event description is too long ({0} bytes)")]
    EventTooLarge(usize),

    /// The description contains a null byte.
    #[error("event description contains a null byte")]
    InvalidDescription,
}

impl MeasureError {
    #[must_use]
    pub fn kind(&self) -> MeasureErrorKind {
        match self {
            Self::CommandFailed => MeasureErrorKind::Io,
            Self::InvalidParameter
            | Self::BufferTooSmall
            | Self::EventTooLarge(_)
            | Self::InvalidDescription => MeasureErrorKind::BadArgument,
            Self::EventAllocationFailed(_) => MeasureErrorKind::OutOfMemory,
            Self::DeviceUnavailable | Self::Unknown(_) => MeasureErrorKind::UnknownDevice,
        }
    }

    /// Convert a status that the firmware reported as a failure.
    fn from_status(status: Status) -> Self {
        match status_to_result(status) {
            Err(err) => err,
            // A failure carrying `SUCCESS` is malformed; it must not be
            // mistaken for a successful measurement.
            Ok(()) => Self::Unknown(status),
        }
    }

    /// Convert an error returned by the firmware.
    fn from_uefi(err: &uefi::Error) -> Self {
        Self::from_status(err.status())
    }
}

/// Convert a CC measurement protocol status to a result.
///
/// Only `SUCCESS` maps to `Ok`. Warnings and unrecognized statuses are
/// errors.
pub fn status_to_result(status: Status) -> Result<(), MeasureError> {
    match status {
        Status::SUCCESS => Ok(()),
        Status::DEVICE_ERROR => Err(MeasureError::CommandFailed),
        Status::INVALID_PARAMETER => Err(MeasureError::InvalidParameter),
        Status::BUFFER_TOO_SMALL => Err(MeasureError::BufferTooSmall),
        Status::NOT_FOUND => Err(MeasureError::DeviceUnavailable),
        _ => Err(MeasureError::Unknown(status)),
    }
}

/// Measures data through the firmware's CC measurement protocol.
pub struct CcLogger<'a> {
    firmware: &'a dyn CcFirmware,
}

impl<'a> CcLogger<'a> {
    #[must_use]
    pub fn new(firmware: &'a dyn CcFirmware) -> Self {
        Self { firmware }
    }

    /// Extend the MR corresponding to `pcr_index` with a measurement of
    /// `data_to_hash`, and add an event with `description` to the CC
    /// event log.
    ///
    /// Returns `Ok` without measuring anything if the firmware does not
    /// provide the CC measurement protocol.
    pub fn log_event(
        &self,
        data_to_hash: &[u8],
        pcr_index: PcrIndex,
        description: &str,
    ) -> Result<(), MeasureError> {
        let Some(mut cc) = self.firmware.locate_cc_measurement() else {
            info!("no CC measurement protocol found");
            return Ok(());
        };

        let mr_index = cc
            .map_pcr_to_mr_index(pcr_index)
            .map_err(|err| MeasureError::from_uefi(&err))?;
        debug!("PCR {} maps to MR {}", pcr_index.0, mr_index.0);

        let event = CcEvent::new(mr_index, EVENT_TYPE, description)?;

        info!(
            "measuring {} bytes into MR {}: {description}",
            data_to_hash.len(),
            mr_index.0
        );
        let result = cc.hash_log_extend_event(HASH_LOG_EXTEND_FLAGS, data_to_hash, &event);

        // Release the event before inspecting the result, so that no
        // exit path keeps it alive.
        drop(event);

        result.map_err(|err| MeasureError::from_uefi(&err))
    }
}

/// Measure `data_to_hash` into the MR corresponding to `pcr_index`
/// using the firmware's CC measurement protocol, if present.
///
/// See [`CcLogger::log_event`].
pub fn log_event(
    data_to_hash: &[u8],
    pcr_index: PcrIndex,
    description: &str,
) -> Result<(), MeasureError> {
    CcLogger::new(&CcFirmwareImpl).log_event(data_to_hash, pcr_index, description)
}
