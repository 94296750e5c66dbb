// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Measurement policy.
//!
//! `libcc` only performs measurements; deciding whether a failed
//! measurement blocks the boot is up to this executable.

use alloc::format;
use libcc::config::boot_file_exists;
use libcc::uefi::CcFirmware;
use libcc::{CcLogger, MeasureError};
use log::{info, warn};
use uefi::cstr16;
use uefi::proto::tcg::PcrIndex;

/// Measure into PCR 8, which is also used by GRUB for the kernel
/// command line. PCRs 0-7 belong to the firmware.
pub const PCR_INDEX: PcrIndex = PcrIndex(8);

/// Prefix of the event description for the command line measurement.
const COMMAND_LINE_PREFIX: &str = "kernel_cmdline: ";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MeasurePolicy {
    /// A failed measurement is logged and the boot continues.
    Advisory,

    /// A failed measurement stops the boot.
    Required,
}

impl MeasurePolicy {
    /// Get the policy from the boot filesystem. Measurement is required
    /// if `efi\boot\ccboot_require_measurement` exists, otherwise it is
    /// advisory.
    #[must_use]
    pub fn from_boot_files() -> Self {
        if boot_file_exists(cstr16!(r"efi\boot\ccboot_require_measurement")) {
            Self::Required
        } else {
            Self::Advisory
        }
    }

    /// Apply the policy to the result of a measurement.
    pub fn check(self, result: Result<(), MeasureError>) -> Result<(), MeasureError> {
        match (self, result) {
            (_, Ok(())) => Ok(()),
            (Self::Advisory, Err(err)) => {
                warn!("measurement failed, continuing anyway: {err}");
                Ok(())
            }
            (Self::Required, Err(err)) => Err(err),
        }
    }
}

/// Measure the kernel command line into [`PCR_INDEX`].
///
/// `raw_command_line` is the exact data that gets hashed;
/// `command_line` is its text form, used in the event description.
pub fn measure_command_line(
    firmware: &dyn CcFirmware,
    policy: MeasurePolicy,
    raw_command_line: &[u8],
    command_line: &str,
) -> Result<(), MeasureError> {
    info!("measuring command line with {policy:?} policy");

    let description = format!("{COMMAND_LINE_PREFIX}{command_line}");
    let result = CcLogger::new(firmware).log_event(raw_command_line, PCR_INDEX, &description);
    policy.check(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcc::uefi::{CcMeasurement, MockCcFirmware, MockCcMeasurement, MrIndex};
    use uefi::{Error, Status};

    fn create_firmware(cc: MockCcMeasurement) -> MockCcFirmware {
        let mut firmware = MockCcFirmware::new();
        firmware
            .expect_locate_cc_measurement()
            .return_once(move || -> Option<Box<dyn CcMeasurement>> { Some(Box::new(cc)) });
        firmware
    }

    /// Create a protocol mock whose `hash_log_extend_event` returns
    /// `status`.
    fn create_cc(status: Status) -> MockCcMeasurement {
        let mut cc = MockCcMeasurement::new();
        cc.expect_map_pcr_to_mr_index()
            .withf(|pcr_index| pcr_index.0 == 8)
            .returning(|_| Ok(MrIndex(3)));
        cc.expect_hash_log_extend_event()
            .times(1)
            .returning(move |_, _, _| {
                if status.is_success() {
                    Ok(())
                } else {
                    Err(Error::from(status))
                }
            });
        cc
    }

    /// Test that the command line is hashed as-is and described with
    /// the `kernel_cmdline` prefix.
    #[test]
    fn test_measure_command_line() {
        let mut cc = MockCcMeasurement::new();
        cc.expect_map_pcr_to_mr_index()
            .returning(|_| Ok(MrIndex(3)));
        cc.expect_hash_log_extend_event()
            .withf(|_, data, event| {
                data == b"c\0o\0n\0"
                    && event.event_data() == b"kernel_cmdline: con\0"
                    && event.mr_index() == MrIndex(3)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let firmware = create_firmware(cc);

        assert_eq!(
            measure_command_line(&firmware, MeasurePolicy::Required, b"c\0o\0n\0", "con"),
            Ok(())
        );
    }

    /// Test that an advisory measurement failure does not stop the boot.
    #[test]
    fn test_advisory_failure() {
        let firmware = create_firmware(create_cc(Status::DEVICE_ERROR));
        assert_eq!(
            measure_command_line(&firmware, MeasurePolicy::Advisory, b"abc", "abc"),
            Ok(())
        );
    }

    /// Test that a required measurement failure is returned.
    #[test]
    fn test_required_failure() {
        let firmware = create_firmware(create_cc(Status::DEVICE_ERROR));
        assert_eq!(
            measure_command_line(&firmware, MeasurePolicy::Required, b"abc", "abc"),
            Err(MeasureError::CommandFailed)
        );
    }

    /// Test that a missing CC protocol is not a failure, even when
    /// measurement is required.
    #[test]
    fn test_required_no_protocol() {
        let mut firmware = MockCcFirmware::new();
        firmware
            .expect_locate_cc_measurement()
            .times(1)
            .returning(|| None);
        assert_eq!(
            measure_command_line(&firmware, MeasurePolicy::Required, b"abc", "abc"),
            Ok(())
        );
    }

    #[test]
    fn test_policy_check() {
        assert_eq!(MeasurePolicy::Required.check(Ok(())), Ok(()));
        assert_eq!(
            MeasurePolicy::Advisory.check(Err(MeasureError::InvalidParameter)),
            Ok(())
        );
        assert_eq!(
            MeasurePolicy::Required.check(Err(MeasureError::InvalidParameter)),
            Err(MeasureError::InvalidParameter)
        );
    }
}
