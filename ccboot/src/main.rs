// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Measure the image's load options (the kernel command line) through
//! the CC measurement protocol before handing them on.

#![deny(clippy::arithmetic_side_effects)]
#![deny(clippy::indexing_slicing)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(target_os = "uefi", no_main)]
#![cfg_attr(target_os = "uefi", no_std)]

extern crate alloc;

mod measure;

use alloc::string::{String, ToString};
use libcc::logging::initialize_logging;
use libcc::uefi::CcFirmwareImpl;
use libcc::{halt_with_error, MeasureError};
use log::info;
use measure::{measure_command_line, MeasurePolicy};
use uefi::proto::loaded_image::LoadedImage;
use uefi::{boot, entry, Status};

#[derive(Debug, thiserror::Error)]
enum BootError {
    /// Failed to open the [`LoadedImage`] protocol.
    #[error("failed to open LoadedImage protocol: {0}")]
    OpenLoadedImageProtocolFailed(Status),

    /// Measuring the command line failed and the policy requires it.
    #[error("failed to measure the kernel command line")]
    Measure(#[source] MeasureError),
}

fn run() -> Result<(), BootError> {
    let policy = MeasurePolicy::from_boot_files();

    let loaded_image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())
        .map_err(|err| BootError::OpenLoadedImageProtocolFailed(err.status()))?;

    let Some(raw_command_line) = loaded_image.load_options_as_bytes() else {
        info!("no load options to measure");
        return Ok(());
    };

    // The text form only goes into the event description, so a command
    // line that isn't valid UCS-2 is still measured.
    let command_line: String = match loaded_image.load_options_as_cstr16() {
        Ok(command_line) => command_line.to_string(),
        Err(err) => {
            info!("load options are not a UCS-2 string: {err:?}");
            String::new()
        }
    };

    measure_command_line(&CcFirmwareImpl, policy, raw_command_line, &command_line)
        .map_err(BootError::Measure)
}

#[entry]
fn efi_main() -> Status {
    uefi::helpers::init().expect("failed to initialize uefi::helpers");
    initialize_logging();

    match run() {
        Ok(()) => Status::SUCCESS,
        Err(err) => halt_with_error!(err),
    }
}

// Host builds exist only to run the unit tests.
#[cfg(not(target_os = "uefi"))]
fn main() {}
