// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use core::error::Error;
use core::fmt::{self, Write};
use log::error;
use uefi::runtime::{self, ResetType};
use uefi::{boot, system, Status};

/// How long the error stays on screen before shutdown, in microseconds.
const ERROR_DISPLAY_TIME_US: usize = 10_000_000;

/// Print a fatal measured-boot error and shut down the machine.
///
/// This is public so that it can be called through the
/// `halt_with_error` macro, but it should not be called directly.
pub fn halt_with_error_impl(exe: &str, version: &str, err: &dyn Error) -> ! {
    system::with_stdout(|stdout| {
        if write_report(stdout, exe, version, err).is_err() {
            // The console is unusable; the logger may still reach a
            // serial port.
            error!("measured boot failed: {err}");
        }
    });

    boot::stall(ERROR_DISPLAY_TIME_US);

    runtime::reset(ResetType::SHUTDOWN, Status::ABORTED, None)
}

/// Print a fatal measured-boot error and shut down the machine.
///
/// A macro rather than a function so that the package name and version
/// are those of the calling executable rather than of libcc.
#[macro_export]
macro_rules! halt_with_error {
    ($err:ident) => {
        $crate::halt_with_error_impl(env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"), &$err)
    };
}

/// Write the report shown before shutdown: the failing executable,
/// `err`, each of its causes numbered from the outermost, and a note
/// that the boot stops here.
fn write_report(
    writer: &mut dyn Write,
    exe: &str,
    version: &str,
    mut err: &dyn Error,
) -> fmt::Result {
    writeln!(writer, "Measured boot failed in {exe}-{version}: {err}")?;

    let mut depth = 0;
    while let Some(source) = err.source() {
        if depth == 0 {
            writeln!(writer, "Caused by:")?;
        }
        depth += 1;
        writeln!(writer, "  {depth}: {source}")?;
        err = source;
    }

    writeln!(writer, "The boot chain cannot be attested; shutting down.")
}
