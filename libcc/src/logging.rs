// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::config::boot_file_exists;
use alloc::format;
use alloc::string::String;
use core::fmt::Write;
use log::{LevelFilter, Metadata, Record};
use uefi::{cstr16, println};

/// Logger that prints to the UEFI console.
///
/// Level filtering is done by the `log` crate macros, using the max
/// level set in `initialize_logging_with_level`.
struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        println!("{}", format_record(record));
    }

    fn flush(&self) {}
}

fn format_record(record: &Record) -> String {
    let mut output = format!(
        "{}: [{}",
        record.level(),
        record.file().unwrap_or("<unknown>")
    );
    if let Some(line) = record.line() {
        // OK to unwrap: writing to a string cannot fail.
        write!(output, "({line})").unwrap();
    }

    // OK to unwrap: writing to a string cannot fail.
    write!(output, "] {}", record.args()).unwrap();

    output
}

/// Pick the display level: `Debug` if the verbose marker file exists,
/// otherwise `Warn`.
fn display_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Initialize logging at the specified level.
///
/// # Panics
///
/// Panics if called more than once.
pub fn initialize_logging_with_level(level: LevelFilter) {
    log::set_logger(&LOGGER).expect("logger must not be initialized twice");
    log::set_max_level(level);
}

/// Initialize logging.
///
/// By default only warnings and errors are shown, so a normal boot
/// prints nothing. If `efi\boot\ccboot_verbose` exists on the boot
/// filesystem, debug logs are shown as well.
///
/// # Panics
///
/// Panics if called more than once.
pub fn initialize_logging() {
    let verbose = boot_file_exists(cstr16!(r"efi\boot\ccboot_verbose"));
    initialize_logging_with_level(display_level(verbose));
}
