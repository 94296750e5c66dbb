// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Measured boot support for confidential computing guests.
//!
//! The main entry point is [`log_event`], which measures a buffer into
//! a measurement register through the firmware's CC measurement
//! protocol and records a matching event in the CC event log.

// Turn off std, except when running tests or building the mocks.
#![cfg_attr(not(any(test, feature = "test_util")), no_std)]
#![deny(clippy::cast_lossless)]
#![deny(clippy::cast_possible_truncation)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::cast_precision_loss)]
#![deny(clippy::cast_sign_loss)]
#![deny(clippy::ptr_as_ptr)]

extern crate alloc;

pub mod cc;
pub mod cc_event;
pub mod config;
mod error;
pub mod logging;
pub mod uefi;
mod util;

pub use cc::{log_event, status_to_result, CcLogger, MeasureError, MeasureErrorKind};
pub use error::halt_with_error_impl;
