// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Boot-time configuration.
//!
//! There is no configuration file to parse. Instead, behavior is
//! toggled by the presence of marker files next to the executable on
//! the boot filesystem, e.g. `efi\boot\ccboot_verbose`.

use log::info;
use uefi::proto::media::file::{File, FileAttribute, FileMode};
use uefi::{boot, CStr16, Status};

/// Check if `path` exists on the filesystem the current executable was
/// loaded from. If any error occurs when checking for the file, `false`
/// is returned.
#[must_use]
pub fn boot_file_exists(path: &CStr16) -> bool {
    let mut sfs = match boot::get_image_file_system(boot::image_handle()) {
        Ok(sfs) => sfs,
        Err(err) => {
            info!("failed to open SimpleFileSystem: {err:?}");
            return false;
        }
    };

    let mut root = match sfs.open_volume() {
        Ok(root) => root,
        Err(err) => {
            info!("failed to open volume: {err:?}");
            return false;
        }
    };

    match root.open(path, FileMode::Read, FileAttribute::empty()) {
        Ok(_) => true,
        Err(err) => {
            if err.status() != Status::NOT_FOUND {
                info!("unexpected error when opening {path}: {err:?}");
            }
            false
        }
    }
}
