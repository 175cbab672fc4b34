// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default maximum size of one message file, in MB.
pub const DEFAULT_WRITE_MSG_MAX_SIZE: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Root of the per-device, per-peer message log tree.
    pub write_dir: PathBuf,

    /// Maximum size of one message file in MB. Accepted but not enforced,
    /// files are never rotated.
    pub write_msg_max_size: u64,
}

impl CollectorConfig {
    pub fn new(write_dir: impl Into<PathBuf>) -> Self {
        Self {
            write_dir: write_dir.into(),
            ..Default::default()
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./"));
        Self {
            write_dir: home.join("data/bmp/local/msg"),
            write_msg_max_size: DEFAULT_WRITE_MSG_MAX_SIZE,
        }
    }
}
