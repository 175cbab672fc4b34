// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test utilities for use across multiple crates.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// A scratch directory under /tmp that is removed when dropped, but only if
/// the test succeeded. Failed tests leave the directory behind so the log
/// files can be examined.
pub struct TestDir {
    path: PathBuf,
}

impl TestDir {
    /// Create a unique, empty directory. The name combines `test_name`, the
    /// process id and a counter so parallel tests never collide.
    pub fn new(test_name: &str) -> std::io::Result<Self> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let path = PathBuf::from(format!(
            "/tmp/{}_{}_{}",
            test_name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));

        // Stale directory from a crashed run.
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for TestDir {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let _ = std::fs::remove_dir_all(&self.path);
        } else {
            eprintln!("Test failed - files left at: {}", self.path.display());
        }
    }
}

#[macro_export]
macro_rules! parse {
    ($x:expr, $err:expr) => {
        $x.parse().expect($err)
    };
}

#[macro_export]
macro_rules! ip {
    ($x:expr) => {
        parse!($x, "ip address")
    };
}
