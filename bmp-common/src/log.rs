// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logger construction shared by the collector crates.
//!
//! Everything logs through slog. Daemon-side loggers emit bunyan JSON behind
//! an async drain so that per-message logging never blocks on the sink.

use slog::{Drain, Logger};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Depth of the async drain channel. Messages beyond this are dropped rather
/// than stalling a peer pipeline.
const ASYNC_CHAN_SIZE: usize = 0x8000;

pub fn init_file_logger<P: AsRef<Path>>(path: P) -> std::io::Result<Logger> {
    Ok(build_logger(File::create(path)?))
}

fn build_logger<W: Write + Send + 'static>(w: W) -> Logger {
    let drain = slog_bunyan::new(w).build().fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(ASYNC_CHAN_SIZE)
        .build()
        .fuse();
    slog::Logger::root(drain, slog::o!())
}

/// A logger that discards everything, for callers that have nowhere to log.
pub fn discard_logger() -> Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
