// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::record::LogRecord;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// An append-only message log file.
///
/// Each record is written as one complete line and flushed before `append`
/// returns, so the tail seen by sequence recovery is always consistent with
/// what has been acknowledged.
#[derive(Debug)]
pub struct LogWriter {
    path: PathBuf,
    file: Option<File>,
}

impl LogWriter {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut w = Self::deferred(path);
        w.file()?;
        Ok(w)
    }

    /// A writer for `path` that does not touch the filesystem until the
    /// first append, so a session that never logs leaves no empty file.
    pub fn deferred(path: &Path) -> Self {
        Self {
            path: path.to_owned(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &LogRecord) -> Result<(), Error> {
        let mut line = record.to_line()?;
        line.push('\n');
        let file = self.file()?;
        // single write so a line is never interleaved with another
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn file(&mut self) -> Result<&mut File, Error> {
        let file = match self.file.take() {
            Some(f) => f,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        Ok(self.file.insert(file))
    }
}
