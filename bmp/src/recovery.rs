// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sequence recovery.
//!
//! There is no sequence counter on disk. The next sequence number for a peer
//! is derived from the last record of its newest log file, which is found by
//! scanning backwards from the end of the file so that arbitrarily large logs
//! are never read in full.

use crate::error::Error;
use crate::log::recovery_log;
use crate::record::LogRecord;
use slog::Logger;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const UNIT_RECOVERY: &str = "recovery";

/// Size of the blocks read while scanning backwards for line breaks.
pub const SCAN_BLOCK_SIZE: u64 = 1024;

/// Sequence number for a log whose tail cannot be used.
pub const FIRST_SEQUENCE: u64 = 1;

/// Determine the sequence number following the last record in `path`.
///
/// Empty, missing, unreadable or corrupt files yield [`FIRST_SEQUENCE`]. A
/// damaged tail must never block ingestion, even though it means sequence
/// numbers restart for that peer.
pub fn recover_next_sequence(path: &Path, log: &Logger) -> u64 {
    match last_record(path) {
        Ok(Some(record)) => {
            let next = record.sequence.saturating_add(1);
            recovery_log!(log, debug, path, "recovered next sequence {}", next;
                "last_sequence" => record.sequence
            );
            next
        }
        Ok(None) => {
            recovery_log!(log, debug, path, "log is empty, starting at 1");
            FIRST_SEQUENCE
        }
        Err(e) => {
            recovery_log!(log, warn, path,
                "unusable log tail, restarting sequence at 1: {}", e;
                "error" => format!("{e}")
            );
            FIRST_SEQUENCE
        }
    }
}

/// Parse the last record of a log file. `Ok(None)` means the file is empty.
pub fn last_record(path: &Path) -> Result<Option<LogRecord>, Error> {
    let line = match last_line(path)? {
        Some(line) => line,
        None => return Ok(None),
    };
    let line = String::from_utf8_lossy(&line);
    Ok(Some(LogRecord::from_line(&line)?))
}

/// Read the final line of a file without its terminating newline.
///
/// The file is scanned backwards in [`SCAN_BLOCK_SIZE`] blocks until at least
/// two newlines have been seen, which guarantees the start of the last line
/// lies within the scanned region, or until the whole file has been scanned.
pub fn last_line(path: &Path) -> Result<Option<Vec<u8>>, std::io::Error> {
    let mut f = File::open(path)?;
    let size = f.metadata()?.len();
    if size == 0 {
        return Ok(None);
    }

    let mut block = [0u8; SCAN_BLOCK_SIZE as usize];
    let mut scanned = 0u64;
    let mut newlines = 0usize;
    while newlines < 2 && scanned < size {
        let n = SCAN_BLOCK_SIZE.min(size - scanned);
        f.seek(SeekFrom::Start(size - scanned - n))?;
        let chunk = &mut block[..n as usize];
        f.read_exact(chunk)?;
        newlines += chunk.iter().filter(|b| **b == b'\n').count();
        scanned += n;
    }

    f.seek(SeekFrom::Start(size - scanned))?;
    let mut tail = Vec::with_capacity(scanned as usize);
    f.take(scanned).read_to_end(&mut tail)?;

    // A trailing newline terminates the last line rather than starting an
    // empty one.
    let body = tail.strip_suffix(b"\n").unwrap_or(&tail);
    Ok(body.rsplit(|b| *b == b'\n').next().map(<[u8]>::to_vec))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::{PolicyMarker, LOG_TYPE_STATISTICS};
    use bmp_common::log::discard_logger;
    use bmp_common::test::TestDir;
    use std::fs::write;

    fn line(seq: u64, filler: usize) -> String {
        LogRecord {
            capture_time: 1700000000.5 + seq as f64,
            sequence: seq,
            type_code: LOG_TYPE_STATISTICS,
            payload: serde_json::json!({ "filler": "x".repeat(filler) }),
            marker: PolicyMarker::NONE,
        }
        .to_line()
        .expect("record line")
    }

    fn log_of(seqs: std::ops::RangeInclusive<u64>, filler: usize) -> String {
        seqs.map(|s| line(s, filler) + "\n").collect()
    }

    #[test]
    fn next_after_last_record() {
        let dir = TestDir::new("recovery_next").expect("test dir");
        let p = dir.join("1.msg");
        write(&p, log_of(1..=5, 0)).expect("write log");
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 6);
    }

    #[test]
    fn single_record_with_and_without_newline() {
        let dir = TestDir::new("recovery_single").expect("test dir");
        let p = dir.join("1.msg");
        write(&p, line(41, 0) + "\n").expect("write log");
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 42);
        write(&p, line(41, 0)).expect("write log");
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 42);
    }

    #[test]
    fn large_file_spanning_many_blocks() {
        let dir = TestDir::new("recovery_large").expect("test dir");
        let p = dir.join("1.msg");
        write(&p, log_of(1..=2000, 100)).expect("write log");
        assert!(std::fs::metadata(&p).unwrap().len() > 100 * SCAN_BLOCK_SIZE);
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 2001);
    }

    #[test]
    fn last_line_longer_than_a_block() {
        let dir = TestDir::new("recovery_long_line").expect("test dir");
        let p = dir.join("1.msg");
        let filler = 5 * SCAN_BLOCK_SIZE as usize;
        write(&p, log_of(1..=3, filler)).expect("write log");
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 4);
    }

    #[test]
    fn empty_and_missing_start_at_one() {
        let dir = TestDir::new("recovery_empty").expect("test dir");
        let p = dir.join("1.msg");
        write(&p, "").expect("write log");
        assert_eq!(last_record(&p).expect("empty log"), None);
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 1);
        assert_eq!(
            recover_next_sequence(&dir.join("missing.msg"), &discard_logger()),
            1
        );
    }

    #[test]
    fn corrupt_tail_starts_at_one() {
        let dir = TestDir::new("recovery_corrupt").expect("test dir");
        let p = dir.join("1.msg");

        // crash in the middle of a write
        let mut content = log_of(1..=9, 0);
        let partial = line(10, 0);
        content.push_str(&partial[..partial.len() / 2]);
        write(&p, &content).expect("write log");
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 1);

        // blank final line
        write(&p, log_of(1..=9, 0) + "\n").expect("write log");
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 1);

        // garbage
        write(&p, b"\xff\xfe\x00garbage\n").expect("write log");
        assert_eq!(recover_next_sequence(&p, &discard_logger()), 1);
    }

    #[test]
    fn last_line_helper() {
        let dir = TestDir::new("recovery_last_line").expect("test dir");
        let p = dir.join("1.msg");
        write(&p, "a\nbb\nccc\n").expect("write");
        assert_eq!(last_line(&p).unwrap(), Some(b"ccc".to_vec()));
        write(&p, "a\nbb\nccc").expect("write");
        assert_eq!(last_line(&p).unwrap(), Some(b"ccc".to_vec()));
        write(&p, "\n").expect("write");
        assert_eq!(last_line(&p).unwrap(), Some(Vec::new()));
    }
}
