// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The uniform log record and its line format.
//!
//! Each record is written as a single JSON array on its own line:
//!
//! ```text
//! [captureTime, sequence, typeCode, payload, [marker0, marker1]]
//! ```
//!
//! `captureTime` is wall clock seconds with fractional precision. Parsing is
//! strict: a line is either exactly this five element array or an error.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Type code logged for a PeerUp message.
pub const LOG_TYPE_PEER_UP: u8 = 1;

/// Type code logged for a PeerDown message.
pub const LOG_TYPE_PEER_DOWN: u8 = 3;

/// Type code logged for a statistics report.
pub const LOG_TYPE_STATISTICS: u8 = 129;

/// Type code logged for a post-policy route monitoring message.
pub const LOG_TYPE_POST_POLICY: u8 = 130;

/// Tag distinguishing policy phases of route records.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct PolicyMarker(pub u8, pub u8);

impl PolicyMarker {
    /// Marker carried by route monitoring records.
    pub const ROUTE: PolicyMarker = PolicyMarker(1, 1);

    /// Marker carried by every other record.
    pub const NONE: PolicyMarker = PolicyMarker(0, 0);
}

type LogLine = (f64, u64, u8, Value, PolicyMarker);

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(from = "LogLine", into = "LogLine")]
pub struct LogRecord {
    /// Wall clock time the record was written, in seconds.
    pub capture_time: f64,
    pub sequence: u64,
    pub type_code: u8,
    pub payload: Value,
    pub marker: PolicyMarker,
}

impl From<LogLine> for LogRecord {
    fn from(l: LogLine) -> Self {
        let (capture_time, sequence, type_code, payload, marker) = l;
        Self {
            capture_time,
            sequence,
            type_code,
            payload,
            marker,
        }
    }
}

impl From<LogRecord> for LogLine {
    fn from(r: LogRecord) -> Self {
        (r.capture_time, r.sequence, r.type_code, r.payload, r.marker)
    }
}

impl LogRecord {
    /// Serialize to a single line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a line produced by [`LogRecord::to_line`]. Surrounding
    /// whitespace, including a trailing newline, is tolerated.
    pub fn from_line(line: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Current wall clock time in seconds since the epoch.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn line_shape() {
        let r = LogRecord {
            capture_time: 1700000000.25,
            sequence: 7,
            type_code: LOG_TYPE_STATISTICS,
            payload: json!({"0": {"counter": 3}}),
            marker: PolicyMarker::NONE,
        };
        let line = r.to_line().expect("to line");
        assert_eq!(line, r#"[1700000000.25,7,129,{"0":{"counter":3}},[0,0]]"#);
        assert!(!line.contains('\n'));
        assert_eq!(LogRecord::from_line(&format!("{line}\n")).unwrap(), r);
    }

    #[test]
    fn strict_parsing() {
        for bad in [
            "",
            "[]",
            "[1.0, 2, 3, {}]",
            "[1.0, 2, 3, {}, [1, 1], 9]",
            "[1.0, -2, 3, {}, [1, 1]]",
            "[1.0, 2, 300, {}, [1, 1]]",
            "[1.0, 2, 3, {}, (1, 1)]",
            "[1.0, 2, 3, {}, [1, 1]",
            "__import__('os').system('true')",
        ] {
            assert!(LogRecord::from_line(bad).is_err(), "accepted {bad:?}");
        }
    }
}
