// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for sequencing and recovery using proptest
//!
//! These tests verify that:
//! - a fresh peer is numbered 1..N with no gaps whatever the message mix
//! - recovery yields k+1 for a log ending at k, regardless of payload size
//!   or how many older files sit next to the newest one
//! - a log line survives the trip through the strict line parser

use crate::collector::Disposition;
use crate::record::{LogRecord, PolicyMarker};
use crate::recovery::recover_next_sequence;
use crate::session::{log_file_name, PeerKey, SessionRegistry};
use crate::test::{
    peer_down_message, peer_up_message, route_monitoring_message,
    stats_message, MemorySink,
};
use crate::{Collector, CollectorConfig};
use bmp_common::log::discard_logger;
use bmp_common::test::TestDir;
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, UNIX_EPOCH};

/// Strategy for generating a message kind: 0..=3 recorded, 4 post-policy
/// route monitoring.
fn message_kind_strategy() -> impl Strategy<Value = u8> {
    0u8..=4
}

/// Strategy for generating arbitrary but well formed log records
fn log_record_strategy() -> impl Strategy<Value = LogRecord> {
    (
        0u32..=u32::MAX,
        0u32..1_000_000,
        1u64..u64::MAX / 2,
        any::<u8>(),
        ".{0,64}",
        any::<bool>(),
    )
        .prop_map(|(secs, micros, sequence, type_code, text, route)| {
            LogRecord {
                capture_time: f64::from(secs) + f64::from(micros) / 1e6,
                sequence,
                type_code,
                payload: serde_json::json!({ "text": text }),
                marker: if route {
                    PolicyMarker::ROUTE
                } else {
                    PolicyMarker::NONE
                },
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: N messages to a fresh peer are logged as 1..N in order
    #[test]
    fn prop_fresh_peer_is_contiguous(
        kinds in prop::collection::vec(message_kind_strategy(), 1..40)
    ) {
        let dir = TestDir::new("prop_contiguous").expect("test dir");
        let c = Collector::new(
            CollectorConfig::new(dir.join("msg")),
            MemorySink::default(),
            discard_logger(),
        ).expect("collector");
        let peer = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        for (i, kind) in kinds.iter().enumerate() {
            let msg = match kind {
                0 => route_monitoring_message(peer, false),
                1 => stats_message(peer),
                2 => peer_down_message(peer),
                3 => peer_up_message(peer),
                _ => route_monitoring_message(peer, true),
            };
            let code = crate::messages::MessageType::from(&msg).into();
            let d = c.on_message_received("r1", 40000, &msg, code)
                .expect("record");
            prop_assert_eq!(d, Disposition::Recorded { sequence: i as u64 + 1 });
        }

        let key = PeerKey::new("r1", peer);
        let slot = c.registry().get(&key).expect("session");
        prop_assert_eq!(slot.next_sequence(), Some(kinds.len() as u64 + 1));
    }

    /// Property: recovery from a file ending at k yields k+1, and older
    /// files do not matter
    #[test]
    fn prop_recovery_follows_newest_file(
        k in 1u64..100_000,
        older in 0usize..4,
        filler in 0usize..3000,
    ) {
        let dir = TestDir::new("prop_recovery").expect("test dir");
        let reg = SessionRegistry::new(dir.path(), discard_logger());
        let key = PeerKey::new("r1", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let peer_dir = reg.peer_dir(&key).expect("peer dir");
        std::fs::create_dir_all(&peer_dir).expect("create peer dir");

        let line = |sequence: u64| {
            LogRecord {
                capture_time: 1700000000.5,
                sequence,
                type_code: 129,
                payload: serde_json::json!({ "filler": "x".repeat(filler) }),
                marker: PolicyMarker::NONE,
            }.to_line().expect("line") + "\n"
        };

        for i in 0..older {
            let t = UNIX_EPOCH + Duration::from_secs(1_600_000_000 + i as u64);
            std::fs::write(peer_dir.join(log_file_name(t)), line(k + 1000))
                .expect("write older log");
        }
        let newest = peer_dir.join(log_file_name(
            UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        ));
        let content: String =
            (k.saturating_sub(3).max(1)..=k).map(line).collect();
        std::fs::write(&newest, content).expect("write newest log");

        prop_assert_eq!(recover_next_sequence(&newest, &discard_logger()), k + 1);
        let r = reg.with_session(&key, |s| {
            s.append(129, serde_json::json!({}), PolicyMarker::NONE)
        }).expect("append");
        prop_assert_eq!(r.sequence, k + 1);
    }

    /// Property: a record read back from its line is the record written
    #[test]
    fn prop_log_line_parses_back(record in log_record_strategy()) {
        let line = record.to_line().expect("to line");
        prop_assert!(!line.contains('\n'));
        prop_assert_eq!(LogRecord::from_line(&line).expect("from line"), record);
    }
}
