// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping decoded messages onto log entries and structured records.

use crate::error::Error;
use crate::messages::{
    flag_str, prefix_list, Message, OpenMessage, PathAttributeTypeCode,
    PeerDownNotification, PeerHeader, PeerUpNotification, RouteMonitoring,
    StatType, StatisticsReport,
};
use crate::record::{
    PolicyMarker, LOG_TYPE_PEER_DOWN, LOG_TYPE_PEER_UP, LOG_TYPE_POST_POLICY,
    LOG_TYPE_STATISTICS,
};
use chrono::{DateTime, Local};
use mdb::{
    Origin, PeerDownRecord, PeerFields, PeerUpRecord, RouteMonitoringRecord,
    StatisticsRecord, StructuredRecord, NOT_EXIST,
};
use serde_json::Value;

/// Format of the human readable timestamp in structured records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The message dependent part of a log record. The session supplies the
/// capture time and sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub type_code: u8,
    pub payload: Value,
    pub marker: PolicyMarker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mapped {
    pub entry: LogEntry,
    pub record: StructuredRecord,
}

/// Map a message onto everything the collector records for it. Messages
/// that are not recorded map to `None`.
pub fn map_message(device: &str, msg: &Message) -> Result<Option<Mapped>, Error> {
    let entry = match log_entry(msg)? {
        Some(entry) => entry,
        None => return Ok(None),
    };
    let record = match structured_record(device, msg) {
        Some(record) => record,
        None => return Ok(None),
    };
    Ok(Some(Mapped { entry, record }))
}

pub fn log_entry(msg: &Message) -> Result<Option<LogEntry>, Error> {
    let entry = match msg {
        Message::RouteMonitoring(h, rm) if h.flags.post_policy() => LogEntry {
            type_code: LOG_TYPE_POST_POLICY,
            payload: serde_json::to_value(rm)?,
            marker: PolicyMarker::ROUTE,
        },
        Message::RouteMonitoring(_, rm) => LogEntry {
            type_code: rm.bgp_type,
            payload: serde_json::to_value(&rm.update)?,
            marker: PolicyMarker::ROUTE,
        },
        Message::StatisticsReport(_, report) => LogEntry {
            type_code: LOG_TYPE_STATISTICS,
            payload: serde_json::to_value(&report.counters)?,
            marker: PolicyMarker::NONE,
        },
        Message::PeerDown(_, reason) => LogEntry {
            type_code: LOG_TYPE_PEER_DOWN,
            payload: serde_json::to_value(reason)?,
            marker: PolicyMarker::NONE,
        },
        Message::PeerUp(_, up) => LogEntry {
            type_code: LOG_TYPE_PEER_UP,
            payload: serde_json::to_value(&up.received_open)?,
            marker: PolicyMarker::NONE,
        },
        Message::Initiation(_)
        | Message::Termination(_)
        | Message::RouteMirroring(_) => return Ok(None),
    };
    Ok(Some(entry))
}

pub fn structured_record(
    device: &str,
    msg: &Message,
) -> Option<StructuredRecord> {
    let record = match msg {
        Message::RouteMonitoring(h, rm) => {
            StructuredRecord::RouteMonitoring(route_monitoring(device, h, rm))
        }
        Message::StatisticsReport(h, report) => {
            StructuredRecord::Statistics(statistics(device, h, report))
        }
        Message::PeerDown(h, reason) => {
            StructuredRecord::PeerDown(peer_down(device, h, reason))
        }
        Message::PeerUp(h, up) => {
            StructuredRecord::PeerUp(peer_up(device, h, up))
        }
        Message::Initiation(_)
        | Message::Termination(_)
        | Message::RouteMirroring(_) => return None,
    };
    Some(record)
}

fn peer_fields(h: &PeerHeader) -> PeerFields {
    PeerFields {
        peer_address: h.address.to_string(),
        peer_bgp_id: h.bgp_id.to_string(),
        peer_as: h.asn.to_string(),
        peer_flags_a: flag_str(h.flags.a).to_owned(),
        peer_flags_l: flag_str(h.flags.l).to_owned(),
        peer_flags_v: flag_str(h.flags.v).to_owned(),
    }
}

fn origin(device: &str, h: &PeerHeader) -> Origin {
    Origin {
        device_ip: device.to_owned(),
        timestamp: local_timestamp(h.timestamp.seconds),
    }
}

/// Render unix seconds as local time. Sub-second precision is dropped.
pub fn local_timestamp(seconds: u32) -> String {
    DateTime::from_timestamp(i64::from(seconds), 0)
        .map(|t| t.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| NOT_EXIST.to_owned())
}

fn or_not_exist<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string())
        .unwrap_or_else(|| NOT_EXIST.to_owned())
}

fn route_monitoring(
    device: &str,
    h: &PeerHeader,
    rm: &RouteMonitoring,
) -> RouteMonitoringRecord {
    let attr = |code: PathAttributeTypeCode| or_not_exist(rm.update.attr(code));
    RouteMonitoringRecord {
        peer: peer_fields(h),
        path_attr_origin: attr(PathAttributeTypeCode::Origin),
        path_attr_as_path: attr(PathAttributeTypeCode::AsPath),
        path_attr_next_hop: attr(PathAttributeTypeCode::NextHop),
        path_attr_med: attr(PathAttributeTypeCode::MultiExitDisc),
        path_attr_local_pref: attr(PathAttributeTypeCode::LocalPref),
        path_attr_atomic_aggregate: attr(
            PathAttributeTypeCode::AtomicAggregate,
        ),
        path_attr_aggregator: attr(PathAttributeTypeCode::Aggregator),
        path_attr_community: attr(PathAttributeTypeCode::Communities),
        nlri_withdrawn: prefix_list(&rm.update.withdrawn),
        nlri: prefix_list(&rm.update.nlri),
        origin: origin(device, h),
    }
}

fn statistics(
    device: &str,
    h: &PeerHeader,
    report: &StatisticsReport,
) -> StatisticsRecord {
    let stat = |typ: StatType| or_not_exist(report.get(typ));
    StatisticsRecord {
        peer: peer_fields(h),
        num_pref_rejected_by_in_policy: stat(StatType::RejectedByPolicy),
        num_dup_prefixes_advertise: stat(
            StatType::DuplicatePrefixAdvertisements,
        ),
        num_dup_withdraws: stat(StatType::DuplicateWithdraws),
        num_updates_invalid_cluster_list_loop: stat(
            StatType::InvalidClusterListLoop,
        ),
        num_updates_invalid_as_path_loop: stat(StatType::InvalidAsPathLoop),
        num_updates_invalid_originator_loop: stat(
            StatType::InvalidOriginatorId,
        ),
        num_updates_invalid_as_confed_loop: stat(
            StatType::InvalidAsConfedLoop,
        ),
        num_routes_adj_ribs_in: stat(StatType::AdjRibInRoutes),
        num_routes_loc_rib: stat(StatType::LocRibRoutes),
        num_routes_per_afi_safi_adj_ribs_in: stat(
            StatType::PerAfiSafiAdjRibInRoutes,
        ),
        num_routes_per_afi_safi_loc_rib: stat(
            StatType::PerAfiSafiLocRibRoutes,
        ),
        num_updates_treat_as_withdraw: stat(StatType::UpdatesTreatAsWithdraw),
        num_prefixes_treat_as_withdraw: stat(
            StatType::PrefixesTreatAsWithdraw,
        ),
        num_dup_updates_msg: stat(StatType::DuplicateUpdates),
        origin: origin(device, h),
    }
}

fn peer_down(
    device: &str,
    h: &PeerHeader,
    reason: &PeerDownNotification,
) -> PeerDownRecord {
    PeerDownRecord {
        peer: peer_fields(h),
        peer_down_reason: reason.to_string(),
        origin: origin(device, h),
    }
}

fn peer_up(
    device: &str,
    h: &PeerHeader,
    up: &PeerUpNotification,
) -> PeerUpRecord {
    let OpenMessage {
        hold_time: peer_hold_time,
        capabilities: peer_caps,
        ..
    } = &up.received_open;
    let local = &up.sent_open;
    PeerUpRecord {
        peer: peer_fields(h),
        peer_bgp_port: up.remote_port.to_string(),
        peer_hold_time: peer_hold_time.to_string(),
        peer_capabilities_route_refresh: peer_caps.route_refresh.to_string(),
        peer_capabilities_four_bytes_as: peer_caps.four_bytes_as.to_string(),
        local_address: up.local_address.to_string(),
        local_bgp_id: local.bgp_id.to_string(),
        local_as: local.asn.to_string(),
        local_hold_time: local.hold_time.to_string(),
        local_bgp_port: up.local_port.to_string(),
        local_capabilities_route_refresh: local
            .capabilities
            .route_refresh
            .to_string(),
        local_capabilities_four_bytes_as: local
            .capabilities
            .four_bytes_as
            .to_string(),
        origin: origin(device, h),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::messages::*;
    use crate::test::{peer_header, peer_up_message, route_monitoring_message};
    use bmp_common::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn pre_policy_route_monitoring() {
        let msg = route_monitoring_message(ip!("10.0.0.1"), false);
        let entry = log_entry(&msg).unwrap().expect("recorded");
        assert_eq!(entry.type_code, BGP_UPDATE);
        assert_eq!(entry.marker, PolicyMarker::ROUTE);
        let Message::RouteMonitoring(_, rm) = &msg else {
            panic!("not route monitoring");
        };
        assert_eq!(entry.payload, serde_json::to_value(&rm.update).unwrap());
    }

    #[test]
    fn post_policy_route_monitoring() {
        let msg = route_monitoring_message(ip!("10.0.0.1"), true);
        let entry = log_entry(&msg).unwrap().expect("recorded");
        assert_eq!(entry.type_code, LOG_TYPE_POST_POLICY);
        assert_eq!(entry.marker, PolicyMarker::ROUTE);
        assert_eq!(entry.payload["bgp_type"], json!(BGP_UPDATE));
        assert!(entry.payload["update"].is_object());
    }

    #[test]
    fn route_monitoring_columns() {
        let msg = route_monitoring_message(ip!("10.0.0.1"), false);
        let Some(StructuredRecord::RouteMonitoring(r)) =
            structured_record("10.0.0.254", &msg)
        else {
            panic!("expected a route monitoring record");
        };
        assert_eq!(r.peer.peer_address, "10.0.0.1");
        assert_eq!(r.peer.peer_as, "65001");
        assert_eq!(r.peer.peer_flags_l, "0");
        assert_eq!(r.path_attr_origin, "0");
        assert_eq!(r.path_attr_as_path, "[65001, 65002]");
        assert_eq!(r.path_attr_next_hop, "10.0.0.1");
        assert_eq!(r.path_attr_med, NOT_EXIST);
        assert_eq!(r.path_attr_local_pref, NOT_EXIST);
        assert_eq!(r.path_attr_community, "[65001:100]");
        assert_eq!(r.nlri, "[198.51.100.0/24]");
        assert_eq!(r.nlri_withdrawn, "[]");
        assert_eq!(r.origin.device_ip, "10.0.0.254");
        assert_eq!(r.origin.timestamp, local_timestamp(1700000000));
    }

    #[test]
    fn statistics_mapping() {
        let mut report = StatisticsReport::default();
        report.set(StatType::RejectedByPolicy, StatValue::Counter(4));
        report.set(StatType::AdjRibInRoutes, StatValue::Gauge(1200));
        let msg = Message::StatisticsReport(
            peer_header(ip!("10.0.0.1"), false),
            report,
        );

        let entry = log_entry(&msg).unwrap().expect("recorded");
        assert_eq!(entry.type_code, LOG_TYPE_STATISTICS);
        assert_eq!(entry.marker, PolicyMarker::NONE);
        assert_eq!(
            entry.payload,
            json!({"0": {"counter": 4}, "7": {"gauge": 1200}})
        );

        let Some(StructuredRecord::Statistics(r)) =
            structured_record("r1", &msg)
        else {
            panic!("expected a statistics record");
        };
        assert_eq!(r.num_pref_rejected_by_in_policy, "4");
        assert_eq!(r.num_routes_adj_ribs_in, "1200");
        assert_eq!(r.num_dup_withdraws, NOT_EXIST);
        assert_eq!(r.num_dup_updates_msg, NOT_EXIST);
    }

    #[test]
    fn peer_down_mapping() {
        let msg = Message::PeerDown(
            peer_header(ip!("10.0.0.1"), false),
            PeerDownNotification::RemoteNoData,
        );
        let entry = log_entry(&msg).unwrap().expect("recorded");
        assert_eq!(entry.type_code, LOG_TYPE_PEER_DOWN);
        assert_eq!(entry.payload, json!("remote_no_data"));

        let Some(StructuredRecord::PeerDown(r)) = structured_record("r1", &msg)
        else {
            panic!("expected a peer down record");
        };
        assert_eq!(r.peer_down_reason, "remote no data");
    }

    #[test]
    fn peer_up_mapping() {
        let msg = peer_up_message(ip!("10.0.0.1"));
        let entry = log_entry(&msg).unwrap().expect("recorded");
        assert_eq!(entry.type_code, LOG_TYPE_PEER_UP);
        assert_eq!(entry.marker, PolicyMarker::NONE);
        assert_eq!(entry.payload["asn"], json!(65001));
        assert_eq!(entry.payload["hold_time"], json!(90));

        let Some(StructuredRecord::PeerUp(r)) = structured_record("r1", &msg)
        else {
            panic!("expected a peer up record");
        };
        assert_eq!(r.peer_bgp_port, "179");
        assert_eq!(r.peer_hold_time, "90");
        assert_eq!(r.peer_capabilities_four_bytes_as, "true");
        assert_eq!(r.local_as, "65000");
        assert_eq!(r.local_bgp_id, "10.0.0.254");
        assert_eq!(r.local_bgp_port, "40000");
        assert_eq!(r.local_hold_time, "180");
        assert_eq!(r.local_capabilities_route_refresh, "false");
    }

    #[test]
    fn unrecorded_types_map_to_nothing() {
        for msg in [
            Message::Initiation(vec![]),
            Message::Termination(vec![]),
            Message::RouteMirroring(peer_header(ip!("10.0.0.1"), false)),
        ] {
            assert_eq!(map_message("r1", &msg).unwrap(), None);
        }
    }

    #[test]
    fn timestamp_format() {
        let ts = local_timestamp(0);
        assert_eq!(ts.len(), "1970-01-01 00:00:00".len());
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[13..14], ":");
    }
}
