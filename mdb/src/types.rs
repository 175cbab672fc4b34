// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured record shapes.
//!
//! Every decoded BMP message that the collector keeps is flattened into one of
//! the four record types below. All values are text, and a field that was not
//! present in the source message holds [`NOT_EXIST`] so that the shape of a
//! record never depends on the message contents.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Placeholder for fields absent from the source message.
pub const NOT_EXIST: &str = "Not exist";

/// The tables records are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    RouteMonitoring,
    StatisticsReport,
    PeerDownNotification,
    PeerUpNotification,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::RouteMonitoring,
        Table::StatisticsReport,
        Table::PeerDownNotification,
        Table::PeerUpNotification,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::RouteMonitoring => "route_monitoring",
            Table::StatisticsReport => "statistics_report",
            Table::PeerDownNotification => "peer_down_notification",
            Table::PeerUpNotification => "peer_up_notification",
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::UnknownTable(s.to_owned()))
    }
}

/// Fields describing the monitored BGP peer, common to all record types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerFields {
    pub peer_address: String,
    pub peer_bgp_id: String,
    pub peer_as: String,
    #[serde(rename = "peer_flags_A")]
    pub peer_flags_a: String,
    #[serde(rename = "peer_flags_L")]
    pub peer_flags_l: String,
    #[serde(rename = "peer_flags_V")]
    pub peer_flags_v: String,
}

impl PeerFields {
    fn columns(&self) -> [(&'static str, &str); 6] {
        [
            col("peer_address", &self.peer_address),
            col("peer_bgp_id", &self.peer_bgp_id),
            col("peer_as", &self.peer_as),
            col("peer_flags_A", &self.peer_flags_a),
            col("peer_flags_L", &self.peer_flags_l),
            col("peer_flags_V", &self.peer_flags_v),
        ]
    }
}

/// Where and when a message was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Management address of the monitored router.
    pub device_ip: String,

    /// Capture time of the message, `%Y-%m-%d %H:%M:%S` local time.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMonitoringRecord {
    #[serde(flatten)]
    pub peer: PeerFields,
    #[serde(rename = "path_attr_ORIGIN")]
    pub path_attr_origin: String,
    #[serde(rename = "path_attr_AS_PATH")]
    pub path_attr_as_path: String,
    #[serde(rename = "path_attr_NEXT_HOP")]
    pub path_attr_next_hop: String,
    #[serde(rename = "path_attr_MED")]
    pub path_attr_med: String,
    #[serde(rename = "path_attr_LOCAL_PREF")]
    pub path_attr_local_pref: String,
    #[serde(rename = "path_attr_ATOMIC_AGGREGATE")]
    pub path_attr_atomic_aggregate: String,
    #[serde(rename = "path_attr_AGGREGATOR")]
    pub path_attr_aggregator: String,
    #[serde(rename = "path_attr_COMMUNITY")]
    pub path_attr_community: String,
    pub nlri_withdrawn: String,
    pub nlri: String,
    #[serde(flatten)]
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    #[serde(flatten)]
    pub peer: PeerFields,
    pub num_pref_rejected_by_in_policy: String,
    pub num_dup_prefixes_advertise: String,
    pub num_dup_withdraws: String,
    #[serde(rename = "num_updates_invalid_CLUSTER_LIST_loop")]
    pub num_updates_invalid_cluster_list_loop: String,
    #[serde(rename = "num_updates_invalid_AS_PATH_loop")]
    pub num_updates_invalid_as_path_loop: String,
    #[serde(rename = "num_updates_invalid_ORIGINATOR_loop")]
    pub num_updates_invalid_originator_loop: String,
    #[serde(rename = "num_updates_invalid_AS_CONFED_loop")]
    pub num_updates_invalid_as_confed_loop: String,
    #[serde(rename = "num_routes_Adj_RIBs_In")]
    pub num_routes_adj_ribs_in: String,
    #[serde(rename = "num_routes_Loc_RIB")]
    pub num_routes_loc_rib: String,
    #[serde(rename = "num_routes_per_AFI_SAFI_Adj_RIBs_In")]
    pub num_routes_per_afi_safi_adj_ribs_in: String,
    #[serde(rename = "num_routes_per_AFI_SAFI_Loc_RIB")]
    pub num_routes_per_afi_safi_loc_rib: String,
    pub num_updates_treat_as_withdraw: String,
    pub num_prefixes_treat_as_withdraw: String,
    pub num_dup_updates_msg: String,
    #[serde(flatten)]
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDownRecord {
    #[serde(flatten)]
    pub peer: PeerFields,
    pub peer_down_reason: String,
    #[serde(flatten)]
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerUpRecord {
    #[serde(flatten)]
    pub peer: PeerFields,
    pub peer_bgp_port: String,
    pub peer_hold_time: String,
    pub peer_capabilities_route_refresh: String,
    pub peer_capabilities_four_bytes_as: String,
    pub local_address: String,
    pub local_bgp_id: String,
    pub local_as: String,
    pub local_hold_time: String,
    pub local_bgp_port: String,
    pub local_capabilities_route_refresh: String,
    pub local_capabilities_four_bytes_as: String,
    #[serde(flatten)]
    pub origin: Origin,
}

/// One flattened BMP message, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredRecord {
    RouteMonitoring(RouteMonitoringRecord),
    Statistics(StatisticsRecord),
    PeerDown(PeerDownRecord),
    PeerUp(PeerUpRecord),
}

impl StructuredRecord {
    pub fn table(&self) -> Table {
        match self {
            Self::RouteMonitoring(_) => Table::RouteMonitoring,
            Self::Statistics(_) => Table::StatisticsReport,
            Self::PeerDown(_) => Table::PeerDownNotification,
            Self::PeerUp(_) => Table::PeerUpNotification,
        }
    }

    pub fn peer(&self) -> &PeerFields {
        match self {
            Self::RouteMonitoring(r) => &r.peer,
            Self::Statistics(r) => &r.peer,
            Self::PeerDown(r) => &r.peer,
            Self::PeerUp(r) => &r.peer,
        }
    }

    pub fn origin(&self) -> &Origin {
        match self {
            Self::RouteMonitoring(r) => &r.origin,
            Self::Statistics(r) => &r.origin,
            Self::PeerDown(r) => &r.origin,
            Self::PeerUp(r) => &r.origin,
        }
    }

    /// Serialize the record body, without any table tag.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(match self {
            Self::RouteMonitoring(r) => serde_json::to_string(r)?,
            Self::Statistics(r) => serde_json::to_string(r)?,
            Self::PeerDown(r) => serde_json::to_string(r)?,
            Self::PeerUp(r) => serde_json::to_string(r)?,
        })
    }

    /// Inverse of [`StructuredRecord::to_json`] for a known table.
    pub fn from_json(table: Table, s: &str) -> Result<Self, Error> {
        Ok(match table {
            Table::RouteMonitoring => {
                Self::RouteMonitoring(serde_json::from_str(s)?)
            }
            Table::StatisticsReport => {
                Self::Statistics(serde_json::from_str(s)?)
            }
            Table::PeerDownNotification => {
                Self::PeerDown(serde_json::from_str(s)?)
            }
            Table::PeerUpNotification => Self::PeerUp(serde_json::from_str(s)?),
        })
    }

    /// Column name and value pairs in table order.
    pub fn columns(&self) -> Vec<(&'static str, &str)> {
        let mut cols = self.peer().columns().to_vec();
        match self {
            Self::RouteMonitoring(r) => cols.extend([
                col("path_attr_ORIGIN", &r.path_attr_origin),
                col("path_attr_AS_PATH", &r.path_attr_as_path),
                col("path_attr_NEXT_HOP", &r.path_attr_next_hop),
                col("path_attr_MED", &r.path_attr_med),
                col("path_attr_LOCAL_PREF", &r.path_attr_local_pref),
                col("path_attr_ATOMIC_AGGREGATE", &r.path_attr_atomic_aggregate),
                col("path_attr_AGGREGATOR", &r.path_attr_aggregator),
                col("path_attr_COMMUNITY", &r.path_attr_community),
                col("nlri_withdrawn", &r.nlri_withdrawn),
                col("nlri", &r.nlri),
            ]),
            Self::Statistics(r) => cols.extend([
                col(
                    "num_pref_rejected_by_in_policy",
                    &r.num_pref_rejected_by_in_policy,
                ),
                col("num_dup_prefixes_advertise", &r.num_dup_prefixes_advertise),
                col("num_dup_withdraws", &r.num_dup_withdraws),
                col(
                    "num_updates_invalid_CLUSTER_LIST_loop",
                    &r.num_updates_invalid_cluster_list_loop,
                ),
                col(
                    "num_updates_invalid_AS_PATH_loop",
                    &r.num_updates_invalid_as_path_loop,
                ),
                col(
                    "num_updates_invalid_ORIGINATOR_loop",
                    &r.num_updates_invalid_originator_loop,
                ),
                col(
                    "num_updates_invalid_AS_CONFED_loop",
                    &r.num_updates_invalid_as_confed_loop,
                ),
                col("num_routes_Adj_RIBs_In", &r.num_routes_adj_ribs_in),
                col("num_routes_Loc_RIB", &r.num_routes_loc_rib),
                col(
                    "num_routes_per_AFI_SAFI_Adj_RIBs_In",
                    &r.num_routes_per_afi_safi_adj_ribs_in,
                ),
                col(
                    "num_routes_per_AFI_SAFI_Loc_RIB",
                    &r.num_routes_per_afi_safi_loc_rib,
                ),
                col(
                    "num_updates_treat_as_withdraw",
                    &r.num_updates_treat_as_withdraw,
                ),
                col(
                    "num_prefixes_treat_as_withdraw",
                    &r.num_prefixes_treat_as_withdraw,
                ),
                col("num_dup_updates_msg", &r.num_dup_updates_msg),
            ]),
            Self::PeerDown(r) => {
                cols.push(col("peer_down_reason", &r.peer_down_reason))
            }
            Self::PeerUp(r) => cols.extend([
                col("peer_bgp_port", &r.peer_bgp_port),
                col("peer_hold_time", &r.peer_hold_time),
                col(
                    "peer_capabilities_route_refresh",
                    &r.peer_capabilities_route_refresh,
                ),
                col(
                    "peer_capabilities_four_bytes_as",
                    &r.peer_capabilities_four_bytes_as,
                ),
                col("local_address", &r.local_address),
                col("local_bgp_id", &r.local_bgp_id),
                col("local_as", &r.local_as),
                col("local_hold_time", &r.local_hold_time),
                col("local_bgp_port", &r.local_bgp_port),
                col(
                    "local_capabilities_route_refresh",
                    &r.local_capabilities_route_refresh,
                ),
                col(
                    "local_capabilities_four_bytes_as",
                    &r.local_capabilities_four_bytes_as,
                ),
            ]),
        }
        let origin = self.origin();
        cols.push(col("device_ip", &origin.device_ip));
        cols.push(col("timestamp", &origin.timestamp));
        cols
    }
}

fn col<'a>(name: &'static str, value: &'a str) -> (&'static str, &'a str) {
    (name, value)
}

impl From<RouteMonitoringRecord> for StructuredRecord {
    fn from(r: RouteMonitoringRecord) -> Self {
        Self::RouteMonitoring(r)
    }
}

impl From<StatisticsRecord> for StructuredRecord {
    fn from(r: StatisticsRecord) -> Self {
        Self::Statistics(r)
    }
}

impl From<PeerDownRecord> for StructuredRecord {
    fn from(r: PeerDownRecord) -> Self {
        Self::PeerDown(r)
    }
}

impl From<PeerUpRecord> for StructuredRecord {
    fn from(r: PeerUpRecord) -> Self {
        Self::PeerUp(r)
    }
}
