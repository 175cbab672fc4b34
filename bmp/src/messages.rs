// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded BMP messages.
//!
//! These are the values the wire decoder hands to the collector. Nothing in
//! this crate parses BMP bytes; the types here only describe what a decoded
//! message contains and how its parts are rendered as text.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};

/// BMP message types.
///
/// Ref: RFC 7854 §4.1
#[derive(
    Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone,
)]
#[repr(u8)]
pub enum MessageType {
    /// RFC 7854 §4.6
    RouteMonitoring = 0,

    /// RFC 7854 §4.8
    StatisticsReport = 1,

    /// RFC 7854 §4.9
    PeerDown = 2,

    /// RFC 7854 §4.10
    PeerUp = 3,

    /// RFC 7854 §4.3
    Initiation = 4,

    /// RFC 7854 §4.5
    Termination = 5,

    /// RFC 7854 §4.7
    RouteMirroring = 6,
}

impl MessageType {
    /// Whether the collector records messages of this type. Initiation,
    /// termination and route mirroring messages are accepted and dropped.
    pub fn is_recorded(&self) -> bool {
        matches!(
            self,
            Self::RouteMonitoring
                | Self::StatisticsReport
                | Self::PeerDown
                | Self::PeerUp
        )
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteMonitoring => write!(f, "route monitoring"),
            Self::StatisticsReport => write!(f, "statistics report"),
            Self::PeerDown => write!(f, "peer down"),
            Self::PeerUp => write!(f, "peer up"),
            Self::Initiation => write!(f, "initiation"),
            Self::Termination => write!(f, "termination"),
            Self::RouteMirroring => write!(f, "route mirroring"),
        }
    }
}

impl From<&Message> for MessageType {
    fn from(m: &Message) -> Self {
        match m {
            Message::RouteMonitoring(..) => Self::RouteMonitoring,
            Message::StatisticsReport(..) => Self::StatisticsReport,
            Message::PeerDown(..) => Self::PeerDown,
            Message::PeerUp(..) => Self::PeerUp,
            Message::Initiation(_) => Self::Initiation,
            Message::Termination(_) => Self::Termination,
            Message::RouteMirroring(_) => Self::RouteMirroring,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Message {
    RouteMonitoring(PeerHeader, RouteMonitoring),
    StatisticsReport(PeerHeader, StatisticsReport),
    PeerDown(PeerHeader, PeerDownNotification),
    PeerUp(PeerHeader, PeerUpNotification),
    Initiation(Vec<InformationTlv>),
    Termination(Vec<InformationTlv>),
    RouteMirroring(PeerHeader),
}

impl Message {
    /// The per-peer header, for message types that carry one.
    pub fn peer_header(&self) -> Option<&PeerHeader> {
        match self {
            Self::RouteMonitoring(h, _)
            | Self::StatisticsReport(h, _)
            | Self::PeerDown(h, _)
            | Self::PeerUp(h, _)
            | Self::RouteMirroring(h) => Some(h),
            Self::Initiation(_) | Self::Termination(_) => None,
        }
    }
}

/// Per-peer header flags.
///
/// ```text
///  0 1 2 3 4 5 6 7
/// +-+-+-+-+-+-+-+-+
/// |V|L|A| Resv    |
/// +-+-+-+-+-+-+-+-+
/// ```
///
/// Ref: RFC 7854 §4.2
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct PeerFlags {
    /// The peer address is IPv6.
    pub v: bool,

    /// The encapsulated message reflects post-policy Adj-RIB-In.
    pub l: bool,

    /// The encapsulated message uses legacy 2-byte AS_PATH encoding.
    pub a: bool,
}

impl PeerFlags {
    pub fn post_policy(&self) -> bool {
        self.l
    }
}

/// Render a flag the way the decoder reports it, `1` or `0`.
pub fn flag_str(f: bool) -> &'static str {
    if f {
        "1"
    } else {
        "0"
    }
}

/// The per-peer header common to all peer-scoped BMP messages.
///
/// Ref: RFC 7854 §4.2
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PeerHeader {
    pub address: IpAddr,
    pub bgp_id: Ipv4Addr,
    pub asn: u32,
    pub flags: PeerFlags,

    /// Time the encapsulated message was captured by the router.
    pub timestamp: Timestamp,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Timestamp {
    pub seconds: u32,
    pub microseconds: u32,
}

/// A route monitoring message: one encapsulated BGP message.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RouteMonitoring {
    /// BGP message type of the encapsulated message. Always UPDATE (2) in
    /// practice.
    pub bgp_type: u8,
    pub update: UpdateMessage,
}

/// BGP UPDATE message type.
pub const BGP_UPDATE: u8 = 2;

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub withdrawn: Vec<Prefix>,

    /// Path attributes keyed by attribute type code.
    pub path_attributes: BTreeMap<u8, PathAttributeValue>,

    pub nlri: Vec<Prefix>,
}

impl UpdateMessage {
    pub fn attr(&self, code: PathAttributeTypeCode) -> Option<&PathAttributeValue> {
        self.path_attributes.get(&u8::from(code))
    }

    pub fn add_attr(&mut self, value: PathAttributeValue) {
        let code = value.type_code();
        self.path_attributes.insert(code, value);
    }
}

/// A network prefix in address/length form.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Prefix {
    pub addr: IpAddr,
    pub length: u8,
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.length)
    }
}

impl std::str::FromStr for Prefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = match s.split_once('/') {
            Some(split) => split,
            None => return Err("invalid prefix".to_owned()),
        };
        let addr: IpAddr = addr.parse().map_err(|_| "invalid addr")?;
        let length: u8 = len.parse().map_err(|_| "invalid length")?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if length > max {
            return Err(format!("invalid length {length}, max is {max}"));
        }
        Ok(Self { addr, length })
    }
}

/// Render a prefix list as `[a/n, b/m]`.
pub fn prefix_list(prefixes: &[Prefix]) -> String {
    let items: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Path attribute type codes the collector knows by name.
///
/// Ref: RFC 4271 §5.1
#[derive(
    Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone,
)]
#[repr(u8)]
pub enum PathAttributeTypeCode {
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    MultiExitDisc = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,
    Communities = 8,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathAttributeValue {
    Origin(PathOrigin),
    AsPath(Vec<AsPathSegment>),
    NextHop(IpAddr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator { asn: u32, address: Ipv4Addr },
    Communities(Vec<u32>),
    /// An attribute the decoder did not interpret.
    Other { type_code: u8, value: Vec<u8> },
}

impl PathAttributeValue {
    pub fn type_code(&self) -> u8 {
        let code = match self {
            Self::Origin(_) => PathAttributeTypeCode::Origin,
            Self::AsPath(_) => PathAttributeTypeCode::AsPath,
            Self::NextHop(_) => PathAttributeTypeCode::NextHop,
            Self::MultiExitDisc(_) => PathAttributeTypeCode::MultiExitDisc,
            Self::LocalPref(_) => PathAttributeTypeCode::LocalPref,
            Self::AtomicAggregate => PathAttributeTypeCode::AtomicAggregate,
            Self::Aggregator { .. } => PathAttributeTypeCode::Aggregator,
            Self::Communities(_) => PathAttributeTypeCode::Communities,
            Self::Other { type_code, .. } => return *type_code,
        };
        code.into()
    }
}

impl Display for PathAttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin(o) => write!(f, "{o}"),
            // Only the first segment is rendered.
            Self::AsPath(segments) => match segments.first() {
                Some(s) => write!(f, "{}", asn_list(&s.value)),
                None => write!(f, "[]"),
            },
            Self::NextHop(nh) => write!(f, "{nh}"),
            Self::MultiExitDisc(v) | Self::LocalPref(v) => write!(f, "{v}"),
            Self::AtomicAggregate => write!(f, "true"),
            Self::Aggregator { asn, address } => {
                write!(f, "[{asn}, '{address}']")
            }
            Self::Communities(cs) => {
                let items: Vec<String> = cs
                    .iter()
                    .map(|c| format!("{}:{}", c >> 16, c & 0xffff))
                    .collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Other { value, .. } => write!(f, "{value:02x?}"),
        }
    }
}

fn asn_list(asns: &[u32]) -> String {
    let items: Vec<String> = asns.iter().map(|a| a.to_string()).collect();
    format!("[{}]", items.join(", "))
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum PathOrigin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

impl Display for PathOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct AsPathSegment {
    pub typ: AsPathType,
    pub value: Vec<u32>,
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum AsPathType {
    AsSet = 1,
    AsSequence = 2,
}

/// Statistics types carried in a statistics report.
///
/// Ref: RFC 7854 §4.8, RFC 8671 §4
#[derive(
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    TryFromPrimitive,
    IntoPrimitive,
    Copy,
    Clone,
)]
#[repr(u16)]
pub enum StatType {
    RejectedByPolicy = 0,
    DuplicatePrefixAdvertisements = 1,
    DuplicateWithdraws = 2,
    InvalidClusterListLoop = 3,
    InvalidAsPathLoop = 4,
    InvalidOriginatorId = 5,
    InvalidAsConfedLoop = 6,
    AdjRibInRoutes = 7,
    LocRibRoutes = 8,
    PerAfiSafiAdjRibInRoutes = 9,
    PerAfiSafiLocRibRoutes = 10,
    UpdatesTreatAsWithdraw = 11,
    PrefixesTreatAsWithdraw = 12,
    DuplicateUpdates = 13,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatValue {
    Counter(u32),
    Gauge(u64),
    AfiSafiGauge { afi: u16, safi: u8, value: u64 },
}

impl Display for StatValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter(v) => write!(f, "{v}"),
            Self::Gauge(v) => write!(f, "{v}"),
            Self::AfiSafiGauge { afi, safi, value } => {
                write!(f, "[{afi}, {safi}, {value}]")
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Statistic values keyed by statistic type code. Unknown codes are kept.
    pub counters: BTreeMap<u16, StatValue>,
}

impl StatisticsReport {
    pub fn get(&self, typ: StatType) -> Option<&StatValue> {
        self.counters.get(&u16::from(typ))
    }

    pub fn set(&mut self, typ: StatType, value: StatValue) {
        self.counters.insert(typ.into(), value);
    }
}

/// Why a monitored session went down.
///
/// Ref: RFC 7854 §4.9, RFC 9069 §5
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerDownNotification {
    /// The local system closed the session and sent a NOTIFICATION.
    LocalNotification(Notification),

    /// The local system closed the session without a NOTIFICATION.
    LocalNoNotification { fsm_event: u16 },

    /// The remote system closed the session with a NOTIFICATION.
    RemoteNotification(Notification),

    /// The remote system closed the session without a NOTIFICATION.
    RemoteNoData,

    /// Information for this peer will no longer be sent.
    PeerDeconfigured,
}

impl PeerDownNotification {
    pub fn reason_code(&self) -> u8 {
        match self {
            Self::LocalNotification(_) => 1,
            Self::LocalNoNotification { .. } => 2,
            Self::RemoteNotification(_) => 3,
            Self::RemoteNoData => 4,
            Self::PeerDeconfigured => 5,
        }
    }
}

impl Display for PeerDownNotification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalNotification(n) => {
                write!(f, "local notification: {n}")
            }
            Self::LocalNoNotification { fsm_event } => {
                write!(f, "local no notification: fsm event {fsm_event}")
            }
            Self::RemoteNotification(n) => {
                write!(f, "remote notification: {n}")
            }
            Self::RemoteNoData => write!(f, "remote no data"),
            Self::PeerDeconfigured => write!(f, "peer de-configured"),
        }
    }
}

/// The interesting parts of a BGP NOTIFICATION.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub error_code: u8,
    pub error_subcode: u8,
    pub data: Vec<u8>,
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "code {} subcode {}", self.error_code, self.error_subcode)
    }
}

/// Ref: RFC 7854 §4.10
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PeerUpNotification {
    pub local_address: IpAddr,
    pub local_port: u16,
    pub remote_port: u16,
    pub sent_open: OpenMessage,
    pub received_open: OpenMessage,
}

/// A decoded BGP OPEN as carried in a peer up notification.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct OpenMessage {
    pub version: u8,
    pub asn: u32,
    pub hold_time: u16,
    pub bgp_id: Ipv4Addr,
    pub capabilities: Capabilities,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub route_refresh: bool,
    pub four_bytes_as: bool,
}

/// Information TLV carried by initiation and termination messages.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InformationTlv {
    pub typ: u16,
    pub value: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn message_type_codes() {
        for code in 0u8..=6 {
            let t = MessageType::try_from(code).expect("message type");
            assert_eq!(u8::from(t), code);
            assert_eq!(t.is_recorded(), code < 4);
        }
        assert!(MessageType::try_from(7).is_err());
    }

    #[test]
    fn prefix_parse_and_display() {
        let p: Prefix = "198.51.100.0/24".parse().expect("prefix");
        assert_eq!(p.to_string(), "198.51.100.0/24");
        assert!("198.51.100.0/33".parse::<Prefix>().is_err());
        assert!("198.51.100.0".parse::<Prefix>().is_err());
        let v6: Prefix = "2001:db8::/32".parse().expect("v6 prefix");
        assert_eq!(prefix_list(&[p, v6]), "[198.51.100.0/24, 2001:db8::/32]");
    }

    #[test]
    fn attribute_rendering() {
        let path = PathAttributeValue::AsPath(vec![
            AsPathSegment {
                typ: AsPathType::AsSequence,
                value: vec![65001, 65002],
            },
            AsPathSegment {
                typ: AsPathType::AsSet,
                value: vec![65100],
            },
        ]);
        assert_eq!(path.to_string(), "[65001, 65002]");
        assert_eq!(path.type_code(), 2);

        let comms = PathAttributeValue::Communities(vec![0xFDE9_0064]);
        assert_eq!(comms.to_string(), "[65001:100]");

        let origin = PathAttributeValue::Origin(PathOrigin::Incomplete);
        assert_eq!(origin.to_string(), "2");

        let other = PathAttributeValue::Other {
            type_code: 32,
            value: vec![1],
        };
        assert_eq!(other.type_code(), 32);
    }

    #[test]
    fn update_attr_lookup() {
        let mut u = UpdateMessage::default();
        u.add_attr(PathAttributeValue::LocalPref(100));
        assert_eq!(
            u.attr(PathAttributeTypeCode::LocalPref),
            Some(&PathAttributeValue::LocalPref(100))
        );
        assert_eq!(u.attr(PathAttributeTypeCode::MultiExitDisc), None);
    }

    #[test]
    fn peer_down_reasons() {
        let n = Notification {
            error_code: 6,
            error_subcode: 2,
            data: vec![],
        };
        let r = PeerDownNotification::RemoteNotification(n);
        assert_eq!(r.reason_code(), 3);
        assert_eq!(r.to_string(), "remote notification: code 6 subcode 2");
        assert_eq!(PeerDownNotification::PeerDeconfigured.reason_code(), 5);
    }
}
