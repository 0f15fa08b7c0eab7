use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::direction::{classify, Direction};
use crate::frame::RawFrame;
use crate::headers::{self, MacAddr, ParsedHeaders, Transport};
use crate::local::LocalAddrs;

/// Protocol label of a packet record
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProtocolLabel {
    Tcp,
    Udp,
    Icmp,
    Other,
}

impl ProtocolLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolLabel::Tcp => "TCP",
            ProtocolLabel::Udp => "UDP",
            ProtocolLabel::Icmp => "ICMP",
            ProtocolLabel::Other => "OTHER",
        }
    }
}

impl fmt::Display for ProtocolLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Transport> for ProtocolLabel {
    fn from(t: &Transport) -> Self {
        match t {
            Transport::Tcp { .. } => ProtocolLabel::Tcp,
            Transport::Udp { .. } => ProtocolLabel::Udp,
            Transport::Icmp { .. } => ProtocolLabel::Icmp,
            Transport::Other(_) | Transport::Absent => ProtocolLabel::Other,
        }
    }
}

/// One logged packet
///
/// Optional fields are `None` when the corresponding layer was absent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PacketRecord {
    pub ts: DateTime<Utc>,
    pub protocol: ProtocolLabel,
    pub direction: Direction,
    pub src_mac: Option<MacAddr>,
    pub dst_mac: Option<MacAddr>,
    pub src_ip: Option<Ipv4Addr>,
    pub dst_ip: Option<Ipv4Addr>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    /// Length of the frame on the wire
    pub byte_len: u32,
}

impl PacketRecord {
    /// Assemble a record from decoded headers and their direction
    pub fn build(
        ts: DateTime<Utc>,
        headers: &ParsedHeaders,
        direction: Direction,
        byte_len: u32,
    ) -> PacketRecord {
        let ports = headers.transport.ports();
        PacketRecord {
            ts,
            protocol: ProtocolLabel::from(&headers.transport),
            direction,
            src_mac: headers.link.map(|l| l.src),
            dst_mac: headers.link.map(|l| l.dst),
            src_ip: headers.network.map(|n| n.src),
            dst_ip: headers.network.map(|n| n.dst),
            src_port: ports.map(|p| p.0),
            dst_port: ports.map(|p| p.1),
            byte_len,
        }
    }

    /// Parse, classify and build the record for a captured frame
    pub fn from_frame(frame: &RawFrame, local: &LocalAddrs) -> PacketRecord {
        let headers = headers::parse(frame);
        let direction = classify(&headers, local);
        PacketRecord::build(frame.ts, &headers, direction, frame.orig_len)
    }
}
