//! Rendering of packet records as log blocks
//!
//! A block is laid out as follows, one line per present layer:
//!
//! ```text
//! [2024-03-01 10:12:45.123] TCP-OUT: 60 Bytes
//! SRC-MAC: d8:43:ae:26:33:2a DST-MAC: 6c:61:f4:0a:24:b8
//! SRC-PORT: 52344 DST-PORT: 443
//! SRC-IP: 192.168.1.46 DST-IP: 172.217.169.78
//! ```
//!
//! The MAC line is omitted without link layer, the port line without TCP or
//! UDP ports and the IP line without network layer.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::record::PacketRecord;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Time zone used to print timestamps
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Zone {
    #[default]
    Local,
    Utc,
}

/// Format a timestamp with millisecond precision
pub fn format_ts(ts: &DateTime<Utc>, zone: Zone) -> String {
    match zone {
        Zone::Local => ts.with_timezone(&Local).format(TS_FORMAT).to_string(),
        Zone::Utc => ts.format(TS_FORMAT).to_string(),
    }
}

/// Render a record as a multi-line block, each line terminated by `\n`
pub fn render(rec: &PacketRecord, zone: Zone) -> String {
    let mut s = String::with_capacity(160);
    // writing to a String cannot fail
    let _ = writeln!(
        s,
        "[{}] {}-{}: {} Bytes",
        format_ts(&rec.ts, zone),
        rec.protocol,
        rec.direction,
        rec.byte_len
    );
    if let (Some(src), Some(dst)) = (rec.src_mac, rec.dst_mac) {
        let _ = writeln!(s, "SRC-MAC: {} DST-MAC: {}", src, dst);
    }
    if let (Some(src), Some(dst)) = (rec.src_port, rec.dst_port) {
        let _ = writeln!(s, "SRC-PORT: {} DST-PORT: {}", src, dst);
    }
    if let (Some(src), Some(dst)) = (rec.src_ip, rec.dst_ip) {
        let _ = writeln!(s, "SRC-IP: {} DST-IP: {}", src, dst);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;
    use crate::headers::MacAddr;
    use crate::record::ProtocolLabel;
    use chrono::TimeZone;
    use std::net::Ipv4Addr;

    fn record() -> PacketRecord {
        PacketRecord {
            ts: Utc.with_ymd_and_hms(2024, 3, 1, 10, 12, 45).unwrap()
                + chrono::Duration::microseconds(123_456),
            protocol: ProtocolLabel::Udp,
            direction: Direction::In,
            src_mac: Some(MacAddr([0x6c, 0x61, 0xf4, 0x0a, 0x24, 0xb8])),
            dst_mac: Some(MacAddr([0xd8, 0x43, 0xae, 0x26, 0x33, 0x2a])),
            src_ip: Some(Ipv4Addr::new(192, 168, 1, 1)),
            dst_ip: Some(Ipv4Addr::new(192, 168, 1, 46)),
            src_port: Some(53),
            dst_port: Some(58017),
            byte_len: 86,
        }
    }

    #[test]
    fn full_block() {
        assert_eq!(
            render(&record(), Zone::Utc),
            "[2024-03-01 10:12:45.123] UDP-IN: 86 Bytes\n\
             SRC-MAC: 6c:61:f4:0a:24:b8 DST-MAC: d8:43:ae:26:33:2a\n\
             SRC-PORT: 53 DST-PORT: 58017\n\
             SRC-IP: 192.168.1.1 DST-IP: 192.168.1.46\n"
        );
    }

    #[test]
    fn header_line_only() {
        let rec = PacketRecord {
            protocol: ProtocolLabel::Other,
            direction: Direction::Unknown,
            src_mac: None,
            dst_mac: None,
            src_ip: None,
            dst_ip: None,
            src_port: None,
            dst_port: None,
            byte_len: 9,
            ..record()
        };
        assert_eq!(
            render(&rec, Zone::Utc),
            "[2024-03-01 10:12:45.123] OTHER-UNKNOWN: 9 Bytes\n"
        );
    }

    #[test]
    fn local_zone_keeps_precision() {
        let s = format_ts(&record().ts, Zone::Local);
        assert!(s.ends_with(".123"));
        assert_eq!(s.len(), "2024-03-01 10:12:45.123".len());
    }
}
