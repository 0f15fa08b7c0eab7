//! Header parser: decodes captured frames into link, network and transport layers
//!
//! Parsing never fails. Captured frames come from an untrusted source and are
//! regularly truncated by the snapshot length, so a layer that does not have
//! enough bytes is reported as absent and the layers above it are absent too.
//!
//! ## Example
//!
//! ```rust
//! use packet_sniffer::headers::{parse_ethernet_frame, Transport};
//!
//! // 14-byte Ethernet header announcing ARP: link layer only
//! let frame = [0xffu8, 0xff, 0xff, 0xff, 0xff, 0xff, 0, 1, 2, 3, 4, 5, 0x08, 0x06];
//! let headers = parse_ethernet_frame(&frame);
//! assert!(headers.link.is_some());
//! assert!(headers.network.is_none());
//! assert_eq!(headers.transport, Transport::Absent);
//! ```

mod ethernet;
mod ipv4;
mod transport;

pub use ethernet::*;
pub use ipv4::*;
pub use transport::*;

use nom::number::complete::{be_u16, be_u64};
use nom::IResult;

use crate::frame::RawFrame;
use crate::linktype::Linktype;

/// Headers decoded from one frame
///
/// Each layer is only populated if its minimal length was present in the
/// frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ParsedHeaders {
    pub link: Option<EthernetHeader>,
    pub network: Option<Ipv4Header>,
    pub transport: Transport,
}

impl ParsedHeaders {
    /// Headers of a frame where nothing could be decoded
    pub const EMPTY: ParsedHeaders = ParsedHeaders {
        link: None,
        network: None,
        transport: Transport::Absent,
    };
}

/// Decode a captured frame, according to the link type of its source
pub fn parse(frame: &RawFrame) -> ParsedHeaders {
    parse_with_linktype(&frame.data, frame.linktype)
}

/// Decode raw bytes captured on a link of type `linktype`
///
/// Link types without a decoder give [`ParsedHeaders::EMPTY`].
pub fn parse_with_linktype(i: &[u8], linktype: Linktype) -> ParsedHeaders {
    match linktype {
        Linktype::ETHERNET => parse_ethernet_frame(i),
        Linktype::RAW | Linktype::IPV4 => parse_ip_packet(i),
        Linktype::NULL | Linktype::LOOP => parse_loopback_frame(i),
        Linktype::LINUX_SLL => parse_sll_frame(i),
        _ => ParsedHeaders::EMPTY,
    }
}

/// Decode an Ethernet II frame
pub fn parse_ethernet_frame(i: &[u8]) -> ParsedHeaders {
    match parse_ethernet_header(i) {
        Ok((rem, eth)) => {
            let mut headers = if eth.ethertype == EtherType::Ipv4 {
                parse_ip_packet(rem)
            } else {
                ParsedHeaders::EMPTY
            };
            headers.link = Some(eth);
            headers
        }
        Err(_) => ParsedHeaders::EMPTY,
    }
}

/// Decode an IPv4 packet without link layer
pub fn parse_ip_packet(i: &[u8]) -> ParsedHeaders {
    match parse_ipv4_header(i) {
        Ok((rem, ip)) => {
            // bytes past total_len are link layer padding
            let payload_len = usize::from(ip.total_len).saturating_sub(usize::from(ip.header_len));
            let payload = &rem[..rem.len().min(payload_len)];
            let transport = if ip.is_later_fragment() {
                Transport::Other(ip.protocol)
            } else {
                parse_transport(ip.protocol, payload)
            };
            ParsedHeaders {
                link: None,
                network: Some(ip),
                transport,
            }
        }
        Err(_) => ParsedHeaders::EMPTY,
    }
}

const AF_INET: u32 = 2;

/// Decode a BSD loopback frame (LINKTYPE_NULL or LINKTYPE_LOOP)
///
/// The 4-byte address family is in host byte order for NULL and network byte
/// order for LOOP; both orders are accepted.
fn parse_loopback_frame(i: &[u8]) -> ParsedHeaders {
    if i.len() < 4 {
        return ParsedHeaders::EMPTY;
    }
    let af = [i[0], i[1], i[2], i[3]];
    if u32::from_le_bytes(af) == AF_INET || u32::from_be_bytes(af) == AF_INET {
        parse_ip_packet(&i[4..])
    } else {
        ParsedHeaders::EMPTY
    }
}

const ARPHRD_IPGRE: u16 = 778;
const ARPHRD_IEEE80211_RADIOTAP: u16 = 803;
const ARPHRD_NETLINK: u16 = 824;

struct SllHeader {
    _packet_type: u16,
    arphrd_type: u16,
    _ll_addr_len: u16,
    _ll_addr: u64,
    proto: u16,
}

fn parse_sll_header(i: &[u8]) -> IResult<&[u8], SllHeader> {
    let (i, _packet_type) = be_u16(i)?;
    let (i, arphrd_type) = be_u16(i)?;
    let (i, _ll_addr_len) = be_u16(i)?;
    let (i, _ll_addr) = be_u64(i)?;
    let (i, proto) = be_u16(i)?;
    let header = SllHeader {
        _packet_type,
        arphrd_type,
        _ll_addr_len,
        _ll_addr,
        proto,
    };
    Ok((i, header))
}

/// Decode a Linux cooked capture frame (LINKTYPE_LINUX_SLL)
///
/// See <http://www.tcpdump.org/linktypes/LINKTYPE_LINUX_SLL.html>
///
/// The protocol field is only meaningful for some device types: GRE tunnels
/// carry the GRE header directly, radiotap and netlink carry no IP at all.
fn parse_sll_frame(i: &[u8]) -> ParsedHeaders {
    let (rem, sll) = match parse_sll_header(i) {
        Ok(r) => r,
        Err(_) => return ParsedHeaders::EMPTY,
    };
    match sll.arphrd_type {
        ARPHRD_IPGRE => ParsedHeaders {
            transport: Transport::Other(IpProtocol::Gre),
            ..ParsedHeaders::EMPTY
        },
        ARPHRD_IEEE80211_RADIOTAP | ARPHRD_NETLINK => ParsedHeaders::EMPTY,
        _ if EtherType(sll.proto) == EtherType::Ipv4 => parse_ip_packet(rem),
        _ => ParsedHeaders::EMPTY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::net::Ipv4Addr;

    // 60 bytes: Ethernet + IPv4 + TCP (SYN) + 6 bytes of padding
    const TCP_FRAME: [u8; 60] = hex!(
        "6c61f40a24b8 d843ae26332a 0800
         4500 0028 1c46 4000 4006 0000 c0a8012e acd9a94e
         cc78 01bb 00000001 00000000 5002 faf0 0000 0000
         000000000000"
    );

    #[test]
    fn parse_tcp_frame() {
        let h = parse_ethernet_frame(&TCP_FRAME);
        let eth = h.link.expect("link layer");
        assert_eq!(eth.src, MacAddr(hex!("d843ae26332a")));
        assert_eq!(eth.dst, MacAddr(hex!("6c61f40a24b8")));
        let ip = h.network.expect("network layer");
        assert_eq!(ip.src, Ipv4Addr::new(192, 168, 1, 46));
        assert_eq!(ip.dst, Ipv4Addr::new(172, 217, 169, 78));
        assert_eq!(ip.total_len, 40);
        assert_eq!(h.transport.ports(), Some((52344, 443)));
    }

    #[test]
    fn short_frames_have_no_layers() {
        for len in 0..14 {
            assert_eq!(parse_ethernet_frame(&TCP_FRAME[..len]), ParsedHeaders::EMPTY);
        }
        let h = parse_ethernet_frame(&TCP_FRAME[..14]);
        assert!(h.link.is_some());
        assert!(h.network.is_none());
    }

    #[test]
    fn truncated_transport() {
        // full IPv4 header, 10 bytes of TCP
        let h = parse_ethernet_frame(&TCP_FRAME[..44]);
        assert!(h.network.is_some());
        assert_eq!(h.transport, Transport::Absent);
        // truncated IPv4 header
        let h = parse_ethernet_frame(&TCP_FRAME[..33]);
        assert!(h.link.is_some());
        assert!(h.network.is_none());
    }

    #[test]
    fn padding_is_not_transport() {
        // IPv4 header alone (total length 20), TCP, padded to 60 bytes
        let mut frame = TCP_FRAME;
        frame[16..18].copy_from_slice(&hex!("0014"));
        frame[34..].fill(0);
        let h = parse_ethernet_frame(&frame);
        assert_eq!(h.network.map(|n| n.total_len), Some(20));
        assert_eq!(h.transport, Transport::Absent);

        // UDP header cut by total length 24, padding would complete it
        let mut frame = TCP_FRAME;
        frame[16..18].copy_from_slice(&hex!("0018"));
        frame[23] = 17;
        let h = parse_ethernet_frame(&frame);
        assert_eq!(h.transport, Transport::Absent);

        // a total length below the header length leaves no transport bytes
        let mut frame = TCP_FRAME;
        frame[16..18].copy_from_slice(&hex!("0004"));
        assert_eq!(parse_ethernet_frame(&frame).transport, Transport::Absent);
    }

    #[test]
    fn non_ip_ethertype() {
        let mut frame = TCP_FRAME;
        frame[12..14].copy_from_slice(&hex!("86dd"));
        let h = parse_ethernet_frame(&frame);
        assert_eq!(h.link.map(|l| l.ethertype), Some(EtherType::Ipv6));
        assert!(h.network.is_none());
        assert_eq!(h.transport, Transport::Absent);
    }

    #[test]
    fn later_fragment_has_no_ports() {
        let mut frame = TCP_FRAME;
        // fragment offset 185 (1480 bytes)
        frame[20..22].copy_from_slice(&hex!("00b9"));
        let h = parse_ethernet_frame(&frame);
        assert_eq!(h.transport, Transport::Other(IpProtocol::Tcp));
    }

    #[test]
    fn idempotent() {
        assert_eq!(parse_ethernet_frame(&TCP_FRAME), parse_ethernet_frame(&TCP_FRAME));
    }

    #[test]
    fn other_linktypes() {
        let ip = &TCP_FRAME[14..];
        let raw = parse_with_linktype(ip, Linktype::RAW);
        assert!(raw.link.is_none());
        assert_eq!(raw.transport.ports(), Some((52344, 443)));

        let mut null = hex!("02000000").to_vec();
        null.extend_from_slice(ip);
        assert!(parse_with_linktype(&null, Linktype::NULL).network.is_some());
        let mut lo = hex!("00000002").to_vec();
        lo.extend_from_slice(ip);
        assert!(parse_with_linktype(&lo, Linktype::LOOP).network.is_some());

        let mut sll = hex!("0000 0001 0006 d843ae26332a0000 0800").to_vec();
        sll.extend_from_slice(ip);
        let h = parse_with_linktype(&sll, Linktype::LINUX_SLL);
        assert_eq!(h.network.map(|n| n.protocol), Some(IpProtocol::Tcp));

        assert_eq!(parse_with_linktype(&TCP_FRAME, Linktype(105)), ParsedHeaders::EMPTY);
    }

    #[test]
    fn sll_device_types() {
        let ip = &TCP_FRAME[14..];
        // netlink capture announcing IPv4 is not decoded
        let mut netlink = hex!("0000 0338 0000 0000000000000000 0800").to_vec();
        netlink.extend_from_slice(ip);
        assert_eq!(parse_with_linktype(&netlink, Linktype::LINUX_SLL), ParsedHeaders::EMPTY);

        let mut gre = hex!("0000 030a 0000 0000000000000000 0800").to_vec();
        gre.extend_from_slice(ip);
        let h = parse_with_linktype(&gre, Linktype::LINUX_SLL);
        assert!(h.network.is_none());
        assert_eq!(h.transport, Transport::Other(IpProtocol::Gre));
    }
}
