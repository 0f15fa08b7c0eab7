use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::ipv4::IpProtocol;

/// Minimal TCP header length (no options)
pub const TCP_MIN_HEADER_LEN: usize = 20;
/// UDP header length
pub const UDP_HEADER_LEN: usize = 8;
/// ICMP header length (type, code, checksum and the 4-byte rest of header)
pub const ICMP_HEADER_LEN: usize = 8;

/// Decoded transport layer
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Transport {
    Tcp { src_port: u16, dst_port: u16 },
    Udp { src_port: u16, dst_port: u16 },
    Icmp { icmp_type: u8, code: u8 },
    /// A protocol the parser does not decode; only its number is known
    Other(IpProtocol),
    /// No transport layer: no network layer, or not enough bytes
    #[default]
    Absent,
}

impl Transport {
    /// Source and destination ports, for transports that have them
    pub fn ports(&self) -> Option<(u16, u16)> {
        match *self {
            Transport::Tcp { src_port, dst_port } | Transport::Udp { src_port, dst_port } => {
                Some((src_port, dst_port))
            }
            _ => None,
        }
    }
}

fn parse_ports(i: &[u8]) -> IResult<&[u8], (u16, u16)> {
    let (i, src_port) = be_u16(i)?;
    let (i, dst_port) = be_u16(i)?;
    Ok((i, (src_port, dst_port)))
}

/// Read a TCP header, requiring the 20-byte fixed part
pub fn parse_tcp_header(i: &[u8]) -> IResult<&[u8], Transport> {
    let (rem, hdr) = take(TCP_MIN_HEADER_LEN)(i)?;
    let (_, (src_port, dst_port)) = parse_ports(hdr)?;
    Ok((rem, Transport::Tcp { src_port, dst_port }))
}

/// Read a UDP header
pub fn parse_udp_header(i: &[u8]) -> IResult<&[u8], Transport> {
    let (rem, hdr) = take(UDP_HEADER_LEN)(i)?;
    let (_, (src_port, dst_port)) = parse_ports(hdr)?;
    Ok((rem, Transport::Udp { src_port, dst_port }))
}

/// Read an ICMP header
pub fn parse_icmp_header(i: &[u8]) -> IResult<&[u8], Transport> {
    let (rem, hdr) = take(ICMP_HEADER_LEN)(i)?;
    let (hdr, icmp_type) = be_u8(hdr)?;
    let (_, code) = be_u8(hdr)?;
    Ok((rem, Transport::Icmp { icmp_type, code }))
}

/// Decode the transport header carried by protocol `proto`
///
/// Unknown protocols give [`Transport::Other`]; a known protocol without
/// enough bytes for its minimal header gives [`Transport::Absent`].
pub fn parse_transport(proto: IpProtocol, i: &[u8]) -> Transport {
    let res = match proto {
        IpProtocol::Tcp => parse_tcp_header(i),
        IpProtocol::Udp => parse_udp_header(i),
        IpProtocol::Icmp => parse_icmp_header(i),
        _ => return Transport::Other(proto),
    };
    res.map(|(_, t)| t).unwrap_or(Transport::Absent)
}
