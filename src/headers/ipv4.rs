use std::net::Ipv4Addr;

use nom::bytes::complete::take;
use nom::combinator::verify;
use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::IResult;
use rusticata_macros::newtype_enum;

/// Length of an IPv4 header without options
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// IP protocol number of the encapsulated transport
///
/// See <https://www.iana.org/assignments/protocol-numbers>
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct IpProtocol(pub u8);

newtype_enum! {
    impl debug IpProtocol {
        Icmp = 1,
        Tcp = 6,
        Udp = 17,
        Gre = 47,
    }
}

/// IPv4 header (RFC 791)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ipv4Header {
    /// Header length in bytes (IHL * 4), options included
    pub header_len: u8,
    /// Total length of the datagram, as declared by the sender
    pub total_len: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    /// Fragment offset, in 8-byte units
    pub fragment_offset: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Returns true if this datagram is a fragment other than the first one,
    /// i.e. it does not start with a transport header
    #[inline]
    pub fn is_later_fragment(&self) -> bool {
        self.fragment_offset != 0
    }
}

fn parse_addr(i: &[u8]) -> IResult<&[u8], Ipv4Addr> {
    let (i, a) = be_u32(i)?;
    Ok((i, Ipv4Addr::from(a)))
}

/// Read an IPv4 header
///
/// The version must be 4 and the header length (IHL) at least 5 words, and
/// all `IHL * 4` bytes must be present. Options are skipped. Returns the
/// header and the bytes following it (the transport header, if any).
pub fn parse_ipv4_header(i: &[u8]) -> IResult<&[u8], Ipv4Header> {
    let (i, vihl) = verify(be_u8, |&b| b >> 4 == 4 && b & 0x0f >= 5)(i)?;
    let header_len = (vihl & 0x0f) * 4;
    let (i, _tos) = be_u8(i)?;
    let (i, total_len) = be_u16(i)?;
    let (i, _id) = be_u16(i)?;
    let (i, flags_frag) = be_u16(i)?;
    let (i, ttl) = be_u8(i)?;
    let (i, protocol) = be_u8(i)?;
    let (i, _checksum) = be_u16(i)?;
    let (i, src) = parse_addr(i)?;
    let (i, dst) = parse_addr(i)?;
    let (i, _options) = take(header_len as usize - IPV4_MIN_HEADER_LEN)(i)?;
    let header = Ipv4Header {
        header_len,
        total_len,
        ttl,
        protocol: IpProtocol(protocol),
        fragment_offset: flags_frag & 0x1fff,
        src,
        dst,
    };
    Ok((i, header))
}
