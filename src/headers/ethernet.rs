use std::fmt;

use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;
use rusticata_macros::newtype_enum;

/// Length of an Ethernet II header
pub const ETHERNET_HEADER_LEN: usize = 14;

/// EtherType of the encapsulated protocol
///
/// See <https://www.iana.org/assignments/ieee-802-numbers>
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct EtherType(pub u16);

newtype_enum! {
    impl debug EtherType {
        Ipv4 = 0x0800,
        Arp = 0x0806,
        Vlan = 0x8100,
        Ipv6 = 0x86dd,
    }
}

/// A 6-byte hardware address
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    #[inline]
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Ethernet II header
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: EtherType,
}

fn parse_mac(i: &[u8]) -> IResult<&[u8], MacAddr> {
    let (i, b) = take(6usize)(i)?;
    let mut octets = [0u8; 6];
    octets.copy_from_slice(b);
    Ok((i, MacAddr(octets)))
}

/// Read an Ethernet II header
///
/// Returns the header and the encapsulated payload. Fails if fewer than
/// [`ETHERNET_HEADER_LEN`] bytes are available.
pub fn parse_ethernet_header(i: &[u8]) -> IResult<&[u8], EthernetHeader> {
    let (i, dst) = parse_mac(i)?;
    let (i, src) = parse_mac(i)?;
    let (i, ethertype) = be_u16(i)?;
    let header = EthernetHeader {
        dst,
        src,
        ethertype: EtherType(ethertype),
    };
    Ok((i, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn parse_header() {
        const INPUT: [u8; 16] = hex!("6c61f40a24b8 d843ae26332a 0800 4500");
        let (rem, eth) = parse_ethernet_header(&INPUT).expect("ethernet header");
        assert_eq!(rem, &hex!("4500"));
        assert_eq!(eth.src.to_string(), "d8:43:ae:26:33:2a");
        assert_eq!(eth.dst.to_string(), "6c:61:f4:0a:24:b8");
        assert_eq!(eth.ethertype, EtherType::Ipv4);
    }

    #[test]
    fn short_header() {
        const INPUT: [u8; 13] = hex!("6c61f40a24b8 d843ae26332a 08");
        assert!(parse_ethernet_header(&INPUT).is_err());
    }

    #[test]
    fn broadcast() {
        assert!(MacAddr([0xff; 6]).is_broadcast());
        assert_eq!(MacAddr([0xff; 6]).to_string(), "ff:ff:ff:ff:ff:ff");
    }
}
