//! Builders for synthetic frames and pcap savefiles
//!
//! These are used to produce test input without a network interface: a
//! [`FrameBuilder`] describes an Ethernet/IPv4 frame and serializes it, and
//! [`savefile`] wraps frames into a legacy pcap savefile that
//! [`ReplaySource`](crate::source::ReplaySource) can read back.

use std::io::Write;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use cookie_factory::bytes::{be_u16, be_u32, be_u8, le_i32, le_u16, le_u32};
use cookie_factory::combinator::slice;
use cookie_factory::sequence::tuple;
use cookie_factory::{gen, gen_simple, GenError, SerializeFn, WriteContext};

use crate::headers::{EtherType, IpProtocol, MacAddr, ETHERNET_HEADER_LEN, IPV4_MIN_HEADER_LEN};
use crate::linktype::Linktype;

/// Transport header to put in a synthetic frame
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportSpec {
    Tcp { src_port: u16, dst_port: u16 },
    Udp { src_port: u16, dst_port: u16 },
    Icmp { icmp_type: u8, code: u8 },
    /// Any other protocol number, with no transport header
    Raw(IpProtocol),
}

impl TransportSpec {
    fn protocol(&self) -> IpProtocol {
        match self {
            TransportSpec::Tcp { .. } => IpProtocol::Tcp,
            TransportSpec::Udp { .. } => IpProtocol::Udp,
            TransportSpec::Icmp { .. } => IpProtocol::Icmp,
            TransportSpec::Raw(p) => *p,
        }
    }

    fn header_len(&self) -> usize {
        match self {
            TransportSpec::Tcp { .. } => 20,
            TransportSpec::Udp { .. } | TransportSpec::Icmp { .. } => 8,
            TransportSpec::Raw(_) => 0,
        }
    }
}

/// Description of an Ethernet + IPv4 frame
#[derive(Clone, Debug)]
pub struct FrameBuilder {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub ttl: u8,
    pub transport: TransportSpec,
    pub payload: Vec<u8>,
    /// Pad the frame with zeroes up to this length (Ethernet minimum is 60)
    pub min_len: usize,
}

impl FrameBuilder {
    pub fn new(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, transport: TransportSpec) -> FrameBuilder {
        FrameBuilder {
            src_mac: MacAddr([0x02, 0, 0, 0, 0, 0x01]),
            dst_mac: MacAddr([0x02, 0, 0, 0, 0, 0x02]),
            src_ip,
            dst_ip,
            ttl: 64,
            transport,
            payload: Vec::new(),
            min_len: 60,
        }
    }

    pub fn macs(mut self, src: MacAddr, dst: MacAddr) -> FrameBuilder {
        self.src_mac = src;
        self.dst_mac = dst;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> FrameBuilder {
        self.payload = payload.to_vec();
        self
    }

    fn ip_total_len(&self) -> u16 {
        (IPV4_MIN_HEADER_LEN + self.transport.header_len() + self.payload.len()) as u16
    }

    /// Serialize the frame. Checksums are left at zero.
    pub fn to_vec(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(ETHERNET_HEADER_LEN + self.ip_total_len() as usize);
        gen_simple(
            tuple((
                gen_ethernet(self.dst_mac, self.src_mac, EtherType::Ipv4),
                self.gen_ipv4(),
                gen_transport(self.transport),
                slice(&self.payload),
            )),
            &mut v,
        )?;
        if v.len() < self.min_len {
            v.resize(self.min_len, 0);
        }
        Ok(v)
    }

    fn gen_ipv4<'a, W: Write + 'a>(&'a self) -> impl SerializeFn<W> + 'a {
        tuple((
            be_u8(0x45),
            be_u8(0),
            be_u16(self.ip_total_len()),
            be_u16(0),
            // don't fragment
            be_u16(0x4000),
            be_u8(self.ttl),
            be_u8(self.transport.protocol().0),
            be_u16(0),
            be_u32(u32::from(self.src_ip)),
            be_u32(u32::from(self.dst_ip)),
        ))
    }
}

fn gen_ethernet<W: Write>(dst: MacAddr, src: MacAddr, ethertype: EtherType) -> impl SerializeFn<W> {
    move |out: WriteContext<W>| {
        let out = slice(dst.0)(out)?;
        let out = slice(src.0)(out)?;
        be_u16(ethertype.0)(out)
    }
}

fn gen_transport<W: Write>(t: TransportSpec) -> impl SerializeFn<W> {
    move |out: WriteContext<W>| match t {
        TransportSpec::Tcp { src_port, dst_port } => tuple((
            be_u16(src_port),
            be_u16(dst_port),
            // sequence, acknowledgment
            be_u32(0),
            be_u32(0),
            // data offset 5, SYN
            be_u16(0x5002),
            be_u16(0xffff),
            be_u16(0),
            be_u16(0),
        ))(out),
        TransportSpec::Udp { src_port, dst_port } => {
            tuple((be_u16(src_port), be_u16(dst_port), be_u16(8), be_u16(0)))(out)
        }
        TransportSpec::Icmp { icmp_type, code } => {
            tuple((be_u8(icmp_type), be_u8(code), be_u16(0), be_u32(0)))(out)
        }
        TransportSpec::Raw(_) => Ok(out),
    }
}

/// Serialize frames into a little-endian, microsecond precision legacy pcap
/// savefile
pub fn savefile(
    linktype: Linktype,
    snaplen: u32,
    frames: &[(DateTime<Utc>, &[u8])],
) -> Result<Vec<u8>, GenError> {
    let mut v = Vec::new();
    let (_, pos) = gen(
        tuple((
            le_u32(0xa1b2_c3d4),
            le_u16(2),
            le_u16(4),
            le_i32(0),
            le_u32(0),
            le_u32(snaplen),
            le_u32(linktype.0 as u32),
        )),
        &mut v,
    )?;
    debug_assert_eq!(pos, 24);
    for (ts, data) in frames {
        let caplen = data.len().min(snaplen as usize);
        gen_simple(
            tuple((
                le_u32(ts.timestamp() as u32),
                le_u32(ts.timestamp_subsec_micros()),
                le_u32(caplen as u32),
                le_u32(data.len() as u32),
                slice(&data[..caplen]),
            )),
            &mut v,
        )?;
    }
    Ok(v)
}
