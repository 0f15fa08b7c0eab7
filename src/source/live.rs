use std::net::{IpAddr, Ipv4Addr};

use log::{debug, info};
use pcap::{Active, Capture, Device};

use super::{CaptureStats, FrameSource};
use crate::config::CaptureConfig;
use crate::error::SnifferError;
use crate::frame::RawFrame;
use crate::linktype::Linktype;

/// Frame source capturing on a network interface through libpcap
pub struct LiveSource {
    iface: String,
    cap: Capture<Active>,
    linktype: Linktype,
}

fn find_device(name: &str) -> Result<Device, SnifferError> {
    Device::list()
        .map_err(|e| SnifferError::Open {
            iface: name.to_string(),
            reason: e.to_string(),
        })?
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| SnifferError::InterfaceNotFound(name.to_string()))
}

/// IPv4 addresses assigned to the interface `name`
pub fn interface_addrs(name: &str) -> Result<Vec<Ipv4Addr>, SnifferError> {
    let device = find_device(name)?;
    let addrs = device
        .addresses
        .iter()
        .filter_map(|a| match a.addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .collect();
    Ok(addrs)
}

impl LiveSource {
    /// Open interface `iface` with the capture settings of `config`
    ///
    /// Fails if the interface does not exist or cannot be opened, for ex.
    /// because the process lacks the capture privilege.
    pub fn open(iface: &str, config: &CaptureConfig) -> Result<LiveSource, SnifferError> {
        let device = find_device(iface)?;
        let open_err = |e: pcap::Error| SnifferError::Open {
            iface: iface.to_string(),
            reason: e.to_string(),
        };
        let cap = Capture::from_device(device)
            .map_err(open_err)?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .immediate_mode(true)
            .open()
            .map_err(open_err)?;
        let linktype = Linktype(cap.get_datalink().0);
        info!(
            "capturing on {} (linktype {}, promiscuous {})",
            iface, linktype, config.promiscuous
        );
        Ok(LiveSource {
            iface: iface.to_string(),
            cap,
            linktype,
        })
    }

    pub fn iface(&self) -> &str {
        &self.iface
    }
}

impl FrameSource for LiveSource {
    fn next_frame(&mut self) -> Result<RawFrame, SnifferError> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(RawFrame::from_pcap_ts(
                packet.header.ts.tv_sec as i64,
                packet.header.ts.tv_usec as u32,
                1_000_000,
                packet.data.to_vec(),
                packet.header.len,
                self.linktype,
            )),
            Err(pcap::Error::TimeoutExpired) => Err(SnifferError::TimedOut),
            Err(pcap::Error::NoMorePackets) => Err(SnifferError::Closed),
            Err(e) => Err(SnifferError::Read(format!("{}: {}", self.iface, e))),
        }
    }

    fn linktype(&self) -> Linktype {
        self.linktype
    }

    fn stats(&mut self) -> Option<CaptureStats> {
        match self.cap.stats() {
            Ok(s) => Some(CaptureStats {
                received: s.received,
                dropped: s.dropped,
                if_dropped: s.if_dropped,
            }),
            Err(e) => {
                debug!("{}: no capture statistics: {}", self.iface, e);
                None
            }
        }
    }
}
