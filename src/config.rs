use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::format::Zone;

/// Default snapshot length: large enough for any Ethernet frame
pub const DEFAULT_SNAPLEN: i32 = 65535;
/// Default read timeout, bounding how long a stop request can go unnoticed
pub const DEFAULT_TIMEOUT_MS: i32 = 500;

/// Settings of a capture session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Interfaces to capture on, one capture loop each
    pub interfaces: Vec<String>,
    /// Replay this pcap savefile instead of capturing live
    pub savefile: Option<PathBuf>,
    /// Append rendered blocks to this file, in addition to the console
    pub output: Option<PathBuf>,
    pub promiscuous: bool,
    pub snaplen: i32,
    pub timeout_ms: i32,
    /// Addresses treated as local in addition to the interface addresses
    pub local_addrs: Vec<Ipv4Addr>,
    pub zone: Zone,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            interfaces: Vec::new(),
            savefile: None,
            output: None,
            promiscuous: true,
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            local_addrs: Vec::new(),
            zone: Zone::Local,
        }
    }
}

impl CaptureConfig {
    /// Capture live on a single interface with default settings
    pub fn interface(name: &str) -> CaptureConfig {
        CaptureConfig {
            interfaces: vec![name.to_string()],
            ..CaptureConfig::default()
        }
    }

    /// Replay a savefile with default settings
    pub fn savefile<P: Into<PathBuf>>(path: P) -> CaptureConfig {
        CaptureConfig {
            savefile: Some(path.into()),
            ..CaptureConfig::default()
        }
    }
}
