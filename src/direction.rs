use std::fmt;

use crate::headers::ParsedHeaders;
use crate::local::LocalAddrs;

/// Direction of a packet relative to this host
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// Sent to a local address from a remote one
    In,
    /// Sent from a local address to a remote one
    Out,
    /// No network layer, or both or neither addresses are local
    Unknown,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
            Direction::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a packet by comparing its addresses to the local address set
///
/// Loopback traffic (both ends local) and forwarded traffic (neither end
/// local) are `Unknown`.
pub fn classify(headers: &ParsedHeaders, local: &LocalAddrs) -> Direction {
    let ip = match headers.network {
        Some(ref ip) => ip,
        None => return Direction::Unknown,
    };
    match (local.contains(&ip.src), local.contains(&ip.dst)) {
        (true, false) => Direction::Out,
        (false, true) => Direction::In,
        _ => Direction::Unknown,
    }
}
