//! The set of addresses treated as "this machine"

use std::collections::HashSet;
use std::iter::FromIterator;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use log::{debug, warn};

/// Remote address used to discover the source address of the default route.
/// No packet is sent: connecting a UDP socket only selects a route.
const ROUTE_PROBE_ADDR: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// Immutable set of local IPv4 addresses
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalAddrs {
    addrs: HashSet<Ipv4Addr>,
}

impl LocalAddrs {
    /// Build the local address set from the explicitly configured addresses
    /// and the addresses reported for the capture interfaces.
    ///
    /// If both are empty, the source address of the default route is used.
    pub fn resolve<I, J>(configured: I, interface_addrs: J) -> LocalAddrs
    where
        I: IntoIterator<Item = Ipv4Addr>,
        J: IntoIterator<Item = Ipv4Addr>,
    {
        let mut local: LocalAddrs = configured.into_iter().chain(interface_addrs).collect();
        if local.is_empty() {
            match probe_default_route_addr() {
                Some(addr) => {
                    debug!("using default route address {}", addr);
                    local.addrs.insert(addr);
                }
                None => warn!("no local address found: direction will be UNKNOWN"),
            }
        }
        local
    }

    #[inline]
    pub fn contains(&self, addr: &Ipv4Addr) -> bool {
        self.addrs.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Addresses in ascending order
    pub fn sorted(&self) -> Vec<Ipv4Addr> {
        let mut v: Vec<_> = self.addrs.iter().copied().collect();
        v.sort();
        v
    }
}

impl FromIterator<Ipv4Addr> for LocalAddrs {
    fn from_iter<T: IntoIterator<Item = Ipv4Addr>>(iter: T) -> Self {
        LocalAddrs {
            addrs: iter.into_iter().collect(),
        }
    }
}

/// Return the address this host would use to reach the public internet
pub fn probe_default_route_addr() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(ROUTE_PROBE_ADDR).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(addr) if !addr.is_unspecified() => Some(addr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_addresses() {
        let local = LocalAddrs::resolve(
            vec![Ipv4Addr::new(192, 168, 1, 46)],
            vec![Ipv4Addr::new(127, 0, 0, 1), Ipv4Addr::new(192, 168, 1, 46)],
        );
        assert_eq!(local.len(), 2);
        assert!(local.contains(&Ipv4Addr::LOCALHOST));
        assert_eq!(
            local.sorted(),
            vec![Ipv4Addr::new(127, 0, 0, 1), Ipv4Addr::new(192, 168, 1, 46)]
        );
    }

    #[test]
    fn collect() {
        let local: LocalAddrs = vec![Ipv4Addr::new(10, 0, 0, 1)].into_iter().collect();
        assert!(local.contains(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(!local.contains(&Ipv4Addr::new(10, 0, 0, 2)));
    }
}
