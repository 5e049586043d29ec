//! Destination address classification
//!
//! Decides whether a datagram is addressed to this host. Checks run in a
//! fixed order and the first match wins: unicast, unspecified, broadcast,
//! all-hosts multicast.

use std::net::Ipv4Addr;

/// The limited broadcast address `255.255.255.255`.
pub const LIMITED_BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;

/// The unspecified address `0.0.0.0`.
pub const UNSPECIFIED: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// The all-hosts multicast group `224.0.0.1`.
pub const ALL_HOSTS_MULTICAST: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 1);

/// Smallest subnet host-part mask that has a directed broadcast. /31 and /32
/// subnets have none.
const MIN_SUBNET_HOST_MASK: u32 = 0b11;

/// Host-part masks of the class A, B and C networks.
const CLASSFUL_HOST_MASKS: [u32; 3] = [0x00FF_FFFF, 0x0000_FFFF, 0x0000_00FF];

/// Category of a destination address relative to this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// Exact match of the host address.
    Unicast,
    /// `0.0.0.0`.
    Unspecified,
    /// Limited broadcast or a directed broadcast of the host's network.
    Broadcast,
    /// The all-hosts multicast group.
    Multicast,
    /// Anything else.
    NotForUs,
}

impl AddressClass {
    /// Whether a datagram with this destination is accepted.
    pub fn is_for_us(self) -> bool {
        self != AddressClass::NotForUs
    }
}

/// Classify `dst` for a host configured with `host` and `netmask`.
///
/// An unconfigured host (`0.0.0.0`) has no unicast address of its own.
pub fn classify(dst: Ipv4Addr, host: Ipv4Addr, netmask: Ipv4Addr) -> AddressClass {
    if dst == host && host != UNSPECIFIED {
        AddressClass::Unicast
    } else if dst == UNSPECIFIED {
        AddressClass::Unspecified
    } else if is_broadcast(dst, host, netmask) {
        AddressClass::Broadcast
    } else if dst == ALL_HOSTS_MULTICAST {
        AddressClass::Multicast
    } else {
        AddressClass::NotForUs
    }
}

/// Check if `dst` is the limited broadcast address or a directed broadcast
/// of the network `host` belongs to.
///
/// A directed broadcast matches when, for one of the host-part masks, every
/// host bit of `dst` is set and `dst` shares the network part of `host`. The
/// masks tried are the configured subnet's, when it leaves at least two host
/// bits, and the three classful ones.
pub fn is_broadcast(dst: Ipv4Addr, host: Ipv4Addr, netmask: Ipv4Addr) -> bool {
    if dst == LIMITED_BROADCAST {
        return true;
    }

    let dst = u32::from(dst);
    let host = u32::from(host);
    let subnet_host_mask = Some(!u32::from(netmask)).filter(|m| *m >= MIN_SUBNET_HOST_MASK);

    subnet_host_mask
        .into_iter()
        .chain(CLASSFUL_HOST_MASKS)
        .any(|host_mask| (dst | !host_mask) == u32::MAX && (host | host_mask) == dst)
}

/// Check if `addr` is on the same subnet as `host`.
pub fn is_same_subnet(addr: Ipv4Addr, host: Ipv4Addr, netmask: Ipv4Addr) -> bool {
    (u32::from(addr) ^ u32::from(host)) & u32::from(netmask) == 0
}
