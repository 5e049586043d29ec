//! Network layer
//!
//! This module contains the IPv4 building blocks:
//! - checksum: Internet checksum and transport pseudo-header sum
//! - addr: destination address classification
//! - ipv4: IPv4 header wire format
//! - icmp: ICMP hand-off

pub mod addr;
pub mod checksum;
pub mod icmp;
pub mod ipv4;

// Re-export commonly used items
pub use addr::{classify, is_broadcast, is_same_subnet, AddressClass};
pub use checksum::{checksum, checksum_with_seed, pseudo_header_sum};
pub use icmp::{IcmpHandler, IcmpHeader};
pub use ipv4::{flags, protocol, Ipv4Header};
