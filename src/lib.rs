//! A single-interface IPv4 core
//!
//! This library provides the IPv4 receive and transmit pipelines of a small
//! embedded-style network stack and the cooperative event loop driving them:
//! - Internet checksum and transport pseudo-header sums
//! - Destination address classification
//! - IPv4 header validation and ICMP/TCP demultiplexing
//! - Next-hop selection and two-phase datagram transmission
//! - Periodic neighbor and TCP timer scheduling
//!
//! Link layer, neighbor resolution, TCP and ICMP are collaborators reached
//! through traits.

pub mod clock;
pub mod config;
mod error;
pub mod iface;
pub mod network;
pub mod transport;

// Re-export commonly used types
pub use clock::{Clock, SystemClock, TickClock};
pub use config::DeviceConfig;
pub use error::{Error, ErrorKind};
pub use iface::{
    Interface, LinkLayer, MemoryLink, NeighborResolver, Received, StaticNeighbors, TxFrame,
};
pub use network::{AddressClass, IcmpHandler, Ipv4Header};
pub use transport::TcpHandler;
