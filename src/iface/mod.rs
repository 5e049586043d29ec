//! Network interface layer
//!
//! This module ties the IPv4 core to its collaborators:
//! - link: link layer contract and frame buffer
//! - memory, tap: concrete link layers
//! - neighbor: neighbor resolution contract
//! - ipv4: receive pipeline
//! - tx: transmit pipeline
//! - interface: the interface and its event loop

pub mod interface;
pub mod ipv4;
pub mod link;
pub mod memory;
pub mod neighbor;
pub mod tap;
pub mod tx;

// Re-export commonly used items
pub use interface::{Interface, Received};
pub use link::{LinkLayer, LinkTarget};
pub use memory::MemoryLink;
pub use neighbor::{NeighborResolver, StaticNeighbors};
pub use tap::TapLink;
pub use tx::TxFrame;
