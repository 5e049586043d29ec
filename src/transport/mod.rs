//! Transport layer hand-off
//!
//! This module contains the contract the IPv4 core uses to reach the
//! transport layer:
//! - TCP: Transmission Control Protocol

pub mod tcp;

// Re-export commonly used items
pub use tcp::{TcpHandler, TcpHeader};
