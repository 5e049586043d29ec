//! ICMP (Internet Control Message Protocol) hand-off
//!
//! The receive pipeline verifies the ICMP checksum and then passes the
//! datagram to an [`IcmpHandler`], which reads the message body from the link
//! layer's receive buffer.

use byteorder::{BigEndian, ByteOrder};

use crate::error::Error;
use crate::iface::link::LinkLayer;
use crate::network::ipv4::Ipv4Header;

/// Minimum ICMP header length in bytes
pub const ICMP_HEADER_LEN: usize = 8;

/// ICMP message types
pub const ICMP_TYPE_ECHO_REPLY: u8 = 0;
pub const ICMP_TYPE_ECHO_REQUEST: u8 = 8;

/// Receiver of verified ICMP datagrams.
pub trait IcmpHandler {
    /// Handle a datagram whose ICMP checksum has been verified. The link's
    /// read pointer sits at the first byte of the ICMP message.
    fn receive<L>(&mut self, header: &Ipv4Header, link: &mut L)
    where
        L: ?Sized + LinkLayer;
}

/// ICMP packet header structure
///
/// Represents the standard 8-byte ICMP header as defined in RFC 792
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub msg_type: u8,  // ICMP message type
    pub msg_code: u8,  // ICMP message code
    pub checksum: u16, // ICMP checksum
    pub rest: [u8; 4], // Type-specific data (e.g., identifier and sequence for echo)
}

impl IcmpHeader {
    /// Parse an ICMP header from a byte array.
    pub fn from_bytes(data: &[u8; ICMP_HEADER_LEN]) -> Self {
        IcmpHeader {
            msg_type: data[0],
            msg_code: data[1],
            checksum: BigEndian::read_u16(&data[2..4]),
            rest: [data[4], data[5], data[6], data[7]],
        }
    }

    /// Read an ICMP header from the link's receive buffer.
    pub fn read<L>(link: &mut L) -> Result<Self, Error>
    where
        L: ?Sized + LinkLayer,
    {
        let mut bytes = [0u8; ICMP_HEADER_LEN];
        link.read_block(&mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Check if this is an Echo Request message
    pub fn is_echo_request(&self) -> bool {
        self.msg_type == ICMP_TYPE_ECHO_REQUEST
    }

    /// Get the identifier field for Echo Request/Reply messages
    pub fn identifier(&self) -> u16 {
        BigEndian::read_u16(&self.rest[0..2])
    }

    /// Get the sequence number field for Echo Request/Reply messages
    pub fn sequence(&self) -> u16 {
        BigEndian::read_u16(&self.rest[2..4])
    }
}
