//! TCP (Transmission Control Protocol) hand-off
//!
//! The connection state machine lives outside this crate. The receive
//! pipeline verifies the segment checksum against the pseudo-header and
//! passes accepted segments to a [`TcpHandler`]; the event loop drives its
//! timeouts.

use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder};

use crate::error::Error;
use crate::iface::link::LinkLayer;

/// Minimum TCP header length in bytes
pub const TCP_HEADER_LEN: usize = 20;

/// Receiver of verified TCP segments.
pub trait TcpHandler {
    /// Reset all connection state.
    fn init(&mut self);

    /// Handle an accepted segment of `len` bytes from `source`. The link's
    /// read pointer sits at the first byte of the TCP header.
    fn recv<L>(&mut self, source: Ipv4Addr, len: u16, link: &mut L)
    where
        L: ?Sized + LinkLayer;

    /// Periodic timeout processing, called once per elapsed time unit.
    fn update(&mut self);
}

/// TCP packet header structure
///
/// Represents the standard 20-byte TCP header as defined in RFC 793
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub data_offset_and_flags: u16, // Data offset (4 bits) + Reserved (3 bits) + Flags (9 bits)
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
}

impl TcpHeader {
    /// Parse a TCP header from a byte array.
    pub fn from_bytes(data: &[u8; TCP_HEADER_LEN]) -> Self {
        TcpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            seq_number: BigEndian::read_u32(&data[4..8]),
            ack_number: BigEndian::read_u32(&data[8..12]),
            data_offset_and_flags: BigEndian::read_u16(&data[12..14]),
            window_size: BigEndian::read_u16(&data[14..16]),
            checksum: BigEndian::read_u16(&data[16..18]),
            urgent_ptr: BigEndian::read_u16(&data[18..20]),
        }
    }

    /// Read a TCP header from the link's receive buffer.
    pub fn read<L>(link: &mut L) -> Result<Self, Error>
    where
        L: ?Sized + LinkLayer,
    {
        let mut bytes = [0u8; TCP_HEADER_LEN];
        link.read_block(&mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Check if SYN flag is set
    pub fn is_syn(&self) -> bool {
        (self.data_offset_and_flags & 0x0002) != 0
    }

    /// Check if ACK flag is set
    pub fn is_ack(&self) -> bool {
        (self.data_offset_and_flags & 0x0010) != 0
    }

    /// Get the data offset (header length) in bytes
    pub fn data_offset(&self) -> usize {
        ((self.data_offset_and_flags >> 12) as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_syn() {
        let bytes = [
            0x30, 0x39, 0x00, 0x50, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x50, 0x02,
            0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
        ];
        let header = TcpHeader::from_bytes(&bytes);
        assert_eq!(header.src_port, 12345);
        assert_eq!(header.dst_port, 80);
        assert_eq!(header.seq_number, 1);
        assert!(header.is_syn());
        assert!(!header.is_ack());
        assert_eq!(header.data_offset(), 20);
        assert_eq!(header.window_size, 0xffff);
    }
}
