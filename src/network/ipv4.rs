//! IPv4 header
//!
//! Parsing and serialization of the fixed 20-byte header of RFC 791. Once
//! parsed, lengths and addresses are held in host order; the wire form is
//! always network order.

use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder};

use crate::iface::link::LinkLayer;
use crate::network::checksum::pseudo_header_sum;

/// Length of a header without options.
pub const IPV4_HEADER_LEN: usize = 20;
/// Smallest valid `ihl`.
pub const MIN_IHL: u8 = 5;

const IPV4_VERSION: u8 = 4;
const DEFAULT_TTL: u8 = 64;

/// Offset of the total length field inside the header.
pub const TOTAL_LEN_OFFSET: usize = 2;
/// Offset of the header checksum field inside the header.
pub const CHECKSUM_OFFSET: usize = 10;

/// IPv4 packet header structure
///
/// Represents the standard 20-byte IPv4 header as defined in RFC 791
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8, // Internet Header Length
    pub tos: u8, // Type of Service
    pub total_len: u16,
    pub id: u16,
    pub flags_frag_offset: u16, // Flags and Fragment Offset
    pub ttl: u8,                // Time to Live
    pub protocol: u8,           // Next Protocol
    pub checksum: u16,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
}

impl Ipv4Header {
    /// The header emitted by the transmit pipeline before the payload is
    /// known: don't-fragment set, zero total length and zero checksum.
    pub fn template(protocol: u8, src_addr: Ipv4Addr, dst_addr: Ipv4Addr) -> Self {
        Ipv4Header {
            version: IPV4_VERSION,
            ihl: MIN_IHL,
            tos: 0,
            total_len: 0,
            id: 0,
            flags_frag_offset: flags::DONT_FRAGMENT,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    /// Parse the fixed part of an IPv4 header.
    ///
    /// No field is validated here, the receive pipeline decides what to do
    /// with the version and header length.
    pub fn from_bytes(data: &[u8; IPV4_HEADER_LEN]) -> Self {
        Ipv4Header {
            version: data[0] >> 4,
            ihl: data[0] & 0x0F,
            tos: data[1],
            total_len: BigEndian::read_u16(&data[2..4]),
            id: BigEndian::read_u16(&data[4..6]),
            flags_frag_offset: BigEndian::read_u16(&data[6..8]),
            ttl: data[8],
            protocol: data[9],
            checksum: BigEndian::read_u16(&data[10..12]),
            src_addr: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            dst_addr: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
        }
    }

    /// Convert IPv4 header to bytes
    pub fn to_bytes(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = [0u8; IPV4_HEADER_LEN];
        bytes[0] = (self.version << 4) | (self.ihl & 0x0F);
        bytes[1] = self.tos;
        BigEndian::write_u16(&mut bytes[2..4], self.total_len);
        BigEndian::write_u16(&mut bytes[4..6], self.id);
        BigEndian::write_u16(&mut bytes[6..8], self.flags_frag_offset);
        bytes[8] = self.ttl;
        bytes[9] = self.protocol;
        BigEndian::write_u16(&mut bytes[10..12], self.checksum);
        bytes[12..16].copy_from_slice(&self.src_addr.octets());
        bytes[16..20].copy_from_slice(&self.dst_addr.octets());
        bytes
    }

    /// Write the header to the outbound frame field by field.
    pub fn emit<L>(&self, link: &mut L)
    where
        L: ?Sized + LinkLayer,
    {
        link.write_u8((self.version << 4) | (self.ihl & 0x0F));
        link.write_u8(self.tos);
        link.write_u16(self.total_len);
        link.write_u16(self.id);
        link.write_u16(self.flags_frag_offset);
        link.write_u8(self.ttl);
        link.write_u8(self.protocol);
        link.write_u16(self.checksum);
        link.write_u32(u32::from(self.src_addr));
        link.write_u32(u32::from(self.dst_addr));
    }

    /// Get the header length in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }

    /// Length of the options that follow the fixed header.
    pub fn options_len(&self) -> usize {
        self.header_len().saturating_sub(IPV4_HEADER_LEN)
    }

    /// Get payload length
    ///
    /// Returns `None` if the total length does not cover the header.
    pub fn payload_len(&self) -> Option<u16> {
        let header_len = u16::try_from(self.header_len()).ok()?;
        self.total_len.checked_sub(header_len)
    }

    /// Transport pseudo-header sum for a payload of `len` bytes carried by
    /// this header.
    pub fn pseudo_header_sum(&self, len: u16) -> u16 {
        pseudo_header_sum(self.protocol, len, self.src_addr, self.dst_addr)
    }
}

/// IPv4 protocol constants
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;

    /// Protocols allowed to leave a host that has no address yet.
    pub fn permits_sourceless(protocol: u8) -> bool {
        protocol == UDP
    }
}

/// IPv4 flags constants
pub mod flags {
    pub const DONT_FRAGMENT: u16 = 0x4000;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::checksum::checksum;

    const RAW: [u8; IPV4_HEADER_LEN] = [
        0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xb8, 0x61, 0xc0, 0xa8, 0x00,
        0x01, 0xc0, 0xa8, 0x00, 0xc7,
    ];

    #[test]
    fn test_parse_header() {
        let header = Ipv4Header::from_bytes(&RAW);
        assert_eq!(header.version, 4);
        assert_eq!(header.ihl, 5);
        assert_eq!(header.total_len, 0x73);
        assert_eq!(header.flags_frag_offset, flags::DONT_FRAGMENT);
        assert_eq!(header.ttl, 64);
        assert_eq!(header.protocol, protocol::UDP);
        assert_eq!(header.checksum, 0xb861);
        assert_eq!(header.src_addr, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(header.dst_addr, Ipv4Addr::new(192, 168, 0, 199));
        assert_eq!(header.header_len(), 20);
        assert_eq!(header.payload_len(), Some(0x73 - 20));
        assert_eq!(header.to_bytes(), RAW);
    }

    #[test]
    fn test_template_header() {
        let src = Ipv4Addr::new(10, 0, 0, 5);
        let dst = Ipv4Addr::new(10, 0, 0, 9);
        let mut header = Ipv4Header::template(protocol::TCP, src, dst);
        header.total_len = 40;

        let mut bytes = header.to_bytes();
        let sum = checksum(&bytes);
        BigEndian::write_u16(&mut bytes[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2], sum);

        assert_eq!(bytes[0], 0x45);
        assert_eq!(&bytes[6..8], &[0x40, 0x00]);
        assert_eq!(checksum(&bytes), 0);
    }

    #[test]
    fn test_options_and_payload_len() {
        let mut header = Ipv4Header::from_bytes(&RAW);
        header.ihl = 6;
        assert_eq!(header.options_len(), 4);
        assert_eq!(header.payload_len(), Some(0x73 - 24));

        header.total_len = 10;
        assert_eq!(header.payload_len(), None);

        header.ihl = 4;
        assert_eq!(header.options_len(), 0);
    }
}
