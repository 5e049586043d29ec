//! Link layer contract
//!
//! The IPv4 core never owns frame memory. It polls a [`LinkLayer`] for
//! received frames, reads them through a cursor, and builds outbound frames
//! in the link's transmit buffer, patching fields in place once the payload
//! length is known.

use byteorder::{BigEndian, ByteOrder};
use macaddr::MacAddr6;

use crate::error::{Error, ErrorKind};
use crate::network::checksum;

/// Length of an Ethernet II header.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Largest Ethernet frame without frame check sequence.
pub const MAX_FRAME_LEN: usize = 1514;

/// EtherType constants
pub mod ether_type {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
}

/// Next-hop link address of an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    /// The broadcast address, no resolution needed.
    Broadcast,
    /// A unicast address obtained from neighbor resolution.
    Unicast(MacAddr6),
}

impl LinkTarget {
    /// The destination hardware address.
    pub fn mac(self) -> MacAddr6 {
        match self {
            LinkTarget::Broadcast => MacAddr6::broadcast(),
            LinkTarget::Unicast(mac) => mac,
        }
    }
}

/// A polled network device with one receive and one transmit buffer.
///
/// Offsets passed to [`insert`](Self::insert) and
/// [`tx_checksum`](Self::tx_checksum) are relative to the start of the
/// outbound frame, link header included.
pub trait LinkLayer {
    /// Service device events such as link changes and buffer management.
    fn event_handler(&mut self);

    /// Whether the link is up.
    fn link_up(&mut self) -> bool;

    /// Whether a received frame is waiting.
    fn packet_ready(&mut self) -> bool;

    /// Make the next waiting frame current and place the read pointer at its
    /// first byte.
    fn next_packet(&mut self);

    /// Release the current frame.
    fn flush(&mut self);

    /// Read exactly `buf.len()` bytes and advance the read pointer.
    fn read_block(&mut self, buf: &mut [u8]) -> Result<(), Error>;

    /// Skip `len` unread bytes.
    fn dump(&mut self, len: usize) -> Result<(), Error>;

    /// Position of the read pointer inside the current frame.
    fn read_pointer(&self) -> usize;

    /// Internet checksum over the next `len` unread bytes, continuing from
    /// `seed`, without advancing the read pointer. Returns zero for a region
    /// that carries a valid checksum.
    fn rx_checksum(&self, len: usize, seed: u16) -> Result<u16, Error>;

    /// Begin a new outbound frame addressed to `target`.
    fn write_start(&mut self, target: LinkTarget, ether_type: u16);

    /// Position of the write pointer inside the outbound frame.
    fn write_pointer(&self) -> usize;

    /// Append a byte.
    fn write_u8(&mut self, value: u8);

    /// Append a 16-bit value in network order.
    fn write_u16(&mut self, value: u16);

    /// Append a 32-bit value in network order.
    fn write_u32(&mut self, value: u32);

    /// Append raw bytes.
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_u8(b);
        }
    }

    /// Overwrite already written bytes at `offset`.
    fn insert(&mut self, bytes: &[u8], offset: usize) -> Result<(), Error>;

    /// Internet checksum over `len` written bytes at `offset`.
    fn tx_checksum(&self, offset: usize, len: usize, seed: u16) -> Result<u16, Error>;

    /// Transmit the outbound frame.
    fn send(&mut self) -> Result<(), Error>;
}

/// Receive cursor and transmit buffer shared by the concrete links.
#[derive(Debug)]
pub struct FrameBuffer {
    mac: MacAddr6,
    rx: Vec<u8>,
    rx_pos: usize,
    tx: Vec<u8>,
}

impl FrameBuffer {
    /// Construct a buffer for a device with hardware address `mac`.
    pub fn new(mac: MacAddr6) -> Self {
        Self {
            mac,
            rx: Vec::new(),
            rx_pos: 0,
            tx: Vec::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Hardware address of the device.
    pub fn mac(&self) -> MacAddr6 {
        self.mac
    }

    /// Make `frame` the current received frame.
    pub fn load(&mut self, frame: Vec<u8>) {
        self.rx = frame;
        self.rx_pos = 0;
    }

    /// Drop the current received frame.
    pub fn clear(&mut self) {
        self.rx.clear();
        self.rx_pos = 0;
    }

    fn remaining(&self) -> usize {
        self.rx.len() - self.rx_pos
    }

    fn unread(&self, len: usize) -> Result<&[u8], Error> {
        if len > self.remaining() {
            return Err(Error::new(ErrorKind::Underrun {
                needed: len,
                available: self.remaining(),
            }));
        }

        Ok(&self.rx[self.rx_pos..self.rx_pos + len])
    }

    fn written(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>, Error> {
        match offset.checked_add(len) {
            Some(end) if end <= self.tx.len() => Ok(offset..end),
            _ => Err(Error::new(ErrorKind::OutOfRange { offset, len })),
        }
    }

    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        buf.copy_from_slice(self.unread(buf.len())?);
        self.rx_pos += buf.len();
        Ok(())
    }

    pub fn dump(&mut self, len: usize) -> Result<(), Error> {
        self.unread(len)?;
        self.rx_pos += len;
        Ok(())
    }

    pub fn read_pointer(&self) -> usize {
        self.rx_pos
    }

    pub fn rx_checksum(&self, len: usize, seed: u16) -> Result<u16, Error> {
        Ok(checksum::checksum_with_seed(self.unread(len)?, seed))
    }

    pub fn write_start(&mut self, target: LinkTarget, ether_type: u16) {
        self.tx.clear();
        self.tx.extend_from_slice(target.mac().as_bytes());
        self.tx.extend_from_slice(self.mac.as_bytes());
        self.write_u16(ether_type);
    }

    pub fn write_pointer(&self) -> usize {
        self.tx.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.tx.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.tx.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.tx.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }

    pub fn insert(&mut self, bytes: &[u8], offset: usize) -> Result<(), Error> {
        let range = self.written(offset, bytes.len())?;
        self.tx[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn tx_checksum(&self, offset: usize, len: usize, seed: u16) -> Result<u16, Error> {
        let range = self.written(offset, len)?;
        Ok(checksum::checksum_with_seed(&self.tx[range], seed))
    }

    /// The completed outbound frame, checked against the maximum frame size.
    pub fn outbound(&self) -> Result<&[u8], Error> {
        if self.tx.len() > MAX_FRAME_LEN {
            return Err(Error::new(ErrorKind::FrameTooLarge {
                len: self.tx.len(),
                max: MAX_FRAME_LEN,
            }));
        }

        Ok(&self.tx)
    }
}

/// Read the EtherType of an Ethernet II header.
pub fn ether_type_of(header: &[u8; ETHERNET_HEADER_LEN]) -> u16 {
    BigEndian::read_u16(&header[12..14])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> MacAddr6 {
        MacAddr6::new(0x02, 0x00, 0x00, 0x00, 0x00, 0x01)
    }

    #[test]
    fn test_read_cursor() {
        let mut buf = FrameBuffer::new(mac());
        buf.load(vec![1, 2, 3, 4, 5, 6]);

        let mut head = [0u8; 2];
        buf.read_block(&mut head).unwrap();
        assert_eq!(head, [1, 2]);
        assert_eq!(buf.read_pointer(), 2);

        buf.dump(3).unwrap();
        assert_eq!(buf.read_pointer(), 5);

        let err = buf.dump(2).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Underrun {
                needed: 2,
                available: 1
            }
        ));
        assert_eq!(buf.read_pointer(), 5);
    }

    #[test]
    fn test_rx_checksum_does_not_advance() {
        let mut buf = FrameBuffer::new(mac());
        buf.load(vec![0xff, 0xff, 0x00, 0x00]);
        assert_eq!(buf.rx_checksum(4, 0).unwrap(), 0);
        assert_eq!(buf.read_pointer(), 0);
        assert!(buf.rx_checksum(5, 0).is_err());
    }

    #[test]
    fn test_write_frame_and_patch() {
        let mut buf = FrameBuffer::new(mac());
        buf.write_start(LinkTarget::Broadcast, ether_type::IPV4);
        assert_eq!(buf.write_pointer(), ETHERNET_HEADER_LEN);

        buf.write_u16(0);
        buf.write_u32(0x0a00_0005);
        buf.insert(&[0x12, 0x34], ETHERNET_HEADER_LEN).unwrap();
        assert!(buf.insert(&[0; 4], ETHERNET_HEADER_LEN + 4).is_err());

        let frame = buf.outbound().unwrap();
        assert_eq!(&frame[0..6], &[0xff; 6]);
        assert_eq!(&frame[6..12], mac().as_bytes());
        assert_eq!(&frame[12..14], &[0x08, 0x00]);
        assert_eq!(&frame[14..], &[0x12, 0x34, 0x0a, 0x00, 0x00, 0x05]);

        let mut header = [0u8; ETHERNET_HEADER_LEN];
        header.copy_from_slice(&frame[..ETHERNET_HEADER_LEN]);
        assert_eq!(ether_type_of(&header), ether_type::IPV4);
    }

    #[test]
    fn test_oversized_frame() {
        let mut buf = FrameBuffer::new(mac());
        buf.write_start(LinkTarget::Unicast(mac()), ether_type::IPV4);
        buf.write_bytes(&[0; MAX_FRAME_LEN]);
        assert!(matches!(
            buf.outbound().unwrap_err().kind(),
            ErrorKind::FrameTooLarge { .. }
        ));
    }
}
