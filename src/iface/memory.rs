//! In-memory link layer
//!
//! Frames pushed with [`MemoryLink::push_frame`] are received in order and
//! sent frames are collected for inspection.

use std::collections::VecDeque;

use macaddr::MacAddr6;

use crate::error::{Error, ErrorKind};
use crate::iface::link::{FrameBuffer, LinkLayer, LinkTarget};

/// A [`LinkLayer`] backed by memory.
#[derive(Debug)]
pub struct MemoryLink {
    buffer: FrameBuffer,
    rx_queue: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    up: bool,
    fail_send: bool,
    events: usize,
    flushes: usize,
}

impl MemoryLink {
    /// Construct a link that is up, with hardware address `mac`.
    pub fn new(mac: MacAddr6) -> Self {
        Self {
            buffer: FrameBuffer::new(mac),
            rx_queue: VecDeque::new(),
            sent: Vec::new(),
            up: true,
            fail_send: false,
            events: 0,
            flushes: 0,
        }
    }

    /// Queue a frame for reception.
    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.rx_queue.push_back(frame);
    }

    /// Frames transmitted so far.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Take the frames transmitted so far.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    /// Set the link state.
    pub fn set_link_up(&mut self, up: bool) {
        self.up = up;
    }

    /// Make every following send fail.
    pub fn set_fail_send(&mut self, fail: bool) {
        self.fail_send = fail;
    }

    /// Number of times the event handler has been serviced.
    pub fn events(&self) -> usize {
        self.events
    }

    /// Number of frames released.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl LinkLayer for MemoryLink {
    fn event_handler(&mut self) {
        self.events += 1;
    }

    fn link_up(&mut self) -> bool {
        self.up
    }

    fn packet_ready(&mut self) -> bool {
        !self.rx_queue.is_empty()
    }

    fn next_packet(&mut self) {
        match self.rx_queue.pop_front() {
            Some(frame) => self.buffer.load(frame),
            None => self.buffer.clear(),
        }
    }

    fn flush(&mut self) {
        self.flushes += 1;
        self.buffer.clear();
    }

    fn read_block(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.buffer.read_block(buf)
    }

    fn dump(&mut self, len: usize) -> Result<(), Error> {
        self.buffer.dump(len)
    }

    fn read_pointer(&self) -> usize {
        self.buffer.read_pointer()
    }

    fn rx_checksum(&self, len: usize, seed: u16) -> Result<u16, Error> {
        self.buffer.rx_checksum(len, seed)
    }

    fn write_start(&mut self, target: LinkTarget, ether_type: u16) {
        self.buffer.write_start(target, ether_type);
    }

    fn write_pointer(&self) -> usize {
        self.buffer.write_pointer()
    }

    fn write_u8(&mut self, value: u8) {
        self.buffer.write_u8(value);
    }

    fn write_u16(&mut self, value: u16) {
        self.buffer.write_u16(value);
    }

    fn write_u32(&mut self, value: u32) {
        self.buffer.write_u32(value);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.write_bytes(bytes);
    }

    fn insert(&mut self, bytes: &[u8], offset: usize) -> Result<(), Error> {
        self.buffer.insert(bytes, offset)
    }

    fn tx_checksum(&self, offset: usize, len: usize, seed: u16) -> Result<u16, Error> {
        self.buffer.tx_checksum(offset, len, seed)
    }

    fn send(&mut self) -> Result<(), Error> {
        if !self.up {
            return Err(Error::new(ErrorKind::LinkDown));
        }

        let frame = self.buffer.outbound()?;

        if self.fail_send {
            return Err(Error::new(ErrorKind::Io(std::io::Error::other(
                "transmit rejected",
            ))));
        }

        self.sent.push(frame.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_received_in_order() {
        let mut link = MemoryLink::new(MacAddr6::nil());
        link.push_frame(vec![1]);
        link.push_frame(vec![2]);

        let mut byte = [0u8; 1];
        assert!(link.packet_ready());
        link.next_packet();
        link.read_block(&mut byte).unwrap();
        assert_eq!(byte, [1]);
        link.flush();

        link.next_packet();
        link.read_block(&mut byte).unwrap();
        assert_eq!(byte, [2]);
        link.flush();

        assert!(!link.packet_ready());
        assert_eq!(link.flushes(), 2);
    }

    #[test]
    fn test_send_failures() {
        let mut link = MemoryLink::new(MacAddr6::nil());
        link.write_start(LinkTarget::Broadcast, 0x0800);

        link.set_fail_send(true);
        assert!(matches!(link.send().unwrap_err().kind(), ErrorKind::Io(..)));

        link.set_fail_send(false);
        link.set_link_up(false);
        assert!(matches!(link.send().unwrap_err().kind(), ErrorKind::LinkDown));

        link.set_link_up(true);
        link.send().unwrap();
        assert_eq!(link.take_sent().len(), 1);
        assert!(link.sent().is_empty());
    }
}
