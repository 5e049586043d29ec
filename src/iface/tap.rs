//! Link layer over a Linux TAP device
//!
//! The device is opened non-blocking so that polling never stalls the event
//! loop. Root privileges (or `CAP_NET_ADMIN`) are needed to create it.

use std::io;

use macaddr::MacAddr6;
use tun_tap::{Iface, Mode};

use crate::error::Error;
use crate::iface::link::{FrameBuffer, LinkLayer, LinkTarget, MAX_FRAME_LEN};

/// A [`LinkLayer`] reading and writing Ethernet frames on a TAP device.
pub struct TapLink {
    iface: Iface,
    buffer: FrameBuffer,
    pending: Option<Vec<u8>>,
    up: bool,
}

impl TapLink {
    /// Open the TAP device `name`, using `mac` as the source of outbound
    /// frames.
    pub fn open(name: &str, mac: MacAddr6) -> Result<Self, Error> {
        let iface = Iface::without_packet_info(name, Mode::Tap)?;
        iface.set_non_blocking()?;

        tracing::info!(name = iface.name(), %mac, "opened tap device");

        Ok(Self {
            iface,
            buffer: FrameBuffer::new(mac),
            pending: None,
            up: true,
        })
    }

    /// Name the kernel assigned to the device.
    pub fn name(&self) -> &str {
        self.iface.name()
    }

    fn receive(&mut self) -> Result<Option<Vec<u8>>, io::Error> {
        let mut buf = vec![0u8; MAX_FRAME_LEN];

        match self.iface.recv(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl LinkLayer for TapLink {
    fn event_handler(&mut self) {
        if self.pending.is_some() {
            return;
        }

        match self.receive() {
            Ok(frame) => {
                self.pending = frame;
                self.up = true;
            }
            Err(error) => {
                tracing::warn!(%error, "tap receive failed");
                self.up = false;
            }
        }
    }

    fn link_up(&mut self) -> bool {
        self.up
    }

    fn packet_ready(&mut self) -> bool {
        self.pending.is_some()
    }

    fn next_packet(&mut self) {
        match self.pending.take() {
            Some(frame) => self.buffer.load(frame),
            None => self.buffer.clear(),
        }
    }

    fn flush(&mut self) {
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
        let frame = self.buffer.outbound()?;
        self.iface.send(frame)?;
        Ok(())
    }
}
