//! IPv4 transmit pipeline
//!
//! Sending is split in two because the total length and header checksum are
//! only known after the payload has been written:
//!
//! 1. [`Interface::start`] picks the next hop, writes the link header and a
//!    template IPv4 header, and returns a [`TxFrame`].
//! 2. The caller writes the payload through [`Interface::link_mut`].
//! 3. [`Interface::send`] patches length and checksum in place and transmits.

use std::net::Ipv4Addr;

use crate::clock::Clock;
use crate::error::{Error, ErrorKind};
use crate::iface::interface::Interface;
use crate::iface::link::{ether_type, LinkLayer, LinkTarget};
use crate::iface::neighbor::NeighborResolver;
use crate::network::addr;
use crate::network::checksum::pseudo_header_sum;
use crate::network::icmp::IcmpHandler;
use crate::network::ipv4::{
    protocol, Ipv4Header, CHECKSUM_OFFSET, IPV4_HEADER_LEN, TOTAL_LEN_OFFSET,
};
use crate::transport::tcp::TcpHandler;

/// An outbound datagram whose header has been written but not finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a started datagram is only transmitted by `Interface::send`"]
pub struct TxFrame {
    offset: usize,
    target: LinkTarget,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    protocol: u8,
}

impl TxFrame {
    /// Offset of the IPv4 header inside the outbound frame.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Resolved next hop.
    pub fn target(&self) -> LinkTarget {
        self.target
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.src_addr
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        self.dst_addr
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// Pseudo-header sum for a transport payload of `len` bytes, the seed of
    /// the transport checksum.
    pub fn pseudo_header_sum(&self, len: u16) -> u16 {
        pseudo_header_sum(self.protocol, len, self.src_addr, self.dst_addr)
    }
}

impl<L, N, T, I, C> Interface<L, N, T, I, C>
where
    L: LinkLayer,
    N: NeighborResolver,
    T: TcpHandler,
    I: IcmpHandler,
    C: Clock,
{
    /// Begin a datagram to `dst`.
    ///
    /// Fails with [`ErrorKind::ResolutionPending`] when the next hop is not
    /// in the neighbor cache; a resolution request has then been issued and
    /// the caller should retry later. Nothing is queued.
    /// Off-subnet destinations fail with [`ErrorKind::NoRoute`] when no
    /// gateway is configured.
    pub fn start(&mut self, dst: Ipv4Addr, protocol: u8) -> Result<TxFrame, Error> {
        let config = self.config;

        if !config.is_configured() && !protocol::permits_sourceless(protocol) {
            return Err(Error::new(ErrorKind::Unconfigured));
        }

        if config.address.is_loopback() {
            return Err(Error::new(ErrorKind::LoopbackSource));
        }

        let target = if addr::is_broadcast(dst, config.address, config.netmask) {
            LinkTarget::Broadcast
        } else {
            let next_hop = if config.is_local(dst) {
                dst
            } else if config.gateway != addr::UNSPECIFIED {
                config.gateway
            } else {
                return Err(Error::new(ErrorKind::NoRoute { destination: dst }));
            };

            match self.neighbors.lookup(next_hop) {
                Some(mac) => LinkTarget::Unicast(mac),
                None => {
                    self.neighbors.request(next_hop, &mut self.link)?;
                    tracing::debug!(%dst, %next_hop, "next hop unresolved");
                    return Err(Error::new(ErrorKind::ResolutionPending { target: next_hop }));
                }
            }
        };

        self.link.write_start(target, ether_type::IPV4);
        let offset = self.link.write_pointer();

        Ipv4Header::template(protocol, config.address, dst).emit(&mut self.link);

        tracing::trace!(%dst, ?target, protocol, "started datagram");

        Ok(TxFrame {
            offset,
            target,
            src_addr: config.address,
            dst_addr: dst,
            protocol,
        })
    }

    /// Finalize and transmit a datagram carrying `payload_len` bytes written
    /// after [`start`](Self::start).
    pub fn send(&mut self, frame: TxFrame, payload_len: usize) -> Result<(), Error> {
        let total_len = IPV4_HEADER_LEN
            .checked_add(payload_len)
            .and_then(|len| u16::try_from(len).ok())
            .ok_or_else(|| Error::new(ErrorKind::PayloadTooLarge { len: payload_len }))?;

        self.link
            .insert(&total_len.to_be_bytes(), frame.offset + TOTAL_LEN_OFFSET)?;

        let checksum = self.link.tx_checksum(frame.offset, IPV4_HEADER_LEN, 0)?;
        self.link
            .insert(&checksum.to_be_bytes(), frame.offset + CHECKSUM_OFFSET)?;

        self.link.send()?;

        tracing::trace!(dst = %frame.dst_addr, total_len, "sent datagram");
        Ok(())
    }

    /// Start, write `payload` and send in one go.
    pub fn send_datagram(
        &mut self,
        dst: Ipv4Addr,
        protocol: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        let frame = self.start(dst, protocol)?;
        self.link.write_bytes(payload);
        self.send(frame, payload.len())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use macaddr::MacAddr6;

    use super::*;
    use crate::clock::TickClock;
    use crate::config::DeviceConfig;
    use crate::iface::ipv4::receive_datagram;
    use crate::iface::ipv4::tests::{config, Recorder, HOST, PEER};
    use crate::iface::link::ETHERNET_HEADER_LEN;
    use crate::iface::memory::MemoryLink;
    use crate::iface::neighbor::StaticNeighbors;
    use crate::network::checksum::{checksum, checksum_with_seed};

    const PEER_MAC: MacAddr6 = MacAddr6::new(0x02, 0, 0, 0, 0, 0x09);
    const GATEWAY_MAC: MacAddr6 = MacAddr6::new(0x02, 0, 0, 0, 0, 0x01);
    const OWN_MAC: MacAddr6 = MacAddr6::new(0x02, 0, 0, 0, 0, 0x05);

    type TestInterface = Interface<MemoryLink, StaticNeighbors, Recorder, Recorder, TickClock>;

    fn interface(config: DeviceConfig) -> TestInterface {
        let mut neighbors = StaticNeighbors::new();
        neighbors.insert(PEER, PEER_MAC);
        neighbors.insert(Ipv4Addr::new(10, 0, 0, 1), GATEWAY_MAC);

        Interface::new(
            config,
            MemoryLink::new(OWN_MAC),
            neighbors,
            Recorder::default(),
            Recorder::default(),
            TickClock::new(),
        )
    }

    #[test]
    fn test_local_destination_resolved_directly() {
        let mut iface = interface(config());
        iface.send_datagram(PEER, protocol::UDP, &[1, 2, 3]).unwrap();

        assert_eq!(iface.neighbors().lookups(), &[PEER]);
        let sent = iface.link_mut().take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0][0..6], PEER_MAC.as_bytes());
    }

    #[test]
    fn test_remote_destination_resolved_via_gateway() {
        let mut iface = interface(config());
        let dst = Ipv4Addr::new(8, 8, 8, 8);
        let frame = iface.start(dst, protocol::TCP).unwrap();

        assert_eq!(iface.neighbors().lookups(), &[Ipv4Addr::new(10, 0, 0, 1)]);
        assert_eq!(frame.target(), LinkTarget::Unicast(GATEWAY_MAC));
        assert_eq!(frame.dst_addr(), dst);
        assert_eq!(frame.src_addr(), HOST);
    }

    #[test]
    fn test_broadcast_needs_no_resolution() {
        let mut iface = interface(config());

        for dst in [addr::LIMITED_BROADCAST, Ipv4Addr::new(10, 0, 0, 255)] {
            let frame = iface.start(dst, protocol::UDP).unwrap();
            assert_eq!(frame.target(), LinkTarget::Broadcast);
            iface.send(frame, 0).unwrap();
        }

        assert!(iface.neighbors().lookups().is_empty());
        for frame in iface.link_mut().take_sent() {
            assert_eq!(&frame[0..6], &[0xff; 6]);
        }
    }

    #[test]
    fn test_unresolved_next_hop_is_pending() {
        let mut iface = interface(config());
        let dst = Ipv4Addr::new(10, 0, 0, 77);
        let err = iface.start(dst, protocol::TCP).unwrap_err();

        assert!(err.is_pending());
        assert!(matches!(
            err.kind(),
            ErrorKind::ResolutionPending { target } if *target == dst
        ));
        assert_eq!(iface.neighbors().requested(), &[dst]);
        assert!(iface.link_mut().sent().is_empty());
    }

    #[test]
    fn test_remote_destination_without_gateway() {
        let no_gateway = DeviceConfig::new(
            HOST,
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::UNSPECIFIED,
        );
        let mut iface = interface(no_gateway);
        let dst = Ipv4Addr::new(8, 8, 8, 8);

        let err = iface.start(dst, protocol::UDP).unwrap_err();
        assert!(!err.is_pending());
        assert!(matches!(
            err.kind(),
            ErrorKind::NoRoute { destination } if *destination == dst
        ));
        assert!(iface.neighbors().requested().is_empty());
        assert!(iface.neighbors().lookups().is_empty());

        // Local destinations still resolve.
        iface.start(PEER, protocol::UDP).unwrap();
    }

    #[test]
    fn test_point_to_point_host_is_not_broadcast() {
        let host_route = DeviceConfig::new(
            PEER,
            Ipv4Addr::new(255, 255, 255, 255),
            Ipv4Addr::new(10, 0, 0, 1),
        );
        let mut iface = interface(host_route);

        let frame = iface.start(PEER, protocol::UDP).unwrap();
        assert_eq!(frame.target(), LinkTarget::Unicast(PEER_MAC));
    }

    #[test]
    fn test_repeated_sends_keep_lookup_log_bounded() {
        let mut iface = interface(config());

        for _ in 0..1000 {
            iface.send_datagram(PEER, protocol::UDP, &[0]).unwrap();
        }

        assert_eq!(iface.neighbors().lookups(), &[PEER]);
        assert_eq!(iface.link_mut().take_sent().len(), 1000);
    }

    #[test]
    fn test_unconfigured_host() {
        let mut iface = interface(DeviceConfig::default());

        let err = iface.start(PEER, protocol::TCP).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Unconfigured));

        // Sourceless UDP, as used to acquire an address.
        let frame = iface.start(addr::LIMITED_BROADCAST, protocol::UDP).unwrap();
        assert_eq!(frame.src_addr(), Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_loopback_host() {
        let loopback = DeviceConfig::new(
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::new(255, 0, 0, 0),
            Ipv4Addr::UNSPECIFIED,
        );
        let mut iface = interface(loopback);
        let err = iface.start(PEER, protocol::UDP).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LoopbackSource));
    }

    #[test]
    fn test_start_send_round_trip() {
        let mut iface = interface(config());
        let payload = [0xabu8; 33];

        let frame = iface.start(PEER, protocol::UDP).unwrap();
        assert_eq!(frame.offset(), ETHERNET_HEADER_LEN);
        iface.link_mut().write_bytes(&payload);
        iface.send(frame, payload.len()).unwrap();

        let sent = iface.link_mut().take_sent();
        let ip = &sent[0][ETHERNET_HEADER_LEN..];

        assert_eq!(&ip[2..4], &(20u16 + 33).to_be_bytes());
        assert_eq!(checksum(&ip[..IPV4_HEADER_LEN]), 0);
        assert_eq!(&ip[6..8], &[0x40, 0x00]);
        assert_eq!(ip[9], protocol::UDP);
        assert_eq!(&ip[12..16], &HOST.octets());
        assert_eq!(&ip[16..20], &PEER.octets());
        assert_eq!(&ip[IPV4_HEADER_LEN..], &payload);
    }

    #[test]
    fn test_sent_datagram_is_received() {
        // Loop a TCP segment from the peer's point of view back through the
        // receive pipeline.
        let peer_config = DeviceConfig::new(
            PEER,
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::UNSPECIFIED,
        );
        let mut neighbors = StaticNeighbors::new();
        neighbors.insert(HOST, OWN_MAC);
        let mut peer = Interface::new(
            peer_config,
            MemoryLink::new(PEER_MAC),
            neighbors,
            Recorder::default(),
            Recorder::default(),
            TickClock::new(),
        );

        let mut segment = crate::iface::ipv4::tests::tcp_syn(PEER, HOST);
        segment[16..18].copy_from_slice(&[0, 0]);

        let frame = peer.start(HOST, protocol::TCP).unwrap();
        let seed = frame.pseudo_header_sum(segment.len() as u16);
        let sum = checksum_with_seed(&segment, seed);
        segment[16..18].copy_from_slice(&sum.to_be_bytes());
        peer.link_mut().write_bytes(&segment);
        peer.send(frame, segment.len()).unwrap();

        let sent = peer.link_mut().take_sent();
        let mut link = MemoryLink::new(OWN_MAC);
        link.push_frame(sent[0][ETHERNET_HEADER_LEN..].to_vec());
        link.next_packet();

        let mut tcp = Recorder::default();
        let mut icmp = Recorder::default();
        let header = receive_datagram(&config(), &mut link, &mut tcp, &mut icmp).unwrap();

        assert_eq!(header.total_len, 40);
        assert_eq!(tcp.tcp.len(), 1);
        assert_eq!(tcp.tcp[0].0, PEER);
    }

    #[test]
    fn test_send_failure_is_reported() {
        let mut iface = interface(config());
        iface.link_mut().set_fail_send(true);
        let err = iface.send_datagram(PEER, protocol::UDP, &[0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(..)));
    }

    #[test]
    fn test_payload_too_large() {
        let mut iface = interface(config());
        let frame = iface.start(PEER, protocol::UDP).unwrap();
        let err = iface.send(frame, 65_516).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::PayloadTooLarge { len: 65_516 }));
    }
}
