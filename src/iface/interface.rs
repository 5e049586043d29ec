//! Network interface and event loop
//!
//! An [`Interface`] owns the device configuration and every collaborator of
//! the IPv4 core. [`Interface::poll`] is the cooperative scheduler: call it
//! repeatedly from the outer driver, it never blocks.

use std::net::Ipv4Addr;

use crate::clock::Clock;
use crate::config::DeviceConfig;
use crate::error::Error;
use crate::iface::ipv4::receive_datagram;
use crate::iface::link::{ether_type, ether_type_of, LinkLayer, ETHERNET_HEADER_LEN};
use crate::iface::neighbor::NeighborResolver;
use crate::network::icmp::IcmpHandler;
use crate::network::ipv4::Ipv4Header;
use crate::transport::tcp::TcpHandler;

/// Time units between neighbor cache maintenance runs.
pub const ARP_INTERVAL: u32 = 10;

/// Most TCP timeout runs made in one poll when catching up on missed units.
pub const MAX_TCP_CATCHUP: u32 = 8;

/// What a single [`Interface::poll`] did with the received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// No frame was waiting.
    Nothing,
    /// An ARP frame was handed to neighbor resolution.
    Arp,
    /// An IPv4 datagram passed the receive pipeline.
    Ipv4(Ipv4Header),
    /// The frame was dropped.
    Dropped,
}

/// Network interface for packet processing
pub struct Interface<L, N, T, I, C> {
    pub(crate) config: DeviceConfig,
    pub(crate) link: L,
    pub(crate) neighbors: N,
    pub(crate) tcp: T,
    pub(crate) icmp: I,
    clock: C,
    last_arp: u32,
    last_tcp: u32,
    link_up: bool,
}

impl<L, N, T, I, C> Interface<L, N, T, I, C>
where
    L: LinkLayer,
    N: NeighborResolver,
    T: TcpHandler,
    I: IcmpHandler,
    C: Clock,
{
    /// Create a new interface and initialize its collaborators.
    pub fn new(config: DeviceConfig, link: L, neighbors: N, tcp: T, icmp: I, clock: C) -> Self {
        let now = clock.now();

        let mut iface = Interface {
            config,
            link,
            neighbors,
            tcp,
            icmp,
            clock,
            last_arp: now,
            last_tcp: now,
            link_up: false,
        };

        iface.init();
        iface
    }

    /// Reset neighbor and TCP state and restart the periodic timers.
    pub fn init(&mut self) {
        self.neighbors.init();
        self.tcp.init();

        let now = self.clock.now();
        self.last_arp = now;
        self.last_tcp = now;

        tracing::debug!(
            address = %self.config.address,
            netmask = %self.config.netmask,
            gateway = %self.config.gateway,
            "interface initialized"
        );
    }

    /// Run one scheduler tick.
    ///
    /// Services the link, processes at most one received frame, and runs
    /// whatever periodic maintenance is due.
    pub fn poll(&mut self) -> Received {
        self.link.event_handler();
        self.track_link_state();

        let received = if self.link.packet_ready() {
            self.link.next_packet();
            let received = self.dispatch_frame();
            self.link.flush();
            received
        } else {
            Received::Nothing
        };

        self.run_timers();
        received
    }

    fn track_link_state(&mut self) {
        let up = self.link.link_up();

        if up != self.link_up {
            if up {
                tracing::info!("link up");
            } else {
                tracing::warn!("link down");
            }

            self.link_up = up;
        }
    }

    fn dispatch_frame(&mut self) -> Received {
        let mut header = [0u8; ETHERNET_HEADER_LEN];

        if let Err(error) = self.link.read_block(&mut header) {
            tracing::debug!(%error, "dropping runt frame");
            return Received::Dropped;
        }

        match ether_type_of(&header) {
            ether_type::ARP => {
                self.neighbors.process(&mut self.link);
                Received::Arp
            }
            ether_type::IPV4 => match self.receive() {
                Ok(header) => Received::Ipv4(header),
                Err(error) => {
                    tracing::debug!(%error, "dropping datagram");
                    Received::Dropped
                }
            },
            other => {
                tracing::trace!(ether_type = other, "ignoring frame");
                Received::Dropped
            }
        }
    }

    /// Run the IPv4 receive pipeline on the datagram at the link's read
    /// pointer.
    pub fn receive(&mut self) -> Result<Ipv4Header, Error> {
        receive_datagram(&self.config, &mut self.link, &mut self.tcp, &mut self.icmp)
    }

    fn run_timers(&mut self) {
        let now = self.clock.now();

        if now.wrapping_sub(self.last_arp) >= ARP_INTERVAL {
            self.last_arp = now;
            self.neighbors.update(&mut self.link);
        }

        let elapsed = now.wrapping_sub(self.last_tcp);

        if elapsed > 0 {
            let runs = elapsed.min(MAX_TCP_CATCHUP);

            if elapsed > MAX_TCP_CATCHUP {
                tracing::debug!(elapsed, "skipping missed tcp timer runs");
            }

            for _ in 0..runs {
                self.tcp.update();
            }

            self.last_tcp = now;
        }
    }
}

impl<L, N, T, I, C> Interface<L, N, T, I, C> {
    /// Current device configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Replace the device configuration.
    pub fn set_config(&mut self, config: DeviceConfig) {
        self.config = config;
    }

    /// Local IPv4 address
    pub fn address(&self) -> Ipv4Addr {
        self.config.address
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Access the link, e.g. to write a payload between
    /// [`start`](Self::start) and [`send`](Self::send).
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn neighbors(&self) -> &N {
        &self.neighbors
    }

    pub fn neighbors_mut(&mut self) -> &mut N {
        &mut self.neighbors
    }

    pub fn tcp(&self) -> &T {
        &self.tcp
    }

    pub fn tcp_mut(&mut self) -> &mut T {
        &mut self.tcp
    }

    pub fn icmp(&self) -> &I {
        &self.icmp
    }

    pub fn icmp_mut(&mut self) -> &mut I {
        &mut self.icmp
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
