//! Run the IPv4 core on a TAP device
//!
//! Receives frames on a TAP interface, runs them through the receive
//! pipeline and logs the ICMP messages and TCP segments that arrive.
//!
//! To run this example:
//!
//! ```sh
//! cargo run --example tap_loop -- --address 10.0.0.5/24 --gateway 10.0.0.1
//! ```
//!
//! Root/sudo privileges are required to create the TAP device. Configure
//! the host side with `ip addr add 10.0.0.1/24 dev tap0 && ip link set up
//! dev tap0`, add a static ARP entry for 10.0.0.5, and ping it.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use macaddr::MacAddr6;
use toy_ipcore::iface::TapLink;
use toy_ipcore::network::{IcmpHeader, Ipv4Header};
use toy_ipcore::transport::TcpHeader;
use toy_ipcore::{
    DeviceConfig, IcmpHandler, Interface, LinkLayer, Received, StaticNeighbors, SystemClock,
    TcpHandler,
};

#[derive(Parser)]
struct Opts {
    /// Name of the TAP device.
    #[arg(long, default_value = "tap0")]
    tap: String,
    /// Host address in CIDR notation.
    #[arg(long, default_value = "10.0.0.5/24")]
    address: String,
    /// Default gateway.
    #[arg(long, default_value = "10.0.0.1")]
    gateway: Ipv4Addr,
    /// Configuration file, overriding `--address` and `--gateway`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Hardware address of the interface.
    #[arg(long, default_value = "02:00:00:00:00:05")]
    mac: MacAddr6,
}

/// Logs ICMP messages.
struct IcmpLog;

impl IcmpHandler for IcmpLog {
    fn receive<L>(&mut self, header: &Ipv4Header, link: &mut L)
    where
        L: ?Sized + LinkLayer,
    {
        match IcmpHeader::read(link) {
            Ok(icmp) if icmp.is_echo_request() => tracing::info!(
                src = %header.src_addr,
                id = icmp.identifier(),
                seq = icmp.sequence(),
                "echo request"
            ),
            Ok(icmp) => tracing::info!(src = %header.src_addr, ty = icmp.msg_type, "icmp"),
            Err(error) => tracing::warn!(%error, "short icmp message"),
        }
    }
}

/// Logs TCP segments.
struct TcpLog;

impl TcpHandler for TcpLog {
    fn init(&mut self) {}

    fn recv<L>(&mut self, source: Ipv4Addr, len: u16, link: &mut L)
    where
        L: ?Sized + LinkLayer,
    {
        match TcpHeader::read(link) {
            Ok(tcp) => tracing::info!(
                %source,
                src_port = tcp.src_port,
                dst_port = tcp.dst_port,
                syn = tcp.is_syn(),
                len,
                "tcp segment"
            ),
            Err(error) => tracing::warn!(%error, "short tcp segment"),
        }
    }

    fn update(&mut self) {}
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();

    let config = match &opts.config {
        Some(path) => {
            let input = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            DeviceConfig::from_toml(&input).context("parsing configuration")?
        }
        None => DeviceConfig::from_cidr(&opts.address, opts.gateway)?,
    };

    let link = TapLink::open(&opts.tap, opts.mac).context("opening tap device")?;
    tracing::info!(tap = link.name(), address = %config.address, "starting");

    let mut iface = Interface::new(
        config,
        link,
        StaticNeighbors::new(),
        TcpLog,
        IcmpLog,
        SystemClock::new(),
    );

    loop {
        if iface.poll() == Received::Nothing {
            thread::sleep(Duration::from_millis(1));
        }
    }
}
