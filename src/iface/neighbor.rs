//! Neighbor resolution contract
//!
//! The ARP engine (cache, request and retry state) lives outside this crate.
//! The transmit pipeline asks it for link addresses and the event loop feeds
//! it ARP frames and a periodic maintenance tick.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use crate::error::Error;
use crate::iface::link::LinkLayer;

/// Maps IPv4 addresses to link addresses.
pub trait NeighborResolver {
    /// Reset the cache.
    fn init(&mut self);

    /// Cached link address of `addr`, if resolved.
    fn lookup(&mut self, addr: Ipv4Addr) -> Option<MacAddr6>;

    /// Start resolving `addr`.
    fn request<L>(&mut self, addr: Ipv4Addr, link: &mut L) -> Result<(), Error>
    where
        L: ?Sized + LinkLayer;

    /// Handle a received ARP frame. The link's read pointer sits at the first
    /// byte after the link header.
    fn process<L>(&mut self, link: &mut L)
    where
        L: ?Sized + LinkLayer;

    /// Periodic cache aging and request retries.
    fn update<L>(&mut self, link: &mut L)
    where
        L: ?Sized + LinkLayer;
}

/// A resolver with a fixed table.
///
/// Unknown addresses are remembered as requested; nothing is ever sent.
#[derive(Debug, Default)]
pub struct StaticNeighbors {
    table: HashMap<Ipv4Addr, MacAddr6>,
    requested: Vec<Ipv4Addr>,
    lookups: Vec<Ipv4Addr>,
    updates: usize,
}

impl StaticNeighbors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, addr: Ipv4Addr, mac: MacAddr6) {
        self.table.insert(addr, mac);
    }

    /// Addresses requested because they were not in the table.
    pub fn requested(&self) -> &[Ipv4Addr] {
        &self.requested
    }

    /// Distinct addresses looked up, in order of first lookup.
    pub fn lookups(&self) -> &[Ipv4Addr] {
        &self.lookups
    }

    /// Number of maintenance ticks received.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl NeighborResolver for StaticNeighbors {
    fn init(&mut self) {
        self.requested.clear();
        self.lookups.clear();
        self.updates = 0;
    }

    fn lookup(&mut self, addr: Ipv4Addr) -> Option<MacAddr6> {
        if !self.lookups.contains(&addr) {
            self.lookups.push(addr);
        }

        self.table.get(&addr).copied()
    }

    fn request<L>(&mut self, addr: Ipv4Addr, _: &mut L) -> Result<(), Error>
    where
        L: ?Sized + LinkLayer,
    {
        if !self.requested.contains(&addr) {
            tracing::debug!(%addr, "no static neighbor entry");
            self.requested.push(addr);
        }

        Ok(())
    }

    fn process<L>(&mut self, _: &mut L)
    where
        L: ?Sized + LinkLayer,
    {
        tracing::trace!("ignoring arp frame");
    }

    fn update<L>(&mut self, _: &mut L)
    where
        L: ?Sized + LinkLayer,
    {
        self.updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_log_is_bounded() {
        let mut neighbors = StaticNeighbors::new();
        let peer = Ipv4Addr::new(10, 0, 0, 9);
        let other = Ipv4Addr::new(10, 0, 0, 7);
        neighbors.insert(peer, MacAddr6::new(0x02, 0, 0, 0, 0, 0x09));

        for _ in 0..10_000 {
            assert!(neighbors.lookup(peer).is_some());
            assert!(neighbors.lookup(other).is_none());
        }

        assert_eq!(neighbors.lookups(), &[peer, other]);
    }

    #[test]
    fn test_init_clears_logs() {
        let mut neighbors = StaticNeighbors::new();
        neighbors.lookup(Ipv4Addr::new(10, 0, 0, 9));
        neighbors.init();
        assert!(neighbors.lookups().is_empty());
        assert_eq!(neighbors.updates(), 0);
    }
}
