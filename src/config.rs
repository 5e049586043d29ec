//! Device configuration
//!
//! The host address, subnet mask and default gateway. The pipelines only
//! read it.
//!
//! A configuration can be loaded from toml:
//!
//! ```toml
//! address = "10.0.0.5"
//! # Either a netmask or a prefix length.
//! prefix = 24
//! gateway = "10.0.0.1"
//! ```

use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::error::{Error, ErrorKind};
use crate::network::addr;

/// Address configuration of the single interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Local IPv4 address
    pub address: Ipv4Addr,
    /// Network mask
    pub netmask: Ipv4Addr,
    /// Default gateway
    pub gateway: Ipv4Addr,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    address: Ipv4Addr,
    netmask: Option<Ipv4Addr>,
    prefix: Option<u8>,
    #[serde(default = "unspecified")]
    gateway: Ipv4Addr,
}

fn unspecified() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

impl DeviceConfig {
    pub fn new(address: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        Self {
            address,
            netmask,
            gateway,
        }
    }

    /// Parse an `a.b.c.d/prefix` address.
    pub fn from_cidr(cidr: &str, gateway: Ipv4Addr) -> Result<Self, Error> {
        let invalid = || Error::new(ErrorKind::InvalidCidr(cidr.to_owned()));

        let (address, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
        let address = address.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        let netmask = prefix
            .parse::<u8>()
            .ok()
            .and_then(netmask_from_prefix)
            .ok_or_else(invalid)?;

        Ok(Self::new(address, netmask, gateway))
    }

    /// Parse a toml configuration document.
    pub fn from_toml(input: &str) -> Result<Self, Error> {
        let file: ConfigFile = toml::from_str(input)?;

        let netmask = match (file.netmask, file.prefix) {
            (Some(netmask), None) => netmask,
            (None, Some(prefix)) => netmask_from_prefix(prefix).ok_or_else(|| {
                Error::new(ErrorKind::InvalidCidr(format!("{}/{prefix}", file.address)))
            })?,
            _ => {
                return Err(Error::new(ErrorKind::InvalidCidr(format!(
                    "{}: expected exactly one of `netmask` or `prefix`",
                    file.address
                ))));
            }
        };

        Ok(Self::new(file.address, netmask, file.gateway))
    }

    /// Whether the host has an address.
    pub fn is_configured(&self) -> bool {
        !self.address.is_unspecified()
    }

    /// Check if address is in the same network
    pub fn is_local(&self, addr: Ipv4Addr) -> bool {
        addr::is_same_subnet(addr, self.address, self.netmask)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new(
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
        )
    }
}

fn netmask_from_prefix(prefix: u8) -> Option<Ipv4Addr> {
    match prefix {
        0 => Some(Ipv4Addr::UNSPECIFIED),
        1..=32 => Some(Ipv4Addr::from(u32::MAX << (32 - prefix))),
        _ => None,
    }
}
