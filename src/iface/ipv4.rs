//! IPv4 receive pipeline
//!
//! One pass per datagram: verify, load, validate, classify, then hand the
//! payload to ICMP or TCP. Every rejection is local; the caller releases the
//! frame whatever the outcome.

use crate::config::DeviceConfig;
use crate::error::{Error, ErrorKind};
use crate::iface::link::LinkLayer;
use crate::network::addr::{self, AddressClass};
use crate::network::icmp::IcmpHandler;
use crate::network::ipv4::{protocol, Ipv4Header, IPV4_HEADER_LEN, MIN_IHL};
use crate::transport::tcp::TcpHandler;

/// Process the IPv4 datagram at the link's read pointer.
///
/// Returns the loaded header once the datagram has been dispatched or
/// discarded. TCP segments failing their checksum or addressed to a
/// broadcast or the unspecified address are dropped silently, as are
/// datagrams of unknown protocols.
pub fn receive_datagram<L, T, I>(
    config: &DeviceConfig,
    link: &mut L,
    tcp: &mut T,
    icmp: &mut I,
) -> Result<Ipv4Header, Error>
where
    L: ?Sized + LinkLayer,
    T: ?Sized + TcpHandler,
    I: ?Sized + IcmpHandler,
{
    if link.rx_checksum(IPV4_HEADER_LEN, 0)? != 0 {
        return Err(Error::new(ErrorKind::HeaderChecksum));
    }

    let mut bytes = [0u8; IPV4_HEADER_LEN];
    link.read_block(&mut bytes)?;
    let header = Ipv4Header::from_bytes(&bytes);

    if header.version != 4 {
        return Err(Error::new(ErrorKind::WrongVersion {
            actual: header.version,
        }));
    }

    if header.src_addr == addr::LIMITED_BROADCAST {
        return Err(Error::new(ErrorKind::SpoofedSource));
    }

    let class = addr::classify(header.dst_addr, config.address, config.netmask);

    if !class.is_for_us() {
        return Err(Error::new(ErrorKind::DestinationMismatch {
            destination: header.dst_addr,
        }));
    }

    if header.ihl < MIN_IHL {
        return Err(Error::new(ErrorKind::MalformedHeader { ihl: header.ihl }));
    }

    if header.ihl > MIN_IHL {
        let len = header.options_len();
        link.dump(len)?;
        return Err(Error::new(ErrorKind::OptionsUnsupported { len }));
    }

    let Some(payload_len) = header.payload_len() else {
        return Err(Error::new(ErrorKind::TotalLengthTooShort {
            total: header.total_len,
            header: header.header_len(),
        }));
    };

    tracing::trace!(
        src = %header.src_addr,
        dst = %header.dst_addr,
        ?class,
        protocol = header.protocol,
        payload_len,
        "received datagram"
    );

    match header.protocol {
        protocol::ICMP => {
            if class == AddressClass::Unspecified {
                tracing::debug!(src = %header.src_addr, "dropping icmp to unspecified address");
                return discard(link, header, payload_len);
            }

            if link.rx_checksum(payload_len as usize, 0)? != 0 {
                return Err(Error::new(ErrorKind::IcmpChecksum));
            }

            icmp.receive(&header, link);
        }
        protocol::TCP => {
            let seed = header.pseudo_header_sum(payload_len);

            match link.rx_checksum(payload_len as usize, seed) {
                Ok(0) => {}
                Ok(_) => {
                    tracing::debug!(
                        src = %header.src_addr,
                        "dropping tcp segment with bad checksum"
                    );
                    return discard(link, header, payload_len);
                }
                Err(error) => {
                    // Frame shorter than the total length; the caller flushes the rest.
                    tracing::debug!(
                        src = %header.src_addr,
                        %error,
                        "dropping truncated tcp segment"
                    );
                    return Ok(header);
                }
            }

            if header.dst_addr == addr::LIMITED_BROADCAST || header.dst_addr == addr::UNSPECIFIED {
                tracing::debug!(dst = %header.dst_addr, "dropping tcp segment to non-unicast address");
                return discard(link, header, payload_len);
            }

            tcp.recv(header.src_addr, payload_len, link);
        }
        other => {
            tracing::trace!(protocol = other, "discarding unsupported protocol");
            return discard(link, header, payload_len);
        }
    }

    Ok(header)
}

fn discard<L>(link: &mut L, header: Ipv4Header, payload_len: u16) -> Result<Ipv4Header, Error>
where
    L: ?Sized + LinkLayer,
{
    link.dump(payload_len as usize)?;
    Ok(header)
}
