//! Error type shared by the receive and transmit pipelines, the link layers
//! and configuration loading.

use std::fmt;
use std::io;
use std::net::Ipv4Addr;

/// An error raised while handling a datagram or talking to the link layer.
///
/// Per-datagram errors are never fatal: the event loop logs them and drops
/// the frame. [`ErrorKind::ResolutionPending`] is not a failure at all, it
/// tells the caller to retry the send once the neighbor answers.
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// The kind of error.
    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Whether this is the caller-retry signal of a pending neighbor lookup.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self.kind, ErrorKind::ResolutionPending { .. })
    }
}

impl fmt::Debug for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self::new(ErrorKind::Io(error))
    }
}

impl From<toml::de::Error> for Error {
    #[inline]
    fn from(error: toml::de::Error) -> Self {
        Self::new(ErrorKind::Toml(error))
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The IPv4 header checksum does not verify.
    HeaderChecksum,
    /// The version nibble is not 4.
    WrongVersion { actual: u8 },
    /// The source address is the limited broadcast address.
    SpoofedSource,
    /// The datagram is not addressed to this host.
    DestinationMismatch { destination: Ipv4Addr },
    /// The header length is below five words.
    MalformedHeader { ihl: u8 },
    /// The total length does not cover the header.
    TotalLengthTooShort { total: u16, header: usize },
    /// The header carries options, which are skipped and not processed.
    OptionsUnsupported { len: usize },
    /// The ICMP checksum does not verify.
    IcmpChecksum,
    /// The host has no usable address.
    Unconfigured,
    /// The host address is in the loopback block.
    LoopbackSource,
    /// The destination is off-subnet and no gateway is configured.
    NoRoute { destination: Ipv4Addr },
    /// The next hop is not resolved yet; a request has been sent.
    ResolutionPending { target: Ipv4Addr },
    /// The payload would overflow the 16-bit total length.
    PayloadTooLarge { len: usize },
    /// The frame is larger than the link can carry.
    FrameTooLarge { len: usize, max: usize },
    /// A read ran past the end of the received frame.
    Underrun { needed: usize, available: usize },
    /// A patch or checksum range lies outside the outbound frame.
    OutOfRange { offset: usize, len: usize },
    /// The link is down.
    LinkDown,
    /// The device failed.
    Io(io::Error),
    /// A CIDR string could not be parsed.
    InvalidCidr(String),
    /// A configuration document could not be parsed.
    Toml(toml::de::Error),
}

impl fmt::Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderChecksum => write!(f, "IPv4 header checksum mismatch"),
            Self::WrongVersion { actual } => {
                write!(f, "IP version mismatch: expected 4, got {actual}")
            }
            Self::SpoofedSource => write!(f, "Source address is the limited broadcast address"),
            Self::DestinationMismatch { destination } => {
                write!(f, "Datagram for {destination} is not for this host")
            }
            Self::MalformedHeader { ihl } => write!(f, "Header length {ihl} below minimum of 5"),
            Self::TotalLengthTooShort { total, header } => {
                write!(f, "Total length {total} shorter than header length {header}")
            }
            Self::OptionsUnsupported { len } => {
                write!(f, "Skipped {len} bytes of unsupported IPv4 options")
            }
            Self::IcmpChecksum => write!(f, "ICMP checksum mismatch"),
            Self::Unconfigured => write!(f, "Host has no IPv4 address"),
            Self::LoopbackSource => write!(f, "Host address is a loopback address"),
            Self::NoRoute { destination } => write!(f, "No route to {destination}"),
            Self::ResolutionPending { target } => {
                write!(f, "Link address of {target} is being resolved")
            }
            Self::PayloadTooLarge { len } => write!(f, "Payload of {len} bytes is too large"),
            Self::FrameTooLarge { len, max } => {
                write!(f, "Frame of {len} bytes exceeds maximum of {max}")
            }
            Self::Underrun { needed, available } => {
                write!(f, "Read of {needed} bytes with only {available} available")
            }
            Self::OutOfRange { offset, len } => {
                write!(f, "Range {offset}+{len} outside of outbound frame")
            }
            Self::LinkDown => write!(f, "Link is down"),
            Self::Io(..) => write!(f, "Device I/O failed"),
            Self::InvalidCidr(cidr) => write!(f, "Invalid CIDR address `{cidr}`"),
            Self::Toml(..) => write!(f, "Failed to parse configuration"),
        }
    }
}

impl std::error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            ErrorKind::Toml(e) => Some(e),
            _ => None,
        }
    }
}
