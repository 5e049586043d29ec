//! Internet checksum (RFC 1071)
//!
//! Algorithm: sum data in 16-bit big-endian words, fold carries back into the
//! low 16 bits, and take the one's complement. A region that already holds
//! its own checksum field verifies to zero.

use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder};

/// Fold a wide accumulator into 16 bits with end-around carry.
fn fold(mut sum: u64) -> u16 {
    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    sum as u16
}

/// One's complement sum of `data` starting from `seed`, folded but not
/// complemented.
///
/// An odd trailing byte is padded with zero, so only the last of several
/// chained ranges may have odd length.
pub fn sum(data: &[u8], seed: u16) -> u16 {
    let mut sum = seed as u64;

    let mut chunks = data.chunks_exact(2);

    for chunk in &mut chunks {
        sum += BigEndian::read_u16(chunk) as u64;
    }

    if let [last] = chunks.remainder() {
        sum += (*last as u64) << 8;
    }

    fold(sum)
}

/// Calculate the Internet checksum of `data`.
pub fn checksum(data: &[u8]) -> u16 {
    !sum(data, 0)
}

/// Calculate the Internet checksum of `data`, continuing from a partial sum
/// such as [`pseudo_header_sum`].
pub fn checksum_with_seed(data: &[u8], seed: u16) -> u16 {
    !sum(data, seed)
}

/// Partial sum over the 12-byte transport pseudo-header.
///
/// Layout: source(4) + destination(4) + zero(1) + protocol(1) + length(2).
pub fn pseudo_header_sum(protocol: u8, length: u16, src: Ipv4Addr, dst: Ipv4Addr) -> u16 {
    let mut pseudo = [0u8; 12];
    pseudo[0..4].copy_from_slice(&src.octets());
    pseudo[4..8].copy_from_slice(&dst.octets());
    pseudo[9] = protocol;
    BigEndian::write_u16(&mut pseudo[10..12], length);
    sum(&pseudo, 0)
}
