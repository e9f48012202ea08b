//! IPv6 protocol - RFC 8200
//!
//! Base header plus a bounded walk over the extension header chain to find
//! the upper-layer protocol.

use super::HeaderCursor;
use crate::error::ParseError;
use std::net::Ipv6Addr;

/// IPv6 header size (fixed, unlike IPv4)
pub const HEADER_SIZE: usize = 40;

/// Upper bound on extension headers walked before giving up
pub const MAX_EXTENSION_HEADERS: usize = 6;

/// Fragment extension header size (fixed)
pub const FRAGMENT_HEADER_SIZE: usize = 8;

/// Next header values that matter to the chain walk
pub mod next_header {
    pub const HOP_BY_HOP: u8 = 0;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const ESP: u8 = 50;
    pub const AUTH: u8 = 51;
    pub const ICMPV6: u8 = 58;
    pub const NO_NEXT_HEADER: u8 = 59;
    pub const DEST_OPTS: u8 = 60;
    pub const MOBILITY: u8 = 135;
    pub const HIP: u8 = 139;
    pub const SHIM6: u8 = 140;
    pub const EXPERIMENT_1: u8 = 253;
    pub const EXPERIMENT_2: u8 = 254;
}

/// How a next header value is treated by the chain walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainLink {
    /// Options-style header: length in 8-octet units, not counting the first 8
    Options,
    /// Fragment header: fixed 8 bytes
    Fragment,
    /// Authentication header: length in 4-octet units, minus 2
    Auth,
    /// Extension header this parser refuses to walk
    Unsupported,
    /// Anything else ends the chain
    UpperLayer,
}

fn chain_link(value: u8) -> ChainLink {
    use self::next_header::*;
    match value {
        HOP_BY_HOP | ROUTING | DEST_OPTS => ChainLink::Options,
        FRAGMENT => ChainLink::Fragment,
        AUTH => ChainLink::Auth,
        MOBILITY | HIP | SHIM6 | EXPERIMENT_1 | EXPERIMENT_2 => ChainLink::Unsupported,
        _ => ChainLink::UpperLayer,
    }
}

/// Parsed IPv6 base header (zero-copy reference)
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Header<'a> {
    buffer: &'a [u8],
}

impl<'a> Ipv6Header<'a> {
    /// Version (always 6)
    pub fn version(&self) -> u8 {
        self.buffer[0] >> 4
    }

    /// Payload Length (does not include header)
    pub fn payload_length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// Next Header of the base header (may be an extension header)
    pub fn next_header(&self) -> u8 {
        self.buffer[6]
    }

    pub fn hop_limit(&self) -> u8 {
        self.buffer[7]
    }

    /// Source address octets in network byte order
    pub fn src_octets(&self) -> [u8; 16] {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.buffer[8..24]);
        octets
    }

    /// Destination address octets in network byte order
    pub fn dst_octets(&self) -> [u8; 16] {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.buffer[24..40]);
        octets
    }

    pub fn src_addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.src_octets())
    }

    pub fn dst_addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.dst_octets())
    }
}

/// IPv6 header plus what the extension chain resolved to
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Packet<'a> {
    pub header: Ipv6Header<'a>,
    /// Upper-layer protocol at the end of the chain
    pub protocol: u8,
    /// Number of extension headers walked
    pub extensions: usize,
    /// Set when a Fragment header had a non-zero offset
    pub later_fragment: bool,
}

/// Parse the IPv6 base header and walk its extension chain.
///
/// On success the cursor sits on the upper-layer header.
pub fn parse_ipv6<'a>(cursor: &mut HeaderCursor<'a>) -> Result<Ipv6Packet<'a>, ParseError> {
    let buffer = cursor.take("ipv6", HEADER_SIZE)?;
    if buffer[0] >> 4 != 6 {
        return Err(ParseError::Malformed {
            header: "ipv6",
            reason: "version is not 6",
        });
    }

    let header = Ipv6Header { buffer };
    let mut next = header.next_header();
    let mut later_fragment = false;

    for depth in 0..=MAX_EXTENSION_HEADERS {
        let link = chain_link(next);
        if link == ChainLink::UpperLayer {
            return Ok(Ipv6Packet {
                header,
                protocol: next,
                extensions: depth,
                later_fragment,
            });
        }
        if link == ChainLink::Unsupported || depth == MAX_EXTENSION_HEADERS {
            break;
        }

        let current = next;
        match link {
            ChainLink::Fragment => {
                let frag = cursor.take("ipv6 fragment", FRAGMENT_HEADER_SIZE)?;
                let offset = u16::from_be_bytes([frag[2], frag[3]]) >> 3;
                later_fragment |= offset != 0;
                next = frag[0];
            }
            ChainLink::Options | ChainLink::Auth => {
                let prefix = cursor.peek("ipv6 extension", 2)?;
                let len = if link == ChainLink::Auth {
                    (prefix[1] as usize + 2) * 4
                } else {
                    (prefix[1] as usize + 1) * 8
                };
                next = prefix[0];
                cursor.skip("ipv6 extension", len)?;
            }
            ChainLink::Unsupported | ChainLink::UpperLayer => {
                return Err(ParseError::UnsupportedExtension {
                    next_header: current,
                })
            }
        }
    }

    Err(ParseError::UnsupportedExtension { next_header: next })
}

/// Builder for constructing IPv6 packets
#[derive(Debug, Clone)]
pub struct Ipv6Builder {
    next_header: u8,
    hop_limit: u8,
    src_addr: Ipv6Addr,
    dst_addr: Ipv6Addr,
    payload: Vec<u8>,
}

impl Ipv6Builder {
    pub fn new() -> Self {
        Self {
            next_header: 0,
            hop_limit: 64,
            src_addr: Ipv6Addr::UNSPECIFIED,
            dst_addr: Ipv6Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }

    pub fn next_header(mut self, nh: u8) -> Self {
        self.next_header = nh;
        self
    }

    pub fn hop_limit(mut self, hl: u8) -> Self {
        self.hop_limit = hl;
        self
    }

    pub fn src_addr(mut self, addr: Ipv6Addr) -> Self {
        self.src_addr = addr;
        self
    }

    pub fn dst_addr(mut self, addr: Ipv6Addr) -> Self {
        self.dst_addr = addr;
        self
    }

    /// Payload after the base header, extension headers included
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let payload_length = self.payload.len() as u16;
        let mut buffer = vec![0u8; HEADER_SIZE + self.payload.len()];

        // Version (6), traffic class and flow label left zero
        buffer[0] = 0x60;
        buffer[4..6].copy_from_slice(&payload_length.to_be_bytes());
        buffer[6] = self.next_header;
        buffer[7] = self.hop_limit;
        buffer[8..24].copy_from_slice(&self.src_addr.octets());
        buffer[24..40].copy_from_slice(&self.dst_addr.octets());
        buffer[HEADER_SIZE..].copy_from_slice(&self.payload);

        buffer
    }
}

impl Default for Ipv6Builder {
    fn default() -> Self {
        Self::new()
    }
}
