//! IPv4 protocol - RFC 791
//!
//! Only the fields the classifier needs are exposed. Options are skipped
//! using IHL but never interpreted.

use super::HeaderCursor;
use crate::error::ParseError;
use std::net::Ipv4Addr;

/// Minimum IPv4 header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

/// Parsed IPv4 header (zero-copy reference, options included)
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
}

impl<'a> Ipv4Header<'a> {
    pub fn version(&self) -> u8 {
        self.buffer[0] >> 4
    }

    pub fn ihl(&self) -> u8 {
        self.buffer[0] & 0x0F
    }

    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn fragment_offset(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6] & 0x1F, self.buffer[7]])
    }

    /// Non-first fragments carry no transport header.
    pub fn is_later_fragment(&self) -> bool {
        self.fragment_offset() > 0
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[9]
    }

    /// Source address octets in network byte order
    pub fn src_octets(&self) -> [u8; 4] {
        [
            self.buffer[12],
            self.buffer[13],
            self.buffer[14],
            self.buffer[15],
        ]
    }

    /// Destination address octets in network byte order
    pub fn dst_octets(&self) -> [u8; 4] {
        [
            self.buffer[16],
            self.buffer[17],
            self.buffer[18],
            self.buffer[19],
        ]
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src_octets())
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dst_octets())
    }

    pub fn header_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Parse an IPv4 header, leaving the cursor at the transport header.
pub fn parse_ipv4<'a>(cursor: &mut HeaderCursor<'a>) -> Result<Ipv4Header<'a>, ParseError> {
    let fixed = cursor.peek("ipv4", MIN_HEADER_SIZE)?;

    if fixed[0] >> 4 != 4 {
        return Err(ParseError::Malformed {
            header: "ipv4",
            reason: "version is not 4",
        });
    }

    let header_len = (fixed[0] & 0x0F) as usize * 4;
    if header_len < MIN_HEADER_SIZE {
        return Err(ParseError::Malformed {
            header: "ipv4",
            reason: "IHL below 5",
        });
    }

    let buffer = cursor.take("ipv4", header_len)?;
    Ok(Ipv4Header { buffer })
}

/// Calculate IPv4 header checksum
pub fn checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for i in (0..header.len()).step_by(2) {
        let word = if i + 1 < header.len() {
            u16::from_be_bytes([header[i], header[i + 1]])
        } else {
            u16::from_be_bytes([header[i], 0])
        };
        sum = sum.wrapping_add(word as u32);
    }

    // Fold 32-bit sum to 16 bits
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Builder for constructing IPv4 packets
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    fragment_offset: u16,
    ttl: u8,
    protocol: u8,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    payload: Vec<u8>,
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self {
            fragment_offset: 0,
            ttl: 64,
            protocol: 0,
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }

    /// Fragment offset in 8-byte units
    pub fn fragment_offset(mut self, offset: u16) -> Self {
        self.fragment_offset = offset & 0x1FFF;
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn src_addr(mut self, addr: Ipv4Addr) -> Self {
        self.src_addr = addr;
        self
    }

    pub fn dst_addr(mut self, addr: Ipv4Addr) -> Self {
        self.dst_addr = addr;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = (MIN_HEADER_SIZE + self.payload.len()) as u16;
        let mut buffer = vec![0u8; MIN_HEADER_SIZE + self.payload.len()];

        // Version (4) + IHL (5 = 20 bytes, no options)
        buffer[0] = 0x45;

        buffer[2..4].copy_from_slice(&total_length.to_be_bytes());

        // Flags (DF unless fragmented) + fragment offset
        let flags_frag = if self.fragment_offset > 0 {
            self.fragment_offset
        } else {
            0x4000
        };
        buffer[6..8].copy_from_slice(&flags_frag.to_be_bytes());

        buffer[8] = self.ttl;
        buffer[9] = self.protocol;
        buffer[12..16].copy_from_slice(&self.src_addr.octets());
        buffer[16..20].copy_from_slice(&self.dst_addr.octets());
        buffer[MIN_HEADER_SIZE..].copy_from_slice(&self.payload);

        let sum = checksum(&buffer[..MIN_HEADER_SIZE]);
        buffer[10..12].copy_from_slice(&sum.to_be_bytes());

        buffer
    }
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self::new()
    }
}
