//! TCP protocol - RFC 793
//!
//! Only the fixed header is read; options are never touched.

use super::HeaderCursor;
use crate::error::ParseError;

/// Minimum TCP header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

/// TCP protocol number
pub const PROTOCOL_NUMBER: u8 = 6;

/// Parsed TCP header (zero-copy reference to the fixed 20 bytes)
#[derive(Debug, Clone, Copy)]
pub struct TcpHeader<'a> {
    buffer: &'a [u8],
}

impl<'a> TcpHeader<'a> {
    /// Source port (offset 0-1)
    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    /// Destination port (offset 2-3)
    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Data offset (header length in 32-bit words)
    pub fn data_offset(&self) -> u8 {
        self.buffer[12] >> 4
    }

    /// Raw flags byte (offset 13)
    pub fn flags(&self) -> u8 {
        self.buffer[13]
    }
}

/// Parse the fixed TCP header.
pub fn parse_tcp<'a>(cursor: &mut HeaderCursor<'a>) -> Result<TcpHeader<'a>, ParseError> {
    let buffer = cursor.take("tcp", MIN_HEADER_SIZE)?;
    let header = TcpHeader { buffer };

    if (header.data_offset() as usize) * 4 < MIN_HEADER_SIZE {
        return Err(ParseError::Malformed {
            header: "tcp",
            reason: "data offset below 5",
        });
    }

    Ok(header)
}

/// Builder for TCP segments (checksum left zero)
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    flags: u8,
    payload: Vec<u8>,
}

impl TcpBuilder {
    pub fn new() -> Self {
        Self {
            src_port: 0,
            dst_port: 0,
            // SYN
            flags: 0x02,
            payload: Vec::new(),
        }
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buffer = vec![0u8; MIN_HEADER_SIZE + self.payload.len()];

        buffer[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        buffer[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        // data_offset = 5 (20 bytes)
        buffer[12] = 0x50;
        buffer[13] = self.flags;
        // window = 65535
        buffer[14..16].copy_from_slice(&0xFFFFu16.to_be_bytes());
        buffer[MIN_HEADER_SIZE..].copy_from_slice(&self.payload);

        buffer
    }
}

impl Default for TcpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tcp_segment() -> Vec<u8> {
        // TCP segment: src_port=12345, dst_port=80, seq=1, ack=0, flags=SYN
        vec![
            0x30, 0x39, // src_port = 12345
            0x00, 0x50, // dst_port = 80
            0x00, 0x00, 0x00, 0x01, // seq = 1
            0x00, 0x00, 0x00, 0x00, // ack = 0
            0x50, // data_offset = 5 (20 bytes), reserved = 0
            0x02, // flags = SYN
            0x72, 0x10, // window = 29200
            0x00, 0x00, // checksum
            0x00, 0x00, // urgent_ptr = 0
        ]
    }

    #[test]
    fn test_tcp_header_parse() {
        let seg = make_tcp_segment();
        let mut cursor = HeaderCursor::new(&seg);
        let hdr = parse_tcp(&mut cursor).unwrap();

        assert_eq!(hdr.src_port(), 12345);
        assert_eq!(hdr.dst_port(), 80);
        assert_eq!(hdr.data_offset(), 5);
        assert_eq!(hdr.flags(), 0x02);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_tcp_header_too_short() {
        let seg = make_tcp_segment();
        let mut cursor = HeaderCursor::new(&seg[..19]);
        assert!(matches!(
            parse_tcp(&mut cursor),
            Err(ParseError::Truncated { header: "tcp", .. })
        ));
    }

    #[test]
    fn test_tcp_data_offset_too_small() {
        let mut seg = make_tcp_segment();
        seg[12] = 0x40;
        let mut cursor = HeaderCursor::new(&seg);
        assert!(matches!(
            parse_tcp(&mut cursor),
            Err(ParseError::Malformed { header: "tcp", .. })
        ));
    }

    #[test]
    fn test_tcp_builder() {
        let seg = TcpBuilder::new().src_port(40000).dst_port(8080).build();
        let mut cursor = HeaderCursor::new(&seg);
        let hdr = parse_tcp(&mut cursor).unwrap();
        assert_eq!(hdr.src_port(), 40000);
        assert_eq!(hdr.dst_port(), 8080);
        assert_eq!(hdr.flags(), 0x02);
    }
}
