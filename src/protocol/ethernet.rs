//! Ethernet frame parsing and construction

use super::{EtherType, HeaderCursor, MacAddr, VlanTag};
use crate::error::ParseError;

/// Ethernet header size without VLAN tag
pub const HEADER_SIZE: usize = 14;
/// 802.1Q tag size (TCI + inner EtherType)
pub const VLAN_TAG_SIZE: usize = 4;
/// Maximum Ethernet frame size (without FCS, with VLAN tag)
pub const MAX_FRAME_SIZE: usize = 1522;

/// Parsed Ethernet header (zero-copy reference)
#[derive(Debug, Clone, Copy)]
pub struct EthernetHeader<'a> {
    buffer: &'a [u8],
    vlan_tag: Option<VlanTag>,
    ethertype: u16,
}

impl<'a> EthernetHeader<'a> {
    pub fn dst_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[0..6]);
        MacAddr(mac)
    }

    pub fn src_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[6..12]);
        MacAddr(mac)
    }

    /// EtherType of the payload (inner type when VLAN tagged)
    pub fn ethertype(&self) -> u16 {
        self.ethertype
    }

    pub fn vlan_tag(&self) -> Option<VlanTag> {
        self.vlan_tag
    }
}

/// Parse the Ethernet header and at most one 802.1Q tag.
pub fn parse_ethernet<'a>(cursor: &mut HeaderCursor<'a>) -> Result<EthernetHeader<'a>, ParseError> {
    let buffer = cursor.take("ethernet", HEADER_SIZE)?;
    let outer = u16::from_be_bytes([buffer[12], buffer[13]]);

    if outer != EtherType::Vlan as u16 {
        return Ok(EthernetHeader {
            buffer,
            vlan_tag: None,
            ethertype: outer,
        });
    }

    let tag = cursor.take("vlan", VLAN_TAG_SIZE)?;
    Ok(EthernetHeader {
        buffer,
        vlan_tag: Some(VlanTag::from_tci(u16::from_be_bytes([tag[0], tag[1]]))),
        ethertype: u16::from_be_bytes([tag[2], tag[3]]),
    })
}

/// Builder for Ethernet frames. Fields may be set in any order.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    dst_mac: MacAddr,
    src_mac: MacAddr,
    vlan_tag: Option<VlanTag>,
    ethertype: u16,
    payload: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            dst_mac: MacAddr::BROADCAST,
            src_mac: MacAddr::ZERO,
            vlan_tag: None,
            ethertype: EtherType::Ipv4 as u16,
            payload: Vec::new(),
        }
    }

    pub fn dst_mac(mut self, mac: MacAddr) -> Self {
        self.dst_mac = mac;
        self
    }

    pub fn src_mac(mut self, mac: MacAddr) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn vlan_tag(mut self, tag: VlanTag) -> Self {
        self.vlan_tag = Some(tag);
        self
    }

    /// Payload EtherType (inner type when tagged)
    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.ethertype = ethertype;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let tag_len = if self.vlan_tag.is_some() { VLAN_TAG_SIZE } else { 0 };
        let mut buffer = Vec::with_capacity(HEADER_SIZE + tag_len + self.payload.len());

        buffer.extend_from_slice(&self.dst_mac.0);
        buffer.extend_from_slice(&self.src_mac.0);
        if let Some(tag) = self.vlan_tag {
            buffer.extend_from_slice(&(EtherType::Vlan as u16).to_be_bytes());
            buffer.extend_from_slice(&tag.tci().to_be_bytes());
        }
        buffer.extend_from_slice(&self.ethertype.to_be_bytes());
        buffer.extend_from_slice(&self.payload);
        buffer
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
