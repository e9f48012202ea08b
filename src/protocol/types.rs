//! Link-layer and protocol-number types shared by the parsers

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);
    pub const ZERO: MacAddr = MacAddr([0; 6]);
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// EtherTypes the classifier dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
    Vlan = 0x8100,
    Ipv6 = 0x86DD,
}

impl EtherType {
    pub fn from_u16(value: u16) -> Option<Self> {
        [Self::Ipv4, Self::Arp, Self::Vlan, Self::Ipv6]
            .into_iter()
            .find(|t| *t as u16 == value)
    }
}

/// 802.1Q tag control information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    tci: u16,
}

impl VlanTag {
    /// Tag with priority 0 and the given VLAN ID (12 bits)
    pub fn new(vid: u16) -> Self {
        Self { tci: vid & 0x0FFF }
    }

    pub fn from_tci(tci: u16) -> Self {
        Self { tci }
    }

    pub fn tci(&self) -> u16 {
        self.tci
    }

    pub fn vid(&self) -> u16 {
        self.tci & 0x0FFF
    }

    pub fn priority(&self) -> u8 {
        (self.tci >> 13) as u8
    }
}

/// IP protocol numbers the classifier knows by name
pub mod ip_proto {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ICMPV6: u8 = 58;
}

/// Protocol name used in event messages.
pub fn protocol_name(protocol: u8) -> &'static str {
    match protocol {
        ip_proto::TCP => "tcp",
        ip_proto::UDP => "udp",
        ip_proto::ICMP => "icmp",
        ip_proto::ICMPV6 => "icmpv6",
        _ => "unclassified",
    }
}
