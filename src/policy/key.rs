//! Keys into the policy tables

use crate::error::TableKind;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Peer address in network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKey {
    V4([u8; 4]),
    V6([u8; 16]),
}

/// Lookup key for either policy role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKey {
    /// Client role: peer source address
    Address(AddressKey),
    /// Listener role: local destination port
    Port(u16),
}

impl PolicyKey {
    pub fn table(&self) -> TableKind {
        match self {
            PolicyKey::Address(AddressKey::V4(_)) => TableKind::Ipv4Addresses,
            PolicyKey::Address(AddressKey::V6(_)) => TableKind::Ipv6Addresses,
            PolicyKey::Port(_) => TableKind::Ports,
        }
    }
}

impl From<IpAddr> for AddressKey {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => AddressKey::V4(v4.octets()),
            IpAddr::V6(v6) => AddressKey::V6(v6.octets()),
        }
    }
}

impl From<IpAddr> for PolicyKey {
    fn from(addr: IpAddr) -> Self {
        PolicyKey::Address(addr.into())
    }
}

impl From<Ipv4Addr> for PolicyKey {
    fn from(addr: Ipv4Addr) -> Self {
        PolicyKey::Address(AddressKey::V4(addr.octets()))
    }
}

impl From<Ipv6Addr> for PolicyKey {
    fn from(addr: Ipv6Addr) -> Self {
        PolicyKey::Address(AddressKey::V6(addr.octets()))
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKey::Address(AddressKey::V4(o)) => write!(f, "{}", Ipv4Addr::from(*o)),
            PolicyKey::Address(AddressKey::V6(o)) => write!(f, "{}", Ipv6Addr::from(*o)),
            PolicyKey::Port(port) => write!(f, "port {}", port),
        }
    }
}
