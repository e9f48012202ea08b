//! Protocol permission bitmask

use crate::protocol::ip_proto;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

/// Set of transport protocols a policy entry permits.
///
/// Only the low four bits name protocols; `ALL` sets every bit so that it
/// intersects any non-empty translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProtocolMask(u8);

impl ProtocolMask {
    pub const NONE: ProtocolMask = ProtocolMask(0x00);
    pub const TCP: ProtocolMask = ProtocolMask(0x01);
    pub const UDP: ProtocolMask = ProtocolMask(0x02);
    pub const ICMP: ProtocolMask = ProtocolMask(0x04);
    pub const ICMPV6: ProtocolMask = ProtocolMask(0x08);
    pub const ALL: ProtocolMask = ProtocolMask(0xFF);

    pub const fn from_bits(bits: u8) -> Self {
        ProtocolMask(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Translate an IP protocol number. Unclassified protocols map to `NONE`
    /// and therefore never satisfy a policy.
    pub const fn from_protocol(protocol: u8) -> Self {
        match protocol {
            ip_proto::TCP => Self::TCP,
            ip_proto::UDP => Self::UDP,
            ip_proto::ICMP => Self::ICMP,
            ip_proto::ICMPV6 => Self::ICMPV6,
            _ => Self::NONE,
        }
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if the two masks share at least one bit.
    pub const fn intersects(self, other: ProtocolMask) -> bool {
        self.0 & other.0 != 0
    }

    /// True if this entry permits the given IP protocol number.
    pub const fn permits(self, protocol: u8) -> bool {
        self.intersects(Self::from_protocol(protocol))
    }

    /// Build a mask from protocol names, e.g. `["tcp", "udp"]`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, UnknownProtocol> {
        names
            .iter()
            .try_fold(Self::NONE, |acc, name| Ok(acc | name.as_ref().parse()?))
    }
}

impl BitOr for ProtocolMask {
    type Output = ProtocolMask;

    fn bitor(self, rhs: ProtocolMask) -> ProtocolMask {
        ProtocolMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ProtocolMask {
    fn bitor_assign(&mut self, rhs: ProtocolMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ProtocolMask {
    /// Writes directly to the formatter; event messages on the packet path
    /// use this and must not allocate.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return f.write_str("all");
        }

        let mut first = true;
        for (bit, name) in [
            (Self::TCP, "tcp"),
            (Self::UDP, "udp"),
            (Self::ICMP, "icmp"),
            (Self::ICMPV6, "icmpv6"),
        ] {
            if self.intersects(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }

        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// A protocol name that has no mask bit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol '{0}'")]
pub struct UnknownProtocol(pub String);

impl FromStr for ProtocolMask {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Self::TCP),
            "udp" => Ok(Self::UDP),
            "icmp" => Ok(Self::ICMP),
            "icmpv6" => Ok(Self::ICMPV6),
            "all" => Ok(Self::ALL),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        assert_eq!(ProtocolMask::from_protocol(6), ProtocolMask::TCP);
        assert_eq!(ProtocolMask::from_protocol(17), ProtocolMask::UDP);
        assert_eq!(ProtocolMask::from_protocol(1), ProtocolMask::ICMP);
        assert_eq!(ProtocolMask::from_protocol(58), ProtocolMask::ICMPV6);
        assert_eq!(ProtocolMask::from_protocol(47), ProtocolMask::NONE);
        assert_eq!(ProtocolMask::from_protocol(132), ProtocolMask::NONE);
    }

    #[test]
    fn test_unclassified_never_permitted() {
        assert!(!ProtocolMask::ALL.permits(47));
        assert!(!ProtocolMask::ALL.permits(0));
        assert!(ProtocolMask::ALL.permits(58));
    }

    #[test]
    fn test_permits() {
        let mask = ProtocolMask::TCP | ProtocolMask::ICMP;
        assert!(mask.permits(6));
        assert!(mask.permits(1));
        assert!(!mask.permits(17));
        assert_eq!(mask.bits(), 0x05);
    }

    #[test]
    fn test_from_names() {
        let mask = ProtocolMask::from_names(&["tcp", "UDP"]).unwrap();
        assert_eq!(mask.bits(), 0x03);

        let all = ProtocolMask::from_names(&["all"]).unwrap();
        assert_eq!(all, ProtocolMask::ALL);

        let empty: [&str; 0] = [];
        assert!(ProtocolMask::from_names(&empty).unwrap().is_empty());

        let err = ProtocolMask::from_names(&["tcp", "sctp"]).unwrap_err();
        assert_eq!(err, UnknownProtocol("sctp".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!((ProtocolMask::TCP | ProtocolMask::UDP).to_string(), "tcp|udp");
        assert_eq!(ProtocolMask::ALL.to_string(), "all");
        assert_eq!(ProtocolMask::NONE.to_string(), "none");
        assert_eq!(
            (ProtocolMask::TCP | ProtocolMask::ICMP).to_string(),
            "tcp|icmp"
        );
    }
}
