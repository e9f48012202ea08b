//! Configuration management
//!
//! Handles config.toml: logging, classifier settings and the initial
//! whitelist and port rules.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Parse configuration from TOML text
pub fn parse(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataplane::RedirectMode;
    use crate::policy::ProtocolMask;
    use crate::telemetry::{LogFormat, LogLevel};

    const SAMPLE: &str = r#"
[logging]
level = "debug"
format = "compact"

[classifier]
interface = "eth0"
redirect = "arrival"
event_level = "warn"
event_capacity = 1024

[[whitelist]]
address = "10.0.0.5"
protocols = ["tcp"]

[[whitelist]]
address = "2001:db8::1"
protocols = ["all"]

[[ports]]
port = 8080
protocols = ["tcp", "udp"]
"#;

    #[test]
    fn test_parse_full() {
        let config = parse(SAMPLE).unwrap();

        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.classifier.interface.as_deref(), Some("eth0"));
        assert_eq!(config.classifier.redirect_mode(), RedirectMode::ArrivalQueue);
        assert_eq!(config.classifier.event_threshold().unwrap(), Some(LogLevel::Warn));
        assert_eq!(config.classifier.event_capacity, 1024);
        assert_eq!(config.whitelist.len(), 2);
        assert_eq!(config.ports.len(), 1);

        let set = config.policy_set().unwrap();
        assert_eq!(set.ipv4.get(&[10, 0, 0, 5]), Some(&ProtocolMask::TCP));
        assert_eq!(set.ipv6.len(), 1);
        assert_eq!(set.ports.get(&8080).map(|m| m.bits()), Some(0x03));
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = parse("").unwrap();

        assert_eq!(config.logging.level, None);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.classifier.redirect_mode(), RedirectMode::Fixed(0));
        assert_eq!(config.classifier.event_threshold().unwrap(), None);
        assert_eq!(config.classifier.event_capacity, 4096);
        assert!(config.whitelist.is_empty());
    }

    #[test]
    fn test_parse_fixed_queue() {
        let config = parse("[classifier]\nredirect = \"fixed\"\nredirect_queue = 3\n").unwrap();
        assert_eq!(config.classifier.redirect_mode(), RedirectMode::Fixed(3));
    }

    #[test]
    fn test_parse_rejects_bad_address() {
        let err = parse("[[whitelist]]\naddress = \"10.0.0\"\nprotocols = [\"tcp\"]\n");
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_policy_set_unknown_protocol() {
        let config = parse("[[ports]]\nport = 22\nprotocols = [\"sctp\"]\n").unwrap();
        assert!(config.policy_set().is_err());
    }

    #[test]
    fn test_policy_set_later_duplicate_wins() {
        let config = parse(
            "[[ports]]\nport = 22\nprotocols = [\"tcp\"]\n[[ports]]\nport = 22\nprotocols = [\"udp\"]\n",
        )
        .unwrap();
        let set = config.policy_set().unwrap();
        assert_eq!(set.ports.get(&22), Some(&ProtocolMask::UDP));
    }
}
