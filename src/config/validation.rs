//! Configuration validation

use super::Config;
use crate::dataplane::MAX_QUEUES;
use crate::policy::{ProtocolMask, MAX_IPV4_ENTRIES, MAX_IPV6_ENTRIES, MAX_PORT_RULES};
use crate::telemetry::LogLevel;
use std::collections::HashSet;
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_logging(config, &mut result);
    validate_classifier(config, &mut result);
    validate_whitelist(config, &mut result);
    validate_ports(config, &mut result);

    result
}

fn validate_logging(config: &Config, result: &mut ValidationResult) {
    if let Some(level) = &config.logging.level {
        if level.trim().parse::<tracing::Level>().is_err() {
            result.warn(format!(
                "logging.level: unknown level '{}', using info",
                level
            ));
        }
    }
}

fn validate_classifier(config: &Config, result: &mut ValidationResult) {
    let classifier = &config.classifier;

    if classifier.redirect_queue as usize >= MAX_QUEUES {
        result.error(format!(
            "classifier.redirect_queue: {} out of range (0-{})",
            classifier.redirect_queue,
            MAX_QUEUES - 1
        ));
    }

    if classifier.event_capacity == 0 {
        result.error("classifier.event_capacity: must be at least 1");
    }

    if let Some(level) = &classifier.event_level {
        if level.parse::<LogLevel>().is_err() {
            result.error(format!(
                "classifier.event_level: unknown level '{}' (debug, info, warn, error)",
                level
            ));
        }
    }

    if classifier.interface.is_none() {
        result.warn("classifier.interface: not specified, `run` requires --interface");
    }
}

/// Unknown names are errors, an empty list a warning.
fn validate_protocols(what: &str, protocols: &[String], result: &mut ValidationResult) {
    match ProtocolMask::from_names(protocols) {
        Ok(mask) if mask.is_empty() => {
            result.warn(format!(
                "{}: no protocols listed, matching traffic will be dropped",
                what
            ));
        }
        Ok(_) => {}
        Err(e) => result.error(format!("{}: {}", what, e)),
    }
}

fn validate_whitelist(config: &Config, result: &mut ValidationResult) {
    let mut seen = HashSet::new();
    let mut v4 = 0usize;
    let mut v6 = 0usize;

    for (i, entry) in config.whitelist.iter().enumerate() {
        let what = format!("whitelist[{}] ({})", i, entry.address);
        validate_protocols(&what, &entry.protocols, result);

        if !seen.insert(entry.address) {
            result.warn(format!("{}: duplicate address, last entry wins", what));
            continue;
        }
        match entry.address {
            IpAddr::V4(_) => v4 += 1,
            IpAddr::V6(_) => v6 += 1,
        }
    }

    if v4 > MAX_IPV4_ENTRIES {
        result.error(format!(
            "whitelist: {} IPv4 addresses exceed capacity {}",
            v4, MAX_IPV4_ENTRIES
        ));
    }
    if v6 > MAX_IPV6_ENTRIES {
        result.error(format!(
            "whitelist: {} IPv6 addresses exceed capacity {}",
            v6, MAX_IPV6_ENTRIES
        ));
    }
}

fn validate_ports(config: &Config, result: &mut ValidationResult) {
    let mut seen = HashSet::new();

    for (i, rule) in config.ports.iter().enumerate() {
        let what = format!("ports[{}] (port {})", i, rule.port);
        validate_protocols(&what, &rule.protocols, result);

        if !seen.insert(rule.port) {
            result.warn(format!("{}: duplicate port, last entry wins", what));
        }
        if let Ok(mask) = ProtocolMask::from_names(&rule.protocols) {
            if mask != ProtocolMask::ALL
                && mask.intersects(ProtocolMask::ICMP | ProtocolMask::ICMPV6)
            {
                result.warn(format!(
                    "{}: ICMP never reaches port rules, only tcp/udp apply",
                    what
                ));
            }
        }
    }

    if seen.len() > MAX_PORT_RULES {
        result.error(format!(
            "ports: {} rules exceed capacity {}",
            seen.len(),
            MAX_PORT_RULES
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierConfig, PortRuleConfig, WhitelistEntry};
    use std::net::Ipv4Addr;

    fn make_config() -> Config {
        Config {
            classifier: ClassifierConfig {
                interface: Some("eth0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn port(port: u16, protocols: &[&str]) -> PortRuleConfig {
        PortRuleConfig {
            port,
            protocols: protocols.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn client(address: IpAddr, protocols: &[&str]) -> WhitelistEntry {
        WhitelistEntry {
            address,
            protocols: protocols.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_valid_minimal_config() {
        let config = make_config();
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_interface_warning() {
        let mut config = make_config();
        config.classifier.interface = None;
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("interface")));
    }

    #[test]
    fn test_redirect_queue_out_of_range() {
        let mut config = make_config();
        config.classifier.redirect_queue = 64;
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("redirect_queue")));
    }

    #[test]
    fn test_zero_event_capacity() {
        let mut config = make_config();
        config.classifier.event_capacity = 0;
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("event_capacity")));
    }

    #[test]
    fn test_unknown_event_level() {
        let mut config = make_config();
        config.classifier.event_level = Some("loud".to_string());
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("loud")));
    }

    #[test]
    fn test_unknown_logging_level_warns() {
        let mut config = make_config();
        config.logging.level = Some("chatty".to_string());
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("chatty")));
    }

    #[test]
    fn test_unknown_protocol() {
        let mut config = make_config();
        config.ports.push(port(22, &["tcp", "sctp"]));
        let result = validate(&config);
        assert!(result.has_errors());
        assert!(result.errors.iter().any(|e| e.contains("sctp")));
    }

    #[test]
    fn test_empty_protocols_warning() {
        let mut config = make_config();
        config
            .whitelist
            .push(client(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), &[]));
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("dropped")));
    }

    #[test]
    fn test_duplicates_warn() {
        let mut config = make_config();
        let addr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
        config.whitelist.push(client(addr, &["tcp"]));
        config.whitelist.push(client(addr, &["udp"]));
        config.ports.push(port(80, &["tcp"]));
        config.ports.push(port(80, &["tcp"]));

        let result = validate(&config);
        assert!(!result.has_errors());
        assert_eq!(
            result
                .warnings
                .iter()
                .filter(|w| w.contains("duplicate"))
                .count(),
            2
        );
    }

    #[test]
    fn test_icmp_port_rule_warning() {
        let mut config = make_config();
        config.ports.push(port(0, &["icmp"]));
        let result = validate(&config);
        assert!(result.warnings.iter().any(|w| w.contains("ICMP")));
    }

    #[test]
    fn test_port_capacity() {
        let mut config = make_config();
        for p in 0..=MAX_PORT_RULES as u16 {
            config.ports.push(port(p + 1, &["tcp"]));
        }
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("exceed capacity")));
    }

    #[test]
    fn test_ipv4_capacity() {
        let mut config = make_config();
        for i in 0..=MAX_IPV4_ENTRIES as u32 {
            config
                .whitelist
                .push(client(IpAddr::V4(Ipv4Addr::from(0x0a00_0000 + i)), &["tcp"]));
        }
        let result = validate(&config);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("IPv4 addresses exceed capacity")));
    }
}
