//! Configuration types

use crate::dataplane::RedirectMode;
use crate::policy::{PolicyKey, PolicySet, ProtocolMask};
use crate::telemetry::{LogConfig, LogLevel};
use crate::{Error, Result};
use serde::Deserialize;
use std::net::IpAddr;

/// User-defined configuration (config.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub whitelist: Vec<WhitelistEntry>,
    #[serde(default)]
    pub ports: Vec<PortRuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Interface watched by `run`
    pub interface: Option<String>,
    #[serde(default)]
    pub redirect: RedirectSetting,
    /// Queue used when `redirect = "fixed"`
    #[serde(default)]
    pub redirect_queue: u32,
    /// Minimum event severity; absent means every event is emitted
    pub event_level: Option<String>,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    4096
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            interface: None,
            redirect: RedirectSetting::default(),
            redirect_queue: 0,
            event_level: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl ClassifierConfig {
    pub fn redirect_mode(&self) -> RedirectMode {
        match self.redirect {
            RedirectSetting::Fixed => RedirectMode::Fixed(self.redirect_queue),
            RedirectSetting::Arrival => RedirectMode::ArrivalQueue,
        }
    }

    pub fn event_threshold(&self) -> Result<Option<LogLevel>> {
        self.event_level
            .as_deref()
            .map(|level| level.parse::<LogLevel>().map_err(Error::Config))
            .transpose()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectSetting {
    #[default]
    Fixed,
    Arrival,
}

/// Client-role entry: peer address and permitted protocols
#[derive(Debug, Clone, Deserialize)]
pub struct WhitelistEntry {
    pub address: IpAddr,
    #[serde(default)]
    pub protocols: Vec<String>,
}

/// Listener-role entry: local destination port and permitted protocols
#[derive(Debug, Clone, Deserialize)]
pub struct PortRuleConfig {
    pub port: u16,
    #[serde(default)]
    pub protocols: Vec<String>,
}

impl Config {
    /// Translate the whitelist and port sections into table contents.
    /// Later duplicates overwrite earlier ones.
    pub fn policy_set(&self) -> Result<PolicySet> {
        let mut set = PolicySet::default();

        for entry in &self.whitelist {
            let mask = ProtocolMask::from_names(&entry.protocols)
                .map_err(|e| Error::Config(format!("whitelist {}: {}", entry.address, e)))?;
            set.insert(PolicyKey::from(entry.address), mask);
        }

        for rule in &self.ports {
            let mask = ProtocolMask::from_names(&rule.protocols)
                .map_err(|e| Error::Config(format!("ports {}: {}", rule.port, e)))?;
            set.insert(PolicyKey::Port(rule.port), mask);
        }

        Ok(set)
    }
}
