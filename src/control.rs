//! Control-plane API
//!
//! Everything that mutates classifier state from outside the packet path:
//! policy entries, the event threshold, redirect targets and whole-config
//! reloads.

use crate::config::Config;
use crate::dataplane::{DecisionEngine, RedirectTable};
use crate::error::{PolicyError, RedirectError};
use crate::policy::{PolicyKey, ProtocolMask};
use crate::telemetry::LogLevel;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ControlPlane<H> {
    engine: Arc<DecisionEngine>,
    redirects: Arc<RedirectTable<H>>,
}

impl<H: Clone> ControlPlane<H> {
    pub fn new(engine: Arc<DecisionEngine>, redirects: Arc<RedirectTable<H>>) -> Self {
        Self { engine, redirects }
    }

    /// Insert or overwrite a policy entry.
    pub fn upsert(&self, key: PolicyKey, mask: ProtocolMask) -> std::result::Result<(), PolicyError> {
        self.engine.policy().upsert(key, mask)?;
        debug!(%key, %mask, "Policy entry upserted");
        Ok(())
    }

    /// Remove a policy entry. Returns whether it existed.
    pub fn delete(&self, key: PolicyKey) -> bool {
        let removed = self.engine.policy().delete(key);
        if removed {
            debug!(%key, "Policy entry deleted");
        }
        removed
    }

    pub fn set_log_threshold(&self, level: LogLevel) {
        if let Some(events) = self.engine.events() {
            events.set_threshold(level);
        }
    }

    pub fn clear_log_threshold(&self) {
        if let Some(events) = self.engine.events() {
            events.clear_threshold();
        }
    }

    pub fn set_redirect_target(
        &self,
        queue: u32,
        handle: H,
    ) -> std::result::Result<(), RedirectError> {
        self.redirects.set(queue, handle)
    }

    pub fn clear_redirect_target(&self, queue: u32) -> std::result::Result<Option<H>, RedirectError> {
        self.redirects.clear(queue)
    }

    /// Apply a configuration: replace all policy tables, then the redirect
    /// mode and event threshold. Nothing changes if the policy part fails.
    pub fn apply(&self, config: &Config) -> Result<()> {
        let set = config.policy_set()?;
        let threshold = config.classifier.event_threshold()?;
        let (v4, v6, ports) = (set.ipv4.len(), set.ipv6.len(), set.ports.len());

        self.engine.policy().replace(set)?;
        self.engine.set_redirect_mode(config.classifier.redirect_mode());
        match threshold {
            Some(level) => self.set_log_threshold(level),
            None => self.clear_log_threshold(),
        }

        info!(
            ipv4 = v4,
            ipv6 = v6,
            ports,
            redirect = ?config.classifier.redirect_mode(),
            "Policy applied"
        );
        Ok(())
    }

    pub fn engine(&self) -> &Arc<DecisionEngine> {
        &self.engine
    }
}
