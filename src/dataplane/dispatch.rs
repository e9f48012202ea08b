//! Turns verdicts into actions on a frame

use super::{RedirectTable, Verdict};
use crate::error::RedirectError;
use crate::telemetry::MetricsRegistry;
use std::sync::Arc;

/// What the host should do with a classified frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition<H> {
    /// Let the frame continue into the network stack
    Deliver,
    /// Discard the frame
    Discard,
    /// Push the frame to a consumer ring
    Push { queue: u32, target: H },
}

pub struct Dispatcher<H> {
    redirects: Arc<RedirectTable<H>>,
    metrics: Arc<MetricsRegistry>,
}

impl<H: Clone> Dispatcher<H> {
    pub fn new(redirects: Arc<RedirectTable<H>>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { redirects, metrics }
    }

    /// Resolve a verdict. A redirect without a usable consumer degrades to
    /// delivery.
    pub fn dispatch(&self, verdict: Verdict) -> Disposition<H> {
        match verdict {
            Verdict::Pass => Disposition::Deliver,
            Verdict::Drop => Disposition::Discard,
            Verdict::Redirect(queue) => match self.redirects.get(queue) {
                Ok(target) => Disposition::Push { queue, target },
                Err(e) => {
                    self.metrics.record_fallback(queue);
                    match e {
                        RedirectError::MissingTarget { .. } => {
                            tracing::debug!(queue, "No consumer for redirect, delivering to stack");
                        }
                        RedirectError::QueueOutOfRange { .. } => {
                            tracing::warn!(queue, error = %e, "Redirect queue invalid, delivering to stack");
                        }
                    }
                    Disposition::Deliver
                }
            },
        }
    }

    pub fn redirects(&self) -> &Arc<RedirectTable<H>> {
        &self.redirects
    }
}
