//! Telemetry: process logging, classifier events and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - Fixed-layout classifier events on a bounded channel
//! - An observer that renders those events through `tracing`
//! - Verdict and per-queue counters

pub mod events;
mod logging;
mod metrics;
mod observer;

pub use events::{channel, EventEmitter, EventKind, EventReceiver, LogEvent, LogLevel};
pub use logging::{init_logging, LogConfig, LogFormat, EVENT_TARGET};
pub use metrics::{Counter, MetricsRegistry, QueueStats};
pub use observer::{render, DrainStats, EventObserver};
