//! Metrics collection for classification statistics.
//!
//! Provides thread-safe counters for verdict totals and per-queue
//! receive/redirect statistics.

use crate::dataplane::{Verdict, MAX_QUEUES};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a value to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-queue statistics.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Frames that arrived on this queue.
    pub rx_frames: Counter,
    /// Bytes that arrived on this queue.
    pub rx_bytes: Counter,
    /// Frames pushed to this queue's consumer.
    pub redirected: Counter,
    /// Redirects that found no consumer on this queue.
    pub missing_target: Counter,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received frame.
    pub fn record_rx(&self, bytes: usize) {
        self.rx_frames.inc();
        self.rx_bytes.add(bytes as u64);
    }
}

/// Global metrics registry for the classifier.
#[derive(Debug)]
pub struct MetricsRegistry {
    queues: Vec<QueueStats>,

    /// Frames classified.
    pub frames: Counter,
    /// Frames with a Pass verdict.
    pub passed: Counter,
    /// Frames with a Drop verdict.
    pub dropped: Counter,
    /// Frames with a Redirect verdict.
    pub redirected: Counter,
    /// Frames whose headers could not be parsed.
    pub invalid: Counter,
    /// Redirect verdicts delivered to the stack for lack of a consumer.
    pub redirect_fallbacks: Counter,
    /// Frames larger than the receive buffer, classified on a truncated copy.
    pub truncated: Counter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry.
    pub fn new() -> Self {
        Self {
            queues: (0..MAX_QUEUES).map(|_| QueueStats::new()).collect(),
            frames: Counter::new(),
            passed: Counter::new(),
            dropped: Counter::new(),
            redirected: Counter::new(),
            invalid: Counter::new(),
            redirect_fallbacks: Counter::new(),
            truncated: Counter::new(),
        }
    }

    /// Statistics for one queue, if the index is in range.
    pub fn queue(&self, queue: u32) -> Option<&QueueStats> {
        self.queues.get(queue as usize)
    }

    /// Records a frame arriving on a queue.
    pub fn record_rx(&self, queue: u32, bytes: usize) {
        if let Some(stats) = self.queue(queue) {
            stats.record_rx(bytes);
        }
    }

    /// Records the verdict of one classification.
    pub fn record_verdict(&self, verdict: Verdict) {
        self.frames.inc();
        match verdict {
            Verdict::Pass => self.passed.inc(),
            Verdict::Drop => self.dropped.inc(),
            Verdict::Redirect(queue) => {
                self.redirected.inc();
                if let Some(stats) = self.queue(queue) {
                    stats.redirected.inc();
                }
            }
        }
    }

    /// Records a redirect that fell back to delivery.
    pub fn record_fallback(&self, queue: u32) {
        self.redirect_fallbacks.inc();
        if let Some(stats) = self.queue(queue) {
            stats.missing_target.inc();
        }
    }

    /// Exports all metrics as key-value pairs.
    ///
    /// Queues that never saw traffic are omitted.
    pub fn export(&self) -> Vec<(String, u64)> {
        let mut result = vec![
            ("frames".into(), self.frames.get()),
            ("passed".into(), self.passed.get()),
            ("dropped".into(), self.dropped.get()),
            ("redirected".into(), self.redirected.get()),
            ("invalid".into(), self.invalid.get()),
            ("redirect_fallbacks".into(), self.redirect_fallbacks.get()),
            ("truncated".into(), self.truncated.get()),
        ];

        for (index, stats) in self.queues.iter().enumerate() {
            if stats.rx_frames.get() == 0
                && stats.redirected.get() == 0
                && stats.missing_target.get() == 0
            {
                continue;
            }
            result.extend([
                (format!("queue{}_rx_frames", index), stats.rx_frames.get()),
                (format!("queue{}_rx_bytes", index), stats.rx_bytes.get()),
                (format!("queue{}_redirected", index), stats.redirected.get()),
                (
                    format!("queue{}_missing_target", index),
                    stats.missing_target.get(),
                ),
            ]);
        }

        result
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
