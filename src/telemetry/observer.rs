//! Drains classifier events and renders them through `tracing`.

use super::events::{EventReceiver, LogEvent, LogLevel};
use super::logging::EVENT_TARGET;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often lost-event counts are reported while running.
const LOST_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub rendered: usize,
    pub malformed: usize,
    pub lost: u64,
}

pub struct EventObserver {
    receiver: EventReceiver,
}

impl EventObserver {
    pub fn new(receiver: EventReceiver) -> Self {
        Self { receiver }
    }

    /// Render everything currently queued and report losses.
    pub fn drain(&self) -> DrainStats {
        let mut stats = DrainStats::default();

        while let Some(record) = self.receiver.try_recv() {
            self.handle(&record, &mut stats);
        }
        stats.lost = self.report_lost();
        stats
    }

    /// Block on the channel until `stop` is set or every emitter is gone.
    pub fn run(&self, stop: &AtomicBool) -> DrainStats {
        let mut total = DrainStats::default();
        let mut last_report = Instant::now();

        while !stop.load(Ordering::Relaxed) {
            match self.receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(Some(record)) => self.handle(&record, &mut total),
                Ok(None) => {}
                Err(_) => break,
            }

            if last_report.elapsed() >= LOST_REPORT_INTERVAL {
                total.lost += self.report_lost();
                last_report = Instant::now();
            }
        }

        let tail = self.drain();
        total.rendered += tail.rendered;
        total.malformed += tail.malformed;
        total.lost += tail.lost;
        total
    }

    fn handle(&self, record: &[u8], stats: &mut DrainStats) {
        match LogEvent::decode(record) {
            Ok(event) => {
                render(&event);
                stats.rendered += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable event record");
                stats.malformed += 1;
            }
        }
    }

    fn report_lost(&self) -> u64 {
        let lost = self.receiver.take_lost();
        if lost > 0 {
            tracing::warn!(lost, "Classifier events lost to channel saturation");
        }
        lost
    }
}

/// Emit one event at its own severity.
pub fn render(event: &LogEvent) {
    let src = event
        .src_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "-".to_string());
    let dst = event
        .dst_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "-".to_string());

    macro_rules! at_level {
        ($mac:ident) => {
            tracing::$mac!(
                target: EVENT_TARGET,
                ts_ns = event.timestamp_ns,
                kind = event.kind.as_str(),
                src = %src,
                dst = %dst,
                sport = event.src_port,
                dport = event.dst_port,
                proto = event.protocol,
                "{}",
                event.message()
            )
        };
    }

    match event.level {
        LogLevel::Debug => at_level!(debug),
        LogLevel::Info => at_level!(info),
        LogLevel::Warn => at_level!(warn),
        LogLevel::Error => at_level!(error),
    }
}
