//! Shadow-mode pipeline
//!
//! Runs the classifier over frames from a [`Capture`] backend and carries
//! out each verdict against in-process consumer rings. The kernel still
//! delivers every frame, so Drop and Redirect are only recorded.

use crate::capture::Capture;
use crate::dataplane::{DecisionEngine, Dispatcher, Disposition, RedirectTable};
use crate::protocol::ethernet::MAX_FRAME_SIZE;
use crate::telemetry::MetricsRegistry;
use crate::Result;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// User-space receive ring standing in for a zero-copy socket.
#[derive(Debug, Clone)]
pub struct ConsumerRing {
    queue: u32,
    tx: Sender<Vec<u8>>,
    overruns: Arc<AtomicU64>,
}

impl ConsumerRing {
    /// Create a ring for `queue` holding at most `capacity` frames.
    pub fn new(queue: u32, capacity: usize) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (
            Self {
                queue,
                tx,
                overruns: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    pub fn queue(&self) -> u32 {
        self.queue
    }

    /// Copy a frame into the ring. A full ring drops the frame.
    pub fn push(&self, frame: &[u8]) -> bool {
        match self.tx.try_send(frame.to_vec()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.overruns.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Frames dropped because the ring was full or closed
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl PartialEq for ConsumerRing {
    fn eq(&self, other: &Self) -> bool {
        self.queue == other.queue && self.tx.same_channel(&other.tx)
    }
}

impl Eq for ConsumerRing {}

/// Classifier plus dispatcher for one interface.
pub struct Pipeline {
    engine: Arc<DecisionEngine>,
    dispatcher: Dispatcher<ConsumerRing>,
}

impl Pipeline {
    pub fn new(engine: Arc<DecisionEngine>, redirects: Arc<RedirectTable<ConsumerRing>>) -> Self {
        let dispatcher = Dispatcher::new(redirects, Arc::clone(engine.metrics()));
        Self { engine, dispatcher }
    }

    /// Classify one frame and carry out the verdict.
    pub fn process(&self, frame: &[u8], queue: u32) -> Disposition<ConsumerRing> {
        self.metrics().record_rx(queue, frame.len());

        let verdict = self.engine.classify(frame, queue);
        let disposition = self.dispatcher.dispatch(verdict);

        if let Disposition::Push { queue, target } = &disposition {
            if !target.push(frame) {
                debug!(queue, "Consumer ring full, frame dropped");
            }
        }
        disposition
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.engine.metrics()
    }
}

/// Read and process frames until `shutdown` resolves or the capture fails.
/// Returns the number of frames processed.
pub async fn serve<C, F>(capture: &mut C, pipeline: &Pipeline, shutdown: F) -> Result<u64>
where
    C: Capture,
    F: Future<Output = ()>,
{
    let mut buf = vec![0u8; MAX_FRAME_SIZE];
    let mut frames = 0u64;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = capture.recv(&mut buf) => {
                let info = match received {
                    Ok(info) => info,
                    Err(e) => {
                        warn!(error = %e, "Capture failed");
                        return Err(e);
                    }
                };
                if info.wire_len > info.len {
                    pipeline.metrics().truncated.inc();
                    debug!(
                        wire_len = info.wire_len,
                        captured = info.len,
                        "Frame larger than receive buffer, classified truncated"
                    );
                }
                pipeline.process(&buf[..info.len], info.queue);
                frames += 1;
            }
        }
    }

    Ok(frames)
}
