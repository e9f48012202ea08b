//! Packet capture backends
//!
//! The shadow-mode daemon reads frames through [`Capture`]. AF_PACKET is
//! the only backend; it sees a copy of each frame and never alters kernel
//! delivery.

mod af_packet;

pub use af_packet::AfPacketSocket;

use crate::Result;
use std::future::Future;

/// Information about a received frame
#[derive(Debug, Clone)]
pub struct RxInfo {
    /// Number of bytes copied into the buffer
    pub len: usize,
    /// Length on the wire; larger than `len` when the buffer was too small
    pub wire_len: usize,
    /// Receive queue the frame arrived on (0 when the backend cannot tell)
    pub queue: u32,
}

/// Frame source for the classifier loop
pub trait Capture: Send {
    /// Receive one frame into the provided buffer
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<RxInfo>> + Send;
}
