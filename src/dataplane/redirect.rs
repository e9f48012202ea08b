//! Queue index to consumer handle table

use crate::error::RedirectError;
use parking_lot::RwLock;

/// Number of redirect slots (one per receive queue)
pub const MAX_QUEUES: usize = 64;

/// Consumer handles indexed by receive queue.
///
/// Written by the control plane, read by the dispatcher. The handle type is
/// opaque here; it only needs to be cheap to clone.
pub struct RedirectTable<H> {
    slots: Box<[RwLock<Option<H>>]>,
}

impl<H: Clone> RedirectTable<H> {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_QUEUES).map(|_| RwLock::new(None)).collect(),
        }
    }

    fn slot(&self, queue: u32) -> Result<&RwLock<Option<H>>, RedirectError> {
        self.slots
            .get(queue as usize)
            .ok_or(RedirectError::QueueOutOfRange {
                queue,
                max: MAX_QUEUES as u32 - 1,
            })
    }

    /// Register (or replace) the consumer for `queue`.
    pub fn set(&self, queue: u32, handle: H) -> Result<(), RedirectError> {
        *self.slot(queue)?.write() = Some(handle);
        Ok(())
    }

    /// Remove the consumer for `queue`. Returns the previous handle.
    pub fn clear(&self, queue: u32) -> Result<Option<H>, RedirectError> {
        Ok(self.slot(queue)?.write().take())
    }

    /// Consumer for `queue`, or `MissingTarget` if none is registered.
    pub fn get(&self, queue: u32) -> Result<H, RedirectError> {
        self.slot(queue)?
            .read()
            .clone()
            .ok_or(RedirectError::MissingTarget { queue })
    }

    /// Number of queues with a registered consumer
    pub fn registered(&self) -> usize {
        self.slots.iter().filter(|slot| slot.read().is_some()).count()
    }
}

impl<H: Clone> Default for RedirectTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
