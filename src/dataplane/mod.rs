//! Data plane components
//!
//! Per-frame classification, the redirect table and verdict dispatch.

mod dispatch;
mod engine;
mod redirect;

pub use dispatch::{Disposition, Dispatcher};
pub use engine::{DecisionEngine, RedirectMode, Verdict};
pub use redirect::{RedirectTable, MAX_QUEUES};
