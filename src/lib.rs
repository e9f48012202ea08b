//! xdpgate - early-ingress packet classifier
//!
//! Decides for every received frame whether it passes into the network
//! stack, is dropped, or is redirected to a user-space consumer ring.
//! Decisions come from whitelist policies keyed by peer address or local
//! destination port, each carrying a mask of permitted protocols.

pub mod capture;
pub mod config;
pub mod control;
pub mod dataplane;
pub mod error;
pub mod policy;
pub mod protocol;
pub mod shadow;
pub mod telemetry;

pub use control::ControlPlane;
pub use dataplane::{DecisionEngine, RedirectMode, Verdict};
pub use error::{Error, Result};
pub use policy::{PolicyKey, PolicyStore, ProtocolMask};
