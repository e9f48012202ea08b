//! Classifier integration tests
//!
//! Run with: cargo test --test classifier

mod control_plane;
mod events;
mod frames;
mod properties;
mod scenarios;
