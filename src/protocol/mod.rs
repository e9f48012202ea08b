//! Header parsers for the classifier
//!
//! Every parser reads through a [`HeaderCursor`] and fails with
//! [`ParseError`](crate::error::ParseError) instead of reading past the frame.

pub mod cursor;
pub mod ethernet;
pub mod ipv4;
pub mod ipv6;
pub mod tcp;
pub mod types;
pub mod udp;

pub use cursor::HeaderCursor;
pub use ethernet::parse_ethernet;
pub use ipv4::parse_ipv4;
pub use ipv6::parse_ipv6;
pub use tcp::parse_tcp;
pub use types::*;
pub use udp::parse_udp;
