//! Whitelist policies
//!
//! Address entries (client role) and port rules (listener role), each
//! carrying a [`ProtocolMask`] of permitted transport protocols.

mod key;
mod mask;
mod store;

pub use key::{AddressKey, PolicyKey};
pub use mask::{ProtocolMask, UnknownProtocol};
pub use store::{
    BoundedTable, PolicySet, PolicyStore, MAX_IPV4_ENTRIES, MAX_IPV6_ENTRIES, MAX_PORT_RULES,
};
