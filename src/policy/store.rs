//! Whitelist and port-rule tables
//!
//! Readers load an immutable snapshot through `ArcSwap` and never block.
//! Writers copy the current snapshot, modify the copy and publish it while
//! holding a per-table mutex, so a failed write leaves the published table
//! exactly as it was.

use super::{AddressKey, PolicyKey, ProtocolMask};
use crate::error::{PolicyError, TableKind};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Maximum IPv4 whitelist entries
pub const MAX_IPV4_ENTRIES: usize = 1024;
/// Maximum IPv6 whitelist entries
pub const MAX_IPV6_ENTRIES: usize = 1024;
/// Maximum port rules
pub const MAX_PORT_RULES: usize = 128;

/// Fixed-capacity hash table with snapshot reads.
pub struct BoundedTable<K> {
    kind: TableKind,
    capacity: usize,
    entries: ArcSwap<HashMap<K, ProtocolMask>>,
    writer: Mutex<()>,
}

impl<K> BoundedTable<K>
where
    K: Eq + Hash + Copy,
{
    pub fn new(kind: TableKind, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            entries: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<ProtocolMask> {
        self.entries.load().get(key).copied()
    }

    /// Insert or overwrite. A new key beyond capacity is rejected.
    pub fn upsert(&self, key: K, mask: ProtocolMask) -> Result<(), PolicyError> {
        let _guard = self.writer.lock();
        let current = self.entries.load();

        match current.get(&key) {
            Some(existing) if *existing == mask => return Ok(()),
            Some(_) => {}
            None if current.len() >= self.capacity => {
                return Err(PolicyError::CapacityExceeded {
                    table: self.kind,
                    capacity: self.capacity,
                });
            }
            None => {}
        }

        let mut next = HashMap::clone(&current);
        next.insert(key, mask);
        self.entries.store(Arc::new(next));
        Ok(())
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &K) -> bool {
        let _guard = self.writer.lock();
        let current = self.entries.load();

        if !current.contains_key(key) {
            return false;
        }

        let mut next = HashMap::clone(&current);
        next.remove(key);
        self.entries.store(Arc::new(next));
        true
    }

    /// Publish a whole new table in one swap.
    pub fn replace(&self, entries: HashMap<K, ProtocolMask>) -> Result<(), PolicyError> {
        self.check_capacity(entries.len())?;
        let _guard = self.writer.lock();
        self.entries.store(Arc::new(entries));
        Ok(())
    }

    fn check_capacity(&self, len: usize) -> Result<(), PolicyError> {
        if len > self.capacity {
            return Err(PolicyError::CapacityExceeded {
                table: self.kind,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the current contents
    pub fn snapshot(&self) -> Arc<HashMap<K, ProtocolMask>> {
        self.entries.load_full()
    }
}

/// The three policy tables shared between the control plane and every
/// classification.
pub struct PolicyStore {
    ipv4: BoundedTable<[u8; 4]>,
    ipv6: BoundedTable<[u8; 16]>,
    ports: BoundedTable<u16>,
}

/// Complete table contents for an atomic-per-table reload.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    pub ipv4: HashMap<[u8; 4], ProtocolMask>,
    pub ipv6: HashMap<[u8; 16], ProtocolMask>,
    pub ports: HashMap<u16, ProtocolMask>,
}

impl PolicySet {
    pub fn insert(&mut self, key: PolicyKey, mask: ProtocolMask) {
        match key {
            PolicyKey::Address(AddressKey::V4(addr)) => {
                self.ipv4.insert(addr, mask);
            }
            PolicyKey::Address(AddressKey::V6(addr)) => {
                self.ipv6.insert(addr, mask);
            }
            PolicyKey::Port(port) => {
                self.ports.insert(port, mask);
            }
        }
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            ipv4: BoundedTable::new(TableKind::Ipv4Addresses, MAX_IPV4_ENTRIES),
            ipv6: BoundedTable::new(TableKind::Ipv6Addresses, MAX_IPV6_ENTRIES),
            ports: BoundedTable::new(TableKind::Ports, MAX_PORT_RULES),
        }
    }

    #[inline]
    pub fn lookup(&self, key: PolicyKey) -> Option<ProtocolMask> {
        match key {
            PolicyKey::Address(AddressKey::V4(addr)) => self.ipv4.get(&addr),
            PolicyKey::Address(AddressKey::V6(addr)) => self.ipv6.get(&addr),
            PolicyKey::Port(port) => self.ports.get(&port),
        }
    }

    pub fn upsert(&self, key: PolicyKey, mask: ProtocolMask) -> Result<(), PolicyError> {
        match key {
            PolicyKey::Address(AddressKey::V4(addr)) => self.ipv4.upsert(addr, mask),
            PolicyKey::Address(AddressKey::V6(addr)) => self.ipv6.upsert(addr, mask),
            PolicyKey::Port(port) => self.ports.upsert(port, mask),
        }
    }

    pub fn delete(&self, key: PolicyKey) -> bool {
        match key {
            PolicyKey::Address(AddressKey::V4(addr)) => self.ipv4.delete(&addr),
            PolicyKey::Address(AddressKey::V6(addr)) => self.ipv6.delete(&addr),
            PolicyKey::Port(port) => self.ports.delete(&port),
        }
    }

    /// Replace all three tables. Capacities are checked before anything
    /// is published.
    pub fn replace(&self, set: PolicySet) -> Result<(), PolicyError> {
        self.ipv4.check_capacity(set.ipv4.len())?;
        self.ipv6.check_capacity(set.ipv6.len())?;
        self.ports.check_capacity(set.ports.len())?;

        self.ipv4.replace(set.ipv4)?;
        self.ipv6.replace(set.ipv6)?;
        self.ports.replace(set.ports)?;
        Ok(())
    }

    pub fn len(&self, table: TableKind) -> usize {
        match table {
            TableKind::Ipv4Addresses => self.ipv4.len(),
            TableKind::Ipv6Addresses => self.ipv6.len(),
            TableKind::Ports => self.ports.len(),
        }
    }

    pub fn ipv4(&self) -> &BoundedTable<[u8; 4]> {
        &self.ipv4
    }

    pub fn ipv6(&self) -> &BoundedTable<[u8; 16]> {
        &self.ipv6
    }

    pub fn ports(&self) -> &BoundedTable<u16> {
        &self.ports
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
