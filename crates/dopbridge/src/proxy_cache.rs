//! Which collider each collision proxy was built from, and as of when.

use std::collections::{BTreeMap, BTreeSet};

use partsim::ProxyId;

use crate::geometry::DataId;
use crate::scene::ObjectId;

/// One cached collision proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyEntry {
    pub key: ObjectId,
    /// Position data id of the collider when the proxy was built.
    pub stamp: DataId,
    pub proxy: ProxyId,
}

impl ProxyEntry {
    /// Whether the collider changed since the proxy was built.
    pub fn is_stale(&self, current: DataId) -> bool {
        self.stamp != current
    }
}

/// Proxy entries keyed by collider, with a per-tick mark set for eviction.
#[derive(Clone, Debug, Default)]
pub struct ProxyCache {
    entries: BTreeMap<ObjectId, ProxyEntry>,
    marked: BTreeSet<ObjectId>,
}

impl ProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: ObjectId) -> Option<&ProxyEntry> {
        self.entries.get(&key)
    }

    /// True when `key` has no entry or its entry is stale.
    pub fn needs_rebuild(&self, key: ObjectId, current: DataId) -> bool {
        self.entries
            .get(&key)
            .map_or(true, |entry| entry.is_stale(current))
    }

    pub fn insert(&mut self, entry: ProxyEntry) {
        self.entries.insert(entry.key, entry);
    }

    /// Start a new mark pass.
    pub fn begin_pass(&mut self) {
        self.marked.clear();
    }

    /// Record that `key` is still related this pass.
    pub fn mark(&mut self, key: ObjectId) {
        self.marked.insert(key);
    }

    /// Remove and return every entry not marked since [`Self::begin_pass`].
    pub fn sweep(&mut self) -> Vec<ProxyEntry> {
        let unmarked: Vec<ObjectId> = self
            .entries
            .keys()
            .filter(|key| !self.marked.contains(*key))
            .copied()
            .collect();
        unmarked
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: u32, stamp: DataId) -> ProxyEntry {
        ProxyEntry {
            key: ObjectId(key),
            stamp,
            proxy: ProxyId(key),
        }
    }

    #[test]
    fn test_stale_only_when_stamp_differs() {
        let stamp = DataId::next();
        let e = entry(1, stamp);
        assert!(!e.is_stale(stamp));
        assert!(e.is_stale(DataId::next()));
    }

    #[test]
    fn test_unknown_key_needs_rebuild() {
        let mut cache = ProxyCache::new();
        let stamp = DataId::next();
        assert!(cache.needs_rebuild(ObjectId(4), stamp));
        cache.insert(entry(4, stamp));
        assert!(!cache.needs_rebuild(ObjectId(4), stamp));
    }

    #[test]
    fn test_sweep_removes_unmarked() {
        let mut cache = ProxyCache::new();
        let stamp = DataId::next();
        cache.insert(entry(1, stamp));
        cache.insert(entry(2, stamp));
        cache.insert(entry(3, stamp));

        cache.begin_pass();
        cache.mark(ObjectId(2));
        let evicted: Vec<ObjectId> = cache.sweep().iter().map(|e| e.key).collect();

        assert_eq!(evicted, vec![ObjectId(1), ObjectId(3)]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(ObjectId(2)).is_some());
    }
}
