//! Triangle-mesh collision proxies held by a container.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::buffers::{MapState, TriangleMeshBuffers};

/// Handle to a collision proxy inside one container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProxyId(pub u32);

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProxyId<{}>", self.0)
    }
}

pub(crate) struct ProxySlot {
    pub key: String,
    /// Shared with the device once bound; copied on the next write.
    pub mesh: Arc<TriangleMeshBuffers>,
    pub state: MapState,
}

/// Every proxy registered with a container.
#[derive(Default)]
pub struct CollisionSet {
    slots: BTreeMap<ProxyId, ProxySlot>,
    by_key: BTreeMap<String, ProxyId>,
    next_id: u32,
    rebuilds: u64,
}

impl CollisionSet {
    /// Get or create the proxy registered under `key`.
    pub fn add_triangle_mesh(&mut self, key: &str) -> ProxyId {
        if let Some(&id) = self.by_key.get(key) {
            return id;
        }
        let id = ProxyId(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            ProxySlot {
                key: key.to_owned(),
                mesh: Arc::default(),
                state: MapState::default(),
            },
        );
        self.by_key.insert(key.to_owned(), id);
        id
    }

    /// Drop a proxy. Returns false if it was not registered.
    pub fn remove(&mut self, id: ProxyId) -> bool {
        match self.slots.remove(&id) {
            Some(slot) => {
                self.by_key.remove(&slot.key);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ProxyId) -> Option<&TriangleMeshBuffers> {
        self.slots.get(&id).map(|s| s.mesh.as_ref())
    }

    pub(crate) fn slot_mut(&mut self, id: ProxyId) -> Option<&mut ProxySlot> {
        let slot = self.slots.get_mut(&id)?;
        self.rebuilds += 1;
        Some(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// How many times any proxy has been mapped for writing.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Every non-empty proxy, as bound for the next tick. Unchanged meshes
    /// are shared with the previous binding.
    pub(crate) fn snapshot(&self) -> Vec<Arc<TriangleMeshBuffers>> {
        self.slots
            .values()
            .filter(|s| !s.mesh.triangles.is_empty())
            .map(|s| Arc::clone(&s.mesh))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn fill(set: &mut CollisionSet, id: ProxyId) {
        let slot = set.slot_mut(id).unwrap();
        let mesh = Arc::make_mut(&mut slot.mesh);
        mesh.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Z];
        mesh.triangles = vec![[0, 2, 1]];
    }

    #[test]
    fn test_unchanged_proxies_are_shared_between_bindings() {
        let mut set = CollisionSet::default();
        let a = set.add_triangle_mesh("a");
        let b = set.add_triangle_mesh("b");
        fill(&mut set, a);
        fill(&mut set, b);

        let first = set.snapshot();
        let second = set.snapshot();
        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first[0], &second[0]));
        assert!(Arc::ptr_eq(&first[1], &second[1]));

        // Rewriting one proxy leaves the bound copy alone.
        fill(&mut set, a);
        let third = set.snapshot();
        assert!(!Arc::ptr_eq(&first[0], &third[0]));
        assert!(Arc::ptr_eq(&first[1], &third[1]));
        assert_eq!(first[0].triangles, vec![[0, 2, 1]]);
    }

    #[test]
    fn test_empty_proxies_are_not_bound() {
        let mut set = CollisionSet::default();
        set.add_triangle_mesh("empty");
        assert!(set.snapshot().is_empty());
        assert_eq!(set.len(), 1);
    }
}
