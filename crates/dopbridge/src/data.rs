//! Per-object solver state kept between timesteps.

use partsim::Container;

use crate::constraints::ConstraintSignature;
use crate::geometry::DataId;
use crate::index_table::ParticleIndexTable;
use crate::proxy_cache::ProxyCache;

/// Everything the solver remembers about one object.
pub struct SolverData<C: Container> {
    pub(crate) container: C,
    pub(crate) capacity: usize,
    pub(crate) index_table: ParticleIndexTable,
    pub(crate) proxies: ProxyCache,
    /// Position data id of the last geometry read back.
    pub(crate) last_position_stamp: Option<DataId>,
    /// Inputs of the constraints currently on the device.
    pub(crate) constraint_signature: Option<ConstraintSignature>,
}

impl<C: Container> SolverData<C> {
    /// Create the state and its container.
    pub fn new(capacity: usize) -> Self {
        Self {
            container: C::create(capacity),
            capacity,
            index_table: ParticleIndexTable::new(),
            proxies: ProxyCache::new(),
            last_position_stamp: None,
            constraint_signature: None,
        }
    }

    /// Whether the container can be used.
    pub fn is_valid(&self) -> bool {
        self.container.is_valid()
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    pub fn index_table(&self) -> &ParticleIndexTable {
        &self.index_table
    }

    pub fn proxies(&self) -> &ProxyCache {
        &self.proxies
    }

    pub fn last_position_stamp(&self) -> Option<DataId> {
        self.last_position_stamp
    }

    /// Replace the container with a fresh one and forget every cached stamp.
    pub fn reset(&mut self) {
        log::debug!("Resetting solver data");
        *self = Self::new(self.capacity);
    }
}
