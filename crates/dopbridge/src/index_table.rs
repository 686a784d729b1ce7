//! Mapping from mesh point order to engine slots.

use partsim::{Container, EngineError};

/// What [`ParticleIndexTable::reconcile`] had to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconcile {
    Unchanged,
    Allocated(usize),
    Freed(usize),
}

/// `slots[point] = engine slot`, refreshed wholesale from the container's
/// active list after every allocation or free.
#[derive(Clone, Debug, Default)]
pub struct ParticleIndexTable {
    slots: Vec<u32>,
    generation: u64,
}

impl ParticleIndexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    /// Engine slot of mesh point `point`.
    pub fn get(&self, point: usize) -> Option<u32> {
        self.slots.get(point).copied()
    }

    /// Bumped every time the table contents change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-fetch the active list. Returns its length.
    pub fn refresh<C: Container>(&mut self, container: &C) -> usize {
        let previous = std::mem::take(&mut self.slots);
        container.active_list(&mut self.slots);
        if previous != self.slots {
            self.generation += 1;
        }
        self.slots.len()
    }

    /// Grow or shrink the active list to `want` particles.
    ///
    /// Shrinking releases the trailing entries, so the slots of the points
    /// that remain are untouched.
    pub fn reconcile<C: Container>(
        &mut self,
        container: &mut C,
        want: usize,
    ) -> Result<Reconcile, EngineError> {
        let have = self.refresh(container);
        let outcome = if want > have {
            container.alloc_particles(want - have)?;
            Reconcile::Allocated(want - have)
        } else if want < have {
            let freed = container.free_particles(&self.slots[want..])?;
            Reconcile::Freed(freed)
        } else {
            return Ok(Reconcile::Unchanged);
        };
        self.refresh(container);
        Ok(outcome)
    }
}
