//! Particle slot pool.
//!
//! Slots are kept as a dense permutation of `0..capacity`. The first `active`
//! entries form the active list; everything after is the free list. The
//! order of the active list is significant: callers map their own point order
//! onto it.

use crate::error::EngineError;

/// Free list of particle slots.
#[derive(Clone, Debug)]
pub struct SlotPool {
    indices: Vec<u32>,
    /// Position of each slot inside `indices`.
    positions: Vec<u32>,
    active: usize,
}

impl SlotPool {
    /// Create a pool able to hold `capacity` live particles.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        let indices: Vec<u32> = (0..capacity as u32).collect();
        let positions = indices.clone();
        Self {
            indices,
            positions,
            active: 0,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.indices.len()
    }

    /// Number of slots currently in use.
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Number of slots still free.
    pub fn available(&self) -> usize {
        self.capacity() - self.active
    }

    /// The active list, in allocation order.
    pub fn active(&self) -> &[u32] {
        &self.indices[..self.active]
    }

    /// Move `count` slots from the free list to the end of the active list.
    ///
    /// Returns the newly allocated slots. Either all `count` slots are
    /// allocated or none are.
    pub fn alloc(&mut self, count: usize) -> Result<&[u32], EngineError> {
        if count > self.available() {
            return Err(EngineError::OutOfSlots {
                requested: count,
                available: self.available(),
            });
        }
        let start = self.active;
        self.active += count;
        Ok(&self.indices[start..self.active])
    }

    /// Return slots to the free list.
    ///
    /// Each freed slot is swapped with the last active slot, so freeing a
    /// trailing run of the active list keeps the leading order intact.
    /// Returns the number of slots freed.
    pub fn free(&mut self, slots: &[u32]) -> Result<usize, EngineError> {
        // Validate first so a bad slot leaves the pool untouched.
        for &slot in slots {
            if !self.is_active(slot) {
                return Err(EngineError::SlotNotActive(slot));
            }
        }

        let mut freed = 0;
        for &slot in slots {
            // Duplicates in `slots` are freed once.
            if !self.is_active(slot) {
                continue;
            }
            let pos = self.positions[slot as usize] as usize;
            let last = self.active - 1;
            self.swap(pos, last);
            self.active -= 1;
            freed += 1;
        }
        Ok(freed)
    }

    /// Whether `slot` is in the active list.
    pub fn is_active(&self, slot: u32) -> bool {
        (slot as usize) < self.positions.len()
            && (self.positions[slot as usize] as usize) < self.active
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.indices.swap(a, b);
        self.positions[self.indices[a] as usize] = a as u32;
        self.positions[self.indices[b] as usize] = b as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_appends_in_order() {
        let mut pool = SlotPool::new(8);
        assert_eq!(pool.alloc(3).unwrap(), &[0, 1, 2]);
        assert_eq!(pool.alloc(2).unwrap(), &[3, 4]);
        assert_eq!(pool.active(), &[0, 1, 2, 3, 4]);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_alloc_beyond_capacity_fails_atomically() {
        let mut pool = SlotPool::new(4);
        pool.alloc(3).unwrap();
        let err = pool.alloc(2).unwrap_err();
        assert_eq!(
            err,
            EngineError::OutOfSlots {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(pool.active_count(), 3);
    }

    #[test]
    fn test_free_trailing_keeps_prefix() {
        let mut pool = SlotPool::new(8);
        pool.alloc(6).unwrap();
        let tail: Vec<u32> = pool.active()[4..].to_vec();
        assert_eq!(pool.free(&tail).unwrap(), 2);
        assert_eq!(pool.active(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_free_middle_swaps_last_in() {
        let mut pool = SlotPool::new(8);
        pool.alloc(4).unwrap();
        pool.free(&[1]).unwrap();
        assert_eq!(pool.active(), &[0, 3, 2]);
        assert!(!pool.is_active(1));

        // The freed slot is the next one handed out.
        assert_eq!(pool.alloc(1).unwrap(), &[1]);
    }

    #[test]
    fn test_free_inactive_slot_is_rejected() {
        let mut pool = SlotPool::new(4);
        pool.alloc(2).unwrap();
        assert_eq!(pool.free(&[3]), Err(EngineError::SlotNotActive(3)));
        assert_eq!(pool.active_count(), 2);
    }
}
