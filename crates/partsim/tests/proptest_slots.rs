//! Property-based tests for the slot pool
//!
//! - The active list never contains duplicates
//! - Active + free always partition the capacity
//! - Failed allocations leave the pool untouched

use std::collections::HashSet;

use partsim::slots::SlotPool;
use proptest::prelude::*;

const CAPACITY: usize = 64;

#[derive(Clone, Debug)]
enum Op {
    Alloc(usize),
    /// Free the trailing `n` active slots
    FreeTail(usize),
    /// Free every `k`-th active slot
    FreeStride(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..40).prop_map(Op::Alloc),
        (0usize..40).prop_map(Op::FreeTail),
        (1usize..5).prop_map(Op::FreeStride),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_active_list_stays_a_set(ops in prop::collection::vec(op(), 1..30)) {
        let mut pool = SlotPool::new(CAPACITY);

        for op in ops {
            let before = pool.active().to_vec();
            match op {
                Op::Alloc(n) => {
                    if pool.alloc(n).is_err() {
                        prop_assert!(n > CAPACITY - before.len());
                        prop_assert_eq!(pool.active(), before.as_slice());
                    } else {
                        prop_assert_eq!(pool.active_count(), before.len() + n);
                        prop_assert_eq!(&pool.active()[..before.len()], before.as_slice());
                    }
                }
                Op::FreeTail(n) => {
                    let n = n.min(before.len());
                    let tail = before[before.len() - n..].to_vec();
                    prop_assert_eq!(pool.free(&tail).unwrap(), n);
                    prop_assert_eq!(pool.active(), &before[..before.len() - n]);
                }
                Op::FreeStride(k) => {
                    let victims: Vec<u32> = before.iter().copied().step_by(k).collect();
                    prop_assert_eq!(pool.free(&victims).unwrap(), victims.len());
                    for v in &victims {
                        prop_assert!(!pool.is_active(*v));
                    }
                }
            }

            let active: HashSet<u32> = pool.active().iter().copied().collect();
            prop_assert_eq!(active.len(), pool.active_count());
            prop_assert!(active.iter().all(|&s| (s as usize) < CAPACITY));
            prop_assert_eq!(pool.active_count() + pool.available(), CAPACITY);
        }
    }
}
