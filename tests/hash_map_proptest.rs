// HashMap property tests.
//
// Property 1: the map agrees with std's HashMap under random operations.
//  - Model: std::collections::HashMap<u16, u32>.
//  - Operations: insert, get, fast remove, clearing remove, get_mut, clear.
//  - Invariant after each step: len() and the probed key match the model.
//  - Final check: iteration yields exactly the model's entries.
//
// Property 2: the same, with a hasher that maps every key onto five hash
// values so entries pile into overflow chains and force rehashes.
use core::hash::BuildHasher;
use core::hash::Hasher;
use core::ops::ControlFlow;
use std::collections::HashMap as ModelMap;
use std::hash::RandomState;

use group_hash::HashMap;
use proptest::prelude::*;

#[derive(Clone, Copy, Default)]
struct FiveBuckets;

struct FiveBucketsHasher(u64);

impl Hasher for FiveBucketsHasher {
    fn finish(&self) -> u64 {
        self.0 % 5
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(b as u64);
        }
    }
}

impl BuildHasher for FiveBuckets {
    type Hasher = FiveBucketsHasher;

    fn build_hasher(&self) -> Self::Hasher {
        FiveBucketsHasher(0)
    }
}

fn run_against_model<S: BuildHasher>(
    mut map: HashMap<'_, u16, u32, S>,
    ops: Vec<(u8, u16, u32)>,
) -> Result<(), TestCaseError> {
    let mut model: ModelMap<u16, u32> = ModelMap::new();

    for (op, k, v) in ops {
        match op {
            0 | 1 => {
                prop_assert_eq!(map.insert(k, v), model.insert(k, v));
            }
            2 => {
                prop_assert_eq!(map.get(&k), model.get(&k));
            }
            3 => {
                prop_assert_eq!(map.remove(&k), model.remove(&k).is_some());
            }
            4 => {
                prop_assert_eq!(map.remove_and_clear(&k), model.remove(&k));
            }
            5 => {
                if let Some(value) = map.get_mut(&k) {
                    *value = value.wrapping_add(v);
                }
                if let Some(value) = model.get_mut(&k) {
                    *value = value.wrapping_add(v);
                }
            }
            6 => {
                // Keep clears rare so maps get a chance to grow.
                if v % 16 == 0 {
                    map.clear();
                    model.clear();
                }
            }
            _ => unreachable!(),
        }

        prop_assert_eq!(map.len(), model.len());
        prop_assert_eq!(map.contains_key(&k), model.contains_key(&k));
        prop_assert_eq!(map.get(&k), model.get(&k));
    }

    let mut seen: ModelMap<u16, u32> = ModelMap::new();
    for (k, v) in map.iter() {
        prop_assert!(seen.insert(*k, *v).is_none(), "key {} yielded twice", k);
    }
    prop_assert_eq!(&seen, &model);

    let mut visited = 0usize;
    let flow = map.range(|_, _| {
        visited += 1;
        ControlFlow::<()>::Continue(())
    });
    prop_assert_eq!(flow, ControlFlow::Continue(()));
    prop_assert_eq!(visited, model.len());
    Ok(())
}

proptest! {
    #[test]
    fn prop_hash_map_matches_model(
        capacity in 0usize..64,
        ops in proptest::collection::vec((0u8..=6u8, 1u16..512u16, any::<u32>()), 1..400)
    ) {
        let map = HashMap::with_capacity_and_hasher(capacity, RandomState::new());
        run_against_model(map, ops)?;
    }

    #[test]
    fn prop_colliding_hash_map_matches_model(
        capacity in 0usize..16,
        ops in proptest::collection::vec((0u8..=6u8, 0u16..256u16, any::<u32>()), 1..300)
    ) {
        let map = HashMap::with_capacity_and_hasher(capacity, FiveBuckets);
        run_against_model(map, ops)?;
    }

    #[test]
    fn prop_growth_keeps_sequential_keys(n in 1u32..3000) {
        let mut map: HashMap<u32, u32, RandomState> = HashMap::with_capacity(1);
        for k in 1..=n {
            map.insert(k, k ^ 0xA5A5);
        }
        prop_assert_eq!(map.len(), n as usize);
        prop_assert_eq!(map.capacity() % 8, 0);
        for k in 1..=n {
            prop_assert_eq!(map.get(&k), Some(&(k ^ 0xA5A5)));
        }
        prop_assert_eq!(map.get(&(n + 1)), None);
    }
}
