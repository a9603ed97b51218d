// ConcurrentMap property tests.
//
// Property 1: single-threaded behavior matches a plain HashMap model.
//  - Operations: put, delete, get over a small key space, so keys collide,
//    get updated and get deleted repeatedly.
//  - Small initial chain arrays force grows and shrinks along the way.
//  - Invariant after each step: put/delete results match the model,
//    get(k) == model[k], len() == model.len().
//
// Property 2: any mix of colliding keys stays retrievable.
//  - A hash with only a few distinct outputs puts many keys in one chain.
//  - Deleting any subset leaves exactly the complement visible.
use chainmap::{ConcurrentMap, ConcurrentMapBuilder, HashFunction, RedistributorConfig};
use hashbrown::HashMap;
use proptest::prelude::*;

fn small_map(concurrency: usize) -> ConcurrentMap<u32> {
    let config = RedistributorConfig::new()
        .chain_count_bounds(2, 1 << 12)
        .unwrap();
    ConcurrentMapBuilder::new()
        .concurrency(concurrency)
        .unwrap()
        .chain_count(2)
        .unwrap()
        .redistributor(config)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_matches_model(
        concurrency in 1usize..=4,
        ops in proptest::collection::vec((0u8..=2u8, 0usize..64usize, any::<u32>()), 1..400),
    ) {
        let map = small_map(concurrency);
        let mut model: HashMap<String, u32> = HashMap::new();

        for (op, raw_k, value) in ops {
            let key = format!("k{}", raw_k);
            match op {
                0 => {
                    let inserted = map.put(key.clone(), value).unwrap();
                    prop_assert_eq!(inserted, model.insert(key.clone(), value).is_none());
                }
                1 => {
                    let removed = map.delete(&key).unwrap();
                    prop_assert_eq!(removed, model.remove(&key).is_some());
                }
                2 => {
                    // Repeated reads with no write in between agree.
                    let first = map.get(&key).map(|v| *v);
                    let second = map.get(&key).map(|v| *v);
                    prop_assert_eq!(first, second);
                }
                _ => unreachable!(),
            }

            prop_assert_eq!(map.get(&key).map(|v| *v), model.get(&key).copied());
            prop_assert_eq!(map.len(), model.len());
        }

        for (key, value) in &model {
            prop_assert_eq!(map.get(key).map(|v| *v), Some(*value));
        }
        prop_assert_eq!(map.stats().size, model.len());
    }
}

proptest! {
    #[test]
    fn prop_colliding_deletes(
        keys in 1usize..120,
        deleted in proptest::collection::vec(any::<bool>(), 120),
    ) {
        let map = ConcurrentMapBuilder::new()
            .concurrency(1)
            .unwrap()
            .hash_function(HashFunction::Custom(|key| (key.len() % 3) as u64))
            .build::<usize>()
            .unwrap();

        for i in 0..keys {
            let inserted = map.put(format!("key_{}", i), i).unwrap();
            prop_assert!(inserted);
        }
        for i in (0..keys).filter(|&i| deleted[i]) {
            let removed = map.delete(&format!("key_{}", i)).unwrap();
            prop_assert!(removed);
        }

        for i in 0..keys {
            let value = map.get(&format!("key_{}", i)).map(|v| *v);
            if deleted[i] {
                prop_assert_eq!(value, None);
            } else {
                prop_assert_eq!(value, Some(i));
            }
        }
        prop_assert_eq!(map.len(), (0..keys).filter(|&i| !deleted[i]).count());
    }
}
