use chainmap::{ConcurrentMapBuilder, RoutingConfig, ShardRouter};

#[test]
fn test_shard_isolation() {
    let map = ConcurrentMapBuilder::new()
        .concurrency(4)
        .unwrap()
        .build::<i32>()
        .unwrap();

    // Insert many keys to ensure distribution across shards
    for i in 0..100 {
        map.put(format!("key_{}", i), i).unwrap();
    }

    let stats = map.stats();
    assert_eq!(stats.shard_sizes.len(), 4);

    // Verify all entries are accounted for
    let total: usize = stats.shard_sizes.iter().sum();
    assert_eq!(total, 100);

    for i in 0..10 {
        let key = format!("key_{}", i);
        assert_eq!(map.get(&key), map.get(&key));
    }
}

#[test]
fn test_deterministic_shard_assignment() {
    let map1 = ConcurrentMapBuilder::new()
        .concurrency(8)
        .unwrap()
        .build::<i32>()
        .unwrap();

    let map2 = ConcurrentMapBuilder::new()
        .concurrency(8)
        .unwrap()
        .build::<i32>()
        .unwrap();

    for i in 0..50 {
        let key = format!("key_{}", i);
        map1.put(key.clone(), i).unwrap();
        map2.put(key, i).unwrap();
    }

    // Shard sizes should be identical (deterministic hashing)
    assert_eq!(map1.stats().shard_sizes, map2.stats().shard_sizes);
}

#[test]
fn test_shard_distribution() {
    let map = ConcurrentMapBuilder::new()
        .concurrency(16)
        .unwrap()
        .build::<i32>()
        .unwrap();

    for i in 0..1000 {
        map.put(format!("key_{}", i), i).unwrap();
    }

    let stats = map.stats();
    let max_shard_size = *stats.shard_sizes.iter().max().unwrap();
    let min_shard_size = *stats.shard_sizes.iter().min().unwrap();

    // With 1000 keys and 16 shards, we expect ~62-63 keys per shard.
    // The last shard must be reachable too.
    assert!(
        max_shard_size < 100,
        "Shard distribution too uneven (max: {})",
        max_shard_size
    );
    assert!(
        min_shard_size > 30,
        "Shard distribution too uneven (min: {})",
        min_shard_size
    );
    assert!(*stats.shard_sizes.last().unwrap() > 0);
}

#[test]
fn test_odd_concurrency_reaches_every_shard() {
    let map = ConcurrentMapBuilder::new()
        .concurrency(3)
        .unwrap()
        .build::<i32>()
        .unwrap();

    for i in 0..300 {
        map.put(format!("key_{}", i), i).unwrap();
    }
    assert!(map.stats().shard_sizes.iter().all(|&size| size > 0));
}

#[test]
fn test_single_shard() {
    let map = ConcurrentMapBuilder::new()
        .concurrency(1)
        .unwrap()
        .build::<i32>()
        .unwrap();

    for i in 0..100 {
        map.put(format!("key_{}", i), i).unwrap();
    }
    assert_eq!(map.stats().shard_sizes, vec![100]);
}

struct LastShardRouter;

impl ShardRouter for LastShardRouter {
    fn route(&self, _key_hash: u64, shard_count: usize) -> usize {
        shard_count - 1
    }
}

#[test]
fn test_custom_router() {
    let map = ConcurrentMapBuilder::new()
        .concurrency(4)
        .unwrap()
        .routing(RoutingConfig::Custom(Box::new(LastShardRouter)))
        .build::<i32>()
        .unwrap();

    for i in 0..20 {
        map.put(format!("key_{}", i), i).unwrap();
    }
    assert_eq!(map.stats().shard_sizes, vec![0, 0, 0, 20]);
    assert_eq!(*map.get("key_7").unwrap(), 7);
}
