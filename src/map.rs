use crate::config::{create_hasher, Config, RedistributorConfig, ShardRouter};
use crate::error::Error;
use crate::hash::KeyHasher;
use crate::node::Node;
use crate::redistributor::{DefaultRedistributor, Redistributor};
use crate::shard::Shard;
use crate::stats::{Diagnostics, ShardOps, Stats};
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

/// Concurrent string-keyed map split into independently locked shards.
///
/// Each key is hashed once. The high bits of the hash pick the shard, the
/// low bits pick a chain inside it. Writers to one shard are serialized by
/// that shard's lock; readers never lock. Values are stored behind `Arc<V>`
/// and replaced wholesale on update.
///
/// Reads are weakly consistent: a `get` racing with a `put` or `delete` may
/// observe the state from before that write. Every write that returned
/// before a `get` started is visible to it.
///
/// # Example
///
/// ```rust
/// use chainmap::ConcurrentMap;
///
/// let map = ConcurrentMap::new(4)?;
/// assert!(map.put("key1", "value1")?);
///
/// if let Some(value) = map.get("key1") {
///     assert_eq!(*value, "value1");
/// }
/// # Ok::<(), chainmap::Error>(())
/// ```
pub struct ConcurrentMap<V> {
    shards: Box<[Shard<V>]>,
    router: Box<dyn ShardRouter>,
    hasher: KeyHasher,
    total: AtomicIsize,
}

impl<V> ConcurrentMap<V>
where
    V: Send + Sync + 'static,
{
    /// Create a map with `concurrency` shards and the default redistributor.
    ///
    /// Fails with `InvalidParameter` unless `1 <= concurrency <= MAX_CONCURRENCY`.
    pub fn new(concurrency: usize) -> Result<Self, Error> {
        Self::with_config(Config::new().concurrency(concurrency)?)
    }

    /// Create a map whose shards use the given redistributor thresholds.
    pub fn with_redistributor(
        concurrency: usize,
        redistributor: RedistributorConfig,
    ) -> Result<Self, Error> {
        Self::with_config(
            Config::new()
                .concurrency(concurrency)?
                .redistributor(redistributor),
        )
    }

    /// Create a new map with custom config.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        let redistributor = config.redistributor;
        let chain_count = config.chain_count;
        Self::with_redistributor_factory(config, || {
            Box::new(DefaultRedistributor::new(redistributor, chain_count))
        })
    }

    /// Create a map whose shards each get a redistributor from `factory`.
    ///
    /// The redistributor settings in `config` are ignored.
    pub fn with_redistributor_factory<F>(config: Config, mut factory: F) -> Result<Self, Error>
    where
        F: FnMut() -> Box<dyn Redistributor<V>>,
    {
        config.validate()?;

        let hasher = create_hasher(config.hash_function);
        let shards = (0..config.concurrency)
            .map(|_| Shard::new(config.chain_count, factory()))
            .collect();

        tracing::debug!(
            concurrency = config.concurrency,
            chain_count = config.chain_count,
            "concurrent map created"
        );

        Ok(Self {
            shards,
            router: config.routing.into_router(),
            hasher,
            total: AtomicIsize::new(0),
        })
    }

    /// Figure out which shard this hash belongs to.
    #[inline]
    fn shard_for(&self, hash: u64) -> &Shard<V> {
        &self.shards[self.router.route(hash, self.shards.len())]
    }

    /// Insert or replace a pair. Returns `true` if the key was new.
    ///
    /// A `RedistributionFailure` is returned when the pair was stored but the
    /// chain array resize it triggered had to be abandoned.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chainmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new(4)?;
    /// assert!(map.put("key", 1)?);
    /// assert!(!map.put("key", 2)?);
    /// assert_eq!(*map.get("key").unwrap(), 2);
    /// # Ok::<(), chainmap::Error>(())
    /// ```
    pub fn put(&self, key: impl Into<String>, value: V) -> Result<bool, Error> {
        let key = key.into();
        let hash = self.hasher.hash_key(&key);
        let node = Node::new(key, hash, value);
        match self.shard_for(hash).put(node) {
            Ok(inserted) => {
                if inserted {
                    self.total.fetch_add(1, Ordering::AcqRel);
                }
                Ok(inserted)
            }
            Err(err @ Error::RedistributionFailure(_)) => {
                self.total.fetch_add(1, Ordering::AcqRel);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Get a value by key. Returns an `Arc<V>` so you can share it without copying.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let hash = self.hasher.hash_key(key);
        self.shard_for(hash).get(key, hash)
    }

    /// Check if a key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a pair. Returns `false` if the key was absent.
    ///
    /// A `RedistributionFailure` is returned when the pair was removed but
    /// the chain array resize it triggered had to be abandoned.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chainmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new(4)?;
    /// map.put("key", "value")?;
    /// assert!(map.delete("key")?);
    /// assert!(!map.delete("key")?);
    /// # Ok::<(), chainmap::Error>(())
    /// ```
    pub fn delete(&self, key: &str) -> Result<bool, Error> {
        let hash = self.hasher.hash_key(key);
        match self.shard_for(hash).delete(key, hash) {
            Ok(removed) => {
                if removed {
                    self.total.fetch_sub(1, Ordering::AcqRel);
                }
                Ok(removed)
            }
            Err(err @ Error::RedistributionFailure(_)) => {
                self.total.fetch_sub(1, Ordering::AcqRel);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Approximate number of pairs.
    ///
    /// The counter is updated after each shard operation completes, so under
    /// concurrent writes it can briefly lag the real occupancy.
    pub fn len(&self) -> usize {
        self.total.load(Ordering::Acquire).max(0) as usize
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of shards, fixed at construction.
    pub fn concurrency(&self) -> usize {
        self.shards.len()
    }

    /// Number of pairs in each shard.
    pub fn shard_loads(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.size()).collect()
    }

    /// Get detailed statistics about the map and its shards.
    pub fn stats(&self) -> Stats {
        let shard_sizes = self.shard_loads();
        let chain_counts = self.shards.iter().map(|s| s.chain_count()).collect();
        let operations: Vec<ShardOps> = self.shards.iter().map(|s| s.stats()).collect();

        Stats {
            size: shard_sizes.iter().sum(),
            shard_sizes,
            chain_counts,
            operations,
        }
    }

    /// Get a structured per-shard load and operation snapshot.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::from_shards(self.shards.iter().map(|s| s.diagnostics()).collect())
    }
}
