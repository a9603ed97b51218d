use crate::chain::Chain;
use crate::error::Error;
use crate::node::Node;
use crate::redistributor::Redistributor;
use crate::stats::{ShardDiagnostics, ShardOps, ShardStats};
use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The chain array of a shard. Its length never changes once published.
struct ChainArray<V> {
    chains: Box<[Chain<V>]>,
}

impl<V> ChainArray<V> {
    fn new(chains: Vec<Chain<V>>) -> Self {
        Self {
            chains: chains.into_boxed_slice(),
        }
    }

    fn len(&self) -> usize {
        self.chains.len()
    }

    #[inline]
    fn chain_for(&self, hash: u64) -> &Chain<V> {
        &self.chains[(hash % self.chains.len() as u64) as usize]
    }

    fn pair_count(&self) -> usize {
        self.chains.iter().map(Chain::size).sum()
    }
}

/// One independently locked partition of the map.
///
/// The lock serializes inserts, deletes and resizes of this shard and owns
/// the shard's redistributor. The chain array is published through an
/// epoch-managed pointer, so lookups take no lock at all: one atomic load
/// yields an array together with its length, and a replaced array stays
/// allocated until every reader that could see it has unpinned.
pub(crate) struct Shard<V> {
    chains: Atomic<ChainArray<V>>,
    pair_total: AtomicUsize,
    redistributor: Mutex<Box<dyn Redistributor<V>>>,
    stats: ShardStats,
}

impl<V> Shard<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(chain_count: usize, redistributor: Box<dyn Redistributor<V>>) -> Self {
        let chains = (0..chain_count.max(1)).map(|_| Chain::new()).collect();
        Self {
            chains: Atomic::new(ChainArray::new(chains)),
            pair_total: AtomicUsize::new(0),
            redistributor: Mutex::new(redistributor),
            stats: ShardStats::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Redistributor<V>>> {
        #[cfg(feature = "lock-timing")]
        let start = std::time::Instant::now();
        let guard = self.redistributor.lock();
        #[cfg(feature = "lock-timing")]
        self.stats.record_lock_wait(start.elapsed().as_nanos() as u64);
        self.stats.record_lock_acquisition();
        guard
    }

    fn array<'g>(&self, guard: &'g Guard) -> &'g ChainArray<V> {
        // SAFETY: the pointer is never null, and a replaced array is retired
        // through the epoch so it outlives every guard that loaded it.
        unsafe { self.chains.load(Ordering::Acquire, guard).deref() }
    }

    /// Insert or update a pair. Returns `true` when a new pair was inserted.
    ///
    /// A `RedistributionFailure` means the pair was inserted but the resize
    /// it triggered was abandoned.
    pub fn put(&self, node: Node<V>) -> Result<bool, Error> {
        let guard = &epoch::pin();
        let mut redistributor = self.lock();
        let array = self.array(guard);
        let chain = array.chain_for(node.hash());

        // SAFETY: the shard lock serializes every writer of this chain.
        let inserted = unsafe { chain.put_exclusive(node, guard) }?;
        self.stats.record_write();
        if inserted {
            let pair_total = self.pair_total.fetch_add(1, Ordering::AcqRel) + 1;
            self.rebalance(&mut **redistributor, pair_total, chain.size(), array, guard)?;
        }
        Ok(inserted)
    }

    /// Look up `key`, whose hash the caller already computed.
    pub fn get(&self, key: &str, hash: u64) -> Option<Arc<V>> {
        let guard = &epoch::pin();
        let value = self
            .array(guard)
            .chain_for(hash)
            .get(key, guard)
            .map(|node| node.value(guard));
        if value.is_some() {
            self.stats.record_read();
        }
        value
    }

    /// Remove `key`, whose hash the caller already computed. Returns
    /// `false` if it was absent.
    ///
    /// A `RedistributionFailure` means the pair was removed but the resize
    /// it triggered was abandoned.
    pub fn delete(&self, key: &str, hash: u64) -> Result<bool, Error> {
        let guard = &epoch::pin();
        let mut redistributor = self.lock();
        let array = self.array(guard);
        let chain = array.chain_for(hash);

        // SAFETY: the shard lock serializes every writer of this chain.
        if !unsafe { chain.delete_exclusive(key, guard) } {
            return Ok(false);
        }
        self.stats.record_remove();
        let pair_total = self.pair_total.fetch_sub(1, Ordering::AcqRel) - 1;
        self.rebalance(&mut **redistributor, pair_total, chain.size(), array, guard)?;
        Ok(true)
    }

    /// Number of pairs in this shard.
    pub fn size(&self) -> usize {
        self.pair_total.load(Ordering::Acquire)
    }

    /// Current length of the chain array.
    pub fn chain_count(&self) -> usize {
        self.array(&epoch::pin()).len()
    }

    /// Get a snapshot of statistics for this shard.
    pub fn stats(&self) -> ShardOps {
        self.stats.snapshot()
    }

    pub fn diagnostics(&self) -> ShardDiagnostics {
        let entries = self.size();
        let chains = self.chain_count();
        ShardDiagnostics {
            entries,
            chains,
            load_factor: entries as f64 / chains as f64,
            ops: self.stats(),
        }
    }

    /// Run the redistribution sequence. Must be called with the lock held.
    fn rebalance(
        &self,
        redistributor: &mut dyn Redistributor<V>,
        pair_total: usize,
        chain_size: usize,
        array: &ChainArray<V>,
        guard: &Guard,
    ) -> Result<(), Error> {
        let result = self.try_rebalance(redistributor, pair_total, chain_size, array, guard);
        if let Err(err) = &result {
            tracing::warn!(error = %err, pairs = pair_total, "chain redistribution failed");
        }
        result
    }

    fn try_rebalance(
        &self,
        redistributor: &mut dyn Redistributor<V>,
        pair_total: usize,
        chain_size: usize,
        array: &ChainArray<V>,
        guard: &Guard,
    ) -> Result<(), Error> {
        redistributor.update_threshold(pair_total, array.len());
        let status = redistributor.check_chain_status(pair_total, chain_size);
        let Some(fresh) = redistributor.redistribute(status, &array.chains, guard)? else {
            return Ok(());
        };

        if fresh.is_empty() {
            return Err(Error::redistribution("replacement chain array is empty"));
        }
        let expected = array.pair_count();
        let actual: usize = fresh.iter().map(Chain::size).sum();
        if actual != expected {
            return Err(Error::redistribution(format!(
                "replacement chain array holds {} pairs, expected {}",
                actual, expected
            )));
        }

        let (from, to) = (array.len(), fresh.len());
        let previous = self
            .chains
            .swap(Owned::new(ChainArray::new(fresh)), Ordering::AcqRel, guard);
        // SAFETY: `previous` is unreachable for new readers after the swap;
        // it is dropped, together with its nodes, once current readers unpin.
        unsafe { guard.defer_destroy(previous) };

        self.stats.record_resize(to > from);
        tracing::debug!(from, to, pairs = pair_total, "chain array redistributed");
        Ok(())
    }
}

impl<V> Drop for Shard<V> {
    fn drop(&mut self) {
        // SAFETY: dropping needs exclusive access, so no reader holds the array.
        unsafe {
            let array = self.chains.load(Ordering::Relaxed, epoch::unprotected());
            if !array.is_null() {
                drop(array.into_owned());
            }
        }
    }
}
