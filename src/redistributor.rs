//! Growth and shrink decisions for a shard's chain array.

use crate::chain::Chain;
use crate::config::RedistributorConfig;
use crate::error::Error;
use crossbeam_epoch::Guard;

/// Load classification of a shard after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// Nothing to do.
    Normal,
    /// Too many pairs for the chain array, or one chain is too long.
    Overloaded,
    /// Few enough pairs that the chain array could be smaller.
    Underloaded,
}

/// Decides when a shard's chain array must change size and builds the
/// replacement.
///
/// A shard calls the three methods in order, while holding its lock, after
/// every insert and delete. A returned array replaces the shard's current
/// one in a single atomic store; readers never see a half-built array.
pub trait Redistributor<V>: Send {
    /// Recompute thresholds for the current pair total and chain count.
    fn update_threshold(&mut self, pair_total: usize, chain_count: usize);

    /// Classify the shard. `chain_size` is the length of the chain that was
    /// just mutated.
    fn check_chain_status(&mut self, pair_total: usize, chain_size: usize) -> ChainStatus;

    /// Build a replacement chain array, or return `None` to keep `chains`.
    ///
    /// `chains` must not be modified. On error the shard keeps its current
    /// array.
    fn redistribute(
        &mut self,
        status: ChainStatus,
        chains: &[Chain<V>],
        guard: &Guard,
    ) -> Result<Option<Vec<Chain<V>>>, Error>;
}

/// Doubling/halving redistributor driven by a load factor.
///
/// A chain longer than `max_chain_size` also triggers growth, but only on
/// insert and only to the smallest multiple of the current length that
/// actually splits such a chain. Keys that share a full hash never cause
/// growth. While the pair total exceeds `max_chain_size`, the array is never
/// shrunk back below the length such a growth reached.
#[derive(Debug, Clone)]
pub struct DefaultRedistributor {
    config: RedistributorConfig,
    pair_total: usize,
    inserting: bool,
    grow_threshold: usize,
    shrink_threshold: usize,
    length_floor: usize,
}

impl DefaultRedistributor {
    /// Create a redistributor for a shard that starts with `chain_count` chains.
    pub fn new(config: RedistributorConfig, chain_count: usize) -> Self {
        let mut redistributor = Self {
            config,
            pair_total: 0,
            inserting: false,
            grow_threshold: 0,
            shrink_threshold: 0,
            length_floor: 0,
        };
        redistributor.set_thresholds(chain_count);
        redistributor
    }

    /// Pair total above which the shard grows.
    pub fn grow_threshold(&self) -> usize {
        self.grow_threshold
    }

    /// Pair total below which the shard shrinks.
    pub fn shrink_threshold(&self) -> usize {
        self.shrink_threshold
    }

    fn growth_limit(&self, chain_count: usize) -> usize {
        (chain_count as f64 * self.config.load_factor) as usize
    }

    fn set_thresholds(&mut self, chain_count: usize) {
        self.grow_threshold = self.growth_limit(chain_count);
        self.shrink_threshold = (self.grow_threshold as f64 * self.config.shrink_ratio) as usize;
    }

    /// Smallest grown length at which some over-long chain spreads over more
    /// than one index, or `None` if none does below `max_chain_count`.
    fn split_target<V>(&self, chains: &[Chain<V>], guard: &Guard) -> Option<usize> {
        let long: Vec<&Chain<V>> = chains
            .iter()
            .filter(|chain| chain.size() > self.config.max_chain_size)
            .collect();
        if long.is_empty() {
            return None;
        }

        let mut target = chains.len();
        while target < self.config.max_chain_count {
            target = target.saturating_mul(2).min(self.config.max_chain_count);
            let spreads = long.iter().any(|chain| {
                let mut indexes = chain
                    .nodes(guard)
                    .map(|node| node.hash() % target as u64);
                match indexes.next() {
                    Some(first) => indexes.any(|index| index != first),
                    None => false,
                }
            });
            if spreads {
                return Some(target);
            }
        }
        None
    }
}

impl<V: Send + Sync + 'static> Redistributor<V> for DefaultRedistributor {
    fn update_threshold(&mut self, pair_total: usize, chain_count: usize) {
        self.inserting = pair_total > self.pair_total;
        self.pair_total = pair_total;
        self.set_thresholds(chain_count);
    }

    fn check_chain_status(&mut self, pair_total: usize, chain_size: usize) -> ChainStatus {
        let chain_too_long = self.inserting && chain_size > self.config.max_chain_size;
        if pair_total > self.grow_threshold || chain_too_long {
            ChainStatus::Overloaded
        } else if pair_total < self.shrink_threshold {
            ChainStatus::Underloaded
        } else {
            ChainStatus::Normal
        }
    }

    fn redistribute(
        &mut self,
        status: ChainStatus,
        chains: &[Chain<V>],
        guard: &Guard,
    ) -> Result<Option<Vec<Chain<V>>>, Error> {
        let current = chains.len();
        let (target, by_length) = match status {
            ChainStatus::Normal => return Ok(None),
            ChainStatus::Overloaded => {
                if current >= self.config.max_chain_count {
                    return Ok(None);
                }
                if self.pair_total > self.grow_threshold {
                    (current.saturating_mul(2).min(self.config.max_chain_count), false)
                } else {
                    // Only a chain is too long.
                    match self.split_target(chains, guard) {
                        Some(target) => (target, true),
                        None => return Ok(None),
                    }
                }
            }
            ChainStatus::Underloaded => {
                // No chain can exceed the cap once the total is below it.
                if self.pair_total <= self.config.max_chain_size {
                    self.length_floor = 0;
                }
                let halved = (current / 2)
                    .max(self.config.min_chain_count)
                    .max(self.length_floor);
                // Hysteresis: never shrink into an array that is already
                // over its own growth threshold.
                if halved >= current || self.pair_total > self.growth_limit(halved) {
                    return Ok(None);
                }
                (halved, false)
            }
        };

        let fresh = rehash(chains, target, guard)?;
        if by_length {
            self.length_floor = target;
        }
        Ok(Some(fresh))
    }
}

/// Copy every pair of `chains` into a fresh array of `chain_count` chains,
/// placing each by `hash % chain_count`. `chains` is left untouched.
pub fn rehash<V: Send + Sync + 'static>(
    chains: &[Chain<V>],
    chain_count: usize,
    guard: &Guard,
) -> Result<Vec<Chain<V>>, Error> {
    if chain_count == 0 {
        return Err(Error::redistribution("chain count must be greater than 0"));
    }
    let mut fresh = Vec::new();
    fresh
        .try_reserve_exact(chain_count)
        .map_err(|err| Error::redistribution(err.to_string()))?;
    fresh.resize_with(chain_count, Chain::new);

    for node in chains.iter().flat_map(|chain| chain.nodes(guard)) {
        let index = (node.hash() % chain_count as u64) as usize;
        fresh[index]
            .put(node.copy(guard), guard)
            .map_err(|err| Error::redistribution(err.to_string()))?;
    }
    Ok(fresh)
}
