//! # ChainMap
//!
//! A concurrent string-keyed map with sharded writers and lock-free readers.
//!
//! ChainMap splits your data across a fixed number of shards, each with its
//! own lock. Inside a shard, pairs live in hash chains that are rewritten
//! copy-on-write and published atomically, so lookups never take a lock and
//! never wait for a writer. Each shard grows or shrinks its chain array on
//! its own as its load changes, without stopping readers. Values are stored
//! behind `Arc<T>` so you can share them without copying.
//!
//! ## Features
//!
//! - **Sharded Writers**: inserts and deletes only contend within one shard
//! - **Lock-Free Reads**: lookups walk an atomically published snapshot
//! - **Online Resizing**: chain arrays are rehashed into a fresh array and
//!   swapped in one step; a failed resize leaves the old array in place
//! - **Pluggable**: choose the hash function, shard router and redistributor
//! - **Statistics**: per-shard load and operation tracking
//!
//! ## Example
//!
//! ```rust
//! use chainmap::ConcurrentMap;
//!
//! let map = ConcurrentMap::new(16)?;
//!
//! // Insert values
//! assert!(map.put("key1", "value1")?);
//! assert!(map.put("key2", "value2")?);
//!
//! // Replace a value
//! assert!(!map.put("key1", "value3")?);
//!
//! // Read values (zero-copy via Arc)
//! if let Some(value) = map.get("key1") {
//!     println!("Found: {}", *value);
//! }
//!
//! // Delete values
//! assert!(map.delete("key2")?);
//! assert_eq!(map.len(), 1);
//! # Ok::<(), chainmap::Error>(())
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use chainmap::{ConcurrentMapBuilder, HashFunction, RedistributorConfig};
//!
//! let map = ConcurrentMapBuilder::new()
//!     .concurrency(32)?
//!     .chain_count(64)?
//!     .hash_function(HashFunction::AHash)
//!     .redistributor(RedistributorConfig::new().load_factor(2.0)?)
//!     .build::<i32>()?;
//! # Ok::<(), chainmap::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Hash chains.
pub mod chain;
/// Configuration and builder types.
pub mod config;
/// Error types.
pub mod error;
/// Hash function implementations.
pub mod hash;
/// Main ConcurrentMap implementation.
pub mod map;
/// Key-value nodes.
pub mod node;
/// Chain array growth and shrink policy.
pub mod redistributor;
mod shard;
/// Statistics and metrics collection.
pub mod stats;

// Re-export main types
pub use chain::Chain;
pub use config::{
    ConcurrentMapBuilder, Config, DefaultRouter, HashFunction, RedistributorConfig,
    RoutingConfig, ShardRouter, MAX_CONCURRENCY,
};
pub use error::Error;
pub use map::ConcurrentMap;
pub use node::Node;
pub use redistributor::{ChainStatus, DefaultRedistributor, Redistributor};
pub use stats::{Diagnostics, ShardDiagnostics, ShardOps, Stats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let map = ConcurrentMap::new(4).unwrap();

        assert!(map.put("a", 1).unwrap());
        assert!(map.put("b", 2).unwrap());
        assert!(!map.put("a", 3).unwrap());
        assert_eq!(*map.get("a").unwrap(), 3);
        assert!(map.delete("b").unwrap());
        assert!(map.get("b").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_invalid_concurrency() {
        assert!(matches!(
            ConcurrentMap::<i32>::new(0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            ConcurrentMap::<i32>::new(MAX_CONCURRENCY + 1),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_stats() {
        let map = ConcurrentMap::new(8).unwrap();
        map.put("key1", "value1").unwrap();
        map.put("key2", "value2").unwrap();

        let stats = map.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.shard_sizes.len(), 8);
        assert_eq!(stats.chain_counts, vec![config::DEFAULT_CHAIN_COUNT; 8]);
    }

    #[test]
    fn test_builder() {
        let map = ConcurrentMapBuilder::new()
            .concurrency(8)
            .unwrap()
            .build::<i32>()
            .unwrap();

        map.put("test", 42).unwrap();
        assert_eq!(*map.get("test").unwrap(), 42);
        assert_eq!(map.concurrency(), 8);
    }
}
