use crate::error::Error;
use crate::hash::KeyHasher;

/// Upper bound on the number of shards a map may be created with.
pub const MAX_CONCURRENCY: usize = 65536;
/// Shard count used by `Config::default()`.
pub const DEFAULT_CONCURRENCY: usize = 16;
/// Initial number of chains in each shard.
pub const DEFAULT_CHAIN_COUNT: usize = 16;
/// Pairs per chain above which a shard grows.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;
/// Fraction of the growth threshold below which a shard shrinks.
pub const DEFAULT_SHRINK_RATIO: f64 = 0.25;
/// Length of a single chain that forces growth regardless of the total.
pub const DEFAULT_MAX_CHAIN_SIZE: usize = 1000;
/// Largest chain array a shard grows to.
pub const DEFAULT_MAX_CHAIN_COUNT: usize = 1 << 24;

/// Which hash function to use for keys.
#[derive(Debug, Clone, Copy, Default)]
pub enum HashFunction {
    /// Use ahash (default, fast and well-distributed).
    #[default]
    AHash,
    /// Use fxhash (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
    /// Use a caller-supplied function. It must be deterministic.
    Custom(fn(&str) -> u64),
}

/// User-provided shard selection. Enables stateful or custom routing.
pub trait ShardRouter: Send + Sync {
    /// Return the shard index in `[0, shard_count)` for the given key hash.
    fn route(&self, key_hash: u64, shard_count: usize) -> usize;
}

/// Default routing on the high bits of the hash.
///
/// Chains inside a shard are selected with `hash % chain_count`, which
/// consumes the low bits. Routing folds the hash to 32 bits, keeps the upper
/// 16 bits of the fold and reduces them modulo `shard_count`, so the two
/// levels do not cluster together.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRouter;

impl ShardRouter for DefaultRouter {
    #[inline]
    fn route(&self, key_hash: u64, shard_count: usize) -> usize {
        if shard_count == 1 {
            return 0;
        }
        let folded = (key_hash ^ (key_hash >> 32)) as u32;
        (folded >> 16) as usize % shard_count
    }
}

/// Routing strategy for shard selection.
#[derive(Default)]
pub enum RoutingConfig {
    /// Default: high-bit fold, see [`DefaultRouter`].
    #[default]
    Default,
    /// User-provided router (e.g. stateful or custom distribution).
    Custom(Box<dyn ShardRouter>),
}

impl std::fmt::Debug for RoutingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingConfig::Default => write!(f, "RoutingConfig::Default"),
            RoutingConfig::Custom(_) => write!(f, "RoutingConfig::Custom(...)"),
        }
    }
}

impl RoutingConfig {
    pub(crate) fn into_router(self) -> Box<dyn ShardRouter> {
        match self {
            RoutingConfig::Default => Box::new(DefaultRouter),
            RoutingConfig::Custom(router) => router,
        }
    }
}

/// Parameters of the default redistributor, shared by every shard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedistributorConfig {
    pub(crate) load_factor: f64,
    pub(crate) shrink_ratio: f64,
    pub(crate) max_chain_size: usize,
    pub(crate) min_chain_count: usize,
    pub(crate) max_chain_count: usize,
}

impl RedistributorConfig {
    /// Create a config with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the load factor. Must be finite and greater than 0.
    pub fn load_factor(mut self, load_factor: f64) -> Result<Self, Error> {
        if !load_factor.is_finite() || load_factor <= 0.0 {
            return Err(Error::invalid_parameter(
                "load factor must be finite and greater than 0",
            ));
        }
        self.load_factor = load_factor;
        Ok(self)
    }

    /// Set the shrink ratio. Must lie strictly between 0 and 0.5 so that a
    /// halved chain array is never immediately over its growth threshold.
    pub fn shrink_ratio(mut self, ratio: f64) -> Result<Self, Error> {
        if !(ratio > 0.0 && ratio < 0.5) {
            return Err(Error::invalid_parameter(
                "shrink ratio must lie strictly between 0 and 0.5",
            ));
        }
        self.shrink_ratio = ratio;
        Ok(self)
    }

    /// Set the chain length that forces growth. Must be greater than 0.
    pub fn max_chain_size(mut self, size: usize) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::invalid_parameter(
                "max chain size must be greater than 0",
            ));
        }
        self.max_chain_size = size;
        Ok(self)
    }

    /// Set the bounds on the number of chains per shard.
    pub fn chain_count_bounds(mut self, min: usize, max: usize) -> Result<Self, Error> {
        if min == 0 || min > max {
            return Err(Error::invalid_parameter(
                "chain count bounds must satisfy 0 < min <= max",
            ));
        }
        self.min_chain_count = min;
        self.max_chain_count = max;
        Ok(self)
    }
}

impl Default for RedistributorConfig {
    fn default() -> Self {
        Self {
            load_factor: DEFAULT_LOAD_FACTOR,
            shrink_ratio: DEFAULT_SHRINK_RATIO,
            max_chain_size: DEFAULT_MAX_CHAIN_SIZE,
            min_chain_count: DEFAULT_CHAIN_COUNT,
            max_chain_count: DEFAULT_MAX_CHAIN_COUNT,
        }
    }
}

/// Configuration for a ConcurrentMap instance.
#[derive(Debug)]
pub struct Config {
    pub(crate) concurrency: usize,
    pub(crate) hash_function: HashFunction,
    pub(crate) chain_count: usize,
    pub(crate) redistributor: RedistributorConfig,
    pub(crate) routing: RoutingConfig,
}

impl Config {
    /// Create a new config with defaults (16 shards, 16 chains each, ahash).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of shards. Must lie in `1..=MAX_CONCURRENCY`.
    pub fn concurrency(mut self, concurrency: usize) -> Result<Self, Error> {
        check_concurrency(concurrency)?;
        self.concurrency = concurrency;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    /// Set the initial number of chains per shard. Must be greater than 0.
    pub fn chain_count(mut self, count: usize) -> Result<Self, Error> {
        if count == 0 {
            return Err(Error::invalid_parameter(
                "chain count must be greater than 0",
            ));
        }
        self.chain_count = count;
        Ok(self)
    }

    /// Set the redistributor thresholds.
    pub fn redistributor(mut self, redistributor: RedistributorConfig) -> Self {
        self.redistributor = redistributor;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        check_concurrency(self.concurrency)?;
        if self.chain_count == 0 {
            return Err(Error::invalid_parameter(
                "chain count must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            hash_function: HashFunction::AHash,
            chain_count: DEFAULT_CHAIN_COUNT,
            redistributor: RedistributorConfig::default(),
            routing: RoutingConfig::Default,
        }
    }
}

/// Builder for creating a ConcurrentMap with custom configuration.
pub struct ConcurrentMapBuilder {
    config: Config,
}

impl ConcurrentMapBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the number of shards. Must lie in `1..=MAX_CONCURRENCY`.
    pub fn concurrency(mut self, concurrency: usize) -> Result<Self, Error> {
        self.config = self.config.concurrency(concurrency)?;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// Set the initial number of chains per shard.
    pub fn chain_count(mut self, count: usize) -> Result<Self, Error> {
        self.config = self.config.chain_count(count)?;
        Ok(self)
    }

    /// Set the redistributor thresholds.
    pub fn redistributor(mut self, redistributor: RedistributorConfig) -> Self {
        self.config = self.config.redistributor(redistributor);
        self
    }

    /// Use a custom shard router (e.g. for stateful or custom distribution).
    pub fn routing(mut self, routing: RoutingConfig) -> Self {
        self.config.routing = routing;
        self
    }

    /// Build a ConcurrentMap with the configured settings.
    pub fn build<V>(self) -> Result<crate::ConcurrentMap<V>, Error>
    where
        V: Send + Sync + 'static,
    {
        crate::ConcurrentMap::with_config(self.config)
    }
}

impl Default for ConcurrentMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_concurrency(concurrency: usize) -> Result<(), Error> {
    if concurrency == 0 {
        return Err(Error::invalid_parameter("concurrency is too small"));
    }
    if concurrency > MAX_CONCURRENCY {
        return Err(Error::invalid_parameter("concurrency is too large"));
    }
    Ok(())
}

/// Create a hash function instance based on the configuration.
pub(crate) fn create_hasher(hash_fn: HashFunction) -> KeyHasher {
    match hash_fn {
        HashFunction::AHash => KeyHasher::AHash,
        #[cfg(feature = "fxhash")]
        HashFunction::FxHash => KeyHasher::FxHash,
        HashFunction::Custom(f) => KeyHasher::Custom(f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_router_single_shard() {
        let router = DefaultRouter;
        assert_eq!(router.route(u64::MAX, 1), 0);
        assert_eq!(router.route(0, 1), 0);
    }

    #[test]
    fn test_default_router_uses_high_bits() {
        let router = DefaultRouter;
        // Low 16 bits never influence the shard.
        assert_eq!(router.route(0xFFFF, 8), router.route(0, 8));
        assert_eq!(router.route(3 << 16, 8), 3);
        assert_eq!(router.route(3 << 48, 8), 3);
    }

    #[test]
    fn test_default_router_reaches_last_shard() {
        let router = DefaultRouter;
        assert_eq!(router.route(7 << 16, 8), 7);
        assert_eq!(router.route(9 << 16, 8), 1);
    }

    #[test]
    fn test_concurrency_bounds() {
        assert!(Config::new().concurrency(0).is_err());
        assert!(Config::new().concurrency(MAX_CONCURRENCY + 1).is_err());
        assert!(Config::new().concurrency(1).is_ok());
        assert!(Config::new().concurrency(MAX_CONCURRENCY).is_ok());
    }

    #[test]
    fn test_redistributor_config_validation() {
        assert!(RedistributorConfig::new().load_factor(0.0).is_err());
        assert!(RedistributorConfig::new().load_factor(f64::NAN).is_err());
        assert!(RedistributorConfig::new().shrink_ratio(0.5).is_err());
        assert!(RedistributorConfig::new().shrink_ratio(0.0).is_err());
        assert!(RedistributorConfig::new().max_chain_size(0).is_err());
        assert!(RedistributorConfig::new().chain_count_bounds(0, 4).is_err());
        assert!(RedistributorConfig::new().chain_count_bounds(8, 4).is_err());

        let config = RedistributorConfig::new()
            .load_factor(2.0)
            .unwrap()
            .shrink_ratio(0.1)
            .unwrap();
        assert_eq!(config.load_factor, 2.0);
        assert_eq!(config.shrink_ratio, 0.1);
    }
}
