use std::hash::Hasher;

/// Hash function implementation shared by shard routing and chain selection.
/// Uses an enum so shards can hold a copy without boxing.
#[derive(Clone, Copy)]
pub enum KeyHasher {
    /// AHash with fixed keys (default, fast and well-distributed).
    AHash,
    /// FxHash implementation (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
    /// Caller-supplied function.
    Custom(fn(&str) -> u64),
}

impl KeyHasher {
    /// Hash a key. The same key always produces the same value.
    pub fn hash_key(&self, key: &str) -> u64 {
        match self {
            KeyHasher::AHash => {
                let mut hasher = ahash::AHasher::default();
                hasher.write(key.as_bytes());
                hasher.finish()
            }
            #[cfg(feature = "fxhash")]
            KeyHasher::FxHash => {
                let mut hasher = fxhash::FxHasher64::default();
                hasher.write(key.as_bytes());
                hasher.finish()
            }
            KeyHasher::Custom(f) => f(key),
        }
    }
}

impl Default for KeyHasher {
    fn default() -> Self {
        KeyHasher::AHash
    }
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyHasher::AHash => write!(f, "KeyHasher::AHash"),
            #[cfg(feature = "fxhash")]
            KeyHasher::FxHash => write!(f, "KeyHasher::FxHash"),
            KeyHasher::Custom(_) => write!(f, "KeyHasher::Custom(...)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = KeyHasher::AHash;
        let b = KeyHasher::default();
        assert_eq!(a.hash_key("alpha"), b.hash_key("alpha"));
        assert_ne!(a.hash_key("alpha"), a.hash_key("beta"));
    }

    #[test]
    fn test_custom_hasher() {
        let hasher = KeyHasher::Custom(|key| key.len() as u64);
        assert_eq!(hasher.hash_key("abc"), 3);
        assert_eq!(hasher.hash_key(""), 0);
    }
}
