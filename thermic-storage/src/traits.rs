//! Persistence capability and cache statistics.

use std::time::Duration;
use thermic_core::StorageError;

// ============================================================================
// SNAPSHOT STORE
// ============================================================================

/// Abstract key/value persistence used for the cache snapshot.
///
/// Implementations only move bytes; encoding and expiry belong to
/// [`crate::CacheStore`]. Every operation is best-effort from the cache's
/// point of view: errors are logged and absorbed by the caller.
pub trait SnapshotStore: Send + Sync {
    /// Short backend name for logs and errors.
    fn backend_name(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Returns whether a value was present.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Remove every stored value.
    fn clear(&self) -> Result<(), StorageError>;
}

// ============================================================================
// CACHE STATS
// ============================================================================

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of records currently held.
    pub size: usize,
    /// Age of the oldest record, if any.
    pub oldest_age: Option<Duration>,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing valid.
    pub misses: u64,
    /// Records dropped for exceeding the TTL.
    pub evictions: u64,
    /// False once a corrupted snapshot has switched the cache to memory only.
    pub persistence_enabled: bool,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let empty = CacheStats::default();
        assert_eq!(empty.hit_rate(), 0.0);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
