//! Content-addressed, TTL-bounded analysis cache.
//!
//! The whole cache is one snapshot under a single persistence key. It is
//! loaded lazily on first use, with expired records dropped at load time,
//! and written back in full after every change.
//!
//! # Failure handling
//!
//! - A snapshot that cannot be decoded starts the cache empty and switches
//!   it to memory only for the rest of the process.
//! - A backend read error starts the cache empty; later writes still go to
//!   the backend.
//! - Write errors are logged and otherwise ignored.
//!
//! No internal locking: the store assumes a single writer and takes
//! `&mut self` for every operation that can touch state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use thermic_core::{
    hash, CacheKey, Clock, MealEntry, StorageError, SystemClock, TefAnalysis, ThermicConfig,
    Timestamp,
};
use tracing::{debug, info, warn};

use crate::record::{CacheRecord, Snapshot};
use crate::traits::{CacheStats, SnapshotStore};

/// The analysis cache.
pub struct CacheStore {
    backend: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    snapshot_key: String,
    records: BTreeMap<CacheKey, CacheRecord>,
    loaded: bool,
    persistence_enabled: bool,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend.backend_name())
            .field("snapshot_key", &self.snapshot_key)
            .field("ttl", &self.ttl)
            .field("records", &self.records.len())
            .field("loaded", &self.loaded)
            .field("persistence_enabled", &self.persistence_enabled)
            .finish()
    }
}

impl CacheStore {
    pub fn new(
        backend: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        config: &ThermicConfig,
    ) -> Self {
        let ttl = Duration::from_std(config.cache_ttl).unwrap_or_else(|_| Duration::days(36_500));
        Self {
            backend,
            clock,
            ttl,
            snapshot_key: config.snapshot_key.clone(),
            records: BTreeMap::new(),
            loaded: false,
            persistence_enabled: true,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Default configuration on the wall clock.
    pub fn with_backend(backend: Arc<dyn SnapshotStore>) -> Self {
        Self::new(backend, Arc::new(SystemClock), &ThermicConfig::default())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ------------------------------------------------------------------------
    // Entry-list API
    // ------------------------------------------------------------------------

    /// Valid cached analysis for these entries, if any.
    pub fn get(&mut self, entries: &[MealEntry]) -> Option<TefAnalysis> {
        self.get_by_key(&hash(entries))
    }

    /// Cache `analysis` for these entries.
    pub fn set(&mut self, entries: &[MealEntry], analysis: TefAnalysis) {
        self.set_by_key(hash(entries), analysis);
    }

    // ------------------------------------------------------------------------
    // Key API
    // ------------------------------------------------------------------------

    /// Look up by precomputed key. An expired record is evicted and the
    /// snapshot rewritten before reporting a miss.
    pub fn get_by_key(&mut self, key: &CacheKey) -> Option<TefAnalysis> {
        if key.is_empty() {
            return None;
        }
        self.ensure_loaded();
        let now = self.clock.now();

        let valid = match self.records.get(key) {
            None => {
                self.misses += 1;
                debug!(key = %key, "Cache miss");
                return None;
            }
            Some(record) => record.is_valid(now, self.ttl),
        };

        if !valid {
            self.records.remove(key);
            self.evictions += 1;
            self.misses += 1;
            debug!(key = %key, "Cache record expired, evicting");
            self.persist();
            return None;
        }

        self.hits += 1;
        debug!(key = %key, "Cache hit");
        self.records.get(key).map(|record| record.analysis.clone())
    }

    /// Store under a precomputed key, sweep other expired records and
    /// persist. The empty key is ignored.
    pub fn set_by_key(&mut self, key: CacheKey, analysis: TefAnalysis) {
        if key.is_empty() {
            debug!("Ignoring cache write for empty meal list");
            return;
        }
        self.ensure_loaded();
        let now = self.clock.now();

        self.records.insert(key.clone(), CacheRecord::new(analysis, now));
        let swept = self.sweep_expired(now, Some(&key));
        debug!(key = %key, swept, size = self.records.len(), "Cached analysis");
        self.persist();
    }

    /// True when a valid record exists. Does not count as a hit or miss and
    /// never evicts.
    pub fn contains_valid(&mut self, key: &CacheKey) -> bool {
        if key.is_empty() {
            return false;
        }
        self.ensure_loaded();
        let now = self.clock.now();
        self.records
            .get(key)
            .is_some_and(|record| record.is_valid(now, self.ttl))
    }

    // ------------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------------

    /// Drop every record and persist an empty snapshot.
    pub fn clear(&mut self) {
        self.loaded = true;
        let dropped = self.records.len();
        self.records.clear();
        info!(dropped, "Cleared analysis cache");
        self.persist();
    }

    pub fn stats(&mut self) -> CacheStats {
        self.ensure_loaded();
        let now = self.clock.now();
        let oldest_age = self
            .records
            .values()
            .map(|record| record.age(now))
            .max()
            .map(|age| age.to_std().unwrap_or_default());

        CacheStats {
            size: self.records.len(),
            oldest_age,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            persistence_enabled: self.persistence_enabled,
        }
    }

    pub fn len(&mut self) -> usize {
        self.ensure_loaded();
        self.records.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence_enabled
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        let bytes = match self.backend.get(&self.snapshot_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %self.snapshot_key, "No persisted snapshot");
                return;
            }
            Err(e) => {
                warn!(
                    backend = self.backend.backend_name(),
                    error = %e,
                    "Failed to read snapshot, starting empty"
                );
                return;
            }
        };

        match Snapshot::decode(&self.snapshot_key, &bytes) {
            Ok(snapshot) => {
                let now = self.clock.now();
                let total = snapshot.records.len();
                self.records = snapshot
                    .records
                    .into_iter()
                    .filter(|(_, record)| record.is_valid(now, self.ttl))
                    .collect();
                info!(
                    loaded = self.records.len(),
                    expired_dropped = total - self.records.len(),
                    "Loaded analysis cache snapshot"
                );
            }
            Err(e) => {
                self.persistence_enabled = false;
                warn!(
                    error = %e,
                    "Snapshot corrupted, continuing in memory only"
                );
            }
        }
    }

    /// Remove expired records other than `keep`. Returns how many went.
    fn sweep_expired(&mut self, now: Timestamp, keep: Option<&CacheKey>) -> usize {
        let ttl = self.ttl;
        let before = self.records.len();
        self.records
            .retain(|key, record| Some(key) == keep || record.is_valid(now, ttl));
        let swept = before - self.records.len();
        self.evictions += swept as u64;
        swept
    }

    fn persist(&mut self) {
        if !self.persistence_enabled {
            return;
        }
        if let Err(e) = self.write_snapshot() {
            warn!(
                backend = self.backend.backend_name(),
                error = %e,
                "Failed to persist analysis cache"
            );
        }
    }

    fn write_snapshot(&self) -> Result<(), StorageError> {
        let bytes = Snapshot::new(self.records.clone()).encode()?;
        self.backend.put(&self.snapshot_key, &bytes)
    }
}
