//! THERMIC Storage - Analysis Cache and Snapshot Persistence
//!
//! - [`CacheStore`]: content-addressed, TTL-bounded map from cache key to
//!   analysis, persisted as one versioned snapshot
//! - [`SnapshotStore`]: the get/put/delete/clear persistence capability
//! - backends: in-memory, JSON file directory, LMDB

pub mod backends;
pub mod record;
pub mod store;
pub mod traits;

pub use backends::{FileSnapshotStore, InMemorySnapshotStore, LmdbSnapshotStore};
pub use record::{CacheRecord, Snapshot, SNAPSHOT_VERSION};
pub use store::CacheStore;
pub use traits::{CacheStats, SnapshotStore};
