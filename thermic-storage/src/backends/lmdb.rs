//! LMDB-backed snapshot store.
//!
//! Uses the heed crate (Rust bindings for LMDB): a memory-mapped key-value
//! store that keeps the snapshot across restarts with ACID writes.
//!
//! - Read transactions for `get`
//! - Write transactions for `put`, `delete` and `clear`

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use thermic_core::StorageError;

use crate::traits::SnapshotStore;

const BACKEND: &str = "lmdb";

fn lmdb_error(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend {
        backend: BACKEND.to_string(),
        reason: format!("{}: {}", context, e),
    }
}

/// LMDB environment with a single unnamed database.
pub struct LmdbSnapshotStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbSnapshotStore {
    /// Open (or create) an environment under `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the map in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&path).map_err(|e| lmdb_error("create dir", e))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| lmdb_error("open environment", e))?;

        let mut wtxn = env.write_txn().map_err(|e| lmdb_error("write txn", e))?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| lmdb_error("create database", e))?;
        wtxn.commit().map_err(|e| lmdb_error("commit", e))?;

        Ok(Self { env, db })
    }
}

impl SnapshotStore for LmdbSnapshotStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let rtxn = self.env.read_txn().map_err(|e| lmdb_error("read txn", e))?;
        let value = self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(|e| lmdb_error("get", e))?;
        Ok(value.map(|bytes| bytes.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut wtxn = self.env.write_txn().map_err(|e| lmdb_error("write txn", e))?;
        self.db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(|e| lmdb_error("put", e))?;
        wtxn.commit().map_err(|e| lmdb_error("commit", e))
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut wtxn = self.env.write_txn().map_err(|e| lmdb_error("write txn", e))?;
        let existed = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| lmdb_error("delete", e))?;
        wtxn.commit().map_err(|e| lmdb_error("commit", e))?;
        Ok(existed)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut wtxn = self.env.write_txn().map_err(|e| lmdb_error("write txn", e))?;
        self.db
            .clear(&mut wtxn)
            .map_err(|e| lmdb_error("clear", e))?;
        wtxn.commit().map_err(|e| lmdb_error("commit", e))
    }
}
