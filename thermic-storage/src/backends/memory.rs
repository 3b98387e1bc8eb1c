//! Process-local snapshot store.

use crate::traits::SnapshotStore;
use std::collections::HashMap;
use std::sync::RwLock;
use thermic_core::StorageError;

/// Keeps values in a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let values = self.values.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut values = self.values.write().map_err(|_| StorageError::LockPoisoned)?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut values = self.values.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(values.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut values = self.values.write().map_err(|_| StorageError::LockPoisoned)?;
        values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete_clear() {
        let store = InMemorySnapshotStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.put("a", b"1").unwrap();
        store.put("b", b"2").unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.len(), 2);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());

        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
