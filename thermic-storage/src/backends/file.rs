//! One JSON file per key inside a directory.

use crate::traits::SnapshotStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thermic_core::StorageError;

const EXTENSION: &str = "json";

/// Stores each key as `<dir>/<sanitized key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path used for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Backend {
        backend: "file".to_string(),
        reason: format!("{}: {}", path.display(), e),
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION) {
                std::fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileSnapshotStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = FileSnapshotStore::open(temp_dir.path()).expect("store should open");
        (store, temp_dir)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (store, _dir) = create_test_store();
        assert_eq!(store.get("tef_analysis_cache").unwrap(), None);

        store.put("tef_analysis_cache", b"{\"version\":1}").unwrap();
        assert_eq!(
            store.get("tef_analysis_cache").unwrap(),
            Some(b"{\"version\":1}".to_vec())
        );
        assert!(store.path_for("tef_analysis_cache").exists());
    }

    #[test]
    fn test_survives_reopen() {
        let (store, dir) = create_test_store();
        store.put("k", b"v").unwrap();
        drop(store);

        let reopened = FileSnapshotStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_key_is_sanitized() {
        let (store, dir) = create_test_store();
        let path = store.path_for("../escape/attempt");
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[test]
    fn test_delete_and_clear() {
        let (store, dir) = create_test_store();
        store.put("a", b"1").unwrap();
        store.put("b", b"2").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());

        store.clear().unwrap();
        assert_eq!(store.get("b").unwrap(), None);
        assert!(dir.path().join("notes.txt").exists());
    }
}
