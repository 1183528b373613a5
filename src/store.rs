//! Change-tracking store
//!
//! A persistent map from canonical file path to a blake3 content
//! fingerprint, backing the `changed`/`unchanged` expression predicates.
//! Every predicate call loads the store, compares and updates the entry,
//! and saves immediately, so each call is durable on its own.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ExecutionError, ExecutionResult};

/// File name of the fingerprint store, one per working directory
pub const STORE_FILE_NAME: &str = ".drover-fingerprints.yaml";

/// Persistent path → fingerprint map
#[derive(Debug, Clone)]
pub struct ChangeStore {
    path: PathBuf,
}

impl ChangeStore {
    /// Create a store handle rooted in the given working directory
    pub fn in_dir(dir: &Path) -> Self {
        ChangeStore {
            path: dir.join(STORE_FILE_NAME),
        }
    }

    /// Create a store handle for an explicit store file path
    pub fn at(path: PathBuf) -> Self {
        ChangeStore { path }
    }

    /// The store file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted map, treating a missing file as empty
    pub fn load(&self) -> ExecutionResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| self.error(e.to_string()))?;
        serde_yaml::from_str(&contents).map_err(|e| self.error(e.to_string()))
    }

    /// Persist the map, replacing the previous contents
    pub fn save(&self, map: &BTreeMap<String, String>) -> ExecutionResult<()> {
        let contents = serde_yaml::to_string(map).map_err(|e| self.error(e.to_string()))?;
        fs::write(&self.path, contents).map_err(|e| self.error(e.to_string()))
    }

    /// Check whether `target` changed since the last call that observed it.
    ///
    /// A file unseen so far, or whose fingerprint differs from the stored
    /// one, counts as changed and the store entry is refreshed. A file
    /// that no longer exists counts as changed and its entry is removed.
    pub fn has_changed(&self, target: &Path) -> ExecutionResult<bool> {
        let key = canonical_key(target);
        let mut map = self.load()?;

        if !target.exists() {
            let was_tracked = map.remove(&key).is_some();
            if was_tracked {
                self.save(&map)?;
            }
            return Ok(true);
        }

        let bytes = fs::read(target).map_err(|e| ExecutionError::ChangeTracking {
            path: target.to_path_buf(),
            reason: e.to_string(),
        })?;
        let fingerprint = blake3::hash(&bytes).to_hex().to_string();

        let changed = map.get(&key) != Some(&fingerprint);
        if changed {
            map.insert(key, fingerprint);
            self.save(&map)?;
        }
        Ok(changed)
    }

    fn error(&self, reason: String) -> ExecutionError {
        ExecutionError::ChangeTracking {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Canonical store key for a path. A path that cannot be resolved (e.g.
/// a file deleted since it was tracked) is keyed by its canonical parent
/// plus file name, so the key matches the one stored while it existed.
pub fn canonical_key(path: &Path) -> String {
    if let Ok(resolved) = path.canonicalize() {
        return resolved.display().to_string();
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .unwrap_or_else(|_| parent.to_path_buf())
            .join(name)
            .display()
            .to_string(),
        _ => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unseen_file_is_changed() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("doc.tex");
        fs::write(&target, "content").unwrap();

        let store = ChangeStore::in_dir(dir.path());
        assert!(store.has_changed(&target).unwrap());
    }

    #[test]
    fn test_unmodified_file_is_unchanged_on_second_call() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("doc.tex");
        fs::write(&target, "content").unwrap();

        let store = ChangeStore::in_dir(dir.path());
        assert!(store.has_changed(&target).unwrap());
        assert!(!store.has_changed(&target).unwrap());
    }

    #[test]
    fn test_modification_is_detected() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("doc.tex");
        fs::write(&target, "content").unwrap();

        let store = ChangeStore::in_dir(dir.path());
        store.has_changed(&target).unwrap();

        fs::write(&target, "different content").unwrap();
        assert!(store.has_changed(&target).unwrap());
        assert!(!store.has_changed(&target).unwrap());
    }

    #[test]
    fn test_deleted_file_is_changed_and_pruned() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("doc.tex");
        fs::write(&target, "content").unwrap();

        let store = ChangeStore::in_dir(dir.path());
        store.has_changed(&target).unwrap();
        let key = canonical_key(&target);

        fs::remove_file(&target).unwrap();
        assert!(store.has_changed(&target).unwrap());
        assert!(!store.load().unwrap().contains_key(&key));
    }

    #[test]
    fn test_store_persists_between_handles() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("doc.tex");
        fs::write(&target, "content").unwrap();

        ChangeStore::in_dir(dir.path()).has_changed(&target).unwrap();
        assert!(!ChangeStore::in_dir(dir.path()).has_changed(&target).unwrap());
    }
}
