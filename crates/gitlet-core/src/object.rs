//! Content-addressable object store.
//!
//! Blobs live in `.gitlet/blobs/` using a 2-character prefix directory
//! scheme and are stored as raw bytes. Commits live in `.gitlet/commits/`
//! as `<id>.json`. Both kinds are immutable once written.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::commit::Commit;
use crate::error::{GitletError, GitletResult};
use crate::fsutil::atomic_write;
use crate::graph::ParentLookup;
use crate::hash::{hash_bytes, is_full_id};

/// The object store manages blob and commit storage on disk.
pub struct ObjectStore {
    /// `.gitlet/blobs/`
    blobs: PathBuf,
    /// `.gitlet/commits/`
    commits: PathBuf,
}

impl ObjectStore {
    /// Create a store over existing blob and commit directories.
    pub fn new(blobs_dir: &Path, commits_dir: &Path) -> Self {
        Self {
            blobs: blobs_dir.to_path_buf(),
            commits: commits_dir.to_path_buf(),
        }
    }

    /// Store bytes and return their content hash.
    ///
    /// If the blob already exists this is a no-op that returns the
    /// existing hash.
    pub fn put_blob(&self, data: &[u8]) -> GitletResult<String> {
        let hash = hash_bytes(data);
        let path = self.blob_path(&hash);

        if path.exists() {
            return Ok(hash);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&path, data)?;
        debug!(blob = %hash, size = data.len(), "stored blob");
        Ok(hash)
    }

    /// Retrieve a blob by its hash.
    pub fn get_blob(&self, hash: &str) -> GitletResult<Vec<u8>> {
        if !is_full_id(hash) {
            return Err(GitletError::ObjectNotFound(hash.to_string()));
        }
        let path = self.blob_path(hash);
        if !path.exists() {
            return Err(GitletError::ObjectNotFound(hash.to_string()));
        }
        Ok(fs::read(&path)?)
    }

    pub fn has_blob(&self, hash: &str) -> bool {
        is_full_id(hash) && self.blob_path(hash).exists()
    }

    /// Persist a commit under its precomputed id.
    pub fn put_commit(&self, commit: &Commit) -> GitletResult<String> {
        let path = self.commit_path(&commit.id);
        if !path.exists() {
            let json = serde_json::to_string_pretty(commit)?;
            atomic_write(&path, json.as_bytes())?;
            debug!(commit = %commit.id, "stored commit");
        }
        Ok(commit.id.clone())
    }

    /// Load a commit by its full id.
    ///
    /// Used for ids taken from stored state, so a miss is an internal
    /// error. User-supplied ids go through [`find_commit`](Self::find_commit).
    pub fn get_commit(&self, id: &str) -> GitletResult<Commit> {
        if !is_full_id(id) {
            return Err(GitletError::ObjectNotFound(id.to_string()));
        }
        let path = self.commit_path(id);
        if !path.exists() {
            return Err(GitletError::ObjectNotFound(id.to_string()));
        }
        let data = fs::read_to_string(&path)?;
        let commit: Commit = serde_json::from_str(&data)?;
        if commit.id != id || commit.compute_id() != id {
            return Err(GitletError::Corrupt(format!(
                "commit {id} does not match its content"
            )));
        }
        Ok(commit)
    }

    /// Resolve a full or short commit id to the single full id it names.
    pub fn resolve_commit_id(&self, prefix: &str) -> GitletResult<String> {
        if prefix.is_empty() {
            return Err(GitletError::AmbiguousOrUnknownId(prefix.to_string()));
        }
        if is_full_id(prefix) {
            return if self.commit_path(prefix).exists() {
                Ok(prefix.to_string())
            } else {
                Err(GitletError::AmbiguousOrUnknownId(prefix.to_string()))
            };
        }

        let mut matches = self
            .commit_ids()?
            .into_iter()
            .filter(|id| id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            _ => Err(GitletError::AmbiguousOrUnknownId(prefix.to_string())),
        }
    }

    /// Load the commit a full or short id names.
    pub fn find_commit(&self, prefix: &str) -> GitletResult<Commit> {
        let id = self.resolve_commit_id(prefix)?;
        self.get_commit(&id)
    }

    /// Every stored commit id, ascending.
    pub fn commit_ids(&self) -> GitletResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.commits)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Uses 2-char prefix directories: hash `abcdef...` -> `ab/cdef...`
    fn blob_path(&self, hash: &str) -> PathBuf {
        let (prefix, rest) = hash.split_at(2);
        self.blobs.join(prefix).join(rest)
    }

    fn commit_path(&self, id: &str) -> PathBuf {
        self.commits.join(format!("{id}.json"))
    }
}

impl ParentLookup for ObjectStore {
    fn parents_of(&self, id: &str) -> GitletResult<Vec<String>> {
        let commit = self.get_commit(id)?;
        Ok(commit.parents().map(String::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::FileMap;
    use tempfile::tempdir;

    fn store(dir: &Path) -> ObjectStore {
        fs::create_dir_all(dir.join("blobs")).unwrap();
        fs::create_dir_all(dir.join("commits")).unwrap();
        ObjectStore::new(&dir.join("blobs"), &dir.join("commits"))
    }

    fn child(parent: &Commit, message: &str) -> Commit {
        Commit::now(message.to_string(), FileMap::new(), parent.id.clone(), None)
    }

    #[test]
    fn test_put_and_get_blob() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let hash = store.put_blob(b"foo").unwrap();
        assert_eq!(store.get_blob(&hash).unwrap(), b"foo");
        assert!(store.has_blob(&hash));
    }

    #[test]
    fn test_put_blob_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let h1 = store.put_blob(b"same content").unwrap();
        let path = store.blob_path(&h1);
        let written = fs::metadata(&path).unwrap().modified().unwrap();
        let h2 = store.put_blob(b"same content").unwrap();
        assert_eq!(h1, h2);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), written);
    }

    #[test]
    fn test_get_missing_blob() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        assert!(matches!(
            store.get_blob(&hash_bytes(b"never stored")),
            Err(GitletError::ObjectNotFound(_))
        ));
        assert!(matches!(
            store.get_blob("ab"),
            Err(GitletError::ObjectNotFound(_))
        ));
        assert!(!store.has_blob("x"));
    }

    #[test]
    fn test_put_and_get_commit() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let root = Commit::initial();
        store.put_commit(&root).unwrap();
        assert_eq!(store.get_commit(&root.id).unwrap(), root);
    }

    #[test]
    fn test_get_commit_detects_tampering() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let root = Commit::initial();
        store.put_commit(&root).unwrap();
        let mut forged = root.clone();
        forged.message = "rewritten".to_string();
        let json = serde_json::to_string(&forged).unwrap();
        fs::write(store.commit_path(&root.id), json).unwrap();

        assert!(matches!(
            store.get_commit(&root.id),
            Err(GitletError::Corrupt(_))
        ));
    }

    #[test]
    fn test_short_id_resolution() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let root = Commit::initial();
        store.put_commit(&root).unwrap();
        let c = child(&root, "second");
        store.put_commit(&c).unwrap();

        assert_eq!(store.resolve_commit_id(&c.id[..8]).unwrap(), c.id);
        assert_eq!(store.find_commit(&root.id[..6]).unwrap(), root);
        assert_eq!(store.resolve_commit_id(&c.id).unwrap(), c.id);
    }

    #[test]
    fn test_short_id_unknown_or_ambiguous() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let root = Commit::initial();
        store.put_commit(&root).unwrap();
        let mut ids = vec![root.id.clone()];
        let mut tip = root;
        // Enough commits that some pair shares a first hex digit.
        for i in 0..17 {
            tip = child(&tip, &format!("c{i}"));
            store.put_commit(&tip).unwrap();
            ids.push(tip.id.clone());
        }

        let shared = ids
            .iter()
            .map(|id| &id[..1])
            .find(|p| ids.iter().filter(|id| id.starts_with(*p)).count() > 1)
            .unwrap();
        assert!(matches!(
            store.resolve_commit_id(shared),
            Err(GitletError::AmbiguousOrUnknownId(_))
        ));
        assert!(matches!(
            store.resolve_commit_id("not-hex"),
            Err(GitletError::AmbiguousOrUnknownId(_))
        ));
        assert!(matches!(
            store.resolve_commit_id(""),
            Err(GitletError::AmbiguousOrUnknownId(_))
        ));
    }

    #[test]
    fn test_commit_ids_sorted() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let root = Commit::initial();
        store.put_commit(&root).unwrap();
        store.put_commit(&child(&root, "a")).unwrap();
        store.put_commit(&child(&root, "b")).unwrap();

        let ids = store.commit_ids().unwrap();
        assert_eq!(ids.len(), 3);
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_parent_lookup() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let root = Commit::initial();
        store.put_commit(&root).unwrap();
        let c = child(&root, "next");
        store.put_commit(&c).unwrap();

        assert_eq!(store.parents_of(&c.id).unwrap(), vec![root.id.clone()]);
        assert!(store.parents_of(&root.id).unwrap().is_empty());
    }
}
