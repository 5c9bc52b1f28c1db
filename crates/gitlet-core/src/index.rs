//! Staging area.
//!
//! Pending changes relative to the current commit, keyed by path. Stored
//! as `.gitlet/index.json` and cleared after every commit, checkout, reset
//! and merge.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commit::FileMap;
use crate::error::GitletResult;
use crate::fsutil::atomic_write;

/// A pending change for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StageEntry {
    /// Add or modify the path with the given blob.
    Add {
        /// SHA-256 hash of the staged content.
        hash: String,
    },
    /// Delete the path from the next commit.
    Remove,
}

/// The full staging area.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Index {
    /// Map of relative file path -> pending change.
    pub entries: BTreeMap<String, StageEntry>,
}

impl Index {
    /// Load the index from a JSON file, or return an empty index.
    pub fn load(path: &Path) -> GitletResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save the index (atomic: temp + fsync + rename).
    pub fn save(&self, path: &Path) -> GitletResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }

    /// Stage new content for a path, replacing any earlier entry.
    pub fn stage_add(&mut self, rel_path: &str, hash: String) {
        self.entries
            .insert(rel_path.to_string(), StageEntry::Add { hash });
    }

    /// Stage a path for removal.
    pub fn mark_removed(&mut self, rel_path: &str) {
        self.entries.insert(rel_path.to_string(), StageEntry::Remove);
    }

    /// Drop whatever is staged for a path.
    pub fn unstage(&mut self, rel_path: &str) -> bool {
        self.entries.remove(rel_path).is_some()
    }

    pub fn get(&self, rel_path: &str) -> Option<&StageEntry> {
        self.entries.get(rel_path)
    }

    /// Hash staged for addition at `rel_path`, if any.
    pub fn staged_hash(&self, rel_path: &str) -> Option<&str> {
        match self.entries.get(rel_path) {
            Some(StageEntry::Add { hash }) => Some(hash.as_str()),
            _ => None,
        }
    }

    pub fn is_removed(&self, rel_path: &str) -> bool {
        matches!(self.entries.get(rel_path), Some(StageEntry::Remove))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Paths staged for addition or modification, sorted.
    pub fn additions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(path, entry)| match entry {
            StageEntry::Add { .. } => Some(path.as_str()),
            StageEntry::Remove => None,
        })
    }

    /// Paths staged for removal, sorted.
    pub fn removals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(path, entry)| match entry {
            StageEntry::Remove => Some(path.as_str()),
            StageEntry::Add { .. } => None,
        })
    }

    /// The mapping the next commit would track: `base` with every staged
    /// addition overlaid and every removal applied.
    pub fn snapshot(&self, base: &FileMap) -> FileMap {
        let mut files = base.clone();
        for (path, entry) in &self.entries {
            match entry {
                StageEntry::Add { hash } => {
                    files.insert(path.clone(), hash.clone());
                }
                StageEntry::Remove => {
                    files.remove(path);
                }
            }
        }
        files
    }
}
