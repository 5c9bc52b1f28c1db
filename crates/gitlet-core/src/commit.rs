//! Commits, the immutable nodes of the history DAG.
//!
//! A commit's id is the SHA-256 of a canonical text encoding of its
//! message, timestamp, parents and file mapping:
//!
//! ```text
//! message <byte-len>\n<message>\n
//! timestamp <RFC 3339, whole seconds, with offset>\n
//! parent <id>\n                 (zero, one or two lines, first parent first)
//! file <path>\0<blob id>\n      (one per path, ascending byte order)
//! ```
//!
//! The mapping is a `BTreeMap`, so identical logical states always encode
//! (and therefore hash) identically.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::hash_bytes;

/// Message of the root commit created by `init`.
pub const INITIAL_MESSAGE: &str = "initial commit";

/// Path -> blob id mapping tracked by a commit.
pub type FileMap = BTreeMap<String, String>;

/// A commit in the history DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    /// SHA-256 of the canonical encoding.
    pub id: String,
    pub message: String,
    /// Creation time, truncated to whole seconds.
    pub timestamp: DateTime<FixedOffset>,
    /// Tracked files.
    pub files: FileMap,
    /// First parent (None only for the root commit).
    pub parent: Option<String>,
    /// Second parent, set only on merge commits.
    pub second_parent: Option<String>,
}

impl Commit {
    /// Build a commit and compute its id.
    pub fn new(
        message: String,
        timestamp: DateTime<FixedOffset>,
        files: FileMap,
        parent: Option<String>,
        second_parent: Option<String>,
    ) -> Self {
        let mut commit = Commit {
            id: String::new(),
            message,
            timestamp: timestamp.trunc_subsecs(0),
            files,
            parent,
            second_parent,
        };
        commit.id = commit.compute_id();
        commit
    }

    /// The root commit: fixed message, Unix epoch, no files, no parent.
    pub fn initial() -> Self {
        Self::new(
            INITIAL_MESSAGE.to_string(),
            DateTime::<Utc>::UNIX_EPOCH.fixed_offset(),
            FileMap::new(),
            None,
            None,
        )
    }

    /// A commit stamped with the current local time.
    pub fn now(
        message: String,
        files: FileMap,
        parent: String,
        second_parent: Option<String>,
    ) -> Self {
        Self::new(
            message,
            Local::now().fixed_offset(),
            files,
            Some(parent),
            second_parent,
        )
    }

    /// Canonical byte encoding the id is computed over.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(format!("message {}\n", self.message.len()).as_bytes());
        out.extend_from_slice(self.message.as_bytes());
        out.push(b'\n');
        let ts = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false);
        out.extend_from_slice(format!("timestamp {ts}\n").as_bytes());
        for parent in self.parents() {
            out.extend_from_slice(format!("parent {parent}\n").as_bytes());
        }
        for (path, blob) in &self.files {
            out.extend_from_slice(b"file ");
            out.extend_from_slice(path.as_bytes());
            out.push(0);
            out.extend_from_slice(blob.as_bytes());
            out.push(b'\n');
        }
        out
    }

    /// Recompute the id from the commit's content.
    pub fn compute_id(&self) -> String {
        hash_bytes(&self.canonical_bytes())
    }

    /// Parent ids, first parent first.
    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.parent
            .as_deref()
            .into_iter()
            .chain(self.second_parent.as_deref())
    }

    pub fn is_merge(&self) -> bool {
        self.second_parent.is_some()
    }

    /// Blob id tracked at `path`, if any.
    pub fn blob(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn tracks(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}
