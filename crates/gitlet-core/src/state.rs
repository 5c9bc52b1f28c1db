//! Working-tree state and status classification.
//!
//! [`scan_working_tree`] hashes every file under the root that the ignore
//! rules let through, and [`scan_with_known`] adds the tracked or staged
//! paths the rules hid. [`compute_status`] is a pure function of that scan,
//! the staging area and the current commit's mapping.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::commit::FileMap;
use crate::error::GitletResult;
use crate::hash::hash_bytes;
use crate::ignore::IgnoreRules;
use crate::index::Index;

/// Why a file shows up under "not staged for commit".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Unstaged {
    /// Working content differs from the staged or committed version.
    Modified,
    /// Staged or tracked, but gone from the working tree.
    Deleted,
}

impl fmt::Display for Unstaged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unstaged::Modified => write!(f, "modified"),
            Unstaged::Deleted => write!(f, "deleted"),
        }
    }
}

/// A file with unstaged changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnstagedFile {
    pub path: String,
    pub kind: Unstaged,
}

impl fmt::Display for UnstagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.kind)
    }
}

/// Categorized working-tree status. Every list is sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub staged: Vec<String>,
    pub removed: Vec<String>,
    pub not_staged: Vec<UnstagedFile>,
    pub untracked: Vec<String>,
}

impl Status {
    /// True if nothing is staged, changed or untracked.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.removed.is_empty()
            && self.not_staged.is_empty()
            && self.untracked.is_empty()
    }
}

/// Hash every non-ignored file under `root`, keyed by `/`-separated
/// relative path.
pub fn scan_working_tree(root: &Path, rules: &IgnoreRules) -> GitletResult<FileMap> {
    let mut files = FileMap::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !rules.is_dir_ignored(&e.file_name().to_string_lossy())
    });
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel_path = match entry.path().strip_prefix(root) {
            Ok(p) => to_rel_string(p),
            Err(_) => continue,
        };
        if rules.is_file_ignored(&rel_path) {
            continue;
        }
        let content = fs::read(entry.path())?;
        files.insert(rel_path, hash_bytes(&content));
    }

    debug!(files = files.len(), "scanned working tree");
    Ok(files)
}

/// [`scan_working_tree`], plus every path in `known` that exists on disk
/// as a file. Tracked, staged and target paths are checked even when the
/// ignore rules hide them.
pub fn scan_with_known<'a, I>(root: &Path, rules: &IgnoreRules, known: I) -> GitletResult<FileMap>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut files = scan_working_tree(root, rules)?;
    for path in known {
        if files.contains_key(path) {
            continue;
        }
        let full_path = root.join(path);
        if full_path.is_file() {
            let content = fs::read(&full_path)?;
            files.insert(path.clone(), hash_bytes(&content));
        }
    }
    Ok(files)
}

/// Render a relative path with `/` separators.
pub fn to_rel_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Classify every path against working tree, stage and current commit.
pub fn compute_status(working: &FileMap, index: &Index, tracked: &FileMap) -> Status {
    let staged: Vec<String> = index.additions().map(String::from).collect();
    let removed: Vec<String> = index.removals().map(String::from).collect();

    let mut not_staged = BTreeSet::new();
    for (path, hash) in working {
        match index.staged_hash(path) {
            Some(staged_hash) if staged_hash != hash => {
                not_staged.insert((path.clone(), Unstaged::Modified));
            }
            Some(_) => {}
            None => {
                if let Some(committed) = tracked.get(path) {
                    if committed != hash && !index.is_removed(path) {
                        not_staged.insert((path.clone(), Unstaged::Modified));
                    }
                }
            }
        }
    }
    for path in tracked.keys() {
        if !working.contains_key(path) && index.get(path).is_none() {
            not_staged.insert((path.clone(), Unstaged::Deleted));
        }
    }
    for path in index.additions() {
        if !working.contains_key(path) {
            not_staged.insert((path.to_string(), Unstaged::Deleted));
        }
    }

    let untracked = working
        .keys()
        .filter(|p| !tracked.contains_key(*p) && index.get(p).is_none())
        .cloned()
        .collect();

    Status {
        staged,
        removed,
        not_staged: not_staged
            .into_iter()
            .map(|(path, kind)| UnstagedFile { path, kind })
            .collect(),
        untracked,
    }
}
