//! Branch table and current-branch pointer.
//!
//! The branch table maps branch names to tip commits and is stored as
//! `.gitlet/branches.json`. `.gitlet/HEAD` holds the name of the current
//! branch as plain text.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{GitletError, GitletResult};
use crate::fsutil::atomic_write;

const BRANCHES_FILE: &str = "branches.json";
const HEAD_FILE: &str = "HEAD";

/// Branch name -> tip commit, plus which branch is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refs {
    branches: BTreeMap<String, String>,
    current: String,
}

impl Refs {
    /// A table holding one branch, which is current.
    pub fn new(branch: &str, tip: &str) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(branch.to_string(), tip.to_string());
        Self {
            branches,
            current: branch.to_string(),
        }
    }

    /// Load the branch table and HEAD from `gitlet_dir`.
    pub fn load(gitlet_dir: &Path) -> GitletResult<Self> {
        let data = fs::read_to_string(gitlet_dir.join(BRANCHES_FILE))?;
        let branches: BTreeMap<String, String> = serde_json::from_str(&data)?;
        let current = fs::read_to_string(gitlet_dir.join(HEAD_FILE))?
            .trim()
            .to_string();

        if !branches.contains_key(&current) {
            return Err(GitletError::Corrupt(format!(
                "HEAD names unknown branch '{current}'"
            )));
        }
        Ok(Self { branches, current })
    }

    pub fn save(&self, gitlet_dir: &Path) -> GitletResult<()> {
        let json = serde_json::to_string_pretty(&self.branches)?;
        atomic_write(&gitlet_dir.join(BRANCHES_FILE), json.as_bytes())?;
        atomic_write(&gitlet_dir.join(HEAD_FILE), self.current.as_bytes())
    }

    pub fn current_branch(&self) -> &str {
        &self.current
    }

    /// Tip of the current branch.
    pub fn head(&self) -> &str {
        // `load` and every mutation keep `current` in the table.
        self.branches
            .get(&self.current)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn tip(&self, name: &str) -> Option<&str> {
        self.branches.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    /// Branch names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    /// Point `name` at `commit_id`, creating the branch if needed.
    pub fn set_tip(&mut self, name: &str, commit_id: &str) {
        debug!(branch = name, tip = commit_id, "set branch tip");
        self.branches.insert(name.to_string(), commit_id.to_string());
    }

    /// Advance the current branch.
    pub fn set_head(&mut self, commit_id: &str) {
        let current = self.current.clone();
        self.set_tip(&current, commit_id);
    }

    /// Create `name` pointing at `commit_id`.
    pub fn create_branch(&mut self, name: &str, commit_id: &str) -> GitletResult<()> {
        if self.contains(name) {
            return Err(GitletError::BranchExists(name.to_string()));
        }
        self.set_tip(name, commit_id);
        Ok(())
    }

    pub fn delete_branch(&mut self, name: &str) -> GitletResult<()> {
        if !self.contains(name) {
            return Err(GitletError::UnknownBranch(name.to_string()));
        }
        if name == self.current {
            return Err(GitletError::CannotDeleteCurrent(name.to_string()));
        }
        self.branches.remove(name);
        debug!(branch = name, "deleted branch");
        Ok(())
    }

    /// Make `name` the current branch.
    pub fn switch_branch(&mut self, name: &str) -> GitletResult<()> {
        if !self.contains(name) {
            return Err(GitletError::UnknownBranch(name.to_string()));
        }
        if name == self.current {
            return Err(GitletError::AlreadyOnBranch(name.to_string()));
        }
        self.current = name.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_sets_current() {
        let refs = Refs::new("master", "c0");
        assert_eq!(refs.current_branch(), "master");
        assert_eq!(refs.head(), "c0");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut refs = Refs::new("master", "c0");
        refs.create_branch("other", "c0").unwrap();
        refs.set_head("c1");
        refs.save(dir.path()).unwrap();

        let loaded = Refs::load(dir.path()).unwrap();
        assert_eq!(loaded, refs);
        assert_eq!(
            fs::read_to_string(dir.path().join("HEAD")).unwrap(),
            "master"
        );
    }

    #[test]
    fn test_load_rejects_dangling_head() {
        let dir = tempdir().unwrap();
        Refs::new("master", "c0").save(dir.path()).unwrap();
        fs::write(dir.path().join("HEAD"), "gone").unwrap();
        assert!(matches!(
            Refs::load(dir.path()),
            Err(GitletError::Corrupt(_))
        ));
    }

    #[test]
    fn test_create_existing_branch_fails() {
        let mut refs = Refs::new("master", "c0");
        assert!(matches!(
            refs.create_branch("master", "c1"),
            Err(GitletError::BranchExists(_))
        ));
        assert_eq!(refs.tip("master"), Some("c0"));
    }

    #[test]
    fn test_delete_branch() {
        let mut refs = Refs::new("master", "c0");
        refs.create_branch("other", "c0").unwrap();
        refs.delete_branch("other").unwrap();
        assert!(!refs.contains("other"));

        assert!(matches!(
            refs.delete_branch("other"),
            Err(GitletError::UnknownBranch(_))
        ));
        assert!(matches!(
            refs.delete_branch("master"),
            Err(GitletError::CannotDeleteCurrent(_))
        ));
    }

    #[test]
    fn test_switch_branch() {
        let mut refs = Refs::new("master", "c0");
        refs.create_branch("other", "c9").unwrap();
        refs.switch_branch("other").unwrap();
        assert_eq!(refs.current_branch(), "other");
        assert_eq!(refs.head(), "c9");

        assert!(matches!(
            refs.switch_branch("other"),
            Err(GitletError::AlreadyOnBranch(_))
        ));
        assert!(matches!(
            refs.switch_branch("nope"),
            Err(GitletError::UnknownBranch(_))
        ));
    }

    #[test]
    fn test_names_sorted() {
        let mut refs = Refs::new("master", "c0");
        refs.create_branch("b", "c0").unwrap();
        refs.create_branch("a", "c0").unwrap();
        assert_eq!(refs.names().collect::<Vec<_>>(), vec!["a", "b", "master"]);
    }
}
