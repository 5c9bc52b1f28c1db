//! Repository: the main entry point for gitlet operations.
//!
//! A `Repository` is the per-command state object: opening one takes the
//! repository lock and loads config, branch table and staging area once.
//! Mutating operations change that in-memory state and write it back with a
//! single [`persist`](Repository::persist) at the end; an operation that
//! fails part way persists nothing.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::commit::{Commit, FileMap};
use crate::config::Config;
use crate::error::{GitletError, GitletResult};
use crate::fsutil::{remove_empty_dirs, write_file};
use crate::graph::{first_parent_history, is_ancestor, lowest_common_ancestor};
use crate::hash::hash_bytes;
use crate::ignore::IgnoreRules;
use crate::index::Index;
use crate::lock::RepoLock;
use crate::merge::{self, MergeOutcome, Resolution};
use crate::object::ObjectStore;
use crate::refs::Refs;
use crate::state::{self, Status};

/// The `.gitlet` directory name.
pub const GITLET_DIR: &str = ".gitlet";

const INDEX_FILE: &str = "index.json";

/// A gitlet repository, opened for one command.
pub struct Repository {
    /// Root of the working directory (where `.gitlet/` lives).
    root: PathBuf,
    /// Path to the `.gitlet/` directory.
    gitlet_dir: PathBuf,
    config: Config,
    objects: ObjectStore,
    refs: Refs,
    index: Index,
    ignore: IgnoreRules,
    /// Released when the repository is dropped.
    _lock: RepoLock,
}

/// Everything `status` prints.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub current_branch: String,
    /// All branch names, sorted.
    pub branches: Vec<String>,
    pub status: Status,
}

impl Repository {
    /// Initialize a new repository in `root` with the default config.
    pub fn init(root: &Path) -> GitletResult<Self> {
        Self::init_with_config(root, Config::default())
    }

    /// Initialize a new repository in `root`.
    ///
    /// Creates the `.gitlet/` layout, the initial commit and the default
    /// branch pointing at it.
    pub fn init_with_config(root: &Path, config: Config) -> GitletResult<Self> {
        let gitlet_dir = root.join(GITLET_DIR);
        if gitlet_dir.exists() {
            return Err(GitletError::AlreadyInitialized);
        }

        fs::create_dir_all(gitlet_dir.join("blobs"))?;
        fs::create_dir_all(gitlet_dir.join("commits"))?;
        config.save(&gitlet_dir)?;

        let objects = ObjectStore::new(&gitlet_dir.join("blobs"), &gitlet_dir.join("commits"));
        let initial = Commit::initial();
        objects.put_commit(&initial)?;

        Refs::new(&config.default_branch, &initial.id).save(&gitlet_dir)?;
        Index::default().save(&gitlet_dir.join(INDEX_FILE))?;

        info!(root = %root.display(), branch = %config.default_branch, "initialized repository");
        Self::open(root)
    }

    /// Open the repository rooted at `root`.
    pub fn open(root: &Path) -> GitletResult<Self> {
        let gitlet_dir = root.join(GITLET_DIR);
        if !gitlet_dir.is_dir() {
            return Err(GitletError::NotInitialized);
        }

        let config = Config::load(&gitlet_dir)?;
        let lock = RepoLock::acquire(&gitlet_dir, config.lock_timeout())?;
        let refs = Refs::load(&gitlet_dir)?;
        let index = Index::load(&gitlet_dir.join(INDEX_FILE))?;
        let objects = ObjectStore::new(&gitlet_dir.join("blobs"), &gitlet_dir.join("commits"));

        Ok(Self {
            root: root.to_path_buf(),
            gitlet_dir,
            config,
            objects,
            refs,
            index,
            ignore: IgnoreRules::load(root),
            _lock: lock,
        })
    }

    /// Write the branch table, HEAD and staging area back to disk.
    pub fn persist(&self) -> GitletResult<()> {
        self.refs.save(&self.gitlet_dir)?;
        self.index.save(&self.gitlet_dir.join(INDEX_FILE))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn current_branch(&self) -> &str {
        self.refs.current_branch()
    }

    /// Id of the current branch's tip.
    pub fn head(&self) -> &str {
        self.refs.head()
    }

    pub fn head_commit(&self) -> GitletResult<Commit> {
        self.objects.get_commit(self.refs.head())
    }

    /// Stage the working-tree version of `path`.
    ///
    /// Content identical to the current commit's version is not staged, and
    /// any earlier staged entry (including a removal mark) is dropped.
    pub fn add(&mut self, path: &str) -> GitletResult<()> {
        let (rel_path, full_path) = self.validate_path(path)?;
        if !full_path.is_file() {
            return Err(GitletError::FileNotFound(rel_path));
        }

        let content = fs::read(&full_path)?;
        let hash = hash_bytes(&content);
        let head = self.head_commit()?;

        if head.blob(&rel_path) == Some(hash.as_str()) {
            self.index.unstage(&rel_path);
            debug!(path = %rel_path, "matches current commit, unstaged");
        } else {
            self.objects.put_blob(&content)?;
            self.index.stage_add(&rel_path, hash);
            debug!(path = %rel_path, "staged for addition");
        }
        self.persist()
    }

    /// Unstage `path`, and if the current commit tracks it, mark it for
    /// removal and delete it from the working tree.
    pub fn rm(&mut self, path: &str) -> GitletResult<()> {
        let (rel_path, full_path) = self.validate_path(path)?;
        let head = self.head_commit()?;
        let staged = self.index.staged_hash(&rel_path).is_some();
        let tracked = head.tracks(&rel_path);

        if !staged && !tracked {
            return Err(GitletError::NothingToRemove(rel_path));
        }
        if staged {
            self.index.unstage(&rel_path);
        }
        if tracked {
            self.index.mark_removed(&rel_path);
            self.delete_working_file(&full_path)?;
            debug!(path = %rel_path, "staged for removal");
        }
        self.persist()
    }

    /// Commit the staging area on the current branch.
    pub fn commit(&mut self, message: &str) -> GitletResult<Commit> {
        if message.trim().is_empty() {
            return Err(GitletError::EmptyMessage);
        }
        if self.index.is_empty() {
            return Err(GitletError::NothingStaged);
        }
        self.create_commit(message.to_string(), None)
    }

    /// Current branch history, tip first, following first parents.
    pub fn log(&self) -> GitletResult<Vec<Commit>> {
        first_parent_history(&self.objects, self.refs.head())?
            .iter()
            .map(|id| self.objects.get_commit(id))
            .collect()
    }

    /// Every stored commit, ordered by id.
    pub fn global_log(&self) -> GitletResult<Vec<Commit>> {
        self.objects
            .commit_ids()?
            .iter()
            .map(|id| self.objects.get_commit(id))
            .collect()
    }

    /// Ids of every commit whose message is exactly `message`.
    pub fn find(&self, message: &str) -> GitletResult<Vec<String>> {
        let ids: Vec<String> = self
            .global_log()?
            .into_iter()
            .filter(|c| c.message == message)
            .map(|c| c.id)
            .collect();
        if ids.is_empty() {
            return Err(GitletError::NoCommitWithMessage);
        }
        Ok(ids)
    }

    pub fn status(&self) -> GitletResult<StatusReport> {
        let head = self.head_commit()?;
        let known = head.files.keys().chain(self.index.entries.keys());
        let working = state::scan_with_known(&self.root, &self.ignore, known)?;
        Ok(StatusReport {
            current_branch: self.refs.current_branch().to_string(),
            branches: self.refs.names().map(String::from).collect(),
            status: state::compute_status(&working, &self.index, &head.files),
        })
    }

    /// Overwrite the working copy of `path` with its version in `commit_id`
    /// (short ids allowed), or in the current commit. Staging is untouched.
    pub fn checkout_file(&self, commit_id: Option<&str>, path: &str) -> GitletResult<()> {
        let (rel_path, full_path) = self.validate_path(path)?;
        let commit = match commit_id {
            Some(id) => self.objects.find_commit(id)?,
            None => self.head_commit()?,
        };
        let hash = commit
            .blob(&rel_path)
            .ok_or_else(|| GitletError::FileNotInCommit(rel_path.clone()))?;

        let content = self.objects.get_blob(hash)?;
        write_file(&full_path, &content)?;
        debug!(path = %rel_path, commit = %commit.id, "checked out file");
        Ok(())
    }

    /// Switch to branch `name`, replacing the working tree with its tip.
    pub fn checkout_branch(&mut self, name: &str) -> GitletResult<()> {
        let tip = self
            .refs
            .tip(name)
            .ok_or_else(|| GitletError::NoSuchBranch(name.to_string()))?
            .to_string();
        if name == self.refs.current_branch() {
            return Err(GitletError::AlreadyOnBranch(name.to_string()));
        }

        let target = self.objects.get_commit(&tip)?;
        self.checkout_commit(&target)?;
        self.refs.switch_branch(name)?;
        self.persist()?;
        info!(branch = name, tip = %tip, "switched branch");
        Ok(())
    }

    /// Create branch `name` at the current commit. HEAD does not move.
    pub fn create_branch(&mut self, name: &str) -> GitletResult<()> {
        let head = self.refs.head().to_string();
        self.refs.create_branch(name, &head)?;
        self.persist()
    }

    /// Delete the branch pointer `name`. Its commits stay in the store.
    pub fn remove_branch(&mut self, name: &str) -> GitletResult<()> {
        self.refs.delete_branch(name)?;
        self.persist()
    }

    /// Check out the commit `commit_id` names and move the current branch
    /// to it.
    pub fn reset(&mut self, commit_id: &str) -> GitletResult<Commit> {
        let target = self.objects.find_commit(commit_id)?;
        self.checkout_commit(&target)?;
        self.refs.set_head(&target.id);
        self.persist()?;
        info!(commit = %target.id, branch = %self.refs.current_branch(), "reset");
        Ok(target)
    }

    /// Merge branch `given` into the current branch.
    pub fn merge(&mut self, given: &str) -> GitletResult<MergeOutcome> {
        if !self.index.is_empty() {
            return Err(GitletError::UncommittedChanges);
        }
        let given_tip = self
            .refs
            .tip(given)
            .ok_or_else(|| GitletError::UnknownBranch(given.to_string()))?
            .to_string();
        let current_branch = self.refs.current_branch().to_string();
        if given == current_branch {
            return Err(GitletError::SelfMerge);
        }

        let current = self.head_commit()?;
        let other = self.objects.get_commit(&given_tip)?;
        let known = current.files.keys().chain(other.files.keys());
        let working = state::scan_with_known(&self.root, &self.ignore, known)?;
        check_untracked(&current, &other, &working)?;

        if is_ancestor(&self.objects, &given_tip, &current.id)? {
            info!(given, "given branch is an ancestor, nothing to merge");
            return Ok(MergeOutcome::AlreadyAncestor);
        }
        if is_ancestor(&self.objects, &current.id, &given_tip)? {
            self.checkout_commit(&other)?;
            self.refs.set_head(&given_tip);
            self.persist()?;
            info!(given, tip = %given_tip, "fast-forwarded");
            return Ok(MergeOutcome::FastForwarded);
        }

        let split_id = lowest_common_ancestor(&self.objects, &current.id, &given_tip)?;
        let split = self.objects.get_commit(&split_id)?;
        let mut conflicted = false;

        // Removals first, so a path can change between file and directory.
        let (removals, writes): (Vec<_>, Vec<_>) =
            merge::plan(&split.files, &current.files, &other.files)
                .into_iter()
                .partition(|(_, r)| *r == Resolution::RemoveFile);
        for (path, _) in &removals {
            self.delete_working_file(&self.root.join(path))?;
            self.index.mark_removed(path);
        }

        for (path, resolution) in writes {
            let full_path = self.root.join(&path);
            match resolution {
                Resolution::KeepCurrent | Resolution::RemoveFile => {}
                Resolution::TakeGiven { hash } => {
                    let content = self.objects.get_blob(&hash)?;
                    write_file(&full_path, &content)?;
                    self.index.stage_add(&path, hash);
                }
                Resolution::Conflict { current, given } => {
                    let ours = self.blob_or_empty(current.as_deref())?;
                    let theirs = self.blob_or_empty(given.as_deref())?;
                    let content = merge::conflict_content(&ours, &theirs);
                    let hash = self.objects.put_blob(&content)?;
                    write_file(&full_path, &content)?;
                    self.index.stage_add(&path, hash);
                    conflicted = true;
                }
            }
        }

        let commit = self.create_commit(
            merge::merge_message(given, &current_branch),
            Some(given_tip),
        )?;
        info!(given, commit = %commit.id, conflicted, "merged");
        Ok(MergeOutcome::Merged {
            commit: commit.id,
            conflicted,
        })
    }

    /// Build a commit from the staging area on top of HEAD, advance the
    /// current branch and clear the stage.
    fn create_commit(&mut self, message: String, second_parent: Option<String>) -> GitletResult<Commit> {
        let head = self.head_commit()?;
        let files = self.index.snapshot(&head.files);
        let commit = Commit::now(message, files, head.id, second_parent);

        self.objects.put_commit(&commit)?;
        self.refs.set_head(&commit.id);
        self.index.clear();
        self.persist()?;

        info!(commit = %commit.id, branch = %self.refs.current_branch(), "committed");
        Ok(commit)
    }

    /// Replace the working tree's tracked files with `target`'s and clear
    /// the staging area. Refs are left to the caller.
    fn checkout_commit(&mut self, target: &Commit) -> GitletResult<()> {
        let current = self.head_commit()?;
        let known = current
            .files
            .keys()
            .chain(target.files.keys())
            .chain(self.index.entries.keys());
        let working = state::scan_with_known(&self.root, &self.ignore, known)?;
        check_untracked(&current, target, &working)?;

        // Deletions before writes: `a` and `a/b` can swap between commits.
        for path in current.files.keys() {
            if !target.tracks(path) {
                self.delete_working_file(&self.root.join(path))?;
            }
        }
        for (path, hash) in &target.files {
            if working.get(path) == Some(hash) {
                continue;
            }
            let content = self.objects.get_blob(hash)?;
            write_file(&self.root.join(path), &content)?;
        }

        self.index.clear();
        debug!(commit = %target.id, files = target.files.len(), "checked out commit");
        Ok(())
    }

    fn blob_or_empty(&self, hash: Option<&str>) -> GitletResult<Vec<u8>> {
        match hash {
            Some(h) => self.objects.get_blob(h),
            None => Ok(Vec::new()),
        }
    }

    /// Delete a working file if present, then any directories it leaves
    /// empty.
    fn delete_working_file(&self, full_path: &Path) -> GitletResult<()> {
        if full_path.is_file() {
            fs::remove_file(full_path)?;
        }
        if let Some(parent) = full_path.parent() {
            if parent.is_dir() {
                remove_empty_dirs(parent, &self.root)?;
            }
        }
        Ok(())
    }

    /// Normalize a user-supplied path to its `/`-separated key and its
    /// location under the root.
    ///
    /// Rejects empty and absolute paths, `..` components, and anything
    /// inside `.gitlet/`.
    fn validate_path(&self, path: &str) -> GitletResult<(String, PathBuf)> {
        let invalid = || GitletError::InvalidPath(path.to_string());
        if path.starts_with('/') || path.starts_with('\\') {
            return Err(invalid());
        }

        let mut parts = Vec::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid())
                }
            }
        }
        match parts.first() {
            None => return Err(invalid()),
            Some(first) if first == GITLET_DIR => return Err(invalid()),
            Some(_) => {}
        }

        let rel_path = parts.join("/");
        let full_path = self.root.join(&rel_path);
        Ok((rel_path, full_path))
    }
}

/// Fail if switching from `current` to `target` would overwrite a working
/// file that `current` does not track.
fn check_untracked(current: &Commit, target: &Commit, working: &FileMap) -> GitletResult<()> {
    for path in target.files.keys() {
        if !current.tracks(path) && working.contains_key(path) {
            return Err(GitletError::UntrackedFileConflict(path.clone()));
        }
    }
    Ok(())
}
