//! Error types for gitlet operations.
//!
//! Errors fall into two classes. User errors are expected outcomes of a
//! command (unknown branch, nothing staged, ...) and their `Display` text is
//! the exact line shown to the user. Internal errors mean disk trouble or a
//! broken invariant and are reported separately by the CLI.

use std::io;

use thiserror::Error;

/// All possible gitlet errors.
#[derive(Debug, Error)]
pub enum GitletError {
    /// No `.gitlet/` directory at the invocation location.
    #[error("Not in an initialized Gitlet directory.")]
    NotInitialized,
    /// `.gitlet/` already exists.
    #[error("A Gitlet version-control system already exists in the current directory.")]
    AlreadyInitialized,
    /// The working-tree file to stage does not exist.
    #[error("File does not exist.")]
    FileNotFound(String),
    /// The requested path is not tracked by the named commit.
    #[error("File does not exist in that commit.")]
    FileNotInCommit(String),
    /// Commit requested with an empty staging area.
    #[error("No changes added to the commit.")]
    NothingStaged,
    /// Commit requested with a blank message.
    #[error("Please enter a commit message.")]
    EmptyMessage,
    /// `rm` of a path that is neither staged nor tracked.
    #[error("No reason to remove the file.")]
    NothingToRemove(String),
    /// Branch name absent from the branch table.
    #[error("A branch with that name does not exist.")]
    UnknownBranch(String),
    /// Branch name absent from the branch table, as reported by checkout.
    #[error("No such branch exists.")]
    NoSuchBranch(String),
    #[error("A branch with that name already exists.")]
    BranchExists(String),
    #[error("Cannot remove the current branch.")]
    CannotDeleteCurrent(String),
    #[error("No need to checkout the current branch.")]
    AlreadyOnBranch(String),
    /// A (possibly short) commit id matched zero or several commits.
    #[error("No commit with that id exists.")]
    AmbiguousOrUnknownId(String),
    /// Merge started with a non-empty staging area.
    #[error("You have uncommitted changes.")]
    UncommittedChanges,
    #[error("Cannot merge a branch with itself.")]
    SelfMerge,
    /// An untracked working file would be overwritten.
    #[error("There is an untracked file in the way; delete it, or add and commit it first.")]
    UntrackedFileConflict(String),
    #[error("Found no commit with that message.")]
    NoCommitWithMessage,
    /// Absolute path, `..` component, or a path inside `.gitlet/`.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    /// Another process holds the repository lock.
    #[error("Another gitlet command is running in this repository.")]
    LockTimeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A blob or commit referenced by stored state is missing.
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    /// Stored state violates an invariant.
    #[error("corrupt repository: {0}")]
    Corrupt(String),
}

impl GitletError {
    /// True for expected, user-facing failures; false for internal errors.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            GitletError::Io(_)
                | GitletError::Json(_)
                | GitletError::ObjectNotFound(_)
                | GitletError::Corrupt(_)
        )
    }
}

/// Convenience alias for Results in gitlet.
pub type GitletResult<T> = Result<T, GitletError>;
