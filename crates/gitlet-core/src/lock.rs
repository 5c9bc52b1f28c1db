//! Exclusive repository lock.
//!
//! Every command runs its whole read-modify-write sequence while holding an
//! advisory `flock(2)` on `.gitlet/gitlet.lock` (via `fs2`). A second
//! invocation against the same repository fails with `LockTimeout` rather
//! than interleaving with the first. The OS releases the lock if the
//! process dies.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::debug;

use crate::error::{GitletError, GitletResult};

pub const LOCK_FILE: &str = "gitlet.lock";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Held for the lifetime of the value; dropping it releases the lock.
#[derive(Debug)]
pub struct RepoLock {
    _file: File,
}

impl RepoLock {
    /// Acquire the lock in `gitlet_dir`, polling until `timeout` expires.
    pub fn acquire(gitlet_dir: &Path, timeout: Duration) -> GitletResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(gitlet_dir.join(LOCK_FILE))?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!("acquired repository lock");
                    return Ok(RepoLock { _file: file });
                }
                Err(_) if start.elapsed() >= timeout => return Err(GitletError::LockTimeout),
                Err(_) => thread::sleep(POLL_INTERVAL),
            }
        }
    }
}
