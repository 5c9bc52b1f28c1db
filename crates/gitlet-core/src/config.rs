//! Per-repository configuration stored at `.gitlet/config.json`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GitletResult;
use crate::fsutil::atomic_write;

const CONFIG_FILE: &str = "config.json";

/// Repository configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Branch created by `init`.
    pub default_branch: String,
    /// Length of abbreviated commit ids in log output.
    pub abbrev_len: usize,
    /// How long a command waits for the repository lock.
    pub lock_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_branch: "master".to_string(),
            abbrev_len: 7,
            lock_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Load from `gitlet_dir`, or return defaults if no config exists.
    pub fn load(gitlet_dir: &Path) -> GitletResult<Self> {
        let path = gitlet_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, gitlet_dir: &Path) -> GitletResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(&gitlet_dir.join(CONFIG_FILE), json.as_bytes())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// First `abbrev_len` characters of `id`.
    pub fn abbrev<'a>(&self, id: &'a str) -> &'a str {
        &id[..self.abbrev_len.min(id.len())]
    }
}
