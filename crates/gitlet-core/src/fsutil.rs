//! Filesystem helpers shared by the stores and the working-tree code.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::error::GitletResult;

/// Write data to a file atomically using temp-file-then-rename.
///
/// The temp file is fsynced before the rename so a crash leaves either the
/// old contents or the new, never a partial write.
pub fn atomic_write(path: &Path, data: &[u8]) -> GitletResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_data()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Write a working-tree file, creating missing parent directories.
pub fn write_file(path: &Path, data: &[u8]) -> GitletResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

/// Remove empty directories walking up from `dir` to `stop_at` (exclusive).
pub fn remove_empty_dirs(dir: &Path, stop_at: &Path) -> io::Result<()> {
    let mut current = dir.to_path_buf();
    while current != stop_at && current.starts_with(stop_at) {
        if fs::read_dir(&current)?.next().is_some() {
            break;
        }
        fs::remove_dir(&current)?;
        match current.parent() {
            Some(p) => current = p.to_path_buf(),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("HEAD");
        atomic_write(&path, b"master").unwrap();
        atomic_write(&path, b"other").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "other");
        assert!(!dir.path().join("HEAD.tmp").exists());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write_file(&path, b"x").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_remove_empty_dirs_stops_at_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/keep.txt"), "k").unwrap();

        remove_empty_dirs(&dir.path().join("a/b"), dir.path()).unwrap();
        assert!(!dir.path().join("a/b").exists());
        assert!(dir.path().join("a").exists());
        assert!(dir.path().exists());
    }
}
