// src/layout.rs

//! On-disk layout of a Dekun installation
//!
//! ```text
//! <root>/lock.json     convergence record
//! <root>/config.toml   optional user configuration
//! <root>/python/       runtime installation
//! <root>/python/src/   materialized payload
//! <root>/packages/     native packages for the selected backend
//! ```

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Lock file name inside the root directory
pub const LOCK_FILE_NAME: &str = "lock.json";

/// Optional configuration file name inside the root directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolved paths for one root installation directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Runtime installation directory
    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("python")
    }

    /// Payload source directory, nested inside the runtime
    pub fn payload_dir(&self) -> PathBuf {
        self.runtime_dir().join("src")
    }

    /// Native package target directory
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    /// Create the root directory if it does not exist
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))
    }
}

/// Remove a directory tree (if present) and create it again empty
pub fn reset_dir(path: &Path) -> Result<()> {
    remove_path(path)?;
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Remove a file or directory tree if it exists
pub fn remove_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map_err(|e| Error::io(path, e)),
        Ok(_) => fs::remove_file(path).map_err(|e| Error::io(path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("/opt/dekun");
        assert_eq!(layout.lock_file(), PathBuf::from("/opt/dekun/lock.json"));
        assert_eq!(layout.runtime_dir(), PathBuf::from("/opt/dekun/python"));
        assert_eq!(layout.payload_dir(), PathBuf::from("/opt/dekun/python/src"));
        assert_eq!(layout.packages_dir(), PathBuf::from("/opt/dekun/packages"));
    }

    #[test]
    fn test_reset_dir_clears_content() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("packages");
        fs::create_dir_all(dir.join("torch")).unwrap();
        fs::write(dir.join("torch/__init__.py"), b"").unwrap();

        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_reset_dir_replaces_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("python");
        fs::write(&path, b"not a directory").unwrap();

        reset_dir(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn test_remove_missing_path_is_ok() {
        let temp = TempDir::new().unwrap();
        remove_path(&temp.path().join("missing")).unwrap();
    }
}
