// src/lock.rs

//! Lock file recording what is installed under the root directory
//!
//! The lock file is the single source of truth for convergence decisions.
//!
//! # Format
//!
//! ```json
//! {
//!   "dekun_version": "0.1.0",
//!   "cpython_version": "3.12.8",
//!   "backend": "cpu"
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::debug;

/// Hardware backend selecting the native package set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cpu,
    Xpu,
    Cuda,
    Rocm,
    /// Nothing installed yet; never a valid install target
    #[default]
    None,
}

impl Backend {
    /// Every backend that can be installed
    pub fn installable() -> &'static [Backend] {
        &[Self::Cpu, Self::Xpu, Self::Cuda, Self::Rocm]
    }

    /// Lowercase name as written in the lock file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Xpu => "xpu",
            Self::Cuda => "cuda",
            Self::Rocm => "rocm",
            Self::None => "none",
        }
    }

    /// Whether packages can be installed for this backend
    pub fn is_installable(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "xpu" => Ok(Self::Xpu),
            "cuda" => Ok(Self::Cuda),
            "rocm" => Ok(Self::Rocm),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown backend '{}' (expected cpu, xpu, cuda, rocm or none)",
                other
            )),
        }
    }
}

/// Persisted convergence state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LockState {
    /// Tool version whose payload is materialized on disk
    #[serde(rename = "dekun_version")]
    pub tool_version: String,

    /// Installed runtime version
    #[serde(rename = "cpython_version")]
    pub runtime_version: String,

    /// Backend whose packages are installed
    pub backend: Backend,
}

impl LockState {
    /// Read the lock file, creating it with an empty record if it is missing
    ///
    /// A file that exists but does not parse is reported as corrupted and
    /// left untouched.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Creating lock file at {}", path.display());
            let state = Self::default();
            state.save(path)?;
            return Ok(state);
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::CorruptLockFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the record to disk, replacing the previous file atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut content =
            serde_json::to_string_pretty(self).map_err(|e| Error::LockWriteError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        content.push('\n');

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| Error::io(path, e))?;
        temp.persist(path).map_err(|e| Error::io(path, e.error))?;

        debug!("Lock file written: {:?}", self);
        Ok(())
    }
}
