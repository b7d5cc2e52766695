// src/config.rs

//! Tool configuration
//!
//! Resolved in layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `<root>/config.toml`, if present
//! 3. Environment (`DEKUN_DEV_RESYNC`, `DEKUN_RUNTIME_MIRROR`, `DEKUN_INDEX_URL`)
//! 4. Command-line flags
//!
//! The root directory itself comes from `--root`, then `DEKUN_HOME`, then
//! `~/.dekun`.
//!
//! # Example
//!
//! ```toml
//! dev_resync = "on-version-change"
//! runtime_mirror = "https://mirror.example.com/python-build-standalone"
//! index_url = "https://pypi.example.com/whl/cpu"
//! ```

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::platform::DEFAULT_RUNTIME_MIRROR;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the root directory
pub const HOME_ENV: &str = "DEKUN_HOME";

/// Default root directory name under the user's home
const DEFAULT_DIR_NAME: &str = ".dekun";

/// When development builds re-sync the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DevResync {
    /// Every run, so edits to `payload/` show up immediately
    #[default]
    Always,
    /// Only when the tool version changes, like release builds
    OnVersionChange,
}

impl DevResync {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "always" => Some(Self::Always),
            "on-version-change" | "never" => Some(Self::OnVersionChange),
            _ => None,
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub dev_resync: Option<DevResync>,
    pub runtime_mirror: Option<String>,
    pub index_url: Option<String>,
}

impl ConfigFile {
    /// Load the file if it exists
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let file = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        Ok(Some(file))
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub dev_resync: DevResync,
    pub runtime_mirror: String,
    pub index_url: Option<String>,
    pub show_progress: bool,
}

impl Config {
    /// Defaults for a given root directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dev_resync: DevResync::default(),
            runtime_mirror: DEFAULT_RUNTIME_MIRROR.to_string(),
            index_url: None,
            show_progress: true,
        }
    }

    /// Resolve configuration from every layer
    pub fn load(root_flag: Option<&Path>) -> Result<Self> {
        let root = match root_flag {
            Some(root) => root.to_path_buf(),
            None => default_root()?,
        };

        let mut config = Self::with_root(root);
        if let Some(file) = ConfigFile::load(&config.layout().config_file())? {
            config.apply_file(file);
        }
        config.apply_env(|key| std::env::var(key).ok())?;

        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Overlay values from `config.toml`
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(resync) = file.dev_resync {
            self.dev_resync = resync;
        }
        if let Some(mirror) = file.runtime_mirror {
            self.runtime_mirror = mirror;
        }
        if file.index_url.is_some() {
            self.index_url = file.index_url;
        }
    }

    /// Overlay values from the environment
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("DEKUN_DEV_RESYNC") {
            self.dev_resync = DevResync::parse(&value).ok_or_else(|| {
                Error::ConfigError(format!(
                    "DEKUN_DEV_RESYNC must be 'always' or 'on-version-change', got '{}'",
                    value
                ))
            })?;
        }
        if let Some(mirror) = lookup("DEKUN_RUNTIME_MIRROR") {
            self.runtime_mirror = mirror;
        }
        if let Some(url) = lookup("DEKUN_INDEX_URL") {
            self.index_url = Some(url);
        }
        Ok(())
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.root)
    }

    /// Whether the payload is re-synced on every run
    ///
    /// Only development builds honour `dev_resync`.
    pub fn always_resync_payload(&self) -> bool {
        cfg!(debug_assertions) && self.dev_resync == DevResync::Always
    }
}

/// `DEKUN_HOME`, else `~/.dekun`
fn default_root() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .ok_or_else(|| {
            Error::ConfigError(format!(
                "Cannot determine home directory; set {} or pass --root",
                HOME_ENV
            ))
        })
}
