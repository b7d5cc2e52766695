// src/error.rs

//! Error types for the Dekun provisioning core
//!
//! Every variant is fatal for the command that produced it. Lock file
//! updates committed before the failure are kept, so re-running resumes
//! from the last completed step.

use crate::bridge::BindingError;
use crate::resource::ResourceError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// The lock file exists but cannot be parsed
    #[error(
        "Lock file {path} is corrupted: {reason}\n\
         Fix or remove the file manually, then run `dekun setup <backend>` again."
    )]
    CorruptLockFile { path: PathBuf, reason: String },

    /// The lock record could not be encoded
    #[error("Failed to write lock file {path}: {reason}")]
    LockWriteError { path: PathBuf, reason: String },

    /// Filesystem operation failed
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport error or non-success HTTP status
    #[error("Download failed: {0}")]
    NetworkError(String),

    /// Decompression or extraction failed
    #[error("Archive extraction failed: {0}")]
    ArchiveError(String),

    /// Child process could not be spawned or exited non-zero
    #[error("{command} failed: {message}")]
    SubprocessError { command: String, message: String },

    /// Missing library, symbol, module or callable in the foreign runtime
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The foreign runtime raised an error during a call
    #[error("Foreign runtime error during {operation}")]
    ForeignError { operation: String },

    /// Resource pack could not be encoded, decoded or written
    #[error("Resource pack error: {0}")]
    Resource(#[from] ResourceError),

    /// `none` was requested as an install target
    #[error(
        "Backend 'none' cannot be installed.\n\
         Select a hardware backend: dekun setup <cpu|xpu|cuda|rocm>"
    )]
    BackendRequired,

    /// No backend was requested and none has been installed yet
    #[error(
        "No backend has been installed yet.\n\
         Select a hardware backend first: dekun setup <cpu|xpu|cuda|rocm>"
    )]
    NoBackendRecorded,

    /// The host operating system or architecture has no runtime build
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Invalid configuration file or value
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Build an `IoError` for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

/// Result alias using the core error type
pub type Result<T> = std::result::Result<T, Error>;
