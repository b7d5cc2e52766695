// src/lib.rs

//! Dekun provisioning core
//!
//! Keeps a local installation of the dekun marker toolkit in shape and calls
//! into it.
//!
//! # Architecture
//!
//! - Convergence: runtime, payload and backend packages are checked and
//!   repaired in order, with progress recorded in a lock file after each step
//! - Resource packs: the application sources ship inside the binary as a
//!   compact binary pack and are materialized on demand
//! - Bridge: the runtime's shared library is loaded at run time and driven
//!   through a fixed table of symbols

pub mod bridge;
pub mod config;
pub mod convergence;
mod error;
pub mod layout;
pub mod lock;
pub mod packages;
pub mod payload;
pub mod platform;
pub mod progress;
pub mod resource;
pub mod runtime;

pub use bridge::{BindingError, Bridge, BridgeOptions, BridgeState, EntryPoint, Marker};
pub use config::{Config, DevResync};
pub use convergence::{Converger, Outcome, Provisioner, SystemProvisioner, Targets};
pub use error::{Error, Result};
pub use layout::Layout;
pub use lock::{Backend, LockState};
pub use platform::RuntimeRelease;
pub use progress::{ConsoleReporter, LogReporter, Reporter, SilentReporter};
pub use resource::{ResourceError, ResourcePack};
