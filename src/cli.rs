// src/cli.rs
//! CLI definitions for dekun
//!
//! Every command that touches the model first converges the installation,
//! so `setup` is only needed to pick or switch the backend.
//!
//! - `setup` - Install or repair the runtime, payload and backend packages
//! - `status` - Show what is installed, without changing anything
//! - `create` - Create a new marker model
//! - `check` - Load a marker model to verify it
//! - `copy` - Load a marker model and save it elsewhere

use clap::{Args, Parser, Subcommand};
use dekun::Backend;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dekun")]
#[command(version)]
#[command(about = "Provision and drive the dekun marker toolkit", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Installation root (default: $DEKUN_HOME or ~/.dekun)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install or repair the installation, optionally switching backend
    Setup {
        /// Hardware backend: cpu, xpu, cuda, rocm (default: keep current)
        #[arg(value_parser = parse_backend)]
        backend: Option<Backend>,
    },

    /// Show the installed versions and backend
    Status,

    /// Create a new marker model
    Create {
        /// Where to write the model
        output: PathBuf,

        /// Hardware backend to install before creating
        #[arg(long, value_parser = parse_backend)]
        backend: Option<Backend>,

        /// Input width
        #[arg(long, default_value_t = 256)]
        width: u32,

        /// Input height
        #[arg(long, default_value_t = 256)]
        height: u32,

        /// Input channel depth
        #[arg(long, default_value_t = 3)]
        depth: u32,
    },

    /// Load a marker model to check that it is readable
    Check {
        /// Model file
        model: PathBuf,
    },

    /// Load a marker model and save it to a new file
    Copy {
        /// Source model
        input: PathBuf,

        /// Destination model
        output: PathBuf,
    },
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    let backend: Backend = s.parse()?;
    if backend.is_installable() {
        Ok(backend)
    } else {
        Err("backend 'none' cannot be installed; choose cpu, xpu, cuda or rocm".to_string())
    }
}
