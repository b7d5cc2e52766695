// src/commands/status.rs
//! Report the installation state without changing it

use super::Env;
use anyhow::{Context, Result};
use dekun::LockState;
use dekun::platform::RUNTIME_VERSION;
use std::path::Path;

pub fn cmd_status(env: &Env) -> Result<()> {
    let layout = env.layout();
    let lock_path = layout.lock_file();

    println!("Root:      {}", layout.root().display());

    if !lock_path.exists() {
        println!("Status:    not installed");
        println!("\nRun `dekun setup <cpu|xpu|cuda|rocm>` to install.");
        return Ok(());
    }

    let state = LockState::open(&lock_path).context("Failed to read lock file")?;

    println!("Tool:      {} (this build: {})", or_dash(&state.tool_version), env!("CARGO_PKG_VERSION"));
    println!("Runtime:   {} (pinned: {})", or_dash(&state.runtime_version), RUNTIME_VERSION);
    println!("Backend:   {}", state.backend);
    println!();
    println!("Runtime dir:  {}", presence(&layout.runtime_dir()));
    println!("Payload dir:  {}", presence(&layout.payload_dir()));
    println!("Packages dir: {}", presence(&layout.packages_dir()));

    Ok(())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

fn presence(path: &Path) -> String {
    let mark = if path.is_dir() { "present" } else { "missing" };
    format!("{} ({})", path.display(), mark)
}
