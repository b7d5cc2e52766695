// src/commands/marker.rs
//! Marker model commands
//!
//! Each command converges the installation first, then opens a runtime
//! session for the duration of the call.

use super::Env;
use anyhow::{Context, Result};
use dekun::Backend;
use std::path::Path;
use tracing::info;

/// Input shape for a new marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Create a new marker and save it to `output`
pub fn cmd_create(env: &Env, output: &Path, backend: Option<Backend>, shape: Shape) -> Result<()> {
    info!("Creating marker {:?} at {}", shape, output.display());

    let bridge = env.open_bridge(backend)?;
    let marker = bridge.marker();

    marker
        .init(bridge.backend(), shape.width, shape.height, shape.depth)
        .context("Failed to create marker")?;
    marker
        .save(output)
        .with_context(|| format!("Failed to save marker to {}", output.display()))?;

    println!("Created {}x{}x{} marker at {}", shape.width, shape.height, shape.depth, output.display());
    Ok(())
}

/// Load `model` to confirm it is a valid marker
pub fn cmd_check(env: &Env, model: &Path) -> Result<()> {
    let bridge = env.open_bridge(None)?;
    bridge
        .marker()
        .load(model)
        .with_context(|| format!("Failed to load marker from {}", model.display()))?;

    println!("{}: OK", model.display());
    Ok(())
}

/// Load `input` and save it as `output`
pub fn cmd_copy(env: &Env, input: &Path, output: &Path) -> Result<()> {
    let bridge = env.open_bridge(None)?;
    let marker = bridge.marker();

    marker
        .load(input)
        .with_context(|| format!("Failed to load marker from {}", input.display()))?;
    marker
        .save(output)
        .with_context(|| format!("Failed to save marker to {}", output.display()))?;

    println!("Copied {} -> {}", input.display(), output.display());
    Ok(())
}

