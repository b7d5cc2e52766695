// src/commands/setup.rs
//! Install or repair the local installation

use super::Env;
use anyhow::Result;
use dekun::Backend;
use tracing::info;

/// Converge the installation, switching to `backend` if one is given
pub fn cmd_setup(env: &Env, backend: Option<Backend>) -> Result<()> {
    info!("Setting up {} (requested backend: {:?})", env.config.root.display(), backend);

    let outcome = env.converge(backend)?;

    if outcome.changed() {
        println!("Installation ready with backend {}", outcome.backend);
    } else {
        println!("Installation already up to date (backend {})", outcome.backend);
    }
    Ok(())
}
