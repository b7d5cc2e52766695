// src/commands/mod.rs
//! Command handlers for the dekun CLI

mod marker;
mod setup;
mod status;

pub use marker::{Shape, cmd_check, cmd_copy, cmd_create};
pub use setup::cmd_setup;
pub use status::cmd_status;

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use dekun::{
    Backend, Bridge, BridgeOptions, Config, ConsoleReporter, Converger, Layout, LogReporter,
    Outcome, Reporter, RuntimeRelease, SystemProvisioner, Targets,
};
use std::io::IsTerminal;

/// Resolved configuration plus the reporter commands print through
pub struct Env {
    pub config: Config,
    reporter: Box<dyn Reporter>,
}

impl Env {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let mut config =
            Config::load(global.root.as_deref()).context("Failed to load configuration")?;
        if global.quiet || !std::io::stdout().is_terminal() {
            config.show_progress = false;
        }

        let reporter: Box<dyn Reporter> = if global.quiet {
            Box::new(LogReporter)
        } else {
            Box::new(ConsoleReporter::new(config.show_progress))
        };

        Ok(Self { config, reporter })
    }

    pub fn layout(&self) -> Layout {
        self.config.layout()
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    /// Bring the installation up to date, installing `requested` if given
    pub fn converge(&self, requested: Option<Backend>) -> Result<Outcome> {
        let layout = self.layout();
        let release = RuntimeRelease::pinned()?;
        let provisioner = SystemProvisioner::new(
            release,
            &self.config.runtime_mirror,
            self.config.index_url.clone(),
        )?;
        let targets = Targets::current(self.config.always_resync_payload());

        let mut converger = Converger::new(&layout, &targets, provisioner, self.reporter());
        let outcome = converger
            .ensure_complete(requested)
            .with_context(|| format!("Failed to prepare installation at {}", layout.root().display()))?;
        Ok(outcome)
    }

    /// Converge, then open a runtime session on the resulting backend
    pub fn open_bridge(&self, requested: Option<Backend>) -> Result<Bridge> {
        let outcome = self.converge(requested)?;
        let options = BridgeOptions::for_layout(&self.layout(), &RuntimeRelease::pinned()?, outcome.backend);
        let bridge = Bridge::open(&options).context("Failed to start the embedded runtime")?;
        Ok(bridge)
    }
}
