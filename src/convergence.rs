// src/convergence.rs

//! Convergence of an installation towards the desired versions
//!
//! Three facets are checked and, if needed, repaired in strict order:
//!
//! 1. **Runtime**: the interpreter installation under `<root>/python`
//! 2. **Payload**: the embedded sources under `<root>/python/src`
//! 3. **Packages**: the backend package set under `<root>/packages`
//!
//! Each later facet assumes the earlier ones are correct on disk, so a
//! refreshed runtime always refreshes the payload and packages too.
//!
//! The lock file is written immediately after each successful step. A
//! failure part way through leaves the lock consistent with what was
//! actually completed, and the next run resumes from there.

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::lock::{Backend, LockState};
use crate::packages::{PackageInstaller, PackageManager, PackageSet};
use crate::payload;
use crate::platform::RuntimeRelease;
use crate::progress::Reporter;
use crate::runtime::RuntimeAcquirer;
use tracing::{debug, info};

/// The installation steps the state machine can trigger
///
/// Split out so the decision logic can be exercised without network access
/// or a real runtime.
pub trait Provisioner {
    /// Download and extract the runtime, then materialize the payload into it
    fn install_runtime(&mut self, layout: &Layout, reporter: &dyn Reporter) -> Result<()>;

    /// Re-materialize the payload into a clean payload directory
    fn install_payload(&mut self, layout: &Layout, reporter: &dyn Reporter) -> Result<()>;

    /// Install the package set for `backend` into a clean package directory
    fn install_packages(
        &mut self,
        layout: &Layout,
        backend: Backend,
        reporter: &dyn Reporter,
    ) -> Result<()>;
}

/// Desired versions for a convergence pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    /// Version of the running tool (and therefore of its embedded payload)
    pub tool_version: String,
    /// Pinned runtime version
    pub runtime_version: String,
    /// Re-sync the payload even when the tool version matches
    pub always_resync_payload: bool,
}

impl Targets {
    /// Targets for this build of the tool
    pub fn current(always_resync_payload: bool) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_version: crate::platform::RUNTIME_VERSION.to_string(),
            always_resync_payload,
        }
    }
}

/// What a convergence pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Backend the installation now provides
    pub backend: Backend,
    pub runtime_installed: bool,
    pub payload_synced: bool,
    pub packages_installed: bool,
}

impl Outcome {
    /// Whether the pass changed anything on disk
    pub fn changed(&self) -> bool {
        self.runtime_installed || self.payload_synced || self.packages_installed
    }
}

/// Convergence state machine over one root directory
///
/// Holds the lock record for the duration of a pass; not safe against
/// concurrent processes using the same root.
pub struct Converger<'a, P: Provisioner> {
    layout: &'a Layout,
    targets: &'a Targets,
    provisioner: P,
    reporter: &'a dyn Reporter,
}

impl<'a, P: Provisioner> Converger<'a, P> {
    pub fn new(
        layout: &'a Layout,
        targets: &'a Targets,
        provisioner: P,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            layout,
            targets,
            provisioner,
            reporter,
        }
    }

    /// Give back the provisioner
    pub fn into_provisioner(self) -> P {
        self.provisioner
    }

    /// Bring the installation up to date
    ///
    /// `requested` selects a backend to install; `None` keeps whatever is
    /// recorded in the lock file.
    pub fn ensure_complete(&mut self, requested: Option<Backend>) -> Result<Outcome> {
        self.layout.ensure_root()?;
        let lock_path = self.layout.lock_file();
        let mut state = LockState::open(&lock_path)?;
        debug!("Lock state at start of pass: {:?}", state);

        match requested {
            Some(Backend::None) => return Err(Error::BackendRequired),
            None if state.backend == Backend::None => return Err(Error::NoBackendRecorded),
            _ => {}
        }

        let runtime_installed = self.converge_runtime(&mut state)?;
        let payload_synced = self.converge_payload(&mut state, runtime_installed)?;
        let (backend, packages_installed) =
            self.converge_packages(&mut state, requested, payload_synced)?;

        let outcome = Outcome {
            backend,
            runtime_installed,
            payload_synced,
            packages_installed,
        };
        info!("Convergence complete: {:?}", outcome);
        Ok(outcome)
    }

    fn converge_runtime(&mut self, state: &mut LockState) -> Result<bool> {
        let runtime_dir = self.layout.runtime_dir();
        let label = format!("Runtime {}", self.targets.runtime_version);

        if runtime_dir.is_dir() && state.runtime_version == self.targets.runtime_version {
            self.reporter.skipped(&label);
            return Ok(false);
        }

        info!(
            "Runtime out of date (recorded '{}', wanted '{}')",
            state.runtime_version, self.targets.runtime_version
        );
        self.reporter.step(&format!("Installing runtime {}", self.targets.runtime_version));
        self.run_step(|p, layout, reporter| p.install_runtime(layout, reporter))?;

        state.runtime_version = self.targets.runtime_version.clone();
        state.save(&self.layout.lock_file())?;
        self.reporter.done(&format!("{} installed", label));
        Ok(true)
    }

    fn converge_payload(&mut self, state: &mut LockState, runtime_installed: bool) -> Result<bool> {
        let label = format!("Payload {}", self.targets.tool_version);

        if runtime_installed {
            // Installing the runtime materialized a fresh payload already
            if state.tool_version != self.targets.tool_version {
                state.tool_version = self.targets.tool_version.clone();
                state.save(&self.layout.lock_file())?;
            }
            return Ok(true);
        }

        let stale = state.tool_version != self.targets.tool_version
            || self.targets.always_resync_payload
            || !self.layout.payload_dir().is_dir();
        if !stale {
            self.reporter.skipped(&label);
            return Ok(false);
        }

        self.reporter.step(&format!("Syncing payload {}", self.targets.tool_version));
        self.run_step(|p, layout, reporter| p.install_payload(layout, reporter))?;

        state.tool_version = self.targets.tool_version.clone();
        state.save(&self.layout.lock_file())?;
        self.reporter.done(&format!("{} synced", label));
        Ok(true)
    }

    fn converge_packages(
        &mut self,
        state: &mut LockState,
        requested: Option<Backend>,
        payload_synced: bool,
    ) -> Result<(Backend, bool)> {
        let (backend, needed) = match requested {
            Some(Backend::None) => return Err(Error::BackendRequired),
            Some(backend) => (backend, backend != state.backend || payload_synced),
            None => match state.backend {
                Backend::None => return Err(Error::NoBackendRecorded),
                backend => (
                    backend,
                    !self.layout.packages_dir().is_dir() || payload_synced,
                ),
            },
        };

        let label = format!("Packages for {}", backend);
        if !needed {
            self.reporter.skipped(&label);
            return Ok((backend, false));
        }

        // Packages are wiped first, so an interrupted install must not look complete
        if state.backend != Backend::None {
            state.backend = Backend::None;
            state.save(&self.layout.lock_file())?;
        }

        self.reporter.step(&format!("Installing packages for {}", backend));
        self.run_step(|p, layout, reporter| p.install_packages(layout, backend, reporter))?;

        state.backend = backend;
        state.save(&self.layout.lock_file())?;
        self.reporter.done(&format!("{} installed", label));
        Ok((backend, true))
    }

    fn run_step<F>(&mut self, step: F) -> Result<()>
    where
        F: FnOnce(&mut P, &Layout, &dyn Reporter) -> Result<()>,
    {
        let result = step(&mut self.provisioner, self.layout, self.reporter);
        if let Err(e) = &result {
            self.reporter.failed(&e.to_string());
        }
        result
    }
}

/// Provisioner that downloads, extracts and spawns for real
pub struct SystemProvisioner {
    release: RuntimeRelease,
    acquirer: RuntimeAcquirer,
    index_url: Option<String>,
}

impl SystemProvisioner {
    pub fn new(release: RuntimeRelease, mirror: &str, index_url: Option<String>) -> Result<Self> {
        Ok(Self {
            release,
            acquirer: RuntimeAcquirer::new(mirror)?,
            index_url,
        })
    }
}

impl Provisioner for SystemProvisioner {
    fn install_runtime(&mut self, layout: &Layout, reporter: &dyn Reporter) -> Result<()> {
        self.acquirer
            .install(&self.release, &layout.runtime_dir(), reporter)?;
        payload::install(&layout.payload_dir())?;
        Ok(())
    }

    fn install_payload(&mut self, layout: &Layout, _reporter: &dyn Reporter) -> Result<()> {
        payload::install(&layout.payload_dir())?;
        Ok(())
    }

    fn install_packages(
        &mut self,
        layout: &Layout,
        backend: Backend,
        reporter: &dyn Reporter,
    ) -> Result<()> {
        let runtime_dir = layout.runtime_dir();
        let mut set = PackageSet::for_backend(backend);
        if let Some(url) = &self.index_url {
            set = set.with_index_url(url);
        }

        let manager = PackageManager::pip(&self.release.interpreter(&runtime_dir));
        PackageInstaller::new(manager, &runtime_dir, &layout.packages_dir()).install(&set, reporter)
    }
}
