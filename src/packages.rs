// src/packages.rs

//! Native package installation
//!
//! Installs the backend-specific package set with the runtime's bundled
//! package manager. Each package is installed by its own subprocess; the
//! first failure aborts the remaining list, and the captured stderr is
//! surfaced to the user.

use crate::error::{Error, Result};
use crate::layout::reset_dir;
use crate::lock::Backend;
use crate::progress::Reporter;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// A package with its pinned version specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: &'static str,
    pub version: &'static str,
}

impl PackageSpec {
    /// Requirement string passed to the package manager
    pub fn requirement(&self) -> String {
        format!("{}{}", self.name, self.version)
    }
}

/// Packages installed for every backend, in install order
const PACKAGES: &[PackageSpec] = &[
    PackageSpec {
        name: "torch",
        version: "==2.5.1",
    },
    PackageSpec {
        name: "torchvision",
        version: "==0.20.1",
    },
];

/// Package list and index for one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSet {
    pub backend: Backend,
    pub index_url: String,
    pub packages: Vec<PackageSpec>,
}

impl PackageSet {
    /// The pinned set for `backend`
    ///
    /// `Backend::None` has no package set; callers must reject it before
    /// getting here.
    pub fn for_backend(backend: Backend) -> Self {
        let index_url = match backend {
            Backend::Cpu => "https://download.pytorch.org/whl/cpu",
            Backend::Xpu => "https://download.pytorch.org/whl/xpu",
            Backend::Cuda => "https://download.pytorch.org/whl/cu124",
            Backend::Rocm => "https://download.pytorch.org/whl/rocm6.2",
            Backend::None => unreachable!("backend 'none' has no package set"),
        };

        Self {
            backend,
            index_url: index_url.to_string(),
            packages: PACKAGES.to_vec(),
        }
    }

    /// Replace the package index URL
    pub fn with_index_url(mut self, index_url: &str) -> Self {
        self.index_url = index_url.to_string();
        self
    }
}

/// How to launch the runtime's package manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManager {
    /// Executable to spawn
    pub program: PathBuf,
    /// Arguments placed before the `install` subcommand
    pub leading_args: Vec<String>,
}

impl PackageManager {
    /// `<interpreter> -m pip`
    pub fn pip(interpreter: &Path) -> Self {
        Self {
            program: interpreter.to_path_buf(),
            leading_args: vec!["-m".to_string(), "pip".to_string()],
        }
    }

    fn display_name(&self) -> String {
        let program = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string());
        std::iter::once(program)
            .chain(self.leading_args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Installs package sets into a target directory
pub struct PackageInstaller {
    manager: PackageManager,
    runtime_dir: PathBuf,
    target_dir: PathBuf,
}

impl PackageInstaller {
    pub fn new(manager: PackageManager, runtime_dir: &Path, target_dir: &Path) -> Self {
        Self {
            manager,
            runtime_dir: runtime_dir.to_path_buf(),
            target_dir: target_dir.to_path_buf(),
        }
    }

    /// Clean the target directory, then install every package in order
    pub fn install(&self, set: &PackageSet, reporter: &dyn Reporter) -> Result<()> {
        info!(
            "Installing {} packages for backend {} from {}",
            set.packages.len(),
            set.backend,
            set.index_url
        );
        reset_dir(&self.target_dir)?;

        for package in &set.packages {
            reporter.step(&format!("Installing {}", package.requirement()));
            if let Err(e) = self.install_one(package, &set.index_url) {
                reporter.failed(&format!("Failed to install {}", package.requirement()));
                return Err(e);
            }
            reporter.done(&format!("Installed {}", package.requirement()));
        }

        Ok(())
    }

    /// Arguments for installing one package
    pub fn install_args(&self, package: &PackageSpec, index_url: &str) -> Vec<String> {
        let mut args = self.manager.leading_args.clone();
        args.extend([
            "install".to_string(),
            package.requirement(),
            "--disable-pip-version-check".to_string(),
            "--target".to_string(),
            self.target_dir.to_string_lossy().to_string(),
            "--index-url".to_string(),
            index_url.to_string(),
        ]);
        args
    }

    fn install_one(&self, package: &PackageSpec, index_url: &str) -> Result<()> {
        let args = self.install_args(package, index_url);
        let command = format!("{} install {}", self.manager.display_name(), package.requirement());
        debug!("Running {} {:?}", self.manager.program.display(), args);

        let output = Command::new(&self.manager.program)
            .args(&args)
            .current_dir(&self.runtime_dir)
            .env("PYTHONHOME", &self.runtime_dir)
            .env("PYTHONPATH", &self.target_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::SubprocessError {
                command: command.clone(),
                message: format!("failed to spawn {}: {}", self.manager.program.display(), e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!("[{}] {}", package.name, line);
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!("{} exited with {}", command, output.status);
        Err(Error::SubprocessError {
            command,
            message: if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            },
        })
    }
}
