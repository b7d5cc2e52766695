// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use dekun::{Backend, Layout, LockState, Provisioner, Reporter, Result, Targets};
use std::fs;
use std::path::Path;

/// Write `files` below `root`, creating parent directories.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (path, content) in files {
        let target = root.join(path);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(target, content).unwrap();
    }
}

/// Targets for a release build of tool 0.1.0 on runtime 3.12.0.
pub fn release_targets() -> Targets {
    Targets {
        tool_version: "0.1.0".to_string(),
        runtime_version: "3.12.0".to_string(),
        always_resync_payload: false,
    }
}

/// Write a lock file and create the directories it claims are installed.
pub fn seed_installation(layout: &Layout, tool: &str, runtime: &str, backend: Backend) {
    fs::create_dir_all(layout.payload_dir()).unwrap();
    if backend.is_installable() {
        fs::create_dir_all(layout.packages_dir()).unwrap();
    }
    LockState {
        tool_version: tool.to_string(),
        runtime_version: runtime.to_string(),
        backend,
    }
    .save(&layout.lock_file())
    .unwrap();
}

/// Provisioner that records each step and creates the directories a real
/// install would, optionally failing one named step.
#[derive(Default)]
pub struct RecordingProvisioner {
    pub calls: Vec<String>,
    pub fail_on: Option<&'static str>,
}

impl RecordingProvisioner {
    pub fn failing_on(step: &'static str) -> Self {
        Self {
            calls: Vec::new(),
            fail_on: Some(step),
        }
    }

    fn record(&mut self, step: &str) -> Result<()> {
        self.calls.push(step.to_string());
        if self.fail_on.is_some_and(|f| step.starts_with(f)) {
            return Err(dekun::Error::SubprocessError {
                command: step.to_string(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Provisioner for RecordingProvisioner {
    fn install_runtime(&mut self, layout: &Layout, _reporter: &dyn Reporter) -> Result<()> {
        self.record("runtime")?;
        fs::create_dir_all(layout.payload_dir()).unwrap();
        Ok(())
    }

    fn install_payload(&mut self, layout: &Layout, _reporter: &dyn Reporter) -> Result<()> {
        self.record("payload")?;
        fs::create_dir_all(layout.payload_dir()).unwrap();
        Ok(())
    }

    fn install_packages(
        &mut self,
        layout: &Layout,
        backend: Backend,
        _reporter: &dyn Reporter,
    ) -> Result<()> {
        self.record(&format!("packages:{}", backend))?;
        fs::create_dir_all(layout.packages_dir()).unwrap();
        Ok(())
    }
}
