// tests/package_installer.rs

//! Integration tests for the package installer.
//!
//! A shell script stands in for the runtime's package manager: it logs each
//! invocation and fails for any requirement listed in `$FAIL_ON`.

#![cfg(unix)]

use dekun::packages::{PackageInstaller, PackageManager, PackageSet};
use dekun::{Backend, Error, SilentReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_MANAGER: &str = r#"
echo "$* home=$PYTHONHOME path=$PYTHONPATH" >> "$PYTHONHOME/calls.log"
case "$2" in
    torchvision*)
        if [ -f "$PYTHONHOME/fail-torchvision" ]; then
            echo "ERROR: No matching distribution found for $2" >&2
            exit 1
        fi
        ;;
esac
echo "Successfully installed $2"
"#;

struct Fixture {
    _temp: TempDir,
    runtime: PathBuf,
    packages: PathBuf,
    installer: PackageInstaller,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let runtime = temp.path().join("python");
    let packages = temp.path().join("packages");
    fs::create_dir_all(&runtime).unwrap();

    let script = temp.path().join("fake-pip.sh");
    fs::write(&script, FAKE_MANAGER).unwrap();

    let manager = PackageManager {
        program: PathBuf::from("/bin/sh"),
        leading_args: vec![script.to_string_lossy().to_string()],
    };
    let installer = PackageInstaller::new(manager, &runtime, &packages);

    Fixture {
        _temp: temp,
        runtime,
        packages,
        installer,
    }
}

fn calls(runtime: &Path) -> Vec<String> {
    fs::read_to_string(runtime.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_installs_each_package_in_order() {
    let f = fixture();
    let set = PackageSet::for_backend(Backend::Cpu);

    f.installer.install(&set, &SilentReporter).unwrap();

    let calls = calls(&f.runtime);
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("install torch==2.5.1 "));
    assert!(calls[1].starts_with("install torchvision==0.20.1 "));
    for call in &calls {
        assert!(call.contains("--index-url https://download.pytorch.org/whl/cpu"));
        assert!(call.contains(&format!("--target {}", f.packages.display())));
        assert!(call.contains(&format!("home={}", f.runtime.display())));
        assert!(call.contains(&format!("path={}", f.packages.display())));
    }
}

#[test]
fn test_target_directory_is_cleaned_first() {
    let f = fixture();
    fs::create_dir_all(f.packages.join("stale")).unwrap();
    fs::write(f.packages.join("stale/old.py"), "x = 1").unwrap();

    f.installer
        .install(&PackageSet::for_backend(Backend::Cuda), &SilentReporter)
        .unwrap();

    assert!(f.packages.is_dir());
    assert!(!f.packages.join("stale").exists());
}

#[test]
fn test_failure_surfaces_stderr_and_stops() {
    let f = fixture();
    fs::write(f.runtime.join("fail-torchvision"), "").unwrap();

    let err = f
        .installer
        .install(&PackageSet::for_backend(Backend::Rocm), &SilentReporter)
        .unwrap_err();

    match err {
        Error::SubprocessError { command, message } => {
            assert!(command.contains("torchvision==0.20.1"));
            assert_eq!(message, "ERROR: No matching distribution found for torchvision==0.20.1");
        }
        other => panic!("expected subprocess error, got {:?}", other),
    }
    assert_eq!(calls(&f.runtime).len(), 2);
}

#[test]
fn test_missing_manager_is_a_subprocess_error() {
    let temp = TempDir::new().unwrap();
    let installer = PackageInstaller::new(
        PackageManager::pip(&temp.path().join("python/bin/python3")),
        temp.path(),
        &temp.path().join("packages"),
    );

    let result = installer.install(&PackageSet::for_backend(Backend::Xpu), &SilentReporter);
    assert!(matches!(result, Err(Error::SubprocessError { .. })));
}
