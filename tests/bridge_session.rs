// tests/bridge_session.rs

//! Integration test for a working runtime session.
//!
//! Needs a real runtime: set `DEKUN_TEST_LIBPYTHON` to its shared library and,
//! when the library does not live in `<home>/lib`, `DEKUN_TEST_PYTHONHOME` to
//! its installation directory. Without them the test is skipped. It lives in
//! its own file so no other test shares the process-wide session slot.

#![cfg(target_os = "linux")]

use dekun::bridge::Value;
use dekun::{Backend, BindingError, Bridge, BridgeOptions, BridgeState, EntryPoint, Error};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// Imports C extension modules, which resolve runtime symbols globally
const ENTRY: &str = r#"
import json
import math
import os

_marker = None

def init_marker(backend, width, height, depth):
    global _marker
    _marker = {
        "backend": backend,
        "env": os.environ["DEKUN_BACKEND"],
        "shape": [width, height, depth],
        "volume": math.prod([width, height, depth]),
    }

def load_marker(path):
    global _marker
    with open(path) as f:
        _marker = json.load(f)

def save_marker(path):
    with open(path, "w") as f:
        json.dump(_marker, f, sort_keys=True)
"#;

fn runtime_options(temp: &TempDir) -> Option<BridgeOptions> {
    let library = PathBuf::from(std::env::var_os("DEKUN_TEST_LIBPYTHON")?);
    let home = match std::env::var_os("DEKUN_TEST_PYTHONHOME") {
        Some(home) => PathBuf::from(home),
        None => library.parent()?.parent()?.to_path_buf(),
    };

    let payload_dir = temp.path().join("python/src");
    fs::create_dir_all(&payload_dir).unwrap();
    fs::write(payload_dir.join("main.py"), ENTRY).unwrap();

    Some(BridgeOptions {
        library,
        home,
        payload_dir,
        packages_dir: temp.path().join("packages"),
        backend: Backend::Cuda,
    })
}

#[test]
fn test_session_runs_marker_operations() {
    let temp = TempDir::new().unwrap();
    let Some(options) = runtime_options(&temp) else {
        eprintln!("DEKUN_TEST_LIBPYTHON not set, skipping");
        return;
    };

    let bridge = Bridge::open(&options).unwrap();
    assert_eq!(bridge.state(), BridgeState::ModuleImported);
    assert_eq!(bridge.backend(), Backend::Cuda);

    // One session per process
    assert!(matches!(
        Bridge::open(&options),
        Err(Error::Binding(BindingError::AlreadyActive))
    ));

    let items = vec![
        bridge.int(-7).unwrap(),
        bridge.float(0.5).unwrap(),
        bridge.str("marker").unwrap(),
    ];
    assert!(!bridge.tuple(items).unwrap().as_ptr().is_null());
    for entry in EntryPoint::ALL {
        assert!(bridge.entry_point(entry).unwrap().is_callable());
    }
    assert!(bridge.object(&Value::Tuple(vec![])).is_ok());

    let marker = bridge.marker();
    let saved = temp.path().join("marker.json");
    marker.init(Backend::Cuda, 4, 5, 6).unwrap();
    marker.save(&saved).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "backend": "cuda",
            "env": "cuda",
            "shape": [4, 5, 6],
            "volume": 120
        })
    );

    let copy = temp.path().join("copy.json");
    marker.load(&saved).unwrap();
    marker.save(&copy).unwrap();
    assert_eq!(fs::read(&saved).unwrap(), fs::read(&copy).unwrap());

    // A raising callable is reported, and the session stays usable
    match marker.load(&temp.path().join("missing.json")) {
        Err(Error::ForeignError { operation }) => assert_eq!(operation, "load_marker"),
        other => panic!("expected foreign error, got {:?}", other.err()),
    }
    marker.save(&copy).unwrap();

    bridge.close();

    // Slot is free again after teardown
    let mut missing = options.clone();
    missing.library = temp.path().join("libmissing.so");
    assert!(matches!(
        Bridge::open(&missing),
        Err(Error::Binding(BindingError::LibraryNotFound { .. }))
    ));
}
