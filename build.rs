// build.rs

//! Packs the `payload/` source tree into `$OUT_DIR/payload.b64`

use std::env;
use std::fs;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "src/resource/mod.rs"]
mod resource;

use resource::ResourcePack;

/// Directories that never belong in the embedded payload
const SKIPPED_SEGMENTS: &[&str] = &["__pycache__", ".pytest_cache"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=payload");
    println!("cargo:rerun-if-changed=src/resource/mod.rs");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));

    let payload_dir = manifest_dir.join("payload");
    let pack = match ResourcePack::read_directory(&payload_dir) {
        Ok(pack) => pack,
        Err(e) => panic!("Failed to read payload directory {}: {}", payload_dir.display(), e),
    };

    let mut filtered = ResourcePack::new();
    for (key, content) in pack.iter() {
        let segments: Vec<&str> = key.split(resource::SEPARATOR).collect();
        if segments.iter().any(|s| SKIPPED_SEGMENTS.contains(s)) || key.ends_with(".pyc") {
            continue;
        }
        filtered.set(segments.as_slice(), content.to_vec());
    }

    let encoded = match filtered.save_base64() {
        Ok(encoded) => encoded,
        Err(e) => panic!("Failed to encode payload: {}", e),
    };

    let target = out_dir.join("payload.b64");
    if let Err(e) = fs::write(&target, encoded) {
        panic!("Failed to write {}: {}", target.display(), e);
    }
}
