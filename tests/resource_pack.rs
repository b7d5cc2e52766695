// tests/resource_pack.rs

//! Integration tests for resource packs over real directory trees.

mod common;

use common::write_tree;
use dekun::{ResourceError, ResourcePack};
use std::fs;
use tempfile::TempDir;

const TREE: &[(&str, &[u8])] = &[
    ("main.py", b"from marker import model\n"),
    ("utilities.py", b"def ensure_directory(path):\n    pass\n"),
    ("marker/__init__.py", b""),
    ("marker/unet.py", b"class UNet:\n    pass\n"),
    ("marker/data/weights.bin", &[0, 1, 2, 255, 254, 0, 0, 7]),
];

#[test]
fn test_directory_round_trip() {
    let source = TempDir::new().unwrap();
    write_tree(source.path(), TREE);

    let bytes = ResourcePack::read_directory(source.path())
        .unwrap()
        .save()
        .unwrap();
    let pack = ResourcePack::load(&bytes).unwrap();
    assert_eq!(pack.len(), TREE.len());

    let dest = TempDir::new().unwrap();
    let written = pack.write_directory(dest.path(), "").unwrap();
    assert_eq!(written, TREE.len());

    for (path, content) in TREE {
        assert_eq!(&fs::read(dest.path().join(path)).unwrap(), content, "{}", path);
    }
}

#[test]
fn test_base64_round_trip_over_tree() {
    let source = TempDir::new().unwrap();
    write_tree(source.path(), TREE);
    let pack = ResourcePack::read_directory(source.path()).unwrap();

    let encoded = pack.save_base64().unwrap();
    let decoded = ResourcePack::load_base64(&encoded).unwrap();

    let original: Vec<_> = pack.iter().collect();
    let restored: Vec<_> = decoded.iter().collect();
    assert_eq!(original, restored);
}

#[test]
fn test_write_subtree_by_prefix() {
    let source = TempDir::new().unwrap();
    write_tree(source.path(), TREE);
    let pack = ResourcePack::read_directory(source.path()).unwrap();

    let dest = TempDir::new().unwrap();
    let written = pack.write_directory(dest.path(), "marker/").unwrap();

    assert_eq!(written, 3);
    assert!(dest.path().join("unet.py").is_file());
    assert!(dest.path().join("data/weights.bin").is_file());
    assert!(!dest.path().join("main.py").exists());
}

#[test]
fn test_truncated_pack_rejected() {
    let source = TempDir::new().unwrap();
    write_tree(source.path(), TREE);
    let bytes = ResourcePack::read_directory(source.path())
        .unwrap()
        .save()
        .unwrap();

    for cut in [1, 4, bytes.len() / 2, bytes.len() - 1] {
        let result = ResourcePack::load(&bytes[..cut]);
        assert!(
            matches!(result, Err(ResourceError::TruncatedInput { .. })),
            "cut at {} gave {:?}",
            cut,
            result
        );
    }
}

#[test]
fn test_embedded_payload_materializes() {
    let dest = TempDir::new().unwrap();
    let payload_dir = dest.path().join("python/src");

    let written = dekun::payload::install(&payload_dir).unwrap();

    assert!(written >= 1);
    assert!(payload_dir.join("main.py").is_file());
    assert!(payload_dir.join("marker").is_dir());
}
