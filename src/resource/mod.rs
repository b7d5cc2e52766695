// src/resource/mod.rs

//! Resource pack: a flat binary bundle of files
//!
//! A pack maps relative file paths to their byte content and serializes the
//! whole mapping into one contiguous buffer. The build script uses it to embed
//! the payload tree into the binary (as base64), and the installer uses it to
//! materialize that tree again on disk.
//!
//! # Format
//!
//! All integers are big-endian `u32`:
//!
//! ```text
//! entry_count
//! entry_count times:
//!     path_len
//!     content_len
//!     path bytes    (path_len)
//!     content bytes (content_len)
//! ```
//!
//! This file is also compiled into `build.rs` via `#[path]`, so it must only
//! depend on `std`, `base64`, `walkdir` and `thiserror`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Separator used to join path segments into a pack key
pub const SEPARATOR: char = '/';

/// Width of every integer field in the format
const FIELD_WIDTH: usize = 4;

/// Errors produced while encoding, decoding or materializing a pack
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Truncated resource pack: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Resource pack has {0} trailing bytes after the last entry")]
    TrailingData(usize),

    #[error("Duplicate resource entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource entry path is not valid UTF-8 at offset {0}")]
    InvalidUtf8(usize),

    #[error("Resource entry '{0}' is too large for the pack format")]
    TooLarge(String),

    #[error("Unsafe resource path: {0}")]
    UnsafePath(String),

    #[error("Invalid base64 resource pack: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },
}

/// Result alias for resource pack operations
pub type ResourceResult<T> = std::result::Result<T, ResourceError>;

/// An in-memory resource pack
///
/// Keys are kept sorted so that serialization is deterministic, which keeps
/// the embedded payload stable across builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePack {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ResourcePack {
    /// Create an empty pack
    pub fn new() -> Self {
        Self::default()
    }

    /// Join path segments into a pack key
    pub fn key<S: AsRef<str>>(segments: &[S]) -> String {
        let mut key = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                key.push(SEPARATOR);
            }
            key.push_str(segment.as_ref());
        }
        key
    }

    /// Number of entries in the pack
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pack holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the content stored under the given path
    pub fn get<S: AsRef<str>>(&self, segments: &[S]) -> Option<&[u8]> {
        self.entries.get(&Self::key(segments)).map(Vec::as_slice)
    }

    /// Store content under the given path, replacing any previous content
    pub fn set<S: AsRef<str>>(&mut self, segments: &[S], content: impl Into<Vec<u8>>) {
        self.entries.insert(Self::key(segments), content.into());
    }

    /// Iterate over `(key, content)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Decode a pack from its binary form
    pub fn load(buffer: &[u8]) -> ResourceResult<Self> {
        let mut reader = Reader { buffer, offset: 0 };
        let count = reader.read_u32()?;

        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let path_len = reader.read_u32()? as usize;
            let content_len = reader.read_u32()? as usize;

            let path_offset = reader.offset;
            let path = reader.read_bytes(path_len)?;
            let path = std::str::from_utf8(path)
                .map_err(|_| ResourceError::InvalidUtf8(path_offset))?
                .to_string();
            let content = reader.read_bytes(content_len)?.to_vec();

            if entries.insert(path.clone(), content).is_some() {
                return Err(ResourceError::DuplicateEntry(path));
            }
        }

        let remaining = reader.remaining();
        if remaining != 0 {
            return Err(ResourceError::TrailingData(remaining));
        }

        Ok(Self { entries })
    }

    /// Number of bytes `save` will produce
    pub fn encoded_len(&self) -> usize {
        self.entries
            .iter()
            .fold(FIELD_WIDTH, |total, (path, content)| {
                total + 2 * FIELD_WIDTH + path.len() + content.len()
            })
    }

    /// Encode the pack into its binary form
    ///
    /// The output size is computed up front and the buffer is allocated once;
    /// the write pass must fill it exactly.
    pub fn save(&self) -> ResourceResult<Vec<u8>> {
        let size = self.encoded_len();
        let mut out = Vec::with_capacity(size);

        let count = field(self.entries.len(), "<entry count>")?;
        out.extend_from_slice(&count.to_be_bytes());

        for (path, content) in &self.entries {
            out.extend_from_slice(&field(path.len(), path)?.to_be_bytes());
            out.extend_from_slice(&field(content.len(), path)?.to_be_bytes());
            out.extend_from_slice(path.as_bytes());
            out.extend_from_slice(content);
        }

        debug_assert_eq!(out.len(), size);
        Ok(out)
    }

    /// Encode the pack as standard base64
    pub fn save_base64(&self) -> ResourceResult<String> {
        Ok(STANDARD.encode(self.save()?))
    }

    /// Decode a pack from standard base64
    pub fn load_base64(encoded: &str) -> ResourceResult<Self> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::load(&bytes)
    }

    /// Build a pack from every regular file below `root`
    ///
    /// Keys are paths relative to `root`, joined with `/`. Directories are
    /// not stored.
    pub fn read_directory(root: &Path) -> ResourceResult<Self> {
        let mut pack = Self::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| ResourceError::Walk {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| ResourceError::UnsafePath(entry.path().display().to_string()))?;
            let segments = path_segments(relative)?;

            let content = fs::read(entry.path()).map_err(|source| ResourceError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            pack.set(segments.as_slice(), content);
        }

        Ok(pack)
    }

    /// Write every entry whose key starts with `prefix` below `root`
    ///
    /// The prefix is removed from the key to form the relative output path.
    /// Parent directories are created as needed. This is not atomic: a
    /// failure leaves the files written so far in place. Returns the number
    /// of files written.
    pub fn write_directory(&self, root: &Path, prefix: &str) -> ResourceResult<usize> {
        let mut written = 0;

        for (key, content) in self.entries.range(prefix.to_string()..) {
            let Some(relative) = key.strip_prefix(prefix) else {
                break;
            };
            if relative.is_empty() {
                continue;
            }

            let target = resolve_target(root, relative)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| ResourceError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(&target, content).map_err(|source| ResourceError::Io {
                path: target.clone(),
                source,
            })?;
            written += 1;
        }

        Ok(written)
    }
}

/// Bounds-checked cursor over an encoded pack
struct Reader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    fn read_bytes(&mut self, needed: usize) -> ResourceResult<&'a [u8]> {
        if self.remaining() < needed {
            return Err(ResourceError::TruncatedInput {
                offset: self.offset,
                needed,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> ResourceResult<u32> {
        let bytes = self.read_bytes(FIELD_WIDTH)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

fn field(len: usize, name: &str) -> ResourceResult<u32> {
    u32::try_from(len).map_err(|_| ResourceError::TooLarge(name.to_string()))
}

/// Split a relative filesystem path into UTF-8 segments
fn path_segments(relative: &Path) -> ResourceResult<Vec<String>> {
    relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part
                .to_str()
                .map(str::to_string)
                .ok_or_else(|| ResourceError::UnsafePath(relative.display().to_string())),
            _ => Err(ResourceError::UnsafePath(relative.display().to_string())),
        })
        .collect()
}

/// Map a pack key onto a path below `root`, refusing to escape it
fn resolve_target(root: &Path, relative: &str) -> ResourceResult<PathBuf> {
    let mut target = root.to_path_buf();
    for segment in relative.split(SEPARATOR) {
        match segment {
            "" | "." => continue,
            ".." => return Err(ResourceError::UnsafePath(relative.to_string())),
            part if Path::new(part).is_absolute() => {
                return Err(ResourceError::UnsafePath(relative.to_string()));
            }
            part => target.push(part),
        }
    }
    Ok(target)
}
