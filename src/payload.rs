// src/payload.rs

//! Embedded application payload
//!
//! `build.rs` packs the `payload/` source tree into a resource pack and writes
//! it as base64 into `OUT_DIR`; this module decodes it and materializes it
//! into the runtime's payload directory.

use crate::error::Result;
use crate::layout::reset_dir;
use crate::resource::ResourcePack;
use std::path::Path;
use tracing::{debug, info};

/// Base64 encoded resource pack produced by the build script
const EMBEDDED_PAYLOAD: &str = include_str!(concat!(env!("OUT_DIR"), "/payload.b64"));

/// Name of the module the bridge imports from the payload
pub const ENTRY_MODULE: &str = "main";

/// Decode the embedded payload pack
pub fn embedded() -> Result<ResourcePack> {
    Ok(ResourcePack::load_base64(EMBEDDED_PAYLOAD)?)
}

/// Replace the contents of `dir` with the files of `pack`
///
/// Returns the number of files written.
pub fn materialize(pack: &ResourcePack, dir: &Path) -> Result<usize> {
    reset_dir(dir)?;
    let written = pack.write_directory(dir, "")?;
    info!("Materialized {} payload files into {}", written, dir.display());
    Ok(written)
}

/// Materialize the embedded payload into `dir`
pub fn install(dir: &Path) -> Result<usize> {
    let pack = embedded()?;
    debug!("Embedded payload holds {} files", pack.len());
    materialize(&pack, dir)
}
