// src/bridge/marker.rs

//! Marker operations exposed by the entry module

use super::{BindingError, Bridge, EntryPoint, Value};
use crate::error::Result;
use crate::lock::Backend;
use std::path::Path;

/// Typed calls into `init_marker`, `load_marker` and `save_marker`
pub struct Marker<'py> {
    bridge: &'py Bridge,
}

impl<'py> Marker<'py> {
    pub(super) fn new(bridge: &'py Bridge) -> Self {
        Self { bridge }
    }

    /// Create a fresh marker for the given input shape
    pub fn init(&self, backend: Backend, width: u32, height: u32, depth: u32) -> Result<()> {
        self.bridge.call(
            EntryPoint::InitMarker,
            &[
                Value::Str(backend.as_str()),
                Value::Int(i64::from(width)),
                Value::Int(i64::from(height)),
                Value::Int(i64::from(depth)),
            ],
        )?;
        Ok(())
    }

    pub fn load(&self, path: &Path) -> Result<()> {
        let path = path_str(path)?;
        self.bridge.call(EntryPoint::LoadMarker, &[Value::Str(path)])?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let path = path_str(path)?;
        self.bridge.call(EntryPoint::SaveMarker, &[Value::Str(path)])?;
        Ok(())
    }
}

/// Paths cross as text; a lossy conversion would name a different file
fn path_str(path: &Path) -> std::result::Result<&str, BindingError> {
    path.to_str()
        .ok_or_else(|| BindingError::NonUtf8Path(path.to_path_buf()))
}
