// src/bridge/mod.rs

//! Bridge into the embedded runtime
//!
//! A session moves through these states, and never backwards:
//!
//! ```text
//! Unloaded -> LibraryLoaded -> ConfigBuilt -> Initialized -> ModuleImported -> TornDown
//! ```
//!
//! Construction is all-or-nothing. Whatever step fails, everything acquired
//! so far is released again (entry references, module, runtime, library)
//! before the error is returned, so no half-built bridge is ever observable.
//!
//! Only one session may exist per process. A second [`Bridge::open`] while
//! one is alive fails with [`BindingError::AlreadyActive`].

mod config;
mod marker;
mod object;
mod symbols;

pub use marker::Marker;
pub use object::{Object, Value};
pub use symbols::Symbols;

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::lock::Backend;
use crate::payload::ENTRY_MODULE;
use crate::platform::RuntimeRelease;
use config::{IsolatedConfig, bootstrap_script};
use libloading::Library;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};
use symbols::PyObject;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures binding to the runtime
#[derive(Error, Debug)]
pub enum BindingError {
    #[error("Cannot load runtime library {path}: {reason}")]
    LibraryNotFound { path: PathBuf, reason: String },

    #[error("Runtime library does not export {0}")]
    SymbolNotFound(String),

    #[error("Runtime initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Cannot import module '{0}'")]
    ModuleNotFound(String),

    #[error("Module '{module}' has no callable '{name}'")]
    CallableNotFound { module: String, name: String },

    #[error("A runtime session is already active in this process")]
    AlreadyActive,

    #[error("String contains a NUL byte: {0}")]
    NulByte(String),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BridgeState {
    Unloaded,
    LibraryLoaded,
    ConfigBuilt,
    Initialized,
    ModuleImported,
    TornDown,
}

/// Callables the entry module must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    InitMarker,
    LoadMarker,
    SaveMarker,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 3] = [Self::InitMarker, Self::LoadMarker, Self::SaveMarker];

    pub fn name(&self) -> &'static str {
        match self {
            Self::InitMarker => "init_marker",
            Self::LoadMarker => "load_marker",
            Self::SaveMarker => "save_marker",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::InitMarker => 0,
            Self::LoadMarker => 1,
            Self::SaveMarker => 2,
        }
    }
}

/// Where a session finds its runtime and sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Absolute path of the runtime's shared library
    pub library: PathBuf,
    /// Runtime installation directory
    pub home: PathBuf,
    pub payload_dir: PathBuf,
    pub packages_dir: PathBuf,
    pub backend: Backend,
}

impl BridgeOptions {
    /// Options for the installation described by `layout`
    pub fn for_layout(layout: &Layout, release: &RuntimeRelease, backend: Backend) -> Self {
        let home = layout.runtime_dir();
        Self {
            library: release.shared_library(&home),
            home,
            payload_dir: layout.payload_dir(),
            packages_dir: layout.packages_dir(),
            backend,
        }
    }
}

static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Claim on the process-wide session slot, released on drop
struct ActiveClaim;

impl ActiveClaim {
    fn acquire() -> std::result::Result<Self, BindingError> {
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self)
            .map_err(|_| BindingError::AlreadyActive)
    }
}

impl Drop for ActiveClaim {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::Release);
    }
}

/// Everything a session has acquired, released in reverse on drop
struct Session {
    symbols: Symbols,
    state: BridgeState,
    module: Option<NonNull<PyObject>>,
    entry_points: Vec<NonNull<PyObject>>,
    library: Option<Library>,
    _claim: ActiveClaim,
}

impl Session {
    fn initialize(&mut self, home: &Path) -> Result<()> {
        let mut config = IsolatedConfig::new(&self.symbols);
        self.state = BridgeState::ConfigBuilt;
        config.set_home(home)?;
        config.initialize()?;
        drop(config);

        self.state = BridgeState::Initialized;
        debug!("Runtime initialized with home {}", home.display());
        Ok(())
    }

    fn bootstrap(&mut self, script: &str) -> Result<()> {
        let script = CString::new(script)
            .map_err(|_| BindingError::NulByte("bootstrap script".to_string()))?;
        let status = unsafe { (self.symbols.run_simple_string)(script.as_ptr(), ptr::null_mut()) };
        if status != 0 {
            return Err(Error::ForeignError {
                operation: "bootstrap".to_string(),
            });
        }
        Ok(())
    }

    fn import(&mut self, name: &str) -> Result<()> {
        let module_name =
            CString::new(name).map_err(|_| BindingError::NulByte(name.to_string()))?;
        let raw = unsafe { (self.symbols.import_module)(module_name.as_ptr()) };
        let Some(module) = NonNull::new(raw) else {
            self.print_pending();
            return Err(BindingError::ModuleNotFound(name.to_string()).into());
        };
        self.module = Some(module);
        self.state = BridgeState::ModuleImported;

        // Borrowed, owned by the module
        let namespace = unsafe { (self.symbols.module_get_dict)(module.as_ptr()) };
        for entry in EntryPoint::ALL {
            let key = CString::new(entry.name())
                .map_err(|_| BindingError::NulByte(entry.name().to_string()))?;
            let item = unsafe { (self.symbols.dict_get_item_string)(namespace, key.as_ptr()) };
            let callable = NonNull::new(item)
                .filter(|p| unsafe { (self.symbols.callable_check)(p.as_ptr()) } != 0)
                .ok_or_else(|| BindingError::CallableNotFound {
                    module: name.to_string(),
                    name: entry.name().to_string(),
                })?;

            unsafe { (self.symbols.inc_ref)(callable.as_ptr()) };
            self.entry_points.push(callable);
        }

        debug!("Imported module {} with {} entry points", name, self.entry_points.len());
        Ok(())
    }

    fn print_pending(&self) {
        unsafe {
            if !(self.symbols.err_occurred)().is_null() {
                (self.symbols.err_print)();
            }
        }
    }

    /// Best effort; failures are logged, never returned
    fn teardown(&mut self) {
        for callable in self.entry_points.drain(..).rev() {
            unsafe { (self.symbols.dec_ref)(callable.as_ptr()) };
        }
        if let Some(module) = self.module.take() {
            unsafe { (self.symbols.dec_ref)(module.as_ptr()) };
        }

        // Finalizing a runtime that never came up is a no-op
        if self.state >= BridgeState::ConfigBuilt && self.state != BridgeState::TornDown {
            let status = unsafe { (self.symbols.finalize)() };
            if status != 0 {
                warn!("Runtime finalization reported status {}", status);
            }
        }

        if let Some(library) = self.library.take() {
            if let Err(e) = library.close() {
                warn!("Failed to unload runtime library: {}", e);
            }
        }

        self.state = BridgeState::TornDown;
        debug!("Runtime session torn down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Open the runtime library
///
/// Extension modules the runtime imports later do not link against it, so on
/// unix its symbols must be bound now and exported to the global namespace.
unsafe fn load_library(path: &Path) -> std::result::Result<Library, libloading::Error> {
    #[cfg(unix)]
    {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
        unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }.map(Library::from)
    }
    #[cfg(not(unix))]
    {
        unsafe { Library::new(path) }
    }
}

/// A live runtime session with the entry module imported
pub struct Bridge {
    session: Session,
    backend: Backend,
}

impl Bridge {
    /// Load, configure, bootstrap and import, or fail having released everything
    pub fn open(options: &BridgeOptions) -> Result<Self> {
        let claim = ActiveClaim::acquire()?;

        info!("Loading runtime library {}", options.library.display());
        let library = unsafe { load_library(&options.library) }.map_err(|e| {
            BindingError::LibraryNotFound {
                path: options.library.clone(),
                reason: e.to_string(),
            }
        })?;

        let symbols = match unsafe { Symbols::resolve(&library) } {
            Ok(symbols) => symbols,
            Err(e) => {
                if let Err(close) = library.close() {
                    warn!("Failed to unload runtime library: {}", close);
                }
                return Err(e.into());
            }
        };

        let mut session = Session {
            symbols,
            state: BridgeState::LibraryLoaded,
            module: None,
            entry_points: Vec::new(),
            library: Some(library),
            _claim: claim,
        };

        session.initialize(&options.home)?;
        session.bootstrap(&bootstrap_script(
            &options.payload_dir,
            &options.packages_dir,
            options.backend.as_str(),
        ))?;
        session.import(ENTRY_MODULE)?;

        info!("Runtime session ready (backend {})", options.backend);
        Ok(Self {
            session,
            backend: options.backend,
        })
    }

    pub fn state(&self) -> BridgeState {
        self.session.state
    }

    /// Backend published to the entry module
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Build a foreign object from a value
    pub fn object(&self, value: &Value<'_>) -> Result<Object<'_>> {
        Object::build(&self.session.symbols, value)
    }

    pub fn int(&self, value: i64) -> Result<Object<'_>> {
        self.object(&Value::Int(value))
    }

    pub fn float(&self, value: f64) -> Result<Object<'_>> {
        self.object(&Value::Float(value))
    }

    pub fn str(&self, value: &str) -> Result<Object<'_>> {
        self.object(&Value::Str(value))
    }

    /// Pack objects into a tuple; the tuple takes over their references
    pub fn tuple<'py>(&'py self, items: Vec<Object<'py>>) -> Result<Object<'py>> {
        Object::tuple_from(&self.session.symbols, items)
    }

    /// A new reference to one of the entry module's callables
    pub fn entry_point(&self, entry: EntryPoint) -> Result<Object<'_>> {
        let ptr = self.session.entry_points[entry.index()];
        unsafe { Object::from_borrowed(&self.session.symbols, ptr.as_ptr()) }.ok_or_else(|| {
            Error::ForeignError {
                operation: entry.name().to_string(),
            }
        })
    }

    /// Call an entry point with positional arguments
    pub fn call(&self, entry: EntryPoint, args: &[Value<'_>]) -> Result<Object<'_>> {
        let callable = self.entry_point(entry)?;
        let args = self.object(&Value::Tuple(args.to_vec()))?;
        debug!("Calling {}", entry.name());
        callable.call(&args, entry.name())
    }

    /// The application's marker operations
    pub fn marker(&self) -> Marker<'_> {
        Marker::new(self)
    }

    /// Tear the session down now instead of at drop
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entry_point_names() {
        let names: Vec<_> = EntryPoint::ALL.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["init_marker", "load_marker", "save_marker"]);
        for (i, entry) in EntryPoint::ALL.iter().enumerate() {
            assert_eq!(entry.index(), i);
        }
    }

    #[test]
    fn test_options_for_layout() {
        let layout = Layout::new("/opt/dekun");
        let release = RuntimeRelease::new(
            crate::platform::RUNTIME_VERSION,
            crate::platform::RUNTIME_RELEASE,
            crate::platform::Arch::X86_64,
            crate::platform::Os::Linux,
        );
        let options = BridgeOptions::for_layout(&layout, &release, Backend::Cpu);

        assert_eq!(options.home, PathBuf::from("/opt/dekun/python"));
        assert_eq!(
            options.library,
            PathBuf::from("/opt/dekun/python/lib/libpython3.12.so.1.0")
        );
        assert_eq!(options.payload_dir, PathBuf::from("/opt/dekun/python/src"));
        assert_eq!(options.packages_dir, PathBuf::from("/opt/dekun/packages"));
    }

    // The only unit test that opens a session; the slot is process-wide
    #[test]
    fn test_missing_library_releases_slot() {
        let temp = TempDir::new().unwrap();
        let options = BridgeOptions {
            library: temp.path().join("libmissing.so"),
            home: temp.path().to_path_buf(),
            payload_dir: temp.path().join("src"),
            packages_dir: temp.path().join("packages"),
            backend: Backend::Cpu,
        };

        for _ in 0..2 {
            let err = Bridge::open(&options).err().unwrap();
            assert!(matches!(
                err,
                Error::Binding(BindingError::LibraryNotFound { .. })
            ));
        }
    }
}
