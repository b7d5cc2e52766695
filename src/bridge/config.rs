// src/bridge/config.rs

//! Isolated runtime configuration
//!
//! The runtime's configuration struct is large and only partially stable, so
//! it lives in an opaque, over-sized buffer that the runtime initializes
//! itself. The only field written from here is `home`, through the runtime's
//! own setter; `ConfigHead` mirrors the struct just far enough to take that
//! field's address.

use super::BindingError;
use super::symbols::{PyStatus, Symbols};
use std::ffi::{CStr, CString, c_int, c_ulong, c_void};
use std::path::Path;
use std::ptr;

#[cfg(windows)]
pub type WideChar = u16;
#[cfg(not(windows))]
pub type WideChar = i32;

/// Bytes reserved for the runtime's configuration struct
const CONFIG_STORAGE_SIZE: usize = 4096;

#[repr(C)]
struct WideStringList {
    length: isize,
    items: *mut *mut WideChar,
}

/// Leading fields of the 3.12 configuration struct, up to and including `home`
#[repr(C)]
struct ConfigHead {
    config_init: c_int,
    isolated: c_int,
    use_environment: c_int,
    dev_mode: c_int,
    install_signal_handlers: c_int,
    use_hash_seed: c_int,
    hash_seed: c_ulong,
    faulthandler: c_int,
    tracemalloc: c_int,
    perf_profiling: c_int,
    import_time: c_int,
    code_debug_ranges: c_int,
    show_ref_count: c_int,
    dump_refs: c_int,
    dump_refs_file: *mut WideChar,
    malloc_stats: c_int,
    filesystem_encoding: *mut WideChar,
    filesystem_errors: *mut WideChar,
    pycache_prefix: *mut WideChar,
    parse_argv: c_int,
    orig_argv: WideStringList,
    argv: WideStringList,
    xoptions: WideStringList,
    warnoptions: WideStringList,
    site_import: c_int,
    bytes_warning: c_int,
    warn_default_encoding: c_int,
    inspect: c_int,
    interactive: c_int,
    optimization_level: c_int,
    parser_debug: c_int,
    write_bytecode: c_int,
    verbose: c_int,
    quiet: c_int,
    user_site_directory: c_int,
    configure_c_stdio: c_int,
    buffered_stdio: c_int,
    stdio_encoding: *mut WideChar,
    stdio_errors: *mut WideChar,
    #[cfg(windows)]
    legacy_windows_stdio: c_int,
    check_hash_pycs_mode: *mut WideChar,
    use_frozen_modules: c_int,
    safe_path: c_int,
    int_max_str_digits: c_int,
    pathconfig_warnings: c_int,
    program_name: *mut WideChar,
    pythonpath_env: *mut WideChar,
    home: *mut WideChar,
}

const _: () = assert!(std::mem::size_of::<ConfigHead>() < CONFIG_STORAGE_SIZE);

#[repr(C, align(16))]
struct ConfigStorage([u8; CONFIG_STORAGE_SIZE]);

/// An isolated configuration owned by the caller
///
/// Cleared through the runtime when dropped.
pub(crate) struct IsolatedConfig<'a> {
    symbols: &'a Symbols,
    storage: Box<ConfigStorage>,
}

impl<'a> IsolatedConfig<'a> {
    /// Allocate and let the runtime fill in isolated defaults
    pub(crate) fn new(symbols: &'a Symbols) -> Self {
        let mut storage = Box::new(ConfigStorage([0; CONFIG_STORAGE_SIZE]));
        unsafe { (symbols.config_init_isolated)(storage.0.as_mut_ptr().cast()) };
        Self { symbols, storage }
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        self.storage.0.as_mut_ptr().cast()
    }

    /// Point the runtime at its installation directory
    pub(crate) fn set_home(&mut self, home: &Path) -> Result<(), BindingError> {
        let value = path_to_cstring(home)?;
        let config = self.as_mut_ptr();
        let status = unsafe {
            let field = ptr::addr_of_mut!((*config.cast::<ConfigHead>()).home);
            (self.symbols.config_set_bytes_string)(config, field, value.as_ptr())
        };
        self.check(status, "set runtime home")
    }

    /// Start the runtime from this configuration
    pub(crate) fn initialize(&mut self) -> Result<(), BindingError> {
        let config = self.as_mut_ptr();
        let status = unsafe { (self.symbols.initialize_from_config)(config) };
        self.check(status, "initialize runtime")
    }

    fn check(&self, status: PyStatus, action: &str) -> Result<(), BindingError> {
        if unsafe { (self.symbols.status_exception)(status) } == 0 {
            return Ok(());
        }
        Err(BindingError::InitializationFailed(format!(
            "{}: {}",
            action,
            status_message(&status)
        )))
    }
}

impl Drop for IsolatedConfig<'_> {
    fn drop(&mut self) {
        let config = self.as_mut_ptr();
        unsafe { (self.symbols.config_clear)(config) };
    }
}

fn status_message(status: &PyStatus) -> String {
    if status.err_msg.is_null() {
        return format!("status {} (exit code {})", status.kind, status.exitcode);
    }
    let message = unsafe { CStr::from_ptr(status.err_msg) }.to_string_lossy();
    if status.func.is_null() {
        message.into_owned()
    } else {
        let func = unsafe { CStr::from_ptr(status.func) }.to_string_lossy();
        format!("{} ({})", message, func)
    }
}

/// Null-terminated bytes for a filesystem path
pub(crate) fn path_to_cstring(path: &Path) -> Result<CString, BindingError> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path.to_string_lossy().into_owned().into_bytes();

    CString::new(bytes).map_err(|_| BindingError::NulByte(path.display().to_string()))
}

/// Quote `value` as a single-quoted script string literal
pub(crate) fn script_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Script run right after initialization
///
/// Puts the payload ahead of the native packages on the search path and
/// publishes the backend to the entry module.
pub(crate) fn bootstrap_script(payload_dir: &Path, packages_dir: &Path, backend: &str) -> String {
    format!(
        "import os\nimport sys\nos.environ['DEKUN_BACKEND'] = {}\nsys.path.insert(0, {})\nsys.path.insert(0, {})\n",
        script_literal(backend),
        script_literal(&packages_dir.to_string_lossy()),
        script_literal(&payload_dir.to_string_lossy()),
    )
}
