// src/bridge/symbols.rs

//! Required runtime symbols
//!
//! The table below is the only place a symbol name or signature is written
//! down. `symbol_table!` turns it into a struct of function pointers plus a
//! resolver that binds every entry or fails on the first missing one.

use super::BindingError;
use super::config::WideChar;
use libloading::{Library, Symbol};
use std::ffi::{c_char, c_double, c_int, c_longlong, c_void};

/// Opaque foreign object
#[repr(C)]
pub struct PyObject {
    _private: [u8; 0],
}

/// Status returned by the runtime's configuration API
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PyStatus {
    pub kind: c_int,
    pub func: *const c_char,
    pub err_msg: *const c_char,
    pub exitcode: c_int,
}

/// Signed size type used by container APIs
pub type PySsize = isize;

macro_rules! symbol_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $field:ident = $symbol:literal : fn($($arg:ty),*) $(-> $ret:ty)?; )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( pub $field: unsafe extern "C" fn($($arg),*) $(-> $ret)?, )*
        }

        impl $name {
            /// Every symbol the table binds, in declaration order
            pub const NAMES: &'static [&'static str] = &[$($symbol),*];

            /// Bind every symbol from `library`
            ///
            /// # Safety
            ///
            /// `library` must export each symbol with the declared signature,
            /// and must outlive the returned table.
            pub unsafe fn resolve(library: &Library) -> Result<Self, BindingError> {
                Ok(Self {
                    $( $field: unsafe {
                        bind::<unsafe extern "C" fn($($arg),*) $(-> $ret)?>(library, $symbol)?
                    }, )*
                })
            }
        }
    };
}

/// Look up one symbol and copy out its function pointer
unsafe fn bind<T: Copy>(library: &Library, name: &str) -> Result<T, BindingError> {
    let mut raw = Vec::with_capacity(name.len() + 1);
    raw.extend_from_slice(name.as_bytes());
    raw.push(0);

    let symbol: Symbol<T> = unsafe { library.get(&raw) }
        .map_err(|_| BindingError::SymbolNotFound(name.to_string()))?;
    Ok(*symbol)
}

symbol_table! {
    /// Function pointers into a loaded runtime library
    pub struct Symbols {
        config_init_isolated = "PyConfig_InitIsolatedConfig": fn(*mut c_void);
        config_set_bytes_string = "PyConfig_SetBytesString": fn(*mut c_void, *mut *mut WideChar, *const c_char) -> PyStatus;
        config_clear = "PyConfig_Clear": fn(*mut c_void);
        initialize_from_config = "Py_InitializeFromConfig": fn(*const c_void) -> PyStatus;
        status_exception = "PyStatus_Exception": fn(PyStatus) -> c_int;
        finalize = "Py_FinalizeEx": fn() -> c_int;
        run_simple_string = "PyRun_SimpleStringFlags": fn(*const c_char, *mut c_void) -> c_int;
        import_module = "PyImport_ImportModule": fn(*const c_char) -> *mut PyObject;
        module_get_dict = "PyModule_GetDict": fn(*mut PyObject) -> *mut PyObject;
        dict_get_item_string = "PyDict_GetItemString": fn(*mut PyObject, *const c_char) -> *mut PyObject;
        callable_check = "PyCallable_Check": fn(*mut PyObject) -> c_int;
        long_from_long_long = "PyLong_FromLongLong": fn(c_longlong) -> *mut PyObject;
        float_from_double = "PyFloat_FromDouble": fn(c_double) -> *mut PyObject;
        unicode_from_string_and_size = "PyUnicode_FromStringAndSize": fn(*const c_char, PySsize) -> *mut PyObject;
        tuple_new = "PyTuple_New": fn(PySsize) -> *mut PyObject;
        tuple_set_item = "PyTuple_SetItem": fn(*mut PyObject, PySsize, *mut PyObject) -> c_int;
        call_object = "PyObject_CallObject": fn(*mut PyObject, *mut PyObject) -> *mut PyObject;
        inc_ref = "Py_IncRef": fn(*mut PyObject);
        dec_ref = "Py_DecRef": fn(*mut PyObject);
        err_occurred = "PyErr_Occurred": fn() -> *mut PyObject;
        err_print = "PyErr_Print": fn();
    }
}
