// src/bridge/object.rs

//! Owned references to foreign objects
//!
//! An [`Object`] holds exactly one strong reference and releases it on drop.
//! Its lifetime is tied to the symbol table, so no handle can outlive the
//! runtime session that produced it.

use super::symbols::{PyObject, PySsize, Symbols};
use crate::error::{Error, Result};
use std::ffi::{c_char, c_longlong};
use std::ptr::NonNull;

/// Values that can be turned into foreign objects
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    Float(f64),
    Str(&'a str),
    Tuple(Vec<Value<'a>>),
}

/// A strong reference to a foreign object
pub struct Object<'py> {
    symbols: &'py Symbols,
    ptr: NonNull<PyObject>,
}

impl<'py> Object<'py> {
    /// Take ownership of a new reference
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a new reference produced by the runtime bound
    /// in `symbols`.
    pub(crate) unsafe fn from_owned(symbols: &'py Symbols, ptr: *mut PyObject) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { symbols, ptr })
    }

    /// Take a new reference to a borrowed object
    ///
    /// # Safety
    ///
    /// Same as [`Object::from_owned`], except `ptr` is borrowed.
    pub(crate) unsafe fn from_borrowed(symbols: &'py Symbols, ptr: *mut PyObject) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        unsafe { (symbols.inc_ref)(ptr.as_ptr()) };
        Some(Self { symbols, ptr })
    }

    /// Build an object from a value
    ///
    /// Null results are turned into [`Error::ForeignError`] after the
    /// runtime's pending exception has been printed.
    pub(crate) fn build(symbols: &'py Symbols, value: &Value<'_>) -> Result<Self> {
        let (ptr, operation) = match value {
            Value::Int(v) => (
                unsafe { (symbols.long_from_long_long)(*v as c_longlong) },
                "int",
            ),
            Value::Float(v) => (unsafe { (symbols.float_from_double)(*v) }, "float"),
            Value::Str(s) => (
                unsafe {
                    (symbols.unicode_from_string_and_size)(
                        s.as_ptr().cast::<c_char>(),
                        s.len() as PySsize,
                    )
                },
                "str",
            ),
            Value::Tuple(items) => return Self::tuple(symbols, items),
        };
        unsafe { Self::from_owned(symbols, ptr) }.ok_or_else(|| foreign_error(symbols, operation))
    }

    fn tuple(symbols: &'py Symbols, items: &[Value<'_>]) -> Result<Self> {
        let items = items
            .iter()
            .map(|item| Self::build(symbols, item))
            .collect::<Result<Vec<_>>>()?;
        Self::tuple_from(symbols, items)
    }

    /// Pack existing objects into a new tuple, moving each one in
    pub(crate) fn tuple_from(symbols: &'py Symbols, items: Vec<Object<'py>>) -> Result<Self> {
        let tuple = unsafe { Self::from_owned(symbols, (symbols.tuple_new)(items.len() as PySsize)) }
            .ok_or_else(|| foreign_error(symbols, "tuple"))?;

        for (index, item) in items.into_iter().enumerate() {
            // Steals the item reference, even on failure
            let status = unsafe {
                (symbols.tuple_set_item)(tuple.as_ptr(), index as PySsize, item.into_raw())
            };
            if status != 0 {
                return Err(foreign_error(symbols, "tuple"));
            }
        }

        Ok(tuple)
    }

    pub fn as_ptr(&self) -> *mut PyObject {
        self.ptr.as_ptr()
    }

    /// Give up ownership without releasing the reference
    pub fn into_raw(self) -> *mut PyObject {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    pub fn is_callable(&self) -> bool {
        unsafe { (self.symbols.callable_check)(self.as_ptr()) != 0 }
    }

    /// Call this object with a tuple of positional arguments
    pub fn call(&self, args: &Object<'py>, operation: &str) -> Result<Object<'py>> {
        let result = unsafe { (self.symbols.call_object)(self.as_ptr(), args.as_ptr()) };
        unsafe { Self::from_owned(self.symbols, result) }
            .ok_or_else(|| foreign_error(self.symbols, operation))
    }
}

impl Clone for Object<'_> {
    fn clone(&self) -> Self {
        unsafe { (self.symbols.inc_ref)(self.as_ptr()) };
        Self {
            symbols: self.symbols,
            ptr: self.ptr,
        }
    }
}

impl Drop for Object<'_> {
    fn drop(&mut self) {
        unsafe { (self.symbols.dec_ref)(self.as_ptr()) };
    }
}

impl std::fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Object").field(&self.ptr).finish()
    }
}

/// Print any pending exception and describe the failed operation
pub(crate) fn foreign_error(symbols: &Symbols, operation: &str) -> Error {
    unsafe {
        if !(symbols.err_occurred)().is_null() {
            (symbols.err_print)();
        }
    }
    Error::ForeignError {
        operation: operation.to_string(),
    }
}
