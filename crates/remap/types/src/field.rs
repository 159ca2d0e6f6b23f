//! The seam between writers and the things they write into
//!
//! The nested path writer and the execution engine never touch an object
//! directly; they go through [`FieldTarget`]. A plain [`ObjectRef`] is a
//! target, and so is the engine's projection wrapper, which redirects
//! writes to a backing container while a mapping is in progress.

use crate::error::MappingResult;
use crate::value::{ObjectRef, Value};

/// Something whose named fields can be read and written.
pub trait FieldTarget {
    /// Read a field (accessor-aware). Absent fields read as `Null`.
    fn read_field(&self, name: &str) -> MappingResult<Value>;

    /// Write a field (accessor-aware).
    fn write_field(&self, name: &str, value: Value) -> MappingResult<()>;

    /// Whether a user-defined setter governs `name`.
    fn setter_governs(&self, name: &str) -> bool;
}

impl FieldTarget for ObjectRef {
    fn read_field(&self, name: &str) -> MappingResult<Value> {
        self.get(name)
    }

    fn write_field(&self, name: &str, value: Value) -> MappingResult<()> {
        self.set(name, value)
    }

    fn setter_governs(&self, name: &str) -> bool {
        self.has_setter(name)
    }
}
