//! Domain types for remap: the object model, identifiers, and property paths
//!
//! This crate holds everything the mapping engine operates on, but none of
//! the engine itself:
//!
//! - [`Value`], [`ObjectRef`], [`ListRef`] - a dynamic object graph with
//!   shared, identity-compared handles, so back-references are expressible
//! - [`Shape`] - nominal object types with inherited getters and setters
//! - [`ModelRef`] / [`ModelId`] - references to model shapes and their
//!   canonical, process-stable identifiers
//! - [`PropertyPath`] - dotted paths into nested objects
//! - [`FieldTarget`] - the write seam shared by plain objects and projections
//! - [`MappingError`] - every failure the engine can report

#![deny(unsafe_code)]

pub mod error;
pub mod field;
pub mod identifier;
pub mod path;
pub mod shape;
pub mod value;

pub use error::{MappingError, MappingResult};
pub use field::FieldTarget;
pub use identifier::{ModelId, ModelRef, ShapeKey, Symbol};
pub use path::PropertyPath;
pub use shape::{Accessor, Getter, Setter, Shape, ShapeBuilder};
pub use value::{ListRef, MarkKey, ObjectKey, ObjectRef, Value};
