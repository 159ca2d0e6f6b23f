//! Object-graph mapping engine for remap
//!
//! Registers mapping definitions between model shapes and executes them
//! against object graphs, including graphs with cycles and destinations
//! whose properties are getters over a private props container.
//!
//! # Architecture
//!
//! The [`Mapper`] composes specialized components:
//!
//! - [`MappingRegistry`] - stores definitions keyed by canonical model ids
//! - [`Mapping`] / [`MappingBuilder`] - ordered property steps plus hooks
//! - [`writer`] - nested path writes that respect setters
//! - [`Projection`] - write redirection into a backing container while a
//!   projected mapping is in progress
//! - [`ErrorHandler`] - observer for lookup failures
//!
//! # Example
//!
//! ```rust
//! use remap_engine::{Mapper, Transform};
//! use remap_types::Value;
//! use serde_json::json;
//!
//! let mapper = Mapper::new();
//! mapper.create_map("Person", "PersonDto", |map| {
//!     map.for_member("name", Transform::path("name"))
//!         .for_member("address.city", Transform::path("city"))
//! });
//!
//! let source = Value::from_json(json!({"name": "Ada", "city": "London"}));
//! let dto = mapper.map(&source, "Person", "PersonDto").unwrap();
//!
//! assert_eq!(
//!     dto.to_json().unwrap(),
//!     json!({"name": "Ada", "address": {"city": "London"}})
//! );
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error_handler;
mod executor;
pub mod mapper;
pub mod mapping;
pub mod projection;
pub mod registry;
pub mod writer;

pub use config::MapperConfig;
pub use error_handler::{ErrorHandler, TracingErrorHandler};
pub use mapper::Mapper;
pub use mapping::{
    Constructor, Converter, Hook, MapOptions, Mapping, MappingBuilder, Predicate, PropertyStep,
    Selector, Transform,
};
pub use projection::{projected_mapping, Constructed, Projection, ProjectionState};
pub use registry::MappingRegistry;
