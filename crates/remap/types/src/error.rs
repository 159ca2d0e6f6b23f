//! Error types for mapping operations

use crate::identifier::ModelId;
use thiserror::Error;

/// Errors raised while registering, looking up, or executing mappings.
#[derive(Error, Debug, Clone)]
pub enum MappingError {
    /// No mapping is registered for the requested pair
    #[error("Mapping Error: Mapping is not found for {source_name} and {destination_name}")]
    MappingNotFound {
        source_name: String,
        destination_name: String,
        source_id: ModelId,
        destination_id: ModelId,
    },

    /// Write to a property that only has a getter
    #[error("Cannot set property '{property}' of {shape}: it has a getter but no setter")]
    ReadOnlyProperty { shape: String, property: String },

    /// A nested write met a value it cannot descend into
    #[error("Cannot write '{path}': segment '{segment}' holds a {found}, not an object")]
    NotTraversable {
        path: String,
        segment: String,
        found: &'static str,
    },

    /// A scalar was given where a source object was expected
    #[error("Cannot map a {found} from {source_name} to {destination_name}")]
    InvalidSource {
        found: &'static str,
        source_name: String,
        destination_name: String,
    },

    /// Recursive mapping went deeper than the configured limit
    #[error("Mapping depth limit {limit} exceeded while mapping {source_name} to {destination_name}")]
    DepthExceeded {
        limit: usize,
        source_name: String,
        destination_name: String,
    },

    /// JSON snapshot of a cyclic value
    #[error("Value contains a cycle and cannot be converted to JSON")]
    CyclicValue,

    #[error("Expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Failure raised by user code (selectors, constructors, hooks, accessors)
    #[error("{0}")]
    Custom(String),
}

impl MappingError {
    pub fn custom(message: impl Into<String>) -> Self {
        MappingError::Custom(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MappingError::MappingNotFound { .. })
    }
}

/// Result type alias for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;
