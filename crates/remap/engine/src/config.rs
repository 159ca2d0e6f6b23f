//! Configuration for the mapper

use serde::{Deserialize, Serialize};

/// Mapper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Maximum nesting of object mappings within one call
    pub max_depth: usize,
    /// Map each source object at most once per destination type within one
    /// call, so cycles resolve to the instance already being built
    pub deduplicate_instances: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            deduplicate_instances: true,
        }
    }
}

impl MapperConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate_instances = enabled;
        self
    }
}
