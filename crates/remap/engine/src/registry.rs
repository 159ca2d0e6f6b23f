//! Mapping registry: stores and retrieves mapping definitions
//!
//! Mappings are keyed by the canonical identifiers of their source and
//! destination models. Registering a pair that is already present replaces
//! the previous definition (last write wins). Lookups that find nothing
//! notify the error handler exactly once and then fail, unless the caller
//! asked to tolerate a miss.

use crate::error_handler::ErrorHandler;
use crate::mapping::Mapping;
use parking_lot::RwLock;
use remap_types::{MappingError, MappingResult, ModelId, ModelRef};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of mapping definitions
pub struct MappingRegistry {
    /// source id → destination id → mapping
    mappings: RwLock<HashMap<ModelId, HashMap<ModelId, Arc<Mapping>>>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl MappingRegistry {
    pub fn new(error_handler: Arc<dyn ErrorHandler>) -> Self {
        Self {
            mappings: RwLock::new(HashMap::new()),
            error_handler,
        }
    }

    pub fn error_handler(&self) -> &Arc<dyn ErrorHandler> {
        &self.error_handler
    }

    /// Store `mapping` for the pair, replacing any previous definition.
    ///
    /// Returns the definition it replaced, if any.
    pub fn register(
        &self,
        source_id: ModelId,
        destination_id: ModelId,
        mapping: Arc<Mapping>,
    ) -> Option<Arc<Mapping>> {
        let source = mapping.source().display_name();
        let destination = mapping.destination().display_name();

        let replaced = self
            .mappings
            .write()
            .entry(source_id)
            .or_default()
            .insert(destination_id, mapping);

        if replaced.is_some() {
            tracing::debug!(%source, %destination, "Mapping replaced");
        } else {
            tracing::info!(%source, %destination, "Mapping registered");
        }
        replaced
    }

    /// Look up the mapping for a pair of model references.
    ///
    /// On a miss: `Ok(None)` when `allow_missing`, otherwise the error
    /// handler is notified once and `MappingNotFound` is returned.
    pub fn lookup(
        &self,
        source: &ModelRef,
        destination: &ModelRef,
        allow_missing: bool,
    ) -> MappingResult<Option<Arc<Mapping>>> {
        match self.find(source, destination) {
            Some(mapping) => Ok(Some(mapping)),
            None if allow_missing => Ok(None),
            None => Err(self.not_found(source, destination)),
        }
    }

    /// The mapping for a pair, or `MappingNotFound`.
    pub fn get(&self, source: &ModelRef, destination: &ModelRef) -> MappingResult<Arc<Mapping>> {
        self.find(source, destination)
            .ok_or_else(|| self.not_found(source, destination))
    }

    fn not_found(&self, source: &ModelRef, destination: &ModelRef) -> MappingError {
        let error = MappingError::MappingNotFound {
            source_name: source.display_name(),
            destination_name: destination.display_name(),
            source_id: source.resolve(),
            destination_id: destination.resolve(),
        };
        self.error_handler.handle(&error);
        error
    }

    /// The mapping for a pair, if registered. Never notifies the handler.
    pub fn find(&self, source: &ModelRef, destination: &ModelRef) -> Option<Arc<Mapping>> {
        self.find_by_id(source.resolve(), destination.resolve())
    }

    pub fn find_by_id(&self, source_id: ModelId, destination_id: ModelId) -> Option<Arc<Mapping>> {
        self.mappings
            .read()
            .get(&source_id)
            .and_then(|by_destination| by_destination.get(&destination_id))
            .cloned()
    }

    pub fn contains(&self, source_id: ModelId, destination_id: ModelId) -> bool {
        self.find_by_id(source_id, destination_id).is_some()
    }

    /// Remove a mapping. Removing an absent pair is a no-op.
    pub fn remove(&self, source_id: ModelId, destination_id: ModelId) -> Option<Arc<Mapping>> {
        let mut mappings = self.mappings.write();
        let by_destination = mappings.get_mut(&source_id)?;
        let removed = by_destination.remove(&destination_id);
        if by_destination.is_empty() {
            mappings.remove(&source_id);
        }
        if let Some(mapping) = &removed {
            tracing::info!(
                source = %mapping.source(),
                destination = %mapping.destination(),
                "Mapping removed"
            );
        }
        removed
    }

    /// Total number of registered mappings
    pub fn len(&self) -> usize {
        self.mappings.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.mappings.write().clear();
    }
}

impl std::fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingRegistry")
            .field("mappings", &self.len())
            .finish()
    }
}
