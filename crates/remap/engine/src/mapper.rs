//! The mapper: the public entry point tying registry, shapes and engine together

use crate::config::MapperConfig;
use crate::error_handler::{ErrorHandler, TracingErrorHandler};
use crate::executor::Executor;
use crate::mapping::{MapOptions, Mapping, MappingBuilder};
use crate::projection::projected_mapping;
use crate::registry::MappingRegistry;
use dashmap::DashMap;
use remap_types::{MappingError, MappingResult, ModelId, ModelRef, ObjectRef, Shape, Value};
use std::sync::Arc;
use tracing::debug;

/// Registry of mappings plus the engine that executes them.
///
/// Shareable across threads: registration and mapping both take `&self`.
pub struct Mapper {
    registry: MappingRegistry,
    /// Shapes known by id, for default construction of name-referenced models
    shapes: DashMap<ModelId, Shape>,
    config: MapperConfig,
}

impl Mapper {
    /// A mapper with default configuration that logs lookup failures.
    pub fn new() -> Self {
        Self::with_parts(MapperConfig::default(), Arc::new(TracingErrorHandler))
    }

    pub fn with_config(config: MapperConfig) -> Self {
        Self::with_parts(config, Arc::new(TracingErrorHandler))
    }

    pub fn with_error_handler(error_handler: Arc<dyn ErrorHandler>) -> Self {
        Self::with_parts(MapperConfig::default(), error_handler)
    }

    pub fn with_parts(config: MapperConfig, error_handler: Arc<dyn ErrorHandler>) -> Self {
        Self {
            registry: MappingRegistry::new(error_handler),
            shapes: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    // ── Shapes ───────────────────────────────────────────────────────

    /// Make `shape` the type default construction uses for its model id.
    pub fn register_shape(&self, shape: &Shape) {
        self.shapes.insert(shape.model_id(), shape.clone());
    }

    /// The shape a model reference constructs, if any is known.
    pub fn shape_for(&self, model: &ModelRef) -> Option<Shape> {
        model
            .as_shape()
            .cloned()
            .or_else(|| self.shapes.get(&model.resolve()).map(|entry| entry.value().clone()))
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Build and register the mapping `source -> destination`.
    pub fn create_map<F>(
        &self,
        source: impl Into<ModelRef>,
        destination: impl Into<ModelRef>,
        configure: F,
    ) -> Arc<Mapping>
    where
        F: FnOnce(MappingBuilder) -> MappingBuilder,
    {
        self.add_mapping(configure(Mapping::builder(source, destination)).build())
    }

    /// Register a prebuilt mapping, replacing any mapping for the same pair.
    pub fn add_mapping(&self, mapping: Mapping) -> Arc<Mapping> {
        for model in [mapping.source(), mapping.destination()] {
            if let Some(shape) = model.as_shape() {
                self.register_shape(shape);
            }
        }
        let mapping = Arc::new(mapping);
        self.registry
            .register(mapping.source_id(), mapping.destination_id(), mapping.clone());
        mapping
    }

    /// The registered mapping, or `MappingNotFound` (after notifying the
    /// error handler).
    pub fn get_mapping(
        &self,
        source: impl Into<ModelRef>,
        destination: impl Into<ModelRef>,
    ) -> MappingResult<Arc<Mapping>> {
        self.registry.get(&source.into(), &destination.into())
    }

    /// The registered mapping, if any. Never notifies the error handler.
    pub fn find_mapping(
        &self,
        source: impl Into<ModelRef>,
        destination: impl Into<ModelRef>,
    ) -> Option<Arc<Mapping>> {
        self.registry.find(&source.into(), &destination.into())
    }

    pub fn has_mapping(&self, source: impl Into<ModelRef>, destination: impl Into<ModelRef>) -> bool {
        self.find_mapping(source, destination).is_some()
    }

    pub fn remove_mapping(
        &self,
        source: impl Into<ModelRef>,
        destination: impl Into<ModelRef>,
    ) -> Option<Arc<Mapping>> {
        self.registry
            .remove(source.into().resolve(), destination.into().resolve())
    }

    /// Register `source -> destination` as a projection of the already
    /// registered `source -> props` mapping.
    ///
    /// Destinations are built by `factory(props, source)`, where `props` is
    /// a fresh props container holding a shallow copy of the source. Every
    /// step of the props mapping then runs against the new instance, with
    /// writes to getter-only names redirected into `props`.
    pub fn create_projected_map<F>(
        &self,
        source: impl Into<ModelRef>,
        destination: impl Into<ModelRef>,
        props: impl Into<ModelRef>,
        factory: F,
    ) -> MappingResult<Arc<Mapping>>
    where
        F: Fn(&ObjectRef, &ObjectRef) -> MappingResult<ObjectRef> + Send + Sync + 'static,
    {
        let props = props.into();
        let props_mapping = self.registry.get(&source.into(), &props)?;
        let mapping = projected_mapping(&props_mapping, destination, self.shape_for(&props), factory);
        Ok(self.add_mapping(mapping))
    }

    // ── Mapping ──────────────────────────────────────────────────────

    /// Map `source` to a new `destination` value.
    ///
    /// `Null` maps to `Null`; a list maps element-wise.
    pub fn map(
        &self,
        source: &Value,
        source_model: impl Into<ModelRef>,
        destination_model: impl Into<ModelRef>,
    ) -> MappingResult<Value> {
        self.map_with_options(source, source_model, destination_model, &MapOptions::default())
    }

    /// [`map`](Self::map) with per-call hooks around the top-level object(s).
    pub fn map_with_options(
        &self,
        source: &Value,
        source_model: impl Into<ModelRef>,
        destination_model: impl Into<ModelRef>,
        options: &MapOptions,
    ) -> MappingResult<Value> {
        let mapping = self.get_mapping(source_model, destination_model)?;
        debug!(source = %mapping.source(), destination = %mapping.destination(), "Mapping value");
        Executor::new(self).map_value(&mapping, source, Some(options))
    }

    /// Map every element of `sources`. Elements share one call context, so
    /// an object reachable from several elements maps to one destination.
    pub fn map_array(
        &self,
        sources: &[Value],
        source_model: impl Into<ModelRef>,
        destination_model: impl Into<ModelRef>,
    ) -> MappingResult<Vec<Value>> {
        let mapping = self.get_mapping(source_model, destination_model)?;
        debug!(
            source = %mapping.source(),
            destination = %mapping.destination(),
            count = sources.len(),
            "Mapping array"
        );
        let mut executor = Executor::new(self);
        sources
            .iter()
            .map(|source| executor.map_value(&mapping, source, None))
            .collect()
    }

    /// Populate an existing `destination` from `source` in place.
    ///
    /// A `Null` source leaves the destination untouched.
    pub fn map_mutate(
        &self,
        source: &Value,
        destination: &ObjectRef,
        source_model: impl Into<ModelRef>,
        destination_model: impl Into<ModelRef>,
    ) -> MappingResult<()> {
        let mapping = self.get_mapping(source_model, destination_model)?;
        debug!(source = %mapping.source(), destination = %mapping.destination(), "Mapping in place");
        match source {
            Value::Null => Ok(()),
            Value::Object(obj) => Executor::new(self).map_into(&mapping, obj, destination, None),
            other => Err(MappingError::InvalidSource {
                found: other.kind_name(),
                source_name: mapping.source().display_name(),
                destination_name: mapping.destination().display_name(),
            }),
        }
    }

    /// Drop every mapping and known shape.
    pub fn dispose(&self) {
        self.registry.clear();
        self.shapes.clear();
        debug!("Mapper disposed");
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("registry", &self.registry)
            .field("shapes", &self.shapes.len())
            .field("config", &self.config)
            .finish()
    }
}
