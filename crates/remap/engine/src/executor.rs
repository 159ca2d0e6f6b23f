//! Execution engine: applies a mapping to a source value
//!
//! One [`Executor`] serves one top-level call. It carries the call's
//! context: the memo of destinations already built (keyed by source object
//! identity and the mapping's source and destination ids) and the current
//! nesting depth. The memo is
//! what makes cyclic source graphs terminate: the second visit to a source
//! object during the same call yields the destination instance the first
//! visit constructed, even while that instance is still being populated.
//!
//! For each source object the engine:
//! 1. constructs the destination (custom constructor or default construction),
//! 2. records it in the memo,
//! 3. runs the before hook(s), every property step in declaration order, and
//!    the after hook(s).
//!
//! Any failure aborts the whole call. If the destination was a projection
//! and the mapping's post-construction hook has not completed, the source's
//! projection mark is lowered on the way out.

use crate::mapper::Mapper;
use crate::mapping::{MapOptions, Mapping, PropertyStep, Transform};
use crate::projection::Constructed;
use crate::writer;
use remap_types::{FieldTarget, ListRef, MappingError, MappingResult, ModelId, ObjectKey, ObjectRef, Value};
use std::collections::HashMap;
use tracing::{debug, trace};

/// How property steps write into the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Reassign containers along nested paths
    Assign,
    /// Write nested paths in place
    Mutate,
}

type MemoKey = (ObjectKey, ModelId, ModelId);

fn memo_key(mapping: &Mapping, source: &ObjectRef) -> MemoKey {
    (source.key(), mapping.source_id(), mapping.destination_id())
}

#[derive(Default)]
struct MapContext {
    /// (source, mapping pair) → (source keepalive, destination)
    memo: HashMap<MemoKey, (ObjectRef, ObjectRef)>,
    depth: usize,
}

pub(crate) struct Executor<'m> {
    mapper: &'m Mapper,
    ctx: MapContext,
}

impl<'m> Executor<'m> {
    pub(crate) fn new(mapper: &'m Mapper) -> Self {
        Self {
            mapper,
            ctx: MapContext::default(),
        }
    }

    /// Map any source value: `Null` stays `Null`, lists map element-wise,
    /// objects map through `mapping`. Other scalars are invalid sources.
    pub(crate) fn map_value(
        &mut self,
        mapping: &Mapping,
        source: &Value,
        options: Option<&MapOptions>,
    ) -> MappingResult<Value> {
        match source {
            Value::Null => Ok(Value::Null),
            Value::Object(obj) => self.map_object(mapping, obj, options).map(Value::Object),
            Value::List(items) => {
                let mapped = items
                    .to_vec()
                    .iter()
                    .map(|item| self.map_value(mapping, item, options))
                    .collect::<MappingResult<Vec<_>>>()?;
                Ok(Value::List(ListRef::from_vec(mapped)))
            }
            other => Err(invalid_source(mapping, other)),
        }
    }

    /// Populate an existing destination from `source` in place.
    pub(crate) fn map_into(
        &mut self,
        mapping: &Mapping,
        source: &ObjectRef,
        destination: &ObjectRef,
        options: Option<&MapOptions>,
    ) -> MappingResult<()> {
        self.check_depth(mapping)?;
        let constructed = Constructed::Object(destination.clone());
        self.remember(mapping, source, destination);
        self.run(mapping, source, &constructed, WriteMode::Mutate, options)
    }

    fn map_object(
        &mut self,
        mapping: &Mapping,
        source: &ObjectRef,
        options: Option<&MapOptions>,
    ) -> MappingResult<ObjectRef> {
        if self.mapper.config().deduplicate_instances {
            if let Some((_, existing)) = self.ctx.memo.get(&memo_key(mapping, source)) {
                trace!(
                    source = %mapping.source(),
                    destination = %mapping.destination(),
                    "Reusing destination already built in this call"
                );
                return Ok(existing.clone());
            }
        }
        self.check_depth(mapping)?;

        let constructed = self.construct(mapping, source)?;
        let instance = constructed.instance().clone();
        self.remember(mapping, source, &instance);
        self.run(mapping, source, &constructed, WriteMode::Assign, options)?;
        Ok(instance)
    }

    fn check_depth(&self, mapping: &Mapping) -> MappingResult<()> {
        let limit = self.mapper.config().max_depth;
        if self.ctx.depth >= limit {
            return Err(MappingError::DepthExceeded {
                limit,
                source_name: mapping.source().display_name(),
                destination_name: mapping.destination().display_name(),
            });
        }
        Ok(())
    }

    fn remember(&mut self, mapping: &Mapping, source: &ObjectRef, destination: &ObjectRef) {
        if self.mapper.config().deduplicate_instances {
            self.ctx
                .memo
                .insert(memo_key(mapping, source), (source.clone(), destination.clone()));
        }
    }

    fn construct(&self, mapping: &Mapping, source: &ObjectRef) -> MappingResult<Constructed> {
        if let Some(constructor) = mapping.constructor() {
            return constructor(source, mapping.destination_id());
        }
        let instance = match self.mapper.shape_for(mapping.destination()) {
            Some(shape) => shape.instantiate(),
            None => ObjectRef::new(),
        };
        trace!(destination = %mapping.destination(), shape = %instance.shape_name(), "Default construction");
        Ok(Constructed::Object(instance))
    }

    /// Hooks and steps for one destination, with depth bookkeeping and
    /// projection cleanup on failure.
    fn run(
        &mut self,
        mapping: &Mapping,
        source: &ObjectRef,
        destination: &Constructed,
        mode: WriteMode,
        options: Option<&MapOptions>,
    ) -> MappingResult<()> {
        let mut post_construction_done = false;
        self.ctx.depth += 1;
        let outcome = self.populate(
            mapping,
            source,
            destination,
            mode,
            options,
            &mut post_construction_done,
        );
        self.ctx.depth -= 1;

        if let Err(err) = &outcome {
            if !post_construction_done {
                if let Some(projection) = destination.projection() {
                    projection.state().end();
                }
            }
            debug!(
                source = %mapping.source(),
                destination = %mapping.destination(),
                error = %err,
                "Mapping failed"
            );
        }
        outcome
    }

    fn populate(
        &mut self,
        mapping: &Mapping,
        source: &ObjectRef,
        destination: &Constructed,
        mode: WriteMode,
        options: Option<&MapOptions>,
        post_construction_done: &mut bool,
    ) -> MappingResult<()> {
        let instance = destination.instance();

        if let Some(hook) = mapping.before_map() {
            hook(source, instance)?;
        }
        if let Some(hook) = options.and_then(|o| o.before_map.as_ref()) {
            hook(source, instance)?;
        }

        for step in mapping.steps() {
            self.apply_step(step, source, destination, mode)?;
        }

        if let Some(hook) = mapping.after_map() {
            hook(source, instance)?;
        }
        *post_construction_done = true;
        if let Some(hook) = options.and_then(|o| o.after_map.as_ref()) {
            hook(source, instance)?;
        }
        Ok(())
    }

    fn apply_step(
        &mut self,
        step: &PropertyStep,
        source: &ObjectRef,
        destination: &Constructed,
        mode: WriteMode,
    ) -> MappingResult<()> {
        let root = Value::Object(source.clone());
        let scoped = match step.scope() {
            Some(scope) => scope(&root)?,
            None => root,
        };
        if let Some(precondition) = step.precondition() {
            if !precondition(&scoped)? {
                return Ok(());
            }
        }

        let Some(value) = self.evaluate(step.transform(), &scoped)? else {
            return Ok(());
        };

        let path = step.destination();
        if !path.is_nested() {
            return match path.head() {
                Some(name) => destination.write_field(name, value),
                None => Ok(()),
            };
        }
        match mode {
            WriteMode::Assign => writer::write(destination, path, value),
            WriteMode::Mutate => writer::write_mutate(destination, path, value),
        }
    }

    /// The value a transform produces, or `None` when nothing is written.
    fn evaluate(&mut self, transform: &Transform, scoped: &Value) -> MappingResult<Option<Value>> {
        match transform {
            Transform::Ignore => Ok(None),
            Transform::MapFrom(selector) => selector(scoped).map(Some),
            Transform::Path(path) => path.read(scoped).map(Some),
            Transform::FromValue(value) => Ok(Some(value.clone())),
            Transform::Condition {
                predicate,
                path,
                default,
            } => {
                if predicate(scoped)? {
                    path.read(scoped).map(Some)
                } else {
                    Ok(default.clone())
                }
            }
            Transform::NullSubstitution { path, substitute } => {
                let value = path.read(scoped)?;
                Ok(Some(if value.is_null() {
                    substitute.clone()
                } else {
                    value
                }))
            }
            Transform::ConvertUsing { path, converter } => converter(path.read(scoped)?).map(Some),
            Transform::MapWith {
                path,
                source,
                destination,
            } => {
                let value = path.read(scoped)?;
                if value.is_null() {
                    return Ok(Some(Value::Null));
                }
                let nested = self.mapper.registry().get(source, destination)?;
                self.map_value(&nested, &value, None).map(Some)
            }
        }
    }
}

fn invalid_source(mapping: &Mapping, found: &Value) -> MappingError {
    MappingError::InvalidSource {
        found: found.kind_name(),
        source_name: mapping.source().display_name(),
        destination_name: mapping.destination().display_name(),
    }
}
