//! Mapping definitions: how to turn one model into another
//!
//! A [`Mapping`] is an immutable recipe for one (source, destination) pair:
//! an ordered list of [`PropertyStep`]s, an optional custom constructor, and
//! optional hooks around the steps. It is built once with [`MappingBuilder`]
//! and then shared (`Arc`) by the registry and every call that uses it.

use crate::projection::Constructed;
use remap_types::{MappingResult, ModelId, ModelRef, ObjectRef, PropertyPath, Value};
use std::sync::Arc;

/// Computes a value from the (scoped) source.
pub type Selector = Arc<dyn Fn(&Value) -> MappingResult<Value> + Send + Sync>;

/// Decides whether a step or condition applies to the (scoped) source.
pub type Predicate = Arc<dyn Fn(&Value) -> MappingResult<bool> + Send + Sync>;

/// Converts a value read from the source.
pub type Converter = Arc<dyn Fn(Value) -> MappingResult<Value> + Send + Sync>;

/// Builds the destination instance from the source and the destination id.
pub type Constructor = Arc<dyn Fn(&ObjectRef, ModelId) -> MappingResult<Constructed> + Send + Sync>;

/// Runs with `(source, destination)` before or after the steps.
pub type Hook = Arc<dyn Fn(&ObjectRef, &ObjectRef) -> MappingResult<()> + Send + Sync>;

/// How a step computes its value.
#[derive(Clone)]
pub enum Transform {
    /// Arbitrary selector over the source
    MapFrom(Selector),
    /// Value at a source path
    Path(PropertyPath),
    /// Value at a source path, mapped through the registered
    /// `source -> destination` mapping (element-wise for lists)
    MapWith {
        path: PropertyPath,
        source: ModelRef,
        destination: ModelRef,
    },
    /// A constant
    FromValue(Value),
    /// Value at `path` when the predicate holds; otherwise `default`, or no
    /// write at all when there is no default
    Condition {
        predicate: Predicate,
        path: PropertyPath,
        default: Option<Value>,
    },
    /// Value at `path`, with `Null` replaced by `substitute`
    NullSubstitution { path: PropertyPath, substitute: Value },
    /// Value at `path`, passed through a converter
    ConvertUsing { path: PropertyPath, converter: Converter },
    /// Never written
    Ignore,
}

impl Transform {
    pub fn map_from<F>(selector: F) -> Self
    where
        F: Fn(&Value) -> MappingResult<Value> + Send + Sync + 'static,
    {
        Transform::MapFrom(Arc::new(selector))
    }

    pub fn path(path: impl Into<PropertyPath>) -> Self {
        Transform::Path(path.into())
    }

    pub fn map_with(
        path: impl Into<PropertyPath>,
        source: impl Into<ModelRef>,
        destination: impl Into<ModelRef>,
    ) -> Self {
        Transform::MapWith {
            path: path.into(),
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn from_value(value: impl Into<Value>) -> Self {
        Transform::FromValue(value.into())
    }

    pub fn condition<F>(predicate: F, path: impl Into<PropertyPath>) -> Self
    where
        F: Fn(&Value) -> MappingResult<bool> + Send + Sync + 'static,
    {
        Transform::Condition {
            predicate: Arc::new(predicate),
            path: path.into(),
            default: None,
        }
    }

    pub fn condition_or<F>(predicate: F, path: impl Into<PropertyPath>, default: impl Into<Value>) -> Self
    where
        F: Fn(&Value) -> MappingResult<bool> + Send + Sync + 'static,
    {
        Transform::Condition {
            predicate: Arc::new(predicate),
            path: path.into(),
            default: Some(default.into()),
        }
    }

    pub fn null_substitution(path: impl Into<PropertyPath>, substitute: impl Into<Value>) -> Self {
        Transform::NullSubstitution {
            path: path.into(),
            substitute: substitute.into(),
        }
    }

    pub fn convert_using<F>(path: impl Into<PropertyPath>, converter: F) -> Self
    where
        F: Fn(Value) -> MappingResult<Value> + Send + Sync + 'static,
    {
        Transform::ConvertUsing {
            path: path.into(),
            converter: Arc::new(converter),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Transform::MapFrom(_) => "map_from",
            Transform::Path(_) => "path",
            Transform::MapWith { .. } => "map_with",
            Transform::FromValue(_) => "from_value",
            Transform::Condition { .. } => "condition",
            Transform::NullSubstitution { .. } => "null_substitution",
            Transform::ConvertUsing { .. } => "convert_using",
            Transform::Ignore => "ignore",
        }
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transform::Path(path) => write!(f, "path({})", path),
            Transform::MapWith {
                path,
                source,
                destination,
            } => write!(f, "map_with({}, {} -> {})", path, source, destination),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// One destination property and how to fill it.
#[derive(Clone)]
pub struct PropertyStep {
    destination: PropertyPath,
    transform: Transform,
    precondition: Option<Predicate>,
    /// Narrows the source before the step runs (from `for_self`)
    scope: Option<Selector>,
}

impl PropertyStep {
    pub fn new(destination: impl Into<PropertyPath>, transform: Transform) -> Self {
        Self {
            destination: destination.into(),
            transform,
            precondition: None,
            scope: None,
        }
    }

    pub fn destination(&self) -> &PropertyPath {
        &self.destination
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn precondition(&self) -> Option<&Predicate> {
        self.precondition.as_ref()
    }

    pub fn scope(&self) -> Option<&Selector> {
        self.scope.as_ref()
    }

    /// Re-scope this step under `outer`: the step sees `inner(outer(source))`.
    fn scoped_under(&self, outer: &Selector) -> Self {
        let scope = match &self.scope {
            None => outer.clone(),
            Some(inner) => {
                let (outer, inner) = (outer.clone(), inner.clone());
                Arc::new(move |source: &Value| inner(&outer(source)?)) as Selector
            }
        };
        Self {
            scope: Some(scope),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for PropertyStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyStep")
            .field("destination", &self.destination.to_string())
            .field("transform", &self.transform)
            .field("precondition", &self.precondition.is_some())
            .field("scoped", &self.scope.is_some())
            .finish()
    }
}

/// Immutable mapping definition for one (source, destination) pair.
#[derive(Clone)]
pub struct Mapping {
    source: ModelRef,
    destination: ModelRef,
    source_id: ModelId,
    destination_id: ModelId,
    steps: Vec<PropertyStep>,
    constructor: Option<Constructor>,
    before_map: Option<Hook>,
    after_map: Option<Hook>,
}

impl Mapping {
    pub fn builder(source: impl Into<ModelRef>, destination: impl Into<ModelRef>) -> MappingBuilder {
        MappingBuilder {
            source: source.into(),
            destination: destination.into(),
            steps: Vec::new(),
            constructor: None,
            before_map: None,
            after_map: None,
        }
    }

    pub fn source(&self) -> &ModelRef {
        &self.source
    }

    pub fn destination(&self) -> &ModelRef {
        &self.destination
    }

    pub fn source_id(&self) -> ModelId {
        self.source_id
    }

    pub fn destination_id(&self) -> ModelId {
        self.destination_id
    }

    /// Steps in application order.
    pub fn steps(&self) -> &[PropertyStep] {
        &self.steps
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn before_map(&self) -> Option<&Hook> {
        self.before_map.as_ref()
    }

    pub fn after_map(&self) -> Option<&Hook> {
        self.after_map.as_ref()
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("source", &self.source.display_name())
            .field("destination", &self.destination.display_name())
            .field("steps", &self.steps)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Builder for [`Mapping`].
pub struct MappingBuilder {
    source: ModelRef,
    destination: ModelRef,
    steps: Vec<PropertyStep>,
    constructor: Option<Constructor>,
    before_map: Option<Hook>,
    after_map: Option<Hook>,
}

impl MappingBuilder {
    /// Fill the destination property at `path` with `transform`.
    pub fn for_member(mut self, path: impl Into<PropertyPath>, transform: Transform) -> Self {
        self.steps.push(PropertyStep::new(path, transform));
        self
    }

    /// Like [`for_member`](Self::for_member), but skip the step entirely
    /// unless `precondition` holds for the source.
    pub fn for_member_when<F>(mut self, path: impl Into<PropertyPath>, precondition: F, transform: Transform) -> Self
    where
        F: Fn(&Value) -> MappingResult<bool> + Send + Sync + 'static,
    {
        let mut step = PropertyStep::new(path, transform);
        step.precondition = Some(Arc::new(precondition));
        self.steps.push(step);
        self
    }

    /// Reuse every step of `other`, run against `selector(source)` instead
    /// of the source itself.
    pub fn for_self<F>(mut self, other: &Mapping, selector: F) -> Self
    where
        F: Fn(&Value) -> MappingResult<Value> + Send + Sync + 'static,
    {
        let outer: Selector = Arc::new(selector);
        self.steps
            .extend(other.steps().iter().map(|step| step.scoped_under(&outer)));
        self
    }

    /// Build destinations with `constructor` instead of default construction.
    pub fn construct_using<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&ObjectRef, ModelId) -> MappingResult<Constructed> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    pub fn before_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) -> MappingResult<()> + Send + Sync + 'static,
    {
        self.before_map = Some(Arc::new(hook));
        self
    }

    pub fn after_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) -> MappingResult<()> + Send + Sync + 'static,
    {
        self.after_map = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Mapping {
        let source_id = self.source.resolve();
        let destination_id = self.destination.resolve();
        Mapping {
            source: self.source,
            destination: self.destination,
            source_id,
            destination_id,
            steps: self.steps,
            constructor: self.constructor,
            before_map: self.before_map,
            after_map: self.after_map,
        }
    }
}

/// Per-call hooks, run after the mapping's own hooks of the same kind.
///
/// Only the top-level object(s) of a call see these; nested mappings do not.
#[derive(Clone, Default)]
pub struct MapOptions {
    pub(crate) before_map: Option<Hook>,
    pub(crate) after_map: Option<Hook>,
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) -> MappingResult<()> + Send + Sync + 'static,
    {
        self.before_map = Some(Arc::new(hook));
        self
    }

    pub fn after_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ObjectRef, &ObjectRef) -> MappingResult<()> + Send + Sync + 'static,
    {
        self.after_map = Some(Arc::new(hook));
        self
    }
}
