//! Projected construction: destinations built around a props container
//!
//! Some destination types are façades: their public properties are getters
//! (and sometimes setters) reading through to a private props container the
//! instance was constructed with. Mapping into such a type happens in two
//! phases:
//!
//! 1. The props container is instantiated, shallow-copied from the source,
//!    and handed to a user factory that returns the façade instance.
//! 2. The property steps run against a [`Projection`] of that instance.
//!    While the source's projection mark is raised, writes to names without
//!    a setter land in the backing container (getter-only names included).
//!    Names with a setter always go through the setter, so invariant-keeping
//!    logic there still runs.
//!
//! The mark is per source object and per projected mapping. It is raised by
//! the constructor and lowered by the mapping's post-construction hook, or
//! by the engine if the mapping fails before that hook completes.

use crate::mapping::Mapping;
use remap_types::{FieldTarget, MappingResult, MarkKey, ModelRef, ObjectRef, Shape, Value};

/// The "mapping in progress" mark of one source object.
#[derive(Clone, Debug)]
pub struct ProjectionState {
    source: ObjectRef,
    key: MarkKey,
}

impl ProjectionState {
    pub fn new(source: ObjectRef, key: MarkKey) -> Self {
        Self { source, key }
    }

    pub fn source(&self) -> &ObjectRef {
        &self.source
    }

    pub fn key(&self) -> MarkKey {
        self.key
    }

    pub fn begin(&self) {
        self.source.mark(self.key);
    }

    pub fn end(&self) {
        self.source.unmark(self.key);
    }

    pub fn is_active(&self) -> bool {
        self.source.is_marked(self.key)
    }
}

/// A façade instance paired with the container backing it.
#[derive(Clone, Debug)]
pub struct Projection {
    instance: ObjectRef,
    backing: ObjectRef,
    state: ProjectionState,
}

impl Projection {
    pub fn new(instance: ObjectRef, backing: ObjectRef, state: ProjectionState) -> Self {
        Self {
            instance,
            backing,
            state,
        }
    }

    /// The object handed back to callers.
    pub fn instance(&self) -> &ObjectRef {
        &self.instance
    }

    pub fn backing(&self) -> &ObjectRef {
        &self.backing
    }

    pub fn state(&self) -> &ProjectionState {
        &self.state
    }
}

impl FieldTarget for Projection {
    fn read_field(&self, name: &str) -> MappingResult<Value> {
        if self.instance.has_getter(name) || !self.state.is_active() {
            return self.instance.get(name);
        }
        self.backing.get(name)
    }

    fn write_field(&self, name: &str, value: Value) -> MappingResult<()> {
        if self.instance.has_setter(name) {
            return self.instance.set(name, value);
        }
        if self.state.is_active() {
            return self.backing.set(name, value);
        }
        self.instance.set(name, value)
    }

    fn setter_governs(&self, name: &str) -> bool {
        self.instance.has_setter(name)
    }
}

/// What a constructor produced.
#[derive(Clone, Debug)]
pub enum Constructed {
    /// A plain destination; steps write to it directly
    Object(ObjectRef),
    /// A façade; steps write through the projection rules
    Projected(Projection),
}

impl Constructed {
    /// The destination object callers receive.
    pub fn instance(&self) -> &ObjectRef {
        match self {
            Constructed::Object(obj) => obj,
            Constructed::Projected(projection) => projection.instance(),
        }
    }

    pub fn projection(&self) -> Option<&Projection> {
        match self {
            Constructed::Object(_) => None,
            Constructed::Projected(projection) => Some(projection),
        }
    }
}

impl From<ObjectRef> for Constructed {
    fn from(obj: ObjectRef) -> Self {
        Constructed::Object(obj)
    }
}

impl From<Projection> for Constructed {
    fn from(projection: Projection) -> Self {
        Constructed::Projected(projection)
    }
}

impl FieldTarget for Constructed {
    fn read_field(&self, name: &str) -> MappingResult<Value> {
        match self {
            Constructed::Object(obj) => obj.read_field(name),
            Constructed::Projected(projection) => projection.read_field(name),
        }
    }

    fn write_field(&self, name: &str, value: Value) -> MappingResult<()> {
        match self {
            Constructed::Object(obj) => obj.write_field(name, value),
            Constructed::Projected(projection) => projection.write_field(name, value),
        }
    }

    fn setter_governs(&self, name: &str) -> bool {
        self.instance().has_setter(name)
    }
}

/// Derive the projected `source -> destination` mapping from the registered
/// `source -> props` mapping.
///
/// The result reuses every step of `props_mapping` against the source
/// itself, constructs destinations with `factory(props, source)` around a
/// props container (an instance of `props_shape`, or a plain object), and
/// lowers the source's mark in its post-construction hook.
pub fn projected_mapping<F>(
    props_mapping: &Mapping,
    destination: impl Into<ModelRef>,
    props_shape: Option<Shape>,
    factory: F,
) -> Mapping
where
    F: Fn(&ObjectRef, &ObjectRef) -> MappingResult<ObjectRef> + Send + Sync + 'static,
{
    let key = MarkKey::unique();

    Mapping::builder(props_mapping.source(), destination)
        .for_self(props_mapping, |source| Ok(source.clone()))
        .construct_using(move |source, _destination_id| {
            let backing = match &props_shape {
                Some(shape) => shape.instantiate(),
                None => ObjectRef::new(),
            };
            backing.assign_from(source)?;

            let state = ProjectionState::new(source.clone(), key);
            state.begin();
            match factory(&backing, source) {
                Ok(instance) => Ok(Projection::new(instance, backing, state).into()),
                Err(err) => {
                    state.end();
                    Err(err)
                }
            }
        })
        .after_map(move |source, _destination| {
            source.unmark(key);
            Ok(())
        })
        .build()
}
