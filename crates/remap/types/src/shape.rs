//! Shapes: nominal object types with accessors
//!
//! A [`Shape`] names a kind of object and declares which of its properties
//! are governed by user code (getters and setters). Accessors are inherited
//! through `extends`; the nearest declaration of a name wins, exactly like a
//! property lookup walking a prototype chain.
//!
//! The chain is flattened into an accessor manifest once, in
//! [`ShapeBuilder::build`]. Setter detection on the write path is a single
//! map lookup and never walks the chain.

use crate::error::MappingResult;
use crate::identifier::{ModelId, ShapeKey, Symbol};
use crate::value::{ObjectRef, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// Computes a property value from its instance.
pub type Getter = Arc<dyn Fn(&ObjectRef) -> MappingResult<Value> + Send + Sync>;

/// Receives every write to a property of its instance.
pub type Setter = Arc<dyn Fn(&ObjectRef, Value) -> MappingResult<()> + Send + Sync>;

/// Getter/setter pair governing one property name.
#[derive(Clone, Default)]
pub struct Accessor {
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl Accessor {
    pub fn getter(&self) -> Option<&Getter> {
        self.getter.as_ref()
    }

    pub fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.getter.is_some() && self.setter.is_none()
    }
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("get", &self.getter.is_some())
            .field("set", &self.setter.is_some())
            .finish()
    }
}

struct ShapeInner {
    name: Arc<str>,
    key: ShapeKey,
    alias: Option<Symbol>,
    parent: Option<Shape>,
    /// Flattened: own accessors over inherited ones.
    manifest: IndexMap<String, Accessor>,
}

/// A nominal object type. Cheap to clone.
#[derive(Clone)]
pub struct Shape(Arc<ShapeInner>);

impl Shape {
    pub fn builder(name: impl Into<String>) -> ShapeBuilder {
        ShapeBuilder {
            name: name.into(),
            alias: None,
            parent: None,
            accessors: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn key(&self) -> ShapeKey {
        self.0.key
    }

    pub fn alias(&self) -> Option<Symbol> {
        self.0.alias
    }

    pub fn parent(&self) -> Option<&Shape> {
        self.0.parent.as_ref()
    }

    /// Canonical identifier: the alias symbol when aliased, else the shape key.
    pub fn model_id(&self) -> ModelId {
        match self.0.alias {
            Some(symbol) => ModelId::Symbol(symbol),
            None => ModelId::Shape(self.0.key),
        }
    }

    /// The accessor governing `name`, own or inherited.
    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.0.manifest.get(name)
    }

    pub fn has_setter(&self, name: &str) -> bool {
        self.accessor(name).map_or(false, |a| a.setter.is_some())
    }

    pub fn has_getter(&self, name: &str) -> bool {
        self.accessor(name).map_or(false, |a| a.getter.is_some())
    }

    /// Names governed by accessors, inherited first.
    pub fn accessor_names(&self) -> impl Iterator<Item = &str> {
        self.0.manifest.keys().map(String::as_str)
    }

    /// Whether this shape is `other` or extends it.
    pub fn is_a(&self, other: &Shape) -> bool {
        let mut current = Some(self);
        while let Some(shape) = current {
            if shape.ptr_eq(other) {
                return true;
            }
            current = shape.parent();
        }
        false
    }

    pub fn ptr_eq(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A new, empty instance of this shape.
    pub fn instantiate(&self) -> ObjectRef {
        ObjectRef::with_shape(Some(self.clone()))
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.0.name)
            .field("key", &self.0.key)
            .field("accessors", &self.0.manifest)
            .finish()
    }
}

/// Builder for [`Shape`].
pub struct ShapeBuilder {
    name: String,
    alias: Option<String>,
    parent: Option<Shape>,
    accessors: IndexMap<String, Accessor>,
}

impl ShapeBuilder {
    /// Inherit `parent`'s accessors.
    pub fn extends(mut self, parent: &Shape) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Make the shape resolve to the same identifier as the string `alias`.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&ObjectRef) -> MappingResult<Value> + Send + Sync + 'static,
    {
        self.accessors.entry(name.into()).or_default().getter = Some(Arc::new(getter));
        self
    }

    pub fn setter<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&ObjectRef, Value) -> MappingResult<()> + Send + Sync + 'static,
    {
        self.accessors.entry(name.into()).or_default().setter = Some(Arc::new(setter));
        self
    }

    pub fn accessor<G, S>(self, name: impl Into<String>, getter: G, setter: S) -> Self
    where
        G: Fn(&ObjectRef) -> MappingResult<Value> + Send + Sync + 'static,
        S: Fn(&ObjectRef, Value) -> MappingResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        self.getter(name.clone(), getter).setter(name, setter)
    }

    /// Getter and setter forwarding `name` to the same field of the object
    /// held in own field `container`.
    pub fn delegate(self, name: impl Into<String>, container: impl Into<String>) -> Self {
        let name = name.into();
        let container = container.into();
        let (get_name, get_container) = (name.clone(), container.clone());
        let set_name = name.clone();
        self.accessor(
            name,
            move |this| read_backing(this, &get_container, &get_name),
            move |this, value| {
                let backing = this.get_own(&container).unwrap_or_default();
                backing.expect_object()?.set(&set_name, value)
            },
        )
    }

    /// Getter-only forwarding of `name` to the object in own field `container`.
    pub fn delegate_readonly(self, name: impl Into<String>, container: impl Into<String>) -> Self {
        let name = name.into();
        let container = container.into();
        let get_name = name.clone();
        self.getter(name, move |this| read_backing(this, &container, &get_name))
    }

    pub fn build(self) -> Shape {
        let mut manifest = self
            .parent
            .as_ref()
            .map(|parent| parent.0.manifest.clone())
            .unwrap_or_default();
        for (name, accessor) in self.accessors {
            // Nearest declaration wins as a whole, getter and setter together.
            manifest.insert(name, accessor);
        }

        Shape(Arc::new(ShapeInner {
            name: Arc::from(self.name),
            key: ShapeKey::next(),
            alias: self.alias.as_deref().map(Symbol::intern),
            parent: self.parent,
            manifest,
        }))
    }
}

fn read_backing(this: &ObjectRef, container: &str, name: &str) -> MappingResult<Value> {
    match this.get_own(container) {
        Some(Value::Object(backing)) => backing.get(name),
        _ => Ok(Value::Null),
    }
}
