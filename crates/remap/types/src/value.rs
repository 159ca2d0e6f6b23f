//! Dynamic object model the engine maps between
//!
//! Values are either scalars (compared structurally) or shared handles to
//! lists and objects (compared by identity). Handles are `Arc`-backed so an
//! object graph may contain back-references, and the same destination
//! instance can be reachable from several places at once.
//!
//! Field reads and writes on an [`ObjectRef`] honour the accessors declared
//! on its [`Shape`]: a getter wins over own fields on read, a setter receives
//! every write to its name, and a getter-only name rejects writes.

use crate::error::{MappingError, MappingResult};
use crate::shape::Shape;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Value ────────────────────────────────────────────────────────────

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(ListRef),
    Object(ObjectRef),
}

impl Value {
    /// Build a plain object value from field pairs.
    pub fn object<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(ObjectRef::from_fields(fields))
    }

    /// Build a list value.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(ListRef::from_vec(items.into_iter().map(Into::into).collect()))
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// The object behind this value, or a `TypeMismatch` error.
    pub fn expect_object(&self) -> MappingResult<&ObjectRef> {
        self.as_object().ok_or(MappingError::TypeMismatch {
            expected: "object",
            found: self.kind_name(),
        })
    }

    /// The list behind this value, or a `TypeMismatch` error.
    pub fn expect_list(&self) -> MappingResult<&ListRef> {
        self.as_list().ok_or(MappingError::TypeMismatch {
            expected: "list",
            found: self.kind_name(),
        })
    }

    /// Build a fresh, acyclic value tree from JSON.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(ListRef::from_vec(items.into_iter().map(Value::from_json).collect()))
            }
            serde_json::Value::Object(fields) => Value::Object(ObjectRef::from_fields(
                fields.into_iter().map(|(k, v)| (k, Value::from_json(v))),
            )),
        }
    }

    /// Snapshot the own fields of this value as JSON.
    ///
    /// Accessors are not evaluated. Shared sub-objects are emitted once per
    /// occurrence; a cycle yields `CyclicValue`.
    pub fn to_json(&self) -> MappingResult<serde_json::Value> {
        let mut on_stack = HashSet::new();
        self.to_json_inner(&mut on_stack)
    }

    fn to_json_inner(&self, on_stack: &mut HashSet<usize>) -> MappingResult<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(list) => {
                let key = list.key();
                if !on_stack.insert(key) {
                    return Err(MappingError::CyclicValue);
                }
                let items = list
                    .to_vec()
                    .iter()
                    .map(|item| item.to_json_inner(on_stack))
                    .collect::<MappingResult<Vec<_>>>()?;
                on_stack.remove(&key);
                serde_json::Value::Array(items)
            }
            Value::Object(obj) => {
                let key = obj.key().0;
                if !on_stack.insert(key) {
                    return Err(MappingError::CyclicValue);
                }
                let mut fields = serde_json::Map::new();
                for (name, value) in obj.own_fields() {
                    fields.insert(name, value.to_json_inner(on_stack)?);
                }
                on_stack.remove(&key);
                serde_json::Value::Object(fields)
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(n) => write!(f, "Float({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(list) => write!(f, "{:?}", list),
            Value::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<&ObjectRef> for Value {
    fn from(obj: &ObjectRef) -> Self {
        Value::Object(obj.clone())
    }
}

impl From<ListRef> for Value {
    fn from(list: ListRef) -> Self {
        Value::List(list)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(ListRef::from_vec(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

// ── Lists ────────────────────────────────────────────────────────────

/// Shared, identity-compared list.
#[derive(Clone, Default)]
pub struct ListRef(Arc<RwLock<Vec<Value>>>);

impl ListRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.write().push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Whether `value` is an element (identity for objects and lists).
    pub fn contains(&self, value: &Value) -> bool {
        self.0.read().iter().any(|item| item == value)
    }

    /// Position of `value` in the list, by the same equality as `contains`.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.0.read().iter().position(|item| item == value)
    }

    pub fn ptr_eq(&self, other: &ListRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl std::fmt::Debug for ListRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "List@{:#x}[{}]", self.key(), self.len())
    }
}

// ── Objects ──────────────────────────────────────────────────────────

/// Identity of an object, stable while any handle to it is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

static NEXT_MARK_KEY: AtomicU64 = AtomicU64::new(1);

/// Private tag for per-object marks (one per projected mapping).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkKey(u64);

impl MarkKey {
    /// Mint a tag no other caller can observe.
    pub fn unique() -> Self {
        Self(NEXT_MARK_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

struct ObjectCell {
    shape: Option<Shape>,
    fields: RwLock<IndexMap<String, Value>>,
    marks: Mutex<HashMap<MarkKey, usize>>,
}

/// Shared handle to an object instance.
///
/// Handles are reference counted. A graph with back-references or rings
/// keeps itself alive after the last outside handle is dropped; release it
/// with [`take_fields`](Self::take_fields) on the objects that close a cycle.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

impl ObjectRef {
    /// A plain object with no shape and no fields.
    pub fn new() -> Self {
        Self::with_shape(None)
    }

    pub(crate) fn with_shape(shape: Option<Shape>) -> Self {
        Self(Arc::new(ObjectCell {
            shape,
            fields: RwLock::new(IndexMap::new()),
            marks: Mutex::new(HashMap::new()),
        }))
    }

    /// A plain object holding `fields` as own fields.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let obj = Self::new();
        {
            let mut own = obj.0.fields.write();
            for (name, value) in fields {
                own.insert(name.into(), value.into());
            }
        }
        obj
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.0.shape.as_ref()
    }

    /// Name of this object's shape, or `"Object"` for plain objects.
    pub fn shape_name(&self) -> String {
        self.shape()
            .map(|shape| shape.name().to_string())
            .unwrap_or_else(|| "Object".to_string())
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Read `name`: getter first, then own field, else `Null`.
    pub fn get(&self, name: &str) -> MappingResult<Value> {
        if let Some(accessor) = self.shape().and_then(|shape| shape.accessor(name)) {
            return match accessor.getter() {
                Some(getter) => getter(self),
                None => Ok(Value::Null),
            };
        }
        Ok(self.get_own(name).unwrap_or(Value::Null))
    }

    /// Read an own field, bypassing accessors.
    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.0.fields.read().get(name).cloned()
    }

    /// Write `name`: through its setter if one governs it, rejected for
    /// getter-only names, otherwise as an own field.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> MappingResult<()> {
        let value = value.into();
        if let Some(accessor) = self.shape().and_then(|shape| shape.accessor(name)) {
            return match accessor.setter() {
                Some(setter) => setter(self, value),
                None => Err(MappingError::ReadOnlyProperty {
                    shape: self.shape_name(),
                    property: name.to_string(),
                }),
            };
        }
        self.set_own(name, value);
        Ok(())
    }

    /// Write an own field, bypassing accessors.
    pub fn set_own(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.fields.write().insert(name.into(), value.into());
    }

    pub fn remove_own(&self, name: &str) -> Option<Value> {
        self.0.fields.write().shift_remove(name)
    }

    /// Remove and return every own field, breaking the links they held.
    pub fn take_fields(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut *self.0.fields.write()).into_iter().collect()
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.0.fields.read().contains_key(name)
    }

    /// Whether a setter (own or inherited) governs `name`.
    pub fn has_setter(&self, name: &str) -> bool {
        self.shape().map_or(false, |shape| shape.has_setter(name))
    }

    /// Whether a getter (own or inherited) governs `name`.
    pub fn has_getter(&self, name: &str) -> bool {
        self.shape().map_or(false, |shape| shape.has_getter(name))
    }

    /// Own field names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.fields.read().keys().cloned().collect()
    }

    /// Snapshot of own fields in insertion order.
    pub fn own_fields(&self) -> Vec<(String, Value)> {
        self.0
            .fields
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.fields.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.fields.read().is_empty()
    }

    /// Shallow-copy `other`'s own fields onto this object with [`set`](Self::set).
    ///
    /// Lists and objects are shared, not cloned.
    pub fn assign_from(&self, other: &ObjectRef) -> MappingResult<()> {
        for (name, value) in other.own_fields() {
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Raise the mark `key` on this object. Marks nest: each `mark` needs a
    /// matching `unmark`.
    pub fn mark(&self, key: MarkKey) {
        *self.0.marks.lock().entry(key).or_insert(0) += 1;
    }

    /// Lower the mark `key`. Lowering an absent mark is a no-op.
    pub fn unmark(&self, key: MarkKey) {
        let mut marks = self.0.marks.lock();
        if let Some(depth) = marks.get_mut(&key) {
            *depth -= 1;
            if *depth == 0 {
                marks.remove(&key);
            }
        }
    }

    /// Drop every level of the mark `key` at once.
    pub fn clear_mark(&self, key: MarkKey) {
        self.0.marks.lock().remove(&key);
    }

    pub fn is_marked(&self, key: MarkKey) -> bool {
        self.0.marks.lock().contains_key(&key)
    }

    /// Whether any mark at all is raised on this object.
    pub fn has_marks(&self) -> bool {
        !self.0.marks.lock().is_empty()
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{:#x} {:?}", self.shape_name(), self.key().0, self.keys())
    }
}
