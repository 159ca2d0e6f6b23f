//! Identifier resolution: model references to canonical model identifiers
//!
//! A mapping end may be named three ways:
//! - by an interned string name (`"Item"`)
//! - by a [`Shape`] handle (a nominal object type)
//! - by a Rust type (`ModelRef::of::<T>()`)
//!
//! All of them resolve to a [`ModelId`], a small `Copy` token that the
//! registry keys on. Strings go through a process-wide, append-only symbol
//! table, so the same string always yields the same token. A shape declared
//! with an alias resolves to the symbol of that alias, which is how a shape
//! handle and a string name come to agree.

use crate::shape::Shape;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Symbol table ─────────────────────────────────────────────────────

/// Interned string token.
///
/// Two symbols are equal iff they were interned from the same string.
/// Interning is case-sensitive and performs no normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

#[derive(Default)]
struct Interner {
    by_name: HashMap<Arc<str>, Symbol>,
    names: Vec<Arc<str>>,
}

/// Process-lifetime symbol table. Entries are only ever appended.
static INTERNER: Lazy<RwLock<Interner>> = Lazy::new(|| RwLock::new(Interner::default()));

impl Symbol {
    /// Intern `name`, returning the existing symbol if it was seen before.
    pub fn intern(name: &str) -> Self {
        if let Some(symbol) = INTERNER.read().by_name.get(name) {
            return *symbol;
        }

        let mut table = INTERNER.write();
        // Another thread may have interned it between the two locks.
        if let Some(symbol) = table.by_name.get(name) {
            return *symbol;
        }
        let symbol = Symbol(table.names.len() as u32);
        let name: Arc<str> = Arc::from(name);
        table.names.push(name.clone());
        table.by_name.insert(name, symbol);
        symbol
    }

    /// The string this symbol was interned from.
    pub fn as_str(&self) -> Arc<str> {
        // Symbols are only minted by `intern`, so the index is always present.
        INTERNER.read().names[self.0 as usize].clone()
    }

    /// Number of distinct strings interned so far.
    pub fn table_len() -> usize {
        INTERNER.read().names.len()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Shape keys ───────────────────────────────────────────────────────

static NEXT_SHAPE_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of one shape definition.
///
/// Minted once per `Shape::build()`; two shapes never share a key, even when
/// they carry the same name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeKey(u64);

impl ShapeKey {
    pub(crate) fn next() -> Self {
        Self(NEXT_SHAPE_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

// ── Model identifiers ────────────────────────────────────────────────

/// Canonical identifier of a model shape, as used by the mapping registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// Interned name (or aliased shape)
    Symbol(Symbol),
    /// Unaliased shape definition
    Shape(ShapeKey),
    /// Rust nominal type
    Type(TypeId),
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelId::Symbol(symbol) => write!(f, "symbol:{}", symbol),
            ModelId::Shape(key) => write!(f, "shape#{}", key.0),
            ModelId::Type(id) => write!(f, "type:{:?}", id),
        }
    }
}

/// A reference to a model shape, before canonicalization.
#[derive(Clone, Debug)]
pub enum ModelRef {
    Name(Arc<str>),
    Shape(Shape),
    Type { id: TypeId, name: &'static str },
}

impl ModelRef {
    /// Reference a Rust type by identity.
    pub fn of<T: 'static>() -> Self {
        ModelRef::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Canonicalize this reference. Never fails.
    pub fn resolve(&self) -> ModelId {
        match self {
            ModelRef::Name(name) => ModelId::Symbol(Symbol::intern(name)),
            ModelRef::Shape(shape) => shape.model_id(),
            ModelRef::Type { id, .. } => ModelId::Type(*id),
        }
    }

    /// Human-readable name, used in error messages.
    pub fn display_name(&self) -> String {
        match self {
            ModelRef::Name(name) => name.to_string(),
            ModelRef::Shape(shape) => shape.name().to_string(),
            ModelRef::Type { name, .. } => (*name).to_string(),
        }
    }

    /// The shape behind this reference, if it is a shape reference.
    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            ModelRef::Shape(shape) => Some(shape),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl From<&str> for ModelRef {
    fn from(name: &str) -> Self {
        ModelRef::Name(Arc::from(name))
    }
}

impl From<String> for ModelRef {
    fn from(name: String) -> Self {
        ModelRef::Name(Arc::from(name))
    }
}

impl From<Shape> for ModelRef {
    fn from(shape: Shape) -> Self {
        ModelRef::Shape(shape)
    }
}

impl From<&Shape> for ModelRef {
    fn from(shape: &Shape) -> Self {
        ModelRef::Shape(shape.clone())
    }
}

impl From<&ModelRef> for ModelRef {
    fn from(model: &ModelRef) -> Self {
        model.clone()
    }
}
