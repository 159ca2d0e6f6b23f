//! Property paths locating (possibly nested) fields in an object graph

use crate::error::MappingResult;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Ordered sequence of property names, e.g. `address.city`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    /// Split a dotted path. Empty segments are dropped, so `""` is the empty path.
    pub fn parse(dotted: &str) -> Self {
        Self(
            dotted
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }

    pub fn head(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Read the value at this path from `root`, evaluating getters on the
    /// way. A missing field or a non-object in the middle yields `Null`.
    /// The empty path reads `root` itself.
    pub fn read(&self, root: &Value) -> MappingResult<Value> {
        let mut current = root.clone();
        for segment in &self.0 {
            current = match &current {
                Value::Object(obj) => obj.get(segment)?,
                _ => return Ok(Value::Null),
            };
        }
        Ok(current)
    }
}

impl std::fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for PropertyPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl From<String> for PropertyPath {
    fn from(dotted: String) -> Self {
        Self::parse(&dotted)
    }
}

impl From<Vec<String>> for PropertyPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for PropertyPath {
    fn from(segments: &[&str]) -> Self {
        Self::from_segments(segments.iter().copied())
    }
}
