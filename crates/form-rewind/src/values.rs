#![forbid(unsafe_code)]

//! Form-value snapshots, equality, and path diffing.
//!
//! A [`FormValues`] is the entire form state at one instant: a JSON object
//! mapping field name to value. Snapshots are immutable by convention once
//! they enter the checkpoint history.
//!
//! # Equality
//!
//! Two snapshots are equal when they have the same set of *defined* fields
//! (fields whose value is not `null`) and every defined field maps to an
//! equal value. A `null` field and an absent field are indistinguishable,
//! so `{"a": 1, "b": null}` equals `{"a": 1}`.
//!
//! # Diffing
//!
//! [`values_diff`] walks two snapshots recursively and reports every leaf
//! difference under a dot-separated path:
//!
//! ```text
//! {"user": {"name": "ann"}, "tags": [1]}
//! {"user": {"name": "bob"}, "tags": [1, 2]}
//!       │
//!       ▼
//! { "user.name": ("ann", "bob"), "tags": ([1], [1, 2]) }
//! ```
//!
//! Only JSON objects recurse; arrays and scalars are recorded wholesale at
//! their path. Equal subtrees short-circuit without visiting children.
//! Field names must never contain `.` — that would make paths ambiguous and
//! is reported as [`RewindError::ReservedPathChar`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RewindError;

/// A full form-value snapshot: field name → JSON value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues {
    fields: Map<String, Value>,
}

impl FormValues {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Build a snapshot from a JSON value. Returns `None` unless the value
    /// is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Get a field's value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field's value, returning the previous one if present.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    /// Iterate over `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Iterate over field names.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Number of fields, including `null`-valued ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the snapshot has no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrow the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn defined_len(&self) -> usize {
        self.fields.values().filter(|v| !v.is_null()).count()
    }
}

impl PartialEq for FormValues {
    fn eq(&self, other: &Self) -> bool {
        if self.defined_len() != other.defined_len() {
            return false;
        }
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .all(|(k, v)| other.fields.get(k).is_some_and(|o| o == v))
    }
}

impl From<Map<String, Value>> for FormValues {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FormValues {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Per-path change set: dotted field path → `(old, new)`.
///
/// A missing side is represented as `Value::Null`.
pub type ValuesDiff = BTreeMap<String, (Value, Value)>;

/// Compute the change set between two snapshots.
///
/// # Errors
///
/// Returns [`RewindError::ReservedPathChar`] if any visited field name
/// contains the `.` separator.
pub fn values_diff(a: &FormValues, b: &FormValues) -> Result<ValuesDiff, RewindError> {
    let mut out = ValuesDiff::new();
    for key in key_union(a.as_map(), b.as_map()) {
        ensure_plain_key(key)?;
        diff_value(
            a.get(key).unwrap_or(&Value::Null),
            b.get(key).unwrap_or(&Value::Null),
            &mut out,
            key,
        )?;
    }
    Ok(out)
}

fn diff_value(
    a: &Value,
    b: &Value,
    out: &mut ValuesDiff,
    path: &str,
) -> Result<(), RewindError> {
    if a == b {
        return Ok(());
    }
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            for key in key_union(ma, mb) {
                ensure_plain_key(key)?;
                diff_value(
                    ma.get(key).unwrap_or(&Value::Null),
                    mb.get(key).unwrap_or(&Value::Null),
                    out,
                    &format!("{path}.{key}"),
                )?;
            }
            Ok(())
        }
        _ => {
            out.insert(path.to_string(), (a.clone(), b.clone()));
            Ok(())
        }
    }
}

/// Union of both maps' keys, in `a`'s order first.
fn key_union<'a>(
    a: &'a Map<String, Value>,
    b: &'a Map<String, Value>,
) -> impl Iterator<Item = &'a String> {
    a.keys().chain(b.keys().filter(|k| !a.contains_key(*k)))
}

fn ensure_plain_key(key: &str) -> Result<(), RewindError> {
    if key.contains('.') {
        return Err(RewindError::ReservedPathChar {
            key: key.to_string(),
        });
    }
    Ok(())
}
