//! Scalar values for partial updates
//!
//! Changed-field values arrive with no static type, so decoding tries
//! candidate types in a fixed order: string first (least ambiguous), then
//! integer, then float (only when integer decoding fails, preserving exact
//! integers), then boolean (so `0`/`1` stay numbers), then null. The order is
//! a load-bearing contract and is pinned by the tests in this module.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::DecodeError;

/// A field-name → scalar map carried by an UPDATE change record.
///
/// Ordered so that diagnostics and iteration are deterministic.
pub type ChangeSet = BTreeMap<String, FieldValue>;

/// One scalar value from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Coerce a raw JSON value, trying candidates in the fixed order.
    ///
    /// Arrays and objects are not valid scalars and fail the record they
    /// belong to, never the surrounding batch.
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        if let Some(s) = value.as_str() {
            return Ok(FieldValue::Text(s.to_string()));
        }
        if let Some(i) = value.as_i64() {
            return Ok(FieldValue::Int(i));
        }
        if let Some(f) = value.as_f64() {
            return Ok(FieldValue::Float(f));
        }
        if let Some(b) = value.as_bool() {
            return Ok(FieldValue::Bool(b));
        }
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        Err(DecodeError::UnsupportedScalar {
            value: value.to_string(),
        })
    }

    /// Encode back to the JSON shape the wire uses.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::from(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Bool(b) => Value::from(*b),
            FieldValue::Null => Value::Null,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float view; exact integers widen. The widening is what lets a feed
    /// that emits odds as bare integers still patch a float field.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FieldValue::from_json(&value).map_err(D::Error::custom)
    }
}

/// Decode a raw JSON object into a `ChangeSet`, one coerced scalar per field.
pub fn change_set_from_json(value: &Value) -> Result<ChangeSet, DecodeError> {
    let object = value.as_object().ok_or_else(|| DecodeError::MalformedRecord {
        reason: format!("changedProperties is not an object: {value}"),
    })?;
    let mut changes = ChangeSet::new();
    for (field, raw) in object {
        changes.insert(field.clone(), FieldValue::from_json(raw)?);
    }
    Ok(changes)
}
