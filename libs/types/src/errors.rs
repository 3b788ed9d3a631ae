//! Error taxonomy for the feed pipeline
//!
//! Decode and patch failures are record-scoped: they are logged and counted
//! by the caller, and never abort a batch or corrupt the store.

use thiserror::Error;

/// Failures while decoding a wire record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("unknown entity type tag: {tag}")]
    UnknownEntityType { tag: String },

    #[error("unknown change kind: {kind}")]
    UnknownChangeKind { kind: String },

    #[error("record is missing required field: {field}")]
    MissingField { field: String },

    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("value is not a supported scalar: {value}")]
    UnsupportedScalar { value: String },

    #[error("entity payload failed to decode for {tag}: {reason}")]
    EntityPayload { tag: String, reason: String },

    #[error("malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },
}

/// Failures while applying a partial update to a stored record.
///
/// A malformed patch is rejected outright rather than silently dropped; the
/// store keeps the prior value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("{entity_type} has no field named {field}")]
    UnknownField { entity_type: String, field: String },

    #[error("field {field} expects {expected}, got {value}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        value: String,
    },
}
