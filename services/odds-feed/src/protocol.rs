//! Wire protocol decoding
//!
//! One inbound batch is a small envelope around a list of raw records. Each
//! record is disambiguated in two stages: records carrying a `changeType`
//! marker decode as change records; everything else dispatches on its `_type`
//! tag through a registry of per-kind decoders. Unknown tags decode to an
//! explicit `Unknown` variant so new upstream record kinds never break the
//! batch.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use types::entities::{
    AnyEntity, BettingOffer, Entity, EventCategory, Location, MainMarket, Market, MarketInfo,
    MarketOutcomeRelation, Match, NextMatchesNumber, Outcome, Sport,
};
use types::errors::DecodeError;
use types::scalar::{change_set_from_json, ChangeSet};

/// Inbound batch envelope.
///
/// `message_type` distinguishes a full/initial dump from an incremental
/// batch; the exact enumeration is owned by the transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEnvelope {
    pub version: String,
    pub format: String,
    pub message_type: String,
    pub records: Vec<Value>,
}

impl FeedEnvelope {
    pub fn from_json(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(|err| DecodeError::MalformedEnvelope {
            reason: err.to_string(),
        })
    }
}

/// The kind of an incremental change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CREATE" => Some(ChangeKind::Create),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ChangeKind::Create => "CREATE",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// An incremental create/update/delete against a known entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub change_type: ChangeKind,
    /// Wire tag of the target entity. Kept as the raw tag so records against
    /// kinds this catalog does not know can still be skipped downstream.
    pub entity_type: String,
    pub id: String,
    /// Full entity payload, CREATE only. Decoded by the ingestion layer when
    /// the policy actually applies creates.
    pub entity: Option<Value>,
    /// Changed-field patch, UPDATE only.
    pub changed_properties: Option<ChangeSet>,
}

/// One decoded wire record.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedRecord {
    /// A full entity from a dump or incremental batch.
    Entity(AnyEntity),
    /// An incremental change record.
    Change(ChangeRecord),
    /// A record shape this catalog does not know; logged and excluded from
    /// storage, never an error for the surrounding batch.
    Unknown { tag: String },
}

type EntityDecoder = fn(&Value) -> Result<AnyEntity, DecodeError>;

fn decode_entity<T: Entity>(value: &Value) -> Result<AnyEntity, DecodeError> {
    serde_json::from_value::<T>(value.clone())
        .map(Entity::into_any)
        .map_err(|err| DecodeError::EntityPayload {
            tag: T::ENTITY_TYPE.as_tag().to_string(),
            reason: err.to_string(),
        })
}

/// Registry mapping each `_type` discriminator to its decode function.
///
/// Resolved at construction so admitting a new entity kind is a `register`
/// call, not an edit to a central switch.
pub struct DecoderRegistry {
    decoders: HashMap<String, EntityDecoder>,
}

impl DecoderRegistry {
    /// Empty registry; decodes every full-entity record as `Unknown`.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registry covering the current entity catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Sport::ENTITY_TYPE.as_tag(), decode_entity::<Sport>);
        registry.register(Match::ENTITY_TYPE.as_tag(), decode_entity::<Match>);
        registry.register(Market::ENTITY_TYPE.as_tag(), decode_entity::<Market>);
        registry.register(Outcome::ENTITY_TYPE.as_tag(), decode_entity::<Outcome>);
        registry.register(BettingOffer::ENTITY_TYPE.as_tag(), decode_entity::<BettingOffer>);
        registry.register(Location::ENTITY_TYPE.as_tag(), decode_entity::<Location>);
        registry.register(EventCategory::ENTITY_TYPE.as_tag(), decode_entity::<EventCategory>);
        registry.register(
            MarketOutcomeRelation::ENTITY_TYPE.as_tag(),
            decode_entity::<MarketOutcomeRelation>,
        );
        registry.register(MainMarket::ENTITY_TYPE.as_tag(), decode_entity::<MainMarket>);
        registry.register(MarketInfo::ENTITY_TYPE.as_tag(), decode_entity::<MarketInfo>);
        registry.register(
            NextMatchesNumber::ENTITY_TYPE.as_tag(),
            decode_entity::<NextMatchesNumber>,
        );
        registry
    }

    /// Register (or override) the decoder for one discriminator tag.
    pub fn register(&mut self, tag: impl Into<String>, decoder: EntityDecoder) {
        self.decoders.insert(tag.into(), decoder);
    }

    /// Decode one raw record, two-stage disambiguation.
    pub fn decode_record(&self, value: &Value) -> Result<FeedRecord, DecodeError> {
        if value.get("changeType").is_some() {
            return self.decode_change(value);
        }

        let tag = value
            .get("_type")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MissingField {
                field: "_type".to_string(),
            })?;

        match self.decoders.get(tag) {
            Some(decoder) => decoder(value).map(FeedRecord::Entity),
            None => {
                debug!(tag, "unknown entity tag, record skipped");
                Ok(FeedRecord::Unknown {
                    tag: tag.to_string(),
                })
            }
        }
    }

    /// Decode a full entity payload against a known tag. Used for the
    /// embedded entity of CREATE change records.
    pub fn decode_entity_tagged(&self, tag: &str, value: &Value) -> Result<AnyEntity, DecodeError> {
        match self.decoders.get(tag) {
            Some(decoder) => decoder(value),
            None => Err(DecodeError::UnknownEntityType {
                tag: tag.to_string(),
            }),
        }
    }

    fn decode_change(&self, value: &Value) -> Result<FeedRecord, DecodeError> {
        let kind_tag = value
            .get("changeType")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MalformedRecord {
                reason: "changeType is not a string".to_string(),
            })?;

        let Some(change_type) = ChangeKind::from_tag(kind_tag) else {
            debug!(kind = kind_tag, "unknown change kind, record skipped");
            return Ok(FeedRecord::Unknown {
                tag: kind_tag.to_string(),
            });
        };

        let entity_type = value
            .get("entityType")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MissingField {
                field: "entityType".to_string(),
            })?
            .to_string();

        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MissingField {
                field: "id".to_string(),
            })?
            .to_string();

        let entity = value.get("entity").filter(|v| !v.is_null()).cloned();

        let changed_properties = match value.get("changedProperties") {
            Some(raw) if !raw.is_null() => Some(change_set_from_json(raw)?),
            _ => None,
        };

        Ok(FeedRecord::Change(ChangeRecord {
            change_type,
            entity_type,
            id,
            entity,
            changed_properties,
        }))
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
