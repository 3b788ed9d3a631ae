//! Entity type tags and store keys
//!
//! Every record on the feed carries a type discriminator; the store indexes
//! entities by the (type, id) pair. `EntityKey` is the single composite key
//! used by both the entity table and the publisher registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The concrete entity kinds carried by the feed.
///
/// `as_tag`/`from_tag` map to the wire discriminator strings. Tags not listed
/// here are handled as explicit unknowns at the decode boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Sport,
    Match,
    Market,
    Outcome,
    BettingOffer,
    Location,
    EventCategory,
    MarketOutcomeRelation,
    MainMarket,
    MarketInfo,
    NextMatchesNumber,
}

impl EntityType {
    /// All known entity kinds, in wire-catalog order.
    pub const ALL: [EntityType; 11] = [
        EntityType::Sport,
        EntityType::Match,
        EntityType::Market,
        EntityType::Outcome,
        EntityType::BettingOffer,
        EntityType::Location,
        EntityType::EventCategory,
        EntityType::MarketOutcomeRelation,
        EntityType::MainMarket,
        EntityType::MarketInfo,
        EntityType::NextMatchesNumber,
    ];

    /// The wire discriminator for this kind.
    pub fn as_tag(&self) -> &'static str {
        match self {
            EntityType::Sport => "SPORT",
            EntityType::Match => "MATCH",
            EntityType::Market => "MARKET",
            EntityType::Outcome => "OUTCOME",
            EntityType::BettingOffer => "BETTING_OFFER",
            EntityType::Location => "LOCATION",
            EntityType::EventCategory => "EVENT_CATEGORY",
            EntityType::MarketOutcomeRelation => "MARKET_OUTCOME_RELATION",
            EntityType::MainMarket => "MAIN_MARKET",
            EntityType::MarketInfo => "MARKET_INFO",
            EntityType::NextMatchesNumber => "NEXT_MATCHES_NUMBER",
        }
    }

    /// Resolve a wire discriminator, `None` for tags this catalog does not know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        EntityType::ALL.iter().copied().find(|t| t.as_tag() == tag)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// Composite key identifying one live entity in the store.
///
/// A single hashable (type, id) key replaces nested per-type maps so the
/// entity table and the publisher registry cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}
