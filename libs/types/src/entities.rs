//! Flat feed records
//!
//! Every record is an immutable value keyed by a globally unique `id` within
//! its own kind. "Mutation" always produces a brand-new value that replaces
//! the old one in the store. Field names mirror the wire (camelCase); fields
//! the platform does not consume are ignored on decode.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::key::{EntityKey, EntityType};

/// Contract for any record that can live in the entity store.
pub trait Entity: Clone + Serialize + DeserializeOwned + Sized {
    /// The wire kind this record decodes from.
    const ENTITY_TYPE: EntityType;

    /// Unique id, scoped by the entity kind.
    fn id(&self) -> &str;

    /// Borrow this record out of the stored sum type, if the kinds match.
    fn from_any(any: &AnyEntity) -> Option<&Self>;

    /// Wrap this record into the stored sum type.
    fn into_any(self) -> AnyEntity;

    /// The composite key this record is stored under.
    fn key(&self) -> EntityKey {
        EntityKey::new(Self::ENTITY_TYPE, self.id())
    }
}

/// Records that reference other entities by id.
///
/// Documentation/utility only: the builders issue their own explicit lookups
/// rather than walking these references generically.
pub trait EntityContainer {
    fn referenced_ids(&self) -> Vec<(EntityType, &str)>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sport {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub is_virtual: bool,
    pub number_of_events: i64,
    pub number_of_live_events: i64,
    pub number_of_upcoming_matches: i64,
    pub show_event_category: bool,
    pub is_top_sport: bool,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub sport_id: String,
    pub venue_id: String,
    pub category_id: String,
    pub name: String,
    pub short_name: String,
    /// Scheduled kickoff, epoch milliseconds.
    pub start_time: i64,
    pub status_id: String,
    pub status_name: String,
    pub home_participant_id: String,
    pub home_participant_name: String,
    pub away_participant_id: String,
    pub away_participant_name: String,
    pub allows_live_odds: bool,
    pub number_of_markets: i64,
    pub number_of_betting_offers: i64,
}

impl EntityContainer for Match {
    fn referenced_ids(&self) -> Vec<(EntityType, &str)> {
        vec![
            (EntityType::Sport, &self.sport_id),
            (EntityType::Location, &self.venue_id),
            (EntityType::EventCategory, &self.category_id),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    /// Owning match.
    pub event_id: String,
    pub name: String,
    pub short_name: String,
    pub display_name: Option<String>,
    pub betting_type_id: String,
    pub betting_type_name: String,
    pub short_betting_type_name: String,
    pub number_of_outcomes: i64,
    pub is_available: bool,
    pub main_line: bool,
    pub is_closed: bool,
    pub param_float1: Option<f64>,
}

impl EntityContainer for Market {
    fn referenced_ids(&self) -> Vec<(EntityType, &str)> {
        vec![(EntityType::Match, &self.event_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub id: String,
    /// Owning match.
    pub event_id: String,
    pub code: String,
    pub translated_name: String,
    pub short_translated_name: Option<String>,
    pub status_id: String,
    pub header_name: Option<String>,
    pub header_name_key: Option<String>,
}

impl EntityContainer for Outcome {
    fn referenced_ids(&self) -> Vec<(EntityType, &str)> {
        vec![(EntityType::Match, &self.event_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingOffer {
    pub id: String,
    /// Owning outcome.
    pub outcome_id: String,
    pub provider_id: String,
    pub status_id: String,
    pub is_live: bool,
    /// The price. The field most frequently updated by the feed.
    pub odds: f64,
    pub is_available: bool,
    /// Epoch milliseconds of the last upstream change.
    pub last_changed_time: i64,
}

impl EntityContainer for BettingOffer {
    fn referenced_ids(&self) -> Vec<(EntityType, &str)> {
        vec![(EntityType::Outcome, &self.outcome_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub type_id: String,
    pub name: String,
    pub short_name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCategory {
    pub id: String,
    pub sport_id: String,
    pub sport_name: String,
    pub name: String,
    pub short_name: String,
    pub number_of_events: i64,
    pub number_of_live_events: i64,
    pub number_of_upcoming_matches: i64,
}

/// Pure join record: the many-to-many link between Market and Outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOutcomeRelation {
    pub id: String,
    pub market_id: String,
    pub outcome_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainMarket {
    pub id: String,
    pub sport_id: String,
    pub betting_type_id: String,
    pub event_part_id: String,
    pub betting_type_name: String,
    pub number_of_outcomes: Option<i64>,
    pub live_market: bool,
    pub outright: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    pub id: String,
    pub market_info: String,
    pub display_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextMatchesNumber {
    pub id: String,
    pub number_of_next_events: i64,
}

/// The stored representation: one live record of any concrete kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnyEntity {
    Sport(Sport),
    Match(Match),
    Market(Market),
    Outcome(Outcome),
    BettingOffer(BettingOffer),
    Location(Location),
    EventCategory(EventCategory),
    MarketOutcomeRelation(MarketOutcomeRelation),
    MainMarket(MainMarket),
    MarketInfo(MarketInfo),
    NextMatchesNumber(NextMatchesNumber),
}

impl AnyEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            AnyEntity::Sport(_) => EntityType::Sport,
            AnyEntity::Match(_) => EntityType::Match,
            AnyEntity::Market(_) => EntityType::Market,
            AnyEntity::Outcome(_) => EntityType::Outcome,
            AnyEntity::BettingOffer(_) => EntityType::BettingOffer,
            AnyEntity::Location(_) => EntityType::Location,
            AnyEntity::EventCategory(_) => EntityType::EventCategory,
            AnyEntity::MarketOutcomeRelation(_) => EntityType::MarketOutcomeRelation,
            AnyEntity::MainMarket(_) => EntityType::MainMarket,
            AnyEntity::MarketInfo(_) => EntityType::MarketInfo,
            AnyEntity::NextMatchesNumber(_) => EntityType::NextMatchesNumber,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AnyEntity::Sport(record) => &record.id,
            AnyEntity::Match(record) => &record.id,
            AnyEntity::Market(record) => &record.id,
            AnyEntity::Outcome(record) => &record.id,
            AnyEntity::BettingOffer(record) => &record.id,
            AnyEntity::Location(record) => &record.id,
            AnyEntity::EventCategory(record) => &record.id,
            AnyEntity::MarketOutcomeRelation(record) => &record.id,
            AnyEntity::MainMarket(record) => &record.id,
            AnyEntity::MarketInfo(record) => &record.id,
            AnyEntity::NextMatchesNumber(record) => &record.id,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type(), self.id())
    }
}

macro_rules! impl_entity {
    ($record:ident => $variant:ident) => {
        impl Entity for $record {
            const ENTITY_TYPE: EntityType = EntityType::$variant;

            fn id(&self) -> &str {
                &self.id
            }

            fn from_any(any: &AnyEntity) -> Option<&Self> {
                match any {
                    AnyEntity::$variant(record) => Some(record),
                    _ => None,
                }
            }

            fn into_any(self) -> AnyEntity {
                AnyEntity::$variant(self)
            }
        }

        impl From<$record> for AnyEntity {
            fn from(record: $record) -> Self {
                AnyEntity::$variant(record)
            }
        }
    };
}

impl_entity!(Sport => Sport);
impl_entity!(Match => Match);
impl_entity!(Market => Market);
impl_entity!(Outcome => Outcome);
impl_entity!(BettingOffer => BettingOffer);
impl_entity!(Location => Location);
impl_entity!(EventCategory => EventCategory);
impl_entity!(MarketOutcomeRelation => MarketOutcomeRelation);
impl_entity!(MainMarket => MainMarket);
impl_entity!(MarketInfo => MarketInfo);
impl_entity!(NextMatchesNumber => NextMatchesNumber);
