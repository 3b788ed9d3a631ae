//! Partial-update merge engine
//!
//! Applies a changed-field map onto an existing immutable record, producing a
//! new record of the same concrete type with those fields overwritten and all
//! other fields preserved. Each record type carries an explicit field table
//! (wire name → typed setter); a field name the table does not list is
//! rejected, as is a value that does not fit the field's type. Integer
//! scalars widen onto float-typed fields, so a feed that emits odds as bare
//! integers still patches cleanly.

use types::entities::{
    AnyEntity, BettingOffer, EventCategory, Location, MainMarket, Market, MarketInfo,
    MarketOutcomeRelation, Match, NextMatchesNumber, Outcome, Sport,
};
use types::errors::PatchError;
use types::scalar::{ChangeSet, FieldValue};

/// Structural copy with a patch applied.
pub trait ApplyPatch: Sized {
    fn apply_patch(&self, changes: &ChangeSet) -> Result<Self, PatchError>;
}

fn mismatch(field: &str, expected: &'static str, value: &FieldValue) -> PatchError {
    PatchError::TypeMismatch {
        field: field.to_string(),
        expected,
        value: value.to_json().to_string(),
    }
}

fn text(field: &str, value: &FieldValue) -> Result<String, PatchError> {
    value
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| mismatch(field, "string", value))
}

fn opt_text(field: &str, value: &FieldValue) -> Result<Option<String>, PatchError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_text()
        .map(|s| Some(s.to_string()))
        .ok_or_else(|| mismatch(field, "string or null", value))
}

fn int(field: &str, value: &FieldValue) -> Result<i64, PatchError> {
    value.as_int().ok_or_else(|| mismatch(field, "integer", value))
}

fn opt_int(field: &str, value: &FieldValue) -> Result<Option<i64>, PatchError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_int()
        .map(Some)
        .ok_or_else(|| mismatch(field, "integer or null", value))
}

fn float(field: &str, value: &FieldValue) -> Result<f64, PatchError> {
    value.as_float().ok_or_else(|| mismatch(field, "float", value))
}

fn opt_float(field: &str, value: &FieldValue) -> Result<Option<f64>, PatchError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_float()
        .map(Some)
        .ok_or_else(|| mismatch(field, "float or null", value))
}

fn boolean(field: &str, value: &FieldValue) -> Result<bool, PatchError> {
    value.as_bool().ok_or_else(|| mismatch(field, "boolean", value))
}

/// Generates the `ApplyPatch` impl from a wire-name → field table.
///
/// `id` is deliberately absent from every table: the identity of a record is
/// carried by the change record's own key, never patched.
macro_rules! impl_apply_patch {
    ($record:ty, $tag:literal, { $($wire:literal => $field:ident : $kind:ident),+ $(,)? }) => {
        impl ApplyPatch for $record {
            fn apply_patch(&self, changes: &ChangeSet) -> Result<Self, PatchError> {
                let mut updated = self.clone();
                for (field, value) in changes {
                    match field.as_str() {
                        $( $wire => updated.$field = $kind(field, value)?, )+
                        _ => {
                            return Err(PatchError::UnknownField {
                                entity_type: $tag.to_string(),
                                field: field.clone(),
                            })
                        }
                    }
                }
                Ok(updated)
            }
        }
    };
}

impl_apply_patch!(Sport, "SPORT", {
    "name" => name: text,
    "shortName" => short_name: text,
    "isVirtual" => is_virtual: boolean,
    "numberOfEvents" => number_of_events: int,
    "numberOfLiveEvents" => number_of_live_events: int,
    "numberOfUpcomingMatches" => number_of_upcoming_matches: int,
    "showEventCategory" => show_event_category: boolean,
    "isTopSport" => is_top_sport: boolean,
    "parentId" => parent_id: opt_text,
});

impl_apply_patch!(Match, "MATCH", {
    "sportId" => sport_id: text,
    "venueId" => venue_id: text,
    "categoryId" => category_id: text,
    "name" => name: text,
    "shortName" => short_name: text,
    "startTime" => start_time: int,
    "statusId" => status_id: text,
    "statusName" => status_name: text,
    "homeParticipantId" => home_participant_id: text,
    "homeParticipantName" => home_participant_name: text,
    "awayParticipantId" => away_participant_id: text,
    "awayParticipantName" => away_participant_name: text,
    "allowsLiveOdds" => allows_live_odds: boolean,
    "numberOfMarkets" => number_of_markets: int,
    "numberOfBettingOffers" => number_of_betting_offers: int,
});

impl_apply_patch!(Market, "MARKET", {
    "eventId" => event_id: text,
    "name" => name: text,
    "shortName" => short_name: text,
    "displayName" => display_name: opt_text,
    "bettingTypeId" => betting_type_id: text,
    "bettingTypeName" => betting_type_name: text,
    "shortBettingTypeName" => short_betting_type_name: text,
    "numberOfOutcomes" => number_of_outcomes: int,
    "isAvailable" => is_available: boolean,
    "mainLine" => main_line: boolean,
    "isClosed" => is_closed: boolean,
    "paramFloat1" => param_float1: opt_float,
});

impl_apply_patch!(Outcome, "OUTCOME", {
    "eventId" => event_id: text,
    "code" => code: text,
    "translatedName" => translated_name: text,
    "shortTranslatedName" => short_translated_name: opt_text,
    "statusId" => status_id: text,
    "headerName" => header_name: opt_text,
    "headerNameKey" => header_name_key: opt_text,
});

impl_apply_patch!(BettingOffer, "BETTING_OFFER", {
    "outcomeId" => outcome_id: text,
    "providerId" => provider_id: text,
    "statusId" => status_id: text,
    "isLive" => is_live: boolean,
    "odds" => odds: float,
    "isAvailable" => is_available: boolean,
    "lastChangedTime" => last_changed_time: int,
});

impl_apply_patch!(Location, "LOCATION", {
    "typeId" => type_id: text,
    "name" => name: text,
    "shortName" => short_name: text,
    "code" => code: opt_text,
});

impl_apply_patch!(EventCategory, "EVENT_CATEGORY", {
    "sportId" => sport_id: text,
    "sportName" => sport_name: text,
    "name" => name: text,
    "shortName" => short_name: text,
    "numberOfEvents" => number_of_events: int,
    "numberOfLiveEvents" => number_of_live_events: int,
    "numberOfUpcomingMatches" => number_of_upcoming_matches: int,
});

impl_apply_patch!(MarketOutcomeRelation, "MARKET_OUTCOME_RELATION", {
    "marketId" => market_id: text,
    "outcomeId" => outcome_id: text,
});

impl_apply_patch!(MainMarket, "MAIN_MARKET", {
    "sportId" => sport_id: text,
    "bettingTypeId" => betting_type_id: text,
    "eventPartId" => event_part_id: text,
    "bettingTypeName" => betting_type_name: text,
    "numberOfOutcomes" => number_of_outcomes: opt_int,
    "liveMarket" => live_market: boolean,
    "outright" => outright: boolean,
});

impl_apply_patch!(MarketInfo, "MARKET_INFO", {
    "marketInfo" => market_info: text,
    "displayKey" => display_key: text,
});

impl_apply_patch!(NextMatchesNumber, "NEXT_MATCHES_NUMBER", {
    "numberOfNextEvents" => number_of_next_events: int,
});

/// Apply a patch to a stored record of any kind.
pub fn apply_change(entity: &AnyEntity, changes: &ChangeSet) -> Result<AnyEntity, PatchError> {
    match entity {
        AnyEntity::Sport(record) => record.apply_patch(changes).map(AnyEntity::Sport),
        AnyEntity::Match(record) => record.apply_patch(changes).map(AnyEntity::Match),
        AnyEntity::Market(record) => record.apply_patch(changes).map(AnyEntity::Market),
        AnyEntity::Outcome(record) => record.apply_patch(changes).map(AnyEntity::Outcome),
        AnyEntity::BettingOffer(record) => record.apply_patch(changes).map(AnyEntity::BettingOffer),
        AnyEntity::Location(record) => record.apply_patch(changes).map(AnyEntity::Location),
        AnyEntity::EventCategory(record) => record.apply_patch(changes).map(AnyEntity::EventCategory),
        AnyEntity::MarketOutcomeRelation(record) => record
            .apply_patch(changes)
            .map(AnyEntity::MarketOutcomeRelation),
        AnyEntity::MainMarket(record) => record.apply_patch(changes).map(AnyEntity::MainMarket),
        AnyEntity::MarketInfo(record) => record.apply_patch(changes).map(AnyEntity::MarketInfo),
        AnyEntity::NextMatchesNumber(record) => record
            .apply_patch(changes)
            .map(AnyEntity::NextMatchesNumber),
    }
}
