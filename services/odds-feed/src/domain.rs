//! Nested domain objects
//!
//! What consumers render: a Match carrying its Markets, each Market its
//! Outcomes, each Outcome its Betting Offers. These are derived, ephemeral
//! values — never stored, always rebuilt from the flat store at request
//! time, with no identity or lifecycle of their own.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
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
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub type_id: String,
    pub name: String,
    pub short_name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
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

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchStatus {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub start_time: DateTime<Utc>,
    /// Absent when the referenced record has not arrived yet.
    pub sport: Option<Sport>,
    pub venue: Option<Location>,
    pub category: Option<EventCategory>,
    pub home_participant: Participant,
    pub away_participant: Participant,
    pub status: MatchStatus,
    pub markets: Vec<Market>,
    pub allows_live_odds: bool,
    pub number_of_markets: i64,
    pub number_of_betting_offers: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BettingType {
    pub id: String,
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub display_name: Option<String>,
    pub betting_type: BettingType,
    pub outcomes: Vec<Outcome>,
    pub is_available: bool,
    pub is_main_line: bool,
    pub param_float1: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub id: String,
    pub name: String,
    pub short_name: Option<String>,
    pub code: String,
    pub betting_offers: Vec<BettingOffer>,
    pub header_name: Option<String>,
    pub header_name_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BettingOffer {
    pub id: String,
    pub odds: f64,
    pub is_available: bool,
    pub is_live: bool,
    pub last_changed_time: DateTime<Utc>,
    pub provider_id: String,
}
