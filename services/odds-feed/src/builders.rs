//! Hierarchical builders
//!
//! Pure functions that reassemble a nested domain object from the flat store
//! by following foreign-key relations. Missing related entities degrade to
//! `None` fields or empty child collections; a builder never fails the whole
//! tree because one leaf is temporarily absent — related records can arrive
//! out of order on a streaming feed.

use chrono::{DateTime, TimeZone, Utc};

use types::entities;

use crate::domain;
use crate::store::EntityStore;

/// Assembles one nested domain object from a flat record and the store.
pub trait HierarchicalBuilder {
    type Flat: entities::Entity;
    type Output;

    fn build(flat: &Self::Flat, store: &EntityStore) -> Option<Self::Output>;
}

fn epoch_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

pub struct MatchBuilder;

impl HierarchicalBuilder for MatchBuilder {
    type Flat = entities::Match;
    type Output = domain::Match;

    fn build(flat: &entities::Match, store: &EntityStore) -> Option<domain::Match> {
        let sport = store
            .get::<entities::Sport>(&flat.sport_id)
            .and_then(|sport| SportBuilder::build(&sport, store));
        let venue = store
            .get::<entities::Location>(&flat.venue_id)
            .and_then(|venue| LocationBuilder::build(&venue, store));
        let category = store
            .get::<entities::EventCategory>(&flat.category_id)
            .and_then(|category| EventCategoryBuilder::build(&category, store));

        let markets = store
            .markets_for_event(&flat.id)
            .iter()
            .filter_map(|market| MarketBuilder::build(market, store))
            .collect();

        Some(domain::Match {
            id: flat.id.clone(),
            name: flat.name.clone(),
            short_name: flat.short_name.clone(),
            start_time: epoch_millis(flat.start_time),
            sport,
            venue,
            category,
            home_participant: domain::Participant {
                id: flat.home_participant_id.clone(),
                name: flat.home_participant_name.clone(),
            },
            away_participant: domain::Participant {
                id: flat.away_participant_id.clone(),
                name: flat.away_participant_name.clone(),
            },
            status: domain::MatchStatus {
                id: flat.status_id.clone(),
                name: flat.status_name.clone(),
            },
            markets,
            allows_live_odds: flat.allows_live_odds,
            number_of_markets: flat.number_of_markets,
            number_of_betting_offers: flat.number_of_betting_offers,
        })
    }
}

pub struct MarketBuilder;

impl HierarchicalBuilder for MarketBuilder {
    type Flat = entities::Market;
    type Output = domain::Market;

    fn build(flat: &entities::Market, store: &EntityStore) -> Option<domain::Market> {
        let outcomes = store
            .outcomes_for_market(&flat.id)
            .iter()
            .filter_map(|outcome| OutcomeBuilder::build(outcome, store))
            .collect();

        Some(domain::Market {
            id: flat.id.clone(),
            name: flat.name.clone(),
            short_name: flat.short_name.clone(),
            display_name: flat.display_name.clone(),
            betting_type: domain::BettingType {
                id: flat.betting_type_id.clone(),
                name: flat.betting_type_name.clone(),
                short_name: flat.short_betting_type_name.clone(),
            },
            outcomes,
            is_available: flat.is_available,
            is_main_line: flat.main_line,
            param_float1: flat.param_float1,
        })
    }
}

pub struct OutcomeBuilder;

impl HierarchicalBuilder for OutcomeBuilder {
    type Flat = entities::Outcome;
    type Output = domain::Outcome;

    fn build(flat: &entities::Outcome, store: &EntityStore) -> Option<domain::Outcome> {
        let betting_offers = store
            .offers_for_outcome(&flat.id)
            .iter()
            .filter_map(|offer| BettingOfferBuilder::build(offer, store))
            .collect();

        Some(domain::Outcome {
            id: flat.id.clone(),
            name: flat.translated_name.clone(),
            short_name: flat.short_translated_name.clone(),
            code: flat.code.clone(),
            betting_offers,
            header_name: flat.header_name.clone(),
            header_name_key: flat.header_name_key.clone(),
        })
    }
}

pub struct BettingOfferBuilder;

impl HierarchicalBuilder for BettingOfferBuilder {
    type Flat = entities::BettingOffer;
    type Output = domain::BettingOffer;

    fn build(flat: &entities::BettingOffer, _store: &EntityStore) -> Option<domain::BettingOffer> {
        Some(domain::BettingOffer {
            id: flat.id.clone(),
            odds: flat.odds,
            is_available: flat.is_available,
            is_live: flat.is_live,
            last_changed_time: epoch_millis(flat.last_changed_time),
            provider_id: flat.provider_id.clone(),
        })
    }
}

pub struct SportBuilder;

impl HierarchicalBuilder for SportBuilder {
    type Flat = entities::Sport;
    type Output = domain::Sport;

    fn build(flat: &entities::Sport, _store: &EntityStore) -> Option<domain::Sport> {
        Some(domain::Sport {
            id: flat.id.clone(),
            name: flat.name.clone(),
            short_name: flat.short_name.clone(),
            is_virtual: flat.is_virtual,
            number_of_events: flat.number_of_events,
            number_of_live_events: flat.number_of_live_events,
            number_of_upcoming_matches: flat.number_of_upcoming_matches,
            show_event_category: flat.show_event_category,
            is_top_sport: flat.is_top_sport,
        })
    }
}

pub struct LocationBuilder;

impl HierarchicalBuilder for LocationBuilder {
    type Flat = entities::Location;
    type Output = domain::Location;

    fn build(flat: &entities::Location, _store: &EntityStore) -> Option<domain::Location> {
        Some(domain::Location {
            id: flat.id.clone(),
            type_id: flat.type_id.clone(),
            name: flat.name.clone(),
            short_name: flat.short_name.clone(),
            code: flat.code.clone(),
        })
    }
}

pub struct EventCategoryBuilder;

impl HierarchicalBuilder for EventCategoryBuilder {
    type Flat = entities::EventCategory;
    type Output = domain::EventCategory;

    fn build(flat: &entities::EventCategory, _store: &EntityStore) -> Option<domain::EventCategory> {
        Some(domain::EventCategory {
            id: flat.id.clone(),
            sport_id: flat.sport_id.clone(),
            sport_name: flat.sport_name.clone(),
            name: flat.name.clone(),
            short_name: flat.short_name.clone(),
            number_of_events: flat.number_of_events,
            number_of_live_events: flat.number_of_live_events,
            number_of_upcoming_matches: flat.number_of_upcoming_matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use types::key::EntityType;
    use types::scalar::FieldValue;

    fn sport(id: &str) -> entities::Sport {
        entities::Sport {
            id: id.to_string(),
            name: "Football".to_string(),
            short_name: "FB".to_string(),
            is_virtual: false,
            number_of_events: 12,
            number_of_live_events: 3,
            number_of_upcoming_matches: 9,
            show_event_category: true,
            is_top_sport: true,
            parent_id: None,
        }
    }

    fn venue(id: &str) -> entities::Location {
        entities::Location {
            id: id.to_string(),
            type_id: "2".to_string(),
            name: "National Stadium".to_string(),
            short_name: "NST".to_string(),
            code: Some("NS".to_string()),
        }
    }

    fn category(id: &str, sport_id: &str) -> entities::EventCategory {
        entities::EventCategory {
            id: id.to_string(),
            sport_id: sport_id.to_string(),
            sport_name: "Football".to_string(),
            name: "Premier League".to_string(),
            short_name: "PL".to_string(),
            number_of_events: 10,
            number_of_live_events: 2,
            number_of_upcoming_matches: 8,
        }
    }

    fn game(id: &str, sport_id: &str, venue_id: &str, category_id: &str) -> entities::Match {
        entities::Match {
            id: id.to_string(),
            sport_id: sport_id.to_string(),
            venue_id: venue_id.to_string(),
            category_id: category_id.to_string(),
            name: "Home FC vs Away FC".to_string(),
            short_name: "HOM v AWY".to_string(),
            start_time: 1_754_560_800_000,
            status_id: "1".to_string(),
            status_name: "Not started".to_string(),
            home_participant_id: "H1".to_string(),
            home_participant_name: "Home FC".to_string(),
            away_participant_id: "A1".to_string(),
            away_participant_name: "Away FC".to_string(),
            allows_live_odds: true,
            number_of_markets: 1,
            number_of_betting_offers: 1,
        }
    }

    fn market(id: &str, event_id: &str) -> entities::Market {
        entities::Market {
            id: id.to_string(),
            event_id: event_id.to_string(),
            name: "Match Winner".to_string(),
            short_name: "1X2".to_string(),
            display_name: Some("Match Winner".to_string()),
            betting_type_id: "BT1".to_string(),
            betting_type_name: "Three Way".to_string(),
            short_betting_type_name: "3W".to_string(),
            number_of_outcomes: 3,
            is_available: true,
            main_line: true,
            is_closed: false,
            param_float1: None,
        }
    }

    fn outcome(id: &str, event_id: &str) -> entities::Outcome {
        entities::Outcome {
            id: id.to_string(),
            event_id: event_id.to_string(),
            code: "HOME".to_string(),
            translated_name: "Home FC".to_string(),
            short_translated_name: Some("Home".to_string()),
            status_id: "1".to_string(),
            header_name: None,
            header_name_key: None,
        }
    }

    fn relation(id: &str, market_id: &str, outcome_id: &str) -> entities::MarketOutcomeRelation {
        entities::MarketOutcomeRelation {
            id: id.to_string(),
            market_id: market_id.to_string(),
            outcome_id: outcome_id.to_string(),
        }
    }

    fn offer(id: &str, outcome_id: &str, odds: f64) -> entities::BettingOffer {
        entities::BettingOffer {
            id: id.to_string(),
            outcome_id: outcome_id.to_string(),
            provider_id: "P1".to_string(),
            status_id: "1".to_string(),
            is_live: false,
            odds,
            is_available: true,
            last_changed_time: 1_754_000_000_000,
        }
    }

    fn seeded_store() -> EntityStore {
        let store = EntityStore::new();
        store.store(sport("S1"));
        store.store(venue("L1"));
        store.store(category("C1", "S1"));
        store.store(game("M1", "S1", "L1", "C1"));
        store.store(market("MK1", "M1"));
        store.store(outcome("O1", "M1"));
        store.store(relation("R1", "MK1", "O1"));
        store.store(offer("B1", "O1", 1.85));
        store
    }

    #[test]
    fn test_full_tree_assembly() {
        let store = seeded_store();
        let flat = store.get::<entities::Match>("M1").unwrap();
        let tree = MatchBuilder::build(&flat, &store).unwrap();

        assert_eq!(tree.id, "M1");
        assert_eq!(tree.sport.as_ref().unwrap().name, "Football");
        assert_eq!(tree.venue.as_ref().unwrap().short_name, "NST");
        assert_eq!(tree.category.as_ref().unwrap().name, "Premier League");
        assert_eq!(tree.home_participant.name, "Home FC");
        assert_eq!(tree.status.name, "Not started");
        assert_eq!(
            tree.start_time,
            Utc.timestamp_millis_opt(1_754_560_800_000).single().unwrap()
        );

        assert_eq!(tree.markets.len(), 1);
        let market = &tree.markets[0];
        assert_eq!(market.id, "MK1");
        assert_eq!(market.betting_type.short_name, "3W");
        assert_eq!(market.outcomes.len(), 1);
        let outcome = &market.outcomes[0];
        assert_eq!(outcome.id, "O1");
        assert_eq!(outcome.betting_offers.len(), 1);
        assert_eq!(outcome.betting_offers[0].odds, 1.85);
    }

    #[test]
    fn test_missing_references_degrade_to_none() {
        let store = EntityStore::new();
        store.store(game("M1", "S404", "L404", "C404"));
        let flat = store.get::<entities::Match>("M1").unwrap();
        let tree = MatchBuilder::build(&flat, &store).unwrap();
        assert!(tree.sport.is_none());
        assert!(tree.venue.is_none());
        assert!(tree.category.is_none());
        assert!(tree.markets.is_empty());
    }

    #[test]
    fn test_outcome_without_relation_is_excluded() {
        let store = seeded_store();
        // A second outcome for the match with no join record to MK1.
        store.store(outcome("O2", "M1"));
        let flat = store.get::<entities::Market>("MK1").unwrap();
        let market = MarketBuilder::build(&flat, &store).unwrap();
        assert_eq!(market.outcomes.len(), 1);
        assert_eq!(market.outcomes[0].id, "O1");
    }

    #[test]
    fn test_no_cross_contamination_between_matches() {
        let store = seeded_store();
        store.store(game("M2", "S1", "L1", "C1"));
        store.store(market("MK2", "M2"));
        store.store(outcome("O2", "M2"));
        store.store(relation("R2", "MK2", "O2"));
        store.store(offer("B2", "O2", 3.40));

        let first = MatchBuilder::build(&store.get::<entities::Match>("M1").unwrap(), &store).unwrap();
        let second = MatchBuilder::build(&store.get::<entities::Match>("M2").unwrap(), &store).unwrap();

        let first_market_ids: Vec<&str> = first.markets.iter().map(|m| m.id.as_str()).collect();
        let second_market_ids: Vec<&str> = second.markets.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(first_market_ids, vec!["MK1"]);
        assert_eq!(second_market_ids, vec!["MK2"]);
        assert_eq!(second.markets[0].outcomes[0].betting_offers[0].odds, 3.40);
    }

    #[test]
    fn test_rebuild_reflects_patched_odds() {
        let store = seeded_store();
        let changes = [("odds".to_string(), FieldValue::Float(2.10))]
            .into_iter()
            .collect();
        store.update_entity(EntityType::BettingOffer, "B1", &changes);

        let flat = store.get::<entities::Match>("M1").unwrap();
        let tree = MatchBuilder::build(&flat, &store).unwrap();
        let offer = &tree.markets[0].outcomes[0].betting_offers[0];
        assert_eq!(offer.odds, 2.10);
        assert!(offer.is_available);
        assert_eq!(offer.provider_id, "P1");
    }
}
