//! Incrementally maintained relation indices
//!
//! The builders walk Match → Market → Outcome → BettingOffer through foreign
//! keys. Instead of scanning a whole type-partition per lookup, the store
//! keeps these indices current on every write:
//! - `eventId → market ids`
//! - `marketId → outcome ids` (through MarketOutcomeRelation join records)
//! - `outcomeId → betting offer ids`
//!
//! `BTreeMap`/`BTreeSet` keep iteration order deterministic.

use std::collections::{BTreeMap, BTreeSet};

use types::entities::AnyEntity;

type IdIndex = BTreeMap<String, BTreeSet<String>>;

fn link(index: &mut IdIndex, owner: &str, member: &str) {
    index
        .entry(owner.to_string())
        .or_default()
        .insert(member.to_string());
}

fn unlink(index: &mut IdIndex, owner: &str, member: &str) {
    if let Some(members) = index.get_mut(owner) {
        members.remove(member);
        if members.is_empty() {
            index.remove(owner);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    markets_by_event: IdIndex,
    outcomes_by_market: IdIndex,
    offers_by_outcome: IdIndex,
    /// relation id → (marketId, outcomeId), so a replaced or deleted join
    /// record can drop exactly the link it created.
    relation_targets: BTreeMap<String, (String, String)>,
}

impl RelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a stored record. `previous` is the record being replaced under
    /// the same key, if any; its links are dropped first so a changed
    /// foreign key moves the record instead of duplicating it.
    pub fn apply(&mut self, previous: Option<&AnyEntity>, current: &AnyEntity) {
        if let Some(previous) = previous {
            self.remove(previous);
        }
        match current {
            AnyEntity::Market(market) => link(&mut self.markets_by_event, &market.event_id, &market.id),
            AnyEntity::BettingOffer(offer) => {
                link(&mut self.offers_by_outcome, &offer.outcome_id, &offer.id)
            }
            AnyEntity::MarketOutcomeRelation(relation) => {
                link(
                    &mut self.outcomes_by_market,
                    &relation.market_id,
                    &relation.outcome_id,
                );
                self.relation_targets.insert(
                    relation.id.clone(),
                    (relation.market_id.clone(), relation.outcome_id.clone()),
                );
            }
            _ => {}
        }
    }

    /// Drop a removed record's links.
    pub fn remove(&mut self, entity: &AnyEntity) {
        match entity {
            AnyEntity::Market(market) => {
                unlink(&mut self.markets_by_event, &market.event_id, &market.id)
            }
            AnyEntity::BettingOffer(offer) => {
                unlink(&mut self.offers_by_outcome, &offer.outcome_id, &offer.id)
            }
            AnyEntity::MarketOutcomeRelation(relation) => {
                if let Some((market_id, outcome_id)) = self.relation_targets.remove(&relation.id) {
                    unlink(&mut self.outcomes_by_market, &market_id, &outcome_id);
                }
            }
            _ => {}
        }
    }

    /// Market ids owned by a match, sorted.
    pub fn markets_for_event(&self, event_id: &str) -> Vec<String> {
        self.markets_by_event
            .get(event_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Outcome ids related to a market through join records, sorted.
    pub fn outcomes_for_market(&self, market_id: &str) -> Vec<String> {
        self.outcomes_by_market
            .get(market_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Betting offer ids priced against an outcome, sorted.
    pub fn offers_for_outcome(&self, outcome_id: &str) -> Vec<String> {
        self.offers_by_outcome
            .get(outcome_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.markets_by_event.clear();
        self.outcomes_by_market.clear();
        self.offers_by_outcome.clear();
        self.relation_targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::entities::{BettingOffer, Entity, Market, MarketOutcomeRelation};

    fn market(id: &str, event_id: &str) -> AnyEntity {
        Market {
            id: id.to_string(),
            event_id: event_id.to_string(),
            name: "Match Winner".to_string(),
            short_name: "1X2".to_string(),
            display_name: None,
            betting_type_id: "BT1".to_string(),
            betting_type_name: "Three Way".to_string(),
            short_betting_type_name: "3W".to_string(),
            number_of_outcomes: 3,
            is_available: true,
            main_line: true,
            is_closed: false,
            param_float1: None,
        }
        .into_any()
    }

    fn offer(id: &str, outcome_id: &str) -> AnyEntity {
        BettingOffer {
            id: id.to_string(),
            outcome_id: outcome_id.to_string(),
            provider_id: "P1".to_string(),
            status_id: "1".to_string(),
            is_live: false,
            odds: 1.85,
            is_available: true,
            last_changed_time: 0,
        }
        .into_any()
    }

    fn relation(id: &str, market_id: &str, outcome_id: &str) -> AnyEntity {
        MarketOutcomeRelation {
            id: id.to_string(),
            market_id: market_id.to_string(),
            outcome_id: outcome_id.to_string(),
        }
        .into_any()
    }

    #[test]
    fn test_market_links_to_event() {
        let mut index = RelationIndex::new();
        index.apply(None, &market("MK2", "M1"));
        index.apply(None, &market("MK1", "M1"));
        index.apply(None, &market("MK3", "M2"));
        assert_eq!(index.markets_for_event("M1"), vec!["MK1", "MK2"]);
        assert_eq!(index.markets_for_event("M2"), vec!["MK3"]);
        assert!(index.markets_for_event("M9").is_empty());
    }

    #[test]
    fn test_replace_moves_changed_foreign_key() {
        let mut index = RelationIndex::new();
        let old = market("MK1", "M1");
        index.apply(None, &old);
        index.apply(Some(&old), &market("MK1", "M2"));
        assert!(index.markets_for_event("M1").is_empty());
        assert_eq!(index.markets_for_event("M2"), vec!["MK1"]);
    }

    #[test]
    fn test_relation_records_join_outcomes() {
        let mut index = RelationIndex::new();
        index.apply(None, &relation("R1", "MK1", "O1"));
        index.apply(None, &relation("R2", "MK1", "O2"));
        assert_eq!(index.outcomes_for_market("MK1"), vec!["O1", "O2"]);

        index.remove(&relation("R1", "MK1", "O1"));
        assert_eq!(index.outcomes_for_market("MK1"), vec!["O2"]);
    }

    #[test]
    fn test_relation_replace_retargets_link() {
        let mut index = RelationIndex::new();
        let old = relation("R1", "MK1", "O1");
        index.apply(None, &old);
        index.apply(Some(&old), &relation("R1", "MK1", "O9"));
        assert_eq!(index.outcomes_for_market("MK1"), vec!["O9"]);
    }

    #[test]
    fn test_offer_removal_prunes_empty_buckets() {
        let mut index = RelationIndex::new();
        index.apply(None, &offer("B1", "O1"));
        assert_eq!(index.offers_for_outcome("O1"), vec!["B1"]);
        index.remove(&offer("B1", "O1"));
        assert!(index.offers_for_outcome("O1").is_empty());
    }

    #[test]
    fn test_clear() {
        let mut index = RelationIndex::new();
        index.apply(None, &market("MK1", "M1"));
        index.apply(None, &offer("B1", "O1"));
        index.clear();
        assert!(index.markets_for_event("M1").is_empty());
        assert!(index.offers_for_outcome("O1").is_empty());
    }
}
