//! Concurrent entity store
//!
//! The single source of truth for live feed entities: one table keyed by
//! `EntityKey`, plus the per-key publisher registry behind the observation
//! API. All shared state sits behind one `RwLock` (exclusive writes,
//! concurrent reads); writes to the same key apply in submission order, and
//! publication happens only after the table mutation is committed.
//!
//! Observation uses one `tokio::sync::watch` channel per observed key: a new
//! subscription immediately replays the current value (`None` if the entity
//! is absent) and then yields on every subsequent store/update/delete of
//! that exact key. Slow consumers see the latest value rather than every
//! intermediate one.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error};

use types::entities::{AnyEntity, BettingOffer, Entity, Market, Match, Outcome};
use types::key::{EntityKey, EntityType};
use types::scalar::ChangeSet;

use crate::index::RelationIndex;
use crate::patch::apply_change;

#[derive(Default)]
struct StoreInner {
    entities: HashMap<EntityKey, AnyEntity>,
    /// First-insertion order per kind; replacing an id keeps its slot.
    order: HashMap<EntityType, Vec<String>>,
    index: RelationIndex,
    publishers: HashMap<EntityKey, watch::Sender<Option<AnyEntity>>>,
}

impl StoreInner {
    /// Insert-or-replace one record, maintain order and indices, publish.
    fn commit(&mut self, entity: AnyEntity) {
        let key = entity.key();
        let previous = self.entities.insert(key.clone(), entity.clone());
        self.index.apply(previous.as_ref(), &entity);
        if previous.is_none() {
            self.order
                .entry(key.entity_type)
                .or_default()
                .push(key.id.clone());
        }
        if let Some(publisher) = self.publishers.get(&key) {
            publisher.send_replace(Some(entity));
        }
    }

    fn publish_deletion(&self, key: &EntityKey) {
        if let Some(publisher) = self.publishers.get(key) {
            publisher.send_replace(None);
        }
    }
}

/// Authoritative, concurrently-accessible table of all live entities.
///
/// Cheap to clone; clones share state. Constructed explicitly and passed to
/// every consumer — its lifetime is owned by the session that created it.
#[derive(Clone, Default)]
pub struct EntityStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-or-replace by (type, id). Publishes the new value to any
    /// active observer of that key.
    pub fn store<T: Entity>(&self, entity: T) {
        self.store_any(entity.into_any());
    }

    /// Bulk insert under one exclusive section, preserving batch order.
    pub fn store_many<T: Entity>(&self, entities: impl IntoIterator<Item = T>) {
        if let Ok(mut inner) = self.inner.write() {
            for entity in entities {
                inner.commit(entity.into_any());
            }
        }
    }

    pub fn store_any(&self, entity: AnyEntity) {
        if let Ok(mut inner) = self.inner.write() {
            inner.commit(entity);
        }
    }

    /// Synchronous point lookup.
    pub fn get<T: Entity>(&self, id: &str) -> Option<T> {
        let inner = self.inner.read().ok()?;
        let key = EntityKey::new(T::ENTITY_TYPE, id);
        inner.entities.get(&key).and_then(T::from_any).cloned()
    }

    pub fn get_any(&self, entity_type: EntityType, id: &str) -> Option<AnyEntity> {
        let inner = self.inner.read().ok()?;
        inner.entities.get(&EntityKey::new(entity_type, id)).cloned()
    }

    /// All records of one kind, in first-insertion order.
    pub fn get_all<T: Entity>(&self) -> Vec<T> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        let Some(order) = inner.order.get(&T::ENTITY_TYPE) else {
            return Vec::new();
        };
        order
            .iter()
            .filter_map(|id| {
                let key = EntityKey::new(T::ENTITY_TYPE, id.as_str());
                inner.entities.get(&key).and_then(T::from_any).cloned()
            })
            .collect()
    }

    /// Look up the target, run the merge engine, replace and publish.
    ///
    /// A missing target or a failed merge leaves the store untouched and
    /// publishes nothing; neither is an error to the caller.
    pub fn update_entity(&self, entity_type: EntityType, id: &str, changes: &ChangeSet) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        let key = EntityKey::new(entity_type, id);
        let Some(existing) = inner.entities.get(&key) else {
            debug!(%key, "update for missing entity dropped");
            return;
        };
        match apply_change(existing, changes) {
            Ok(updated) => {
                if entity_type == EntityType::BettingOffer {
                    if let Some(odds) = changes.get("odds") {
                        debug!(id, ?odds, "betting offer odds updated");
                    }
                }
                inner.commit(updated);
            }
            Err(err) => error!(%key, %err, "merge failed, keeping prior value"),
        }
    }

    /// Remove the entry and publish a deletion (`None`) to observers.
    pub fn delete_entity(&self, entity_type: EntityType, id: &str) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        let key = EntityKey::new(entity_type, id);
        let Some(removed) = inner.entities.remove(&key) else {
            return;
        };
        inner.index.remove(&removed);
        if let Some(order) = inner.order.get_mut(&entity_type) {
            order.retain(|other| other != id);
        }
        inner.publish_deletion(&key);
        debug!(%key, "entity deleted");
    }

    /// Empty the whole table. Existing observers are not notified; their
    /// channels stay registered and keep their last value.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.entities.clear();
            inner.order.clear();
            inner.index.clear();
        }
    }

    /// Observe one (type, id): replays the current value immediately, then
    /// yields on every subsequent change to that exact key.
    pub fn observe_entity<T: Entity>(&self, id: &str) -> impl Stream<Item = Option<T>> + Send + Unpin {
        let receiver = self.subscribe(EntityKey::new(T::ENTITY_TYPE, id));
        WatchStream::new(receiver).map(|value| value.and_then(|any| T::from_any(&any).cloned()))
    }

    pub fn observe_match(&self, id: &str) -> impl Stream<Item = Option<Match>> + Send + Unpin {
        self.observe_entity::<Match>(id)
    }

    pub fn observe_market(&self, id: &str) -> impl Stream<Item = Option<Market>> + Send + Unpin {
        debug!(id, "subscribing to market");
        self.observe_entity::<Market>(id)
    }

    pub fn observe_outcome(&self, id: &str) -> impl Stream<Item = Option<Outcome>> + Send + Unpin {
        debug!(id, "subscribing to outcome");
        self.observe_entity::<Outcome>(id)
    }

    pub fn observe_betting_offer(
        &self,
        id: &str,
    ) -> impl Stream<Item = Option<BettingOffer>> + Send + Unpin {
        debug!(id, "subscribing to betting offer");
        self.observe_entity::<BettingOffer>(id)
    }

    fn subscribe(&self, key: EntityKey) -> watch::Receiver<Option<AnyEntity>> {
        let Ok(mut inner) = self.inner.write() else {
            // Poisoned store: hand back a closed channel holding no value.
            let (_publisher, receiver) = watch::channel(None);
            return receiver;
        };
        if let Some(publisher) = inner.publishers.get(&key) {
            return publisher.subscribe();
        }
        let current = inner.entities.get(&key).cloned();
        if current.is_none() {
            debug!(%key, "observe on absent entity, subscription created anyway");
        }
        let (publisher, receiver) = watch::channel(current);
        inner.publishers.insert(key, publisher);
        receiver
    }

    /// Markets owned by a match, sorted by id.
    pub fn markets_for_event(&self, event_id: &str) -> Vec<Market> {
        self.resolve_related(|inner| inner.index.markets_for_event(event_id))
    }

    /// Outcomes related to a market through join records, sorted by id.
    pub fn outcomes_for_market(&self, market_id: &str) -> Vec<Outcome> {
        self.resolve_related(|inner| inner.index.outcomes_for_market(market_id))
    }

    /// Betting offers priced against an outcome, sorted by id.
    pub fn offers_for_outcome(&self, outcome_id: &str) -> Vec<BettingOffer> {
        self.resolve_related(|inner| inner.index.offers_for_outcome(outcome_id))
    }

    fn resolve_related<T: Entity>(&self, ids: impl FnOnce(&StoreInner) -> Vec<String>) -> Vec<T> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        ids(&inner)
            .iter()
            .filter_map(|id| {
                let key = EntityKey::new(T::ENTITY_TYPE, id.as_str());
                inner.entities.get(&key).and_then(T::from_any).cloned()
            })
            .collect()
    }

    /// Total live entities across all kinds.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.entities.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entities of one kind.
    pub fn count(&self, entity_type: EntityType) -> usize {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.order.get(&entity_type).map(Vec::len))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use types::scalar::FieldValue;

    fn offer(id: &str, outcome_id: &str, odds: f64) -> BettingOffer {
        BettingOffer {
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

    fn odds_change(odds: f64) -> ChangeSet {
        [("odds".to_string(), FieldValue::Float(odds))]
            .into_iter()
            .collect()
    }

    /// Polls the stream briefly; `None` means nothing was emitted.
    async fn try_next<T>(stream: &mut (impl Stream<Item = T> + Unpin)) -> Option<T> {
        tokio::time::timeout(Duration::from_millis(20), stream.next())
            .await
            .ok()
            .flatten()
    }

    #[test]
    fn test_store_then_get_same_context() {
        let store = EntityStore::new();
        let original = offer("B1", "O1", 1.85);
        store.store(original.clone());
        assert_eq!(store.get::<BettingOffer>("B1"), Some(original));
    }

    #[test]
    fn test_replace_is_total_never_a_merge() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        let replacement = offer("B1", "O2", 9.99);
        store.store(replacement.clone());
        assert_eq!(store.get::<BettingOffer>("B1"), Some(replacement));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_type_partitions_are_isolated() {
        let store = EntityStore::new();
        store.store(offer("X", "O1", 1.85));
        assert_eq!(store.get::<Outcome>("X"), None);
        assert_eq!(store.count(EntityType::BettingOffer), 1);
        assert_eq!(store.count(EntityType::Outcome), 0);
    }

    #[test]
    fn test_get_all_keeps_first_insertion_order() {
        let store = EntityStore::new();
        store.store(offer("B2", "O1", 1.1));
        store.store(offer("B1", "O1", 1.2));
        store.store(offer("B3", "O1", 1.3));
        // Replacing B2 must not move it.
        store.store(offer("B2", "O1", 9.9));
        let ids: Vec<String> = store
            .get_all::<BettingOffer>()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["B2", "B1", "B3"]);
    }

    #[test]
    fn test_update_entity_patches_in_place() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        store.update_entity(EntityType::BettingOffer, "B1", &odds_change(2.10));
        let updated = store.get::<BettingOffer>("B1").unwrap();
        assert_eq!(updated.odds, 2.10);
        assert_eq!(updated.outcome_id, "O1");
        assert_eq!(updated.provider_id, "P1");
        assert!(updated.is_available);
    }

    #[test]
    fn test_update_missing_entity_is_noop() {
        let store = EntityStore::new();
        store.update_entity(EntityType::BettingOffer, "B404", &odds_change(2.10));
        assert_eq!(store.get::<BettingOffer>("B404"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_merge_keeps_prior_value() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        let bad: ChangeSet = [("margin".to_string(), FieldValue::Float(0.05))]
            .into_iter()
            .collect();
        store.update_entity(EntityType::BettingOffer, "B1", &bad);
        assert_eq!(store.get::<BettingOffer>("B1").unwrap().odds, 1.85);
    }

    #[test]
    fn test_delete_then_get_returns_none() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        store.delete_entity(EntityType::BettingOffer, "B1");
        assert_eq!(store.get::<BettingOffer>("B1"), None);
        assert!(store.get_all::<BettingOffer>().is_empty());
    }

    #[test]
    fn test_relation_queries_follow_replacements() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        store.store(offer("B2", "O1", 2.05));
        assert_eq!(
            store
                .offers_for_outcome("O1")
                .iter()
                .map(|o| o.id.as_str())
                .collect::<Vec<_>>(),
            vec!["B1", "B2"]
        );
        // Moving B2 to another outcome drops it from O1.
        store.store(offer("B2", "O9", 2.05));
        assert_eq!(
            store
                .offers_for_outcome("O1")
                .iter()
                .map(|o| o.id.as_str())
                .collect::<Vec<_>>(),
            vec!["B1"]
        );
        assert_eq!(store.offers_for_outcome("O9").len(), 1);
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let store = EntityStore::new();
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.store(offer(&format!("B{worker}-{i}"), "O1", 1.5));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 400);
        assert_eq!(store.offers_for_outcome("O1").len(), 400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_before_store_replays_none_first() {
        let store = EntityStore::new();
        let mut stream = store.observe_betting_offer("B1");
        assert_eq!(try_next(&mut stream).await, Some(None));

        let stored = offer("B1", "O1", 1.85);
        store.store(stored.clone());
        assert_eq!(try_next(&mut stream).await, Some(Some(stored)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_after_store_replays_current_value() {
        let store = EntityStore::new();
        let stored = offer("B1", "O1", 1.85);
        store.store(stored.clone());

        let mut stream = store.observe_betting_offer("B1");
        assert_eq!(try_next(&mut stream).await, Some(Some(stored)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_emits_only_for_its_exact_key() {
        let store = EntityStore::new();
        let mut stream = store.observe_betting_offer("B1");
        assert_eq!(try_next(&mut stream).await, Some(None));

        // Writes to other keys must not surface here.
        store.store(offer("B2", "O1", 3.0));
        assert_eq!(try_next(&mut stream).await, None);

        let mine = offer("B1", "O1", 1.85);
        store.store(mine.clone());
        assert_eq!(try_next(&mut stream).await, Some(Some(mine)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_publishes_patched_value() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        let mut stream = store.observe_betting_offer("B1");
        assert_eq!(try_next(&mut stream).await.unwrap().unwrap().odds, 1.85);

        store.update_entity(EntityType::BettingOffer, "B1", &odds_change(2.10));
        assert_eq!(try_next(&mut stream).await.unwrap().unwrap().odds, 2.10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_missing_publishes_nothing() {
        let store = EntityStore::new();
        let mut stream = store.observe_betting_offer("B404");
        assert_eq!(try_next(&mut stream).await, Some(None));

        store.update_entity(EntityType::BettingOffer, "B404", &odds_change(2.10));
        assert_eq!(try_next(&mut stream).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_publishes_none() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        let mut stream = store.observe_betting_offer("B1");
        assert!(try_next(&mut stream).await.unwrap().is_some());

        store.delete_entity(EntityType::BettingOffer, "B1");
        assert_eq!(try_next(&mut stream).await, Some(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_does_not_notify_observers() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        let mut stream = store.observe_betting_offer("B1");
        assert!(try_next(&mut stream).await.unwrap().is_some());

        store.clear();
        assert_eq!(try_next(&mut stream).await, None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_subscribers_share_one_channel() {
        let store = EntityStore::new();
        store.store(offer("B1", "O1", 1.85));
        let mut first = store.observe_betting_offer("B1");
        let mut second = store.observe_betting_offer("B1");
        assert!(try_next(&mut first).await.unwrap().is_some());
        assert!(try_next(&mut second).await.unwrap().is_some());

        store.update_entity(EntityType::BettingOffer, "B1", &odds_change(2.4));
        assert_eq!(try_next(&mut first).await.unwrap().unwrap().odds, 2.4);
        assert_eq!(try_next(&mut second).await.unwrap().unwrap().odds, 2.4);
    }
}
