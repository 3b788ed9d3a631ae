//! Feed ingestion
//!
//! Applies decoded batches to the entity store under the ingestion policy.
//! Full entity records are always stored, whatever the message kind. Change
//! records go through `IngestPolicy`; the defaults mirror the live feed
//! contract: creates and deletes are dropped, and updates are narrowed to
//! betting offers whose patch includes `odds` — the one field that
//! materially moves displayed prices.
//!
//! Every failure is record-scoped: logged, counted, and the batch continues.

use tracing::{debug, info, warn};

use types::errors::DecodeError;
use types::key::EntityType;

use crate::protocol::{ChangeKind, ChangeRecord, DecoderRegistry, FeedEnvelope, FeedRecord};
use crate::store::EntityStore;

/// Which incremental change kinds the ingestor applies.
#[derive(Debug, Clone)]
pub struct IngestPolicy {
    /// Store the embedded entity of CREATE records.
    pub apply_creates: bool,
    /// Remove the target of DELETE records.
    pub apply_deletes: bool,
    /// Restrict UPDATE records to betting offers whose patch includes `odds`.
    pub odds_updates_only: bool,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            apply_creates: false,
            apply_deletes: false,
            odds_updates_only: true,
        }
    }
}

/// Outcome counts for one batch, and (summed) for the ingestor lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Full entity records stored (including applied creates).
    pub entities_stored: u64,
    pub updates_applied: u64,
    pub updates_skipped: u64,
    pub creates_dropped: u64,
    pub deletes_applied: u64,
    pub deletes_dropped: u64,
    /// Records with a type or change tag this catalog does not know.
    pub unknown_records: u64,
    /// Records that failed to decode; the batch continued without them.
    pub decode_errors: u64,
}

impl IngestSummary {
    fn merge(&mut self, other: &IngestSummary) {
        self.entities_stored += other.entities_stored;
        self.updates_applied += other.updates_applied;
        self.updates_skipped += other.updates_skipped;
        self.creates_dropped += other.creates_dropped;
        self.deletes_applied += other.deletes_applied;
        self.deletes_dropped += other.deletes_dropped;
        self.unknown_records += other.unknown_records;
        self.decode_errors += other.decode_errors;
    }
}

/// Decodes inbound batches and applies them to the store.
pub struct FeedIngestor {
    store: EntityStore,
    registry: DecoderRegistry,
    policy: IngestPolicy,
    batches_ingested: u64,
    totals: IngestSummary,
}

impl FeedIngestor {
    pub fn new(store: EntityStore) -> Self {
        Self::with_policy(store, IngestPolicy::default())
    }

    pub fn with_policy(store: EntityStore, policy: IngestPolicy) -> Self {
        info!(
            apply_creates = policy.apply_creates,
            apply_deletes = policy.apply_deletes,
            odds_updates_only = policy.odds_updates_only,
            "feed ingestor initialized"
        );
        Self {
            store,
            registry: DecoderRegistry::with_defaults(),
            policy,
            batches_ingested: 0,
            totals: IngestSummary::default(),
        }
    }

    /// The store this ingestor writes to.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn policy(&self) -> &IngestPolicy {
        &self.policy
    }

    /// Admit or override entity decoders, e.g. for new upstream kinds.
    pub fn registry_mut(&mut self) -> &mut DecoderRegistry {
        &mut self.registry
    }

    /// Cumulative counts since construction.
    pub fn totals(&self) -> IngestSummary {
        self.totals
    }

    pub fn batches_ingested(&self) -> u64 {
        self.batches_ingested
    }

    /// Parse a raw JSON batch and apply it.
    ///
    /// Only a malformed envelope is an error; record-level failures are
    /// counted in the summary.
    pub fn ingest_json(&mut self, raw: &str) -> Result<IngestSummary, DecodeError> {
        let envelope = FeedEnvelope::from_json(raw)?;
        Ok(self.ingest(envelope))
    }

    /// Apply one decoded envelope to the store.
    pub fn ingest(&mut self, envelope: FeedEnvelope) -> IngestSummary {
        debug!(
            message_type = %envelope.message_type,
            records = envelope.records.len(),
            "ingesting batch"
        );
        let mut summary = IngestSummary::default();
        for raw in &envelope.records {
            match self.registry.decode_record(raw) {
                Ok(FeedRecord::Entity(entity)) => {
                    self.store.store_any(entity);
                    summary.entities_stored += 1;
                }
                Ok(FeedRecord::Change(change)) => self.apply_change_record(change, &mut summary),
                Ok(FeedRecord::Unknown { .. }) => summary.unknown_records += 1,
                Err(err) => {
                    warn!(%err, "record failed to decode, batch continues");
                    summary.decode_errors += 1;
                }
            }
        }
        self.batches_ingested += 1;
        self.totals.merge(&summary);
        info!(
            stored = summary.entities_stored,
            updates_applied = summary.updates_applied,
            updates_skipped = summary.updates_skipped,
            unknown = summary.unknown_records,
            errors = summary.decode_errors,
            "batch ingested"
        );
        summary
    }

    fn apply_change_record(&mut self, change: ChangeRecord, summary: &mut IngestSummary) {
        match change.change_type {
            ChangeKind::Create => {
                if !self.policy.apply_creates {
                    debug!(entity_type = %change.entity_type, id = %change.id, "create record dropped");
                    summary.creates_dropped += 1;
                    return;
                }
                let Some(payload) = change.entity else {
                    warn!(entity_type = %change.entity_type, id = %change.id, "create record without entity payload");
                    summary.decode_errors += 1;
                    return;
                };
                match self.registry.decode_entity_tagged(&change.entity_type, &payload) {
                    Ok(entity) => {
                        self.store.store_any(entity);
                        summary.entities_stored += 1;
                    }
                    Err(err) => {
                        warn!(%err, id = %change.id, "create payload failed to decode");
                        summary.decode_errors += 1;
                    }
                }
            }
            ChangeKind::Update => self.apply_update(change, summary),
            ChangeKind::Delete => {
                if !self.policy.apply_deletes {
                    debug!(entity_type = %change.entity_type, id = %change.id, "delete record dropped");
                    summary.deletes_dropped += 1;
                    return;
                }
                let Some(entity_type) = EntityType::from_tag(&change.entity_type) else {
                    debug!(tag = %change.entity_type, "delete against unknown entity kind, skipped");
                    summary.unknown_records += 1;
                    return;
                };
                self.store.delete_entity(entity_type, &change.id);
                summary.deletes_applied += 1;
            }
        }
    }

    fn apply_update(&mut self, change: ChangeRecord, summary: &mut IngestSummary) {
        let Some(changes) = change.changed_properties else {
            warn!(entity_type = %change.entity_type, id = %change.id, "update record missing changedProperties");
            summary.updates_skipped += 1;
            return;
        };
        if self.policy.odds_updates_only {
            let is_offer = change.entity_type == EntityType::BettingOffer.as_tag();
            if !is_offer || !changes.contains_key("odds") {
                debug!(entity_type = %change.entity_type, id = %change.id, "update outside odds policy, skipped");
                summary.updates_skipped += 1;
                return;
            }
        }
        let Some(entity_type) = EntityType::from_tag(&change.entity_type) else {
            debug!(tag = %change.entity_type, "update against unknown entity kind, skipped");
            summary.unknown_records += 1;
            return;
        };
        self.store.update_entity(entity_type, &change.id, &changes);
        summary.updates_applied += 1;
    }
}
