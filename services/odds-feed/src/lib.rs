//! Odds Feed Service
//!
//! Consumes the normalized sports-trading feed and maintains the single
//! source of truth for live entities:
//! - Wire protocol decoding (full-dump records vs. create/update/delete
//!   change records) with graceful handling of unknown record shapes
//! - A concurrent entity store keyed by (entity-type, id) with per-entity
//!   observation channels
//! - Partial-update merging of otherwise-immutable records
//! - Hierarchical builders that reassemble a Match with its Markets,
//!   Outcomes, and Betting Offers on demand
//!
//! # Architecture
//!
//! ```text
//!     Feed batches (JSON)
//!            │
//!       ┌────▼─────┐
//!       │ Protocol │  ← registry-dispatched record decoding
//!       └────┬─────┘
//!            │
//!       ┌────▼─────┐
//!       │ Ingestor │  ← change-record policy, counters
//!       └────┬─────┘
//!            │                    ┌─────────┐
//!       ┌────▼─────┐   patches    │  Patch  │
//!       │  Store   │◄─────────────┤ engine  │
//!       └─┬──────┬─┘              └─────────┘
//!         │      │
//!  ┌──────▼──┐ ┌─▼──────────┐
//!  │Observers│ │  Builders  │ → nested Match/Market/Outcome/BettingOffer
//!  └─────────┘ └────────────┘
//! ```

pub mod builders;
pub mod domain;
pub mod index;
pub mod ingest;
pub mod patch;
pub mod protocol;
pub mod store;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
