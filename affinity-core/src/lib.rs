//! # Affinity Core
//!
//! Places that remember. Locations, artifacts and characters accumulate
//! decaying traces of what actors did to them, weigh those traces against
//! what they value, and push back through small environmental effects.
//!
//! - **Traces**: personal (actor × category), group (tag × category) and
//!   behavior (category) channels, each with its own half-life
//! - **Scoring**: `tanh` of the weighted, valued sum of decayed traces
//! - **Affordances**: data-driven effects gated by affinity bands, seeded
//!   per request and replayable from a frozen snapshot
//! - **Maintenance**: pruning, hot/warm/scar compaction and a periodic tick
//!
//! ## Determinism Contract
//!
//! - Every call takes an explicit timestamp; nothing reads the wall clock
//! - All maps iterate in key order, so float sums are reproducible
//! - Evaluation randomness comes from a seed derived from (actor, place, time)

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod affordance;
pub mod compaction;
pub mod config;
pub mod cooldown;
pub mod decay;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod place;
pub mod replay;
pub mod saturation;
pub mod scoring;
pub mod seed;
pub mod state;
pub mod tick;
pub mod types;
pub mod validation;
pub mod valuation;

pub use affordance::{
    AffordanceCatalog, AffordanceContext, AffordanceKind, AffordanceOutcome, AffordancePolicy, Band, TriggeredEffect,
    evaluate_affordances,
};
pub use compaction::{CompactionReport, compact, prune};
pub use config::AffinityConfig;
pub use engine::AffinityEngine;
pub use error::{AffinityError, Result};
pub use place::{AffinityEvent, Place, record_event};
pub use replay::{AffordanceSnapshot, TriggerLog, replay, replay_verified, verify};
pub use scoring::{compute_affinity, threshold_label};
pub use state::PlaceState;
pub use tick::{TickReport, tick};
pub use types::*;
pub use valuation::ValuationProfile;
