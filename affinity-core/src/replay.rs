//! Frozen evaluations and deterministic replay.
//!
//! Every evaluation freezes its inputs and outputs into an
//! [`AffordanceSnapshot`]. [`replay`] hands the stored outputs back verbatim
//! and never re-rolls. [`verify`] is the audit path: it rescores the frozen
//! traces with the live scoring function and checks the stored affinity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::affordance::{AffordanceOutcome, TriggeredEffect};
use crate::error::{AffinityError, Result};
use crate::scoring::{MemoryView, ScoringParameters, TraceContribution, affinity_from_view};
use crate::types::{EntityKind, ThresholdLabel, Timestamp, TraceKey, TraceRecord};
use crate::valuation::ValuationProfile;

/// Absolute tolerance used by [`verify`].
pub const VERIFY_TOLERANCE: f64 = 1e-9;

/// Why an evaluation came out the way it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerLog {
    /// Evaluation time.
    pub timestamp: Timestamp,
    /// Place evaluated.
    pub place_id: String,
    /// Actor evaluated.
    pub actor_id: String,
    /// What fired, in evaluation order.
    pub effects: Vec<TriggeredEffect>,
    /// Severity of the first effect, 0.0 if none fired.
    pub severity: f64,
    /// Largest contributors to the score.
    pub contributions: Vec<TraceContribution>,
    /// Affinity at evaluation time.
    pub affinity: f64,
    /// Band of that affinity.
    pub threshold: ThresholdLabel,
}

/// Everything needed to reproduce or audit one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordanceSnapshot {
    /// Place evaluated.
    pub place_id: String,
    /// Kind of entity evaluated.
    pub entity_kind: EntityKind,
    /// Actor evaluated.
    pub actor_id: String,
    /// Actor tags at evaluation time.
    pub actor_tags: BTreeSet<String>,
    /// Action that prompted the evaluation.
    pub action_type: String,
    /// Element tag, if the action carried one.
    pub element_tag: Option<String>,
    /// Evaluation time.
    pub eval_time: Timestamp,
    /// Deep copy of personal traces.
    pub personal_traces: BTreeMap<TraceKey, TraceRecord>,
    /// Deep copy of group traces.
    pub group_traces: BTreeMap<TraceKey, TraceRecord>,
    /// Deep copy of behavior traces.
    pub behavior_traces: BTreeMap<String, TraceRecord>,
    /// Deep copy of the valuation profile.
    pub valuations: ValuationProfile,
    /// Half-lives, weights and scale in force.
    pub parameters: ScoringParameters,
    /// RNG seed used.
    pub seed: u64,
    /// Affinity computed.
    pub affinity: f64,
    /// Band of that affinity.
    pub threshold: ThresholdLabel,
    /// What fired.
    pub effects: Vec<TriggeredEffect>,
    /// Final numeric adjustments.
    pub adjustments: BTreeMap<String, f64>,
    /// Final narrative.
    pub narrative: Vec<String>,
    /// Misdirection target, if any.
    pub redirect_target: Option<String>,
    /// Cooldown keys started.
    pub cooldowns_consumed: Vec<String>,
    /// Whether anything fired.
    pub triggered: bool,
    /// Diagnostic trace.
    pub diagnostic: TriggerLog,
}

impl AffordanceSnapshot {
    /// Borrow the frozen traces as a scoring view.
    #[must_use]
    pub fn memory_view(&self) -> MemoryView<'_> {
        MemoryView {
            personal: &self.personal_traces,
            group: &self.group_traces,
            behavior: &self.behavior_traces,
            valuations: &self.valuations,
        }
    }

    /// Affinity recomputed from the frozen inputs.
    #[must_use]
    pub fn recompute_affinity(&self) -> f64 {
        affinity_from_view(
            self.memory_view(),
            &self.actor_id,
            &self.actor_tags,
            &self.parameters,
            self.eval_time,
        )
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    /// `AffinityError::Serialization` on encoder failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    /// `AffinityError::Serialization` for malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The stored outcome, verbatim. Nothing is recomputed or re-rolled.
#[must_use]
pub fn replay(snapshot: &AffordanceSnapshot) -> AffordanceOutcome {
    AffordanceOutcome {
        adjustments: snapshot.adjustments.clone(),
        narrative: snapshot.narrative.clone(),
        triggered: snapshot.triggered,
        redirect_target: snapshot.redirect_target.clone(),
        cooldowns_consumed: snapshot.cooldowns_consumed.clone(),
        affinity: snapshot.affinity,
        threshold: snapshot.threshold,
        effects: snapshot.effects.clone(),
        diagnostic: snapshot.diagnostic.clone(),
        snapshot: snapshot.clone(),
    }
}

/// Whether rescoring the frozen traces reproduces the stored affinity.
#[must_use]
pub fn verify(snapshot: &AffordanceSnapshot) -> bool {
    (snapshot.recompute_affinity() - snapshot.affinity).abs() <= VERIFY_TOLERANCE
}

/// [`replay`], refusing snapshots that fail [`verify`].
///
/// # Errors
/// [`AffinityError::SnapshotDrift`] when scoring and the snapshot disagree.
pub fn replay_verified(snapshot: &AffordanceSnapshot) -> Result<AffordanceOutcome> {
    let recomputed = snapshot.recompute_affinity();
    if (recomputed - snapshot.affinity).abs() > VERIFY_TOLERANCE {
        warn!(
            place = %snapshot.place_id,
            actor = %snapshot.actor_id,
            stored = snapshot.affinity,
            recomputed,
            "snapshot drift detected"
        );
        return Err(AffinityError::SnapshotDrift {
            stored: snapshot.affinity,
            recomputed,
        });
    }
    Ok(replay(snapshot))
}
