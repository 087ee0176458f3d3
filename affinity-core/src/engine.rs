//! One handle tying configuration, catalog, policy and counters together.
//!
//! The free functions in each module stay usable on their own; the engine
//! just passes the shared pieces along and keeps the counters current.
//! Places are owned by the caller and lent per call.

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;

use tracing::info;

use crate::affordance::{AffordanceCatalog, AffordanceContext, AffordanceKind, AffordanceOutcome, AffordancePolicy, Band};
use crate::compaction::{self, CompactionReport};
use crate::config::AffinityConfig;
use crate::error::Result;
use crate::metrics::{AffinityCounters, CounterSnapshot};
use crate::place::{self, AffinityEvent, Place};
use crate::replay::{self, AffordanceSnapshot};
use crate::scoring;
use crate::tick::{self, TickReport};
use crate::types::{ThresholdLabel, Timestamp};

/// Configured affinity engine.
#[derive(Debug)]
pub struct AffinityEngine {
    config: AffinityConfig,
    catalog: AffordanceCatalog,
    policy: AffordancePolicy,
    counters: AffinityCounters,
}

impl AffinityEngine {
    /// Engine over a validated configuration and catalog.
    ///
    /// # Errors
    /// Any [`AffinityConfig::validate`] failure.
    pub fn new(config: AffinityConfig, catalog: AffordanceCatalog) -> Result<Self> {
        config.validate()?;
        info!(affordances = catalog.len(), "affinity engine ready");
        Ok(Self {
            config,
            catalog,
            policy: AffordancePolicy::new(),
            counters: AffinityCounters::new(),
        })
    }

    /// Default configuration and the stock catalog.
    ///
    /// # Errors
    /// Only if the stock content is broken.
    pub fn with_defaults() -> Result<Self> {
        Self::new(AffinityConfig::default(), AffordanceCatalog::standard()?)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AffinityConfig {
        &self.config
    }

    /// Active catalog.
    #[must_use]
    pub fn catalog(&self) -> &AffordanceCatalog {
        &self.catalog
    }

    /// Current policy.
    #[must_use]
    pub fn policy(&self) -> &AffordancePolicy {
        &self.policy
    }

    /// Mutable policy, for admin tooling.
    pub fn policy_mut(&mut self) -> &mut AffordancePolicy {
        &mut self.policy
    }

    /// Switch an affordance on or off.
    pub fn set_enabled(&mut self, kind: AffordanceKind, enabled: bool) {
        info!(affordance = %kind, enabled, "affordance toggled");
        self.policy.set_enabled(kind, enabled);
    }

    /// Pin an affordance to a band, or release it.
    pub fn force(&mut self, kind: AffordanceKind, band: Option<Band>) {
        info!(affordance = %kind, band = ?band, "affordance force changed");
        self.policy.force(kind, band);
    }

    /// Toggle per-evaluation diagnostics for an affordance.
    pub fn set_debug(&mut self, kind: AffordanceKind, on: bool) {
        self.policy.set_debug(kind, on);
    }

    /// Record one event into `place`.
    pub fn record_event(&self, place: &mut Place, event: &AffinityEvent) {
        place::record_event(place, event, &self.config);
        self.counters.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// How `place` feels about the actor at `now`.
    #[must_use]
    pub fn compute_affinity(&self, place: &Place, actor_id: &str, actor_tags: &BTreeSet<String>, now: Timestamp) -> f64 {
        scoring::compute_affinity(place, actor_id, actor_tags, now, &self.config)
    }

    /// Band name for the actor's affinity at `now`.
    #[must_use]
    pub fn threshold_label(&self, place: &Place, actor_id: &str, actor_tags: &BTreeSet<String>, now: Timestamp) -> ThresholdLabel {
        scoring::threshold_label(self.compute_affinity(place, actor_id, actor_tags, now))
    }

    /// Evaluate every affordance for one action.
    pub fn evaluate(&self, place: &mut Place, ctx: &AffordanceContext) -> AffordanceOutcome {
        let outcome = crate::affordance::evaluate_affordances(place, ctx, &self.catalog, &self.policy, &self.config);
        self.counters.evaluations.fetch_add(1, Ordering::Relaxed);
        self.counters
            .triggers
            .fetch_add(outcome.effects.len() as u64, Ordering::Relaxed);
        self.counters
            .cooldowns_consumed
            .fetch_add(outcome.cooldowns_consumed.len() as u64, Ordering::Relaxed);
        outcome
    }

    /// Tier `place`'s memory now.
    pub fn compact(&self, place: &mut Place, now: Timestamp) -> CompactionReport {
        let report = compaction::compact(place, now, &self.config);
        self.counters.add_compaction(&report);
        report
    }

    /// Drop traces whose decayed magnitude is below `threshold`.
    pub fn prune(&self, place: &mut Place, threshold: f64, now: Timestamp) -> usize {
        let removed = compaction::prune(place, threshold, now, &self.config);
        self.counters.traces_pruned.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Periodic maintenance.
    pub fn tick(&self, place: &mut Place, now: Timestamp) -> TickReport {
        let report = tick::tick(place, now, &self.config);
        if report.ran {
            self.counters.ticks_run.fetch_add(1, Ordering::Relaxed);
            self.counters.add_compaction(&report.compaction);
        }
        report
    }

    /// Drop every cooldown on `place`. Returns how many were dropped.
    pub fn reset_cooldowns(&self, place: &mut Place) -> usize {
        let cleared = place.cooldowns.reset();
        info!(place = %place.id, cleared, "cooldowns reset");
        cleared
    }

    /// The stored outcome of `snapshot`.
    #[must_use]
    pub fn replay(&self, snapshot: &AffordanceSnapshot) -> AffordanceOutcome {
        replay::replay(snapshot)
    }

    /// Whether `snapshot` still rescores to its stored affinity.
    #[must_use]
    pub fn verify(&self, snapshot: &AffordanceSnapshot) -> bool {
        let ok = replay::verify(snapshot);
        if !ok {
            self.counters.snapshot_drift.fetch_add(1, Ordering::Relaxed);
        }
        ok
    }

    /// Replay, refusing drifted snapshots.
    ///
    /// # Errors
    /// [`crate::AffinityError::SnapshotDrift`] on mismatch.
    pub fn replay_verified(&self, snapshot: &AffordanceSnapshot) -> Result<AffordanceOutcome> {
        replay::replay_verified(snapshot).inspect_err(|_| {
            self.counters.snapshot_drift.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Current counter values.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::ValuationProfile;

    fn engine() -> AffinityEngine {
        AffinityEngine::with_defaults().expect("defaults are valid")
    }

    #[test]
    fn invalid_config_is_refused() {
        let mut config = AffinityConfig::default();
        config.affinity_scale = 0.0;
        let catalog = AffordanceCatalog::standard().expect("stock catalog");
        assert!(AffinityEngine::new(config, catalog).is_err());
    }

    #[test]
    fn counters_track_calls() {
        let engine = engine();
        let mut place = Place::new("bog", "Black Bog", ValuationProfile::new().with("harm", -1.0));
        for i in 0..30 {
            let at = Timestamp::from_secs(f64::from(i));
            engine.record_event(&mut place, &AffinityEvent::new("harm.poison", "kira", "bog", 1.0, at));
        }
        let ctx = AffordanceContext::new("kira", "move.pass", Timestamp::from_secs(60.0));
        let outcome = engine.evaluate(&mut place, &ctx);
        assert!(outcome.triggered);
        engine.tick(&mut place, Timestamp::from_secs(7_200.0));
        engine.tick(&mut place, Timestamp::from_secs(7_300.0));

        let snap = engine.counters();
        assert_eq!(snap.events_recorded, 30);
        assert_eq!(snap.evaluations, 1);
        assert_eq!(snap.triggers, outcome.effects.len() as u64);
        assert_eq!(snap.ticks_run, 1);
    }

    #[test]
    fn policy_changes_reach_evaluation() {
        let mut engine = engine();
        let mut place = Place::new("bog", "Black Bog", ValuationProfile::new());
        engine.force(AffordanceKind::PathFriction, Some(Band::Favorable));
        let ctx = AffordanceContext::new("kira", "move.pass", Timestamp::from_secs(0.0));
        let outcome = engine.evaluate(&mut place, &ctx);
        assert!(outcome.adjustments["room.travel_time_modifier"] < 0.0);

        assert_eq!(engine.reset_cooldowns(&mut place), 1);
        engine.set_enabled(AffordanceKind::PathFriction, false);
        let outcome = engine.evaluate(&mut place, &ctx);
        assert!(!outcome.adjustments.contains_key("room.travel_time_modifier"));
    }

    #[test]
    fn drift_is_counted() {
        let engine = engine();
        let mut place = Place::new("bog", "Black Bog", ValuationProfile::new());
        let ctx = AffordanceContext::new("kira", "look", Timestamp::from_secs(0.0));
        let mut snapshot = engine.evaluate(&mut place, &ctx).snapshot;
        assert!(engine.verify(&snapshot));
        snapshot.affinity = 0.5;
        assert!(engine.replay_verified(&snapshot).is_err());
        assert_eq!(engine.counters().snapshot_drift, 1);
    }
}
