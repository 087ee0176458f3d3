//! Property-based tests for the affinity engine.
//!
//! Boundedness, the decay law, determinism and replay fidelity must hold for
//! any event history, not just the hand-picked ones in the unit tests.

use std::collections::BTreeSet;

use proptest::prelude::*;

use affinity_core::decay::decayed_value;
use affinity_core::{
    AffinityConfig, AffinityEvent, AffordanceCatalog, AffordanceContext, AffordancePolicy, Place, Timestamp,
    ValuationProfile, compute_affinity, evaluate_affordances, record_event, replay, verify,
};

const CATEGORIES: [&str; 6] = ["harm.fire", "harm.blade", "help.heal", "trespass.enter", "offering", "trade.fair"];
const ACTORS: [&str; 3] = ["kira", "tomas", "ivo"];
const TAGS: [&str; 3] = ["human", "elf", "guard"];

fn profile() -> ValuationProfile {
    ValuationProfile::new()
        .with("harm", -0.6)
        .with("harm.fire", -1.0)
        .with("help", 0.7)
        .with("trespass", -0.4)
        .with("offering", 0.5)
}

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_event() -> impl Strategy<Value = (usize, usize, usize, f64, f64)> {
    (0..CATEGORIES.len(), 0..ACTORS.len(), 0..TAGS.len(), 0.0..=1.0f64, 0.0..500_000.0f64)
}

fn arb_history() -> impl Strategy<Value = Vec<(usize, usize, usize, f64, f64)>> {
    prop::collection::vec(arb_event(), 0..60)
}

fn build_place(history: &[(usize, usize, usize, f64, f64)], config: &AffinityConfig) -> Place {
    let mut place = Place::new("grove", "Grove", profile());
    let mut sorted = history.to_vec();
    sorted.sort_by(|a, b| a.4.total_cmp(&b.4));
    for (category, actor, tag, intensity, secs) in sorted {
        let event = AffinityEvent::new(CATEGORIES[category], ACTORS[actor], "grove", intensity, Timestamp::from_secs(secs))
            .with_tags([TAGS[tag]]);
        record_event(&mut place, &event, config);
    }
    place
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn affinity_is_bounded(history in arb_history(), actor in 0..ACTORS.len()) {
        let config = AffinityConfig::default();
        let place = build_place(&history, &config);
        let tags: BTreeSet<String> = TAGS.iter().map(|t| (*t).to_string()).collect();
        let affinity = compute_affinity(&place, ACTORS[actor], &tags, Timestamp::from_secs(600_000.0), &config);
        prop_assert!(affinity.is_finite());
        prop_assert!((-1.0..=1.0).contains(&affinity));
    }

    #[test]
    fn decay_halves_each_half_life(
        acc in -1_000.0..1_000.0f64,
        start in 0.0..1e9f64,
        half_life in 60.0..1e8f64,
        periods in 0i32..6,
    ) {
        let t0 = Timestamp::from_secs(start);
        let later = t0.plus_secs(half_life * f64::from(periods));
        let expected = acc * 0.5f64.powi(periods);
        let got = decayed_value(acc, t0, later, half_life);
        prop_assert!((got - expected).abs() <= 1e-6 * acc.abs().max(1.0));
    }

    #[test]
    fn decay_never_grows(acc in -1_000.0..1_000.0f64, elapsed in -1e6..1e9f64, half_life in 1.0..1e8f64) {
        let t0 = Timestamp::from_secs(1e9);
        let got = decayed_value(acc, t0, t0.plus_secs(elapsed), half_life);
        prop_assert!(got.abs() <= acc.abs());
        prop_assert!(got * acc >= 0.0);
    }

    #[test]
    fn evaluation_is_deterministic(
        history in arb_history(),
        actor in 0..ACTORS.len(),
        at in 500_000.0..600_000.0f64,
    ) {
        let config = AffinityConfig::default();
        let catalog = AffordanceCatalog::standard().expect("stock catalog");
        let ctx = AffordanceContext::new(ACTORS[actor], "move", Timestamp::from_secs(at))
            .with_tags(["human"])
            .with_destinations(["ford", "ridge"]);
        let mut a = build_place(&history, &config);
        let mut b = build_place(&history, &config);
        let first = evaluate_affordances(&mut a, &ctx, &catalog, &AffordancePolicy::new(), &config);
        let second = evaluate_affordances(&mut b, &ctx, &catalog, &AffordancePolicy::new(), &config);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn replay_is_faithful(history in arb_history(), action in prop::sample::select(vec!["move.pass", "rest", "cast", "loot", "look"])) {
        let config = AffinityConfig::default();
        let catalog = AffordanceCatalog::standard().expect("stock catalog");
        let mut place = build_place(&history, &config);
        let ctx = AffordanceContext::new("kira", action, Timestamp::from_secs(550_000.0))
            .with_tags(["guard"])
            .with_element("fire");
        let outcome = evaluate_affordances(&mut place, &ctx, &catalog, &AffordancePolicy::new(), &config);

        place.personal_traces.clear();
        place.valuations.set("harm", 1.0);

        prop_assert_eq!(&replay(&outcome.snapshot), &outcome);
        prop_assert!(verify(&outcome.snapshot));
        prop_assert!(outcome.adjustments.len() <= 2);
    }
}
