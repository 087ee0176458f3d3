//! Places and the event recorder.
//!
//! A [`Place`] owns three trace maps, one per channel, plus the saturation
//! levels, cooldown ledger and scars that ride along with them. Recording an
//! event touches all three channels: one personal key, one group key per
//! actor tag, and one behavior key.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::AffinityConfig;
use crate::cooldown::CooldownLedger;
use crate::decay::accumulate;
use crate::saturation::SaturationState;
use crate::types::{Channel, EntityKind, ScarEvent, Timestamp, TraceKey, TraceRecord};
use crate::valuation::ValuationProfile;

/// Something that happened at a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityEvent {
    /// Event category, e.g. `harm.fire`. Opaque to the recorder.
    pub category: String,
    /// Who did it.
    pub actor_id: String,
    /// Social tags the actor carries.
    pub actor_tags: BTreeSet<String>,
    /// Where it happened.
    pub place_id: String,
    /// Strength in [0, 1].
    pub intensity: f64,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Optional target of the action.
    #[serde(default)]
    pub target_id: Option<String>,
    /// Optional free-form context.
    #[serde(default)]
    pub context_tags: BTreeSet<String>,
}

impl AffinityEvent {
    /// Build an event. Intensity is clamped to [0, 1].
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        actor_id: impl Into<String>,
        place_id: impl Into<String>,
        intensity: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            category: category.into(),
            actor_id: actor_id.into(),
            actor_tags: BTreeSet::new(),
            place_id: place_id.into(),
            intensity: intensity.clamp(0.0, 1.0),
            timestamp,
            target_id: None,
            context_tags: BTreeSet::new(),
        }
    }

    /// Attach actor tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actor_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a target.
    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }
}

/// A location, artifact or character that accumulates memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Selects the half-life row.
    pub kind: EntityKind,
    /// What this place cares about.
    pub valuations: ValuationProfile,
    /// (actor, category) → trace.
    pub personal_traces: BTreeMap<TraceKey, TraceRecord>,
    /// (tag, category) → trace.
    pub group_traces: BTreeMap<TraceKey, TraceRecord>,
    /// category → trace.
    pub behavior_traces: BTreeMap<String, TraceRecord>,
    /// Per-channel saturation.
    pub saturation: SaturationState,
    /// Affordance cooldowns.
    pub cooldowns: CooldownLedger,
    /// Permanent landmarks left by compaction.
    pub scars: Vec<ScarEvent>,
    /// When maintenance last executed.
    pub last_tick: Timestamp,
}

impl Place {
    /// A location with no memory.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, valuations: ValuationProfile) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntityKind::Location,
            valuations,
            personal_traces: BTreeMap::new(),
            group_traces: BTreeMap::new(),
            behavior_traces: BTreeMap::new(),
            saturation: SaturationState::default(),
            cooldowns: CooldownLedger::new(),
            scars: Vec::new(),
            last_tick: Timestamp::default(),
        }
    }

    /// Change the entity kind. Chainable.
    #[must_use]
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }

    /// Half-life for `channel` in seconds, according to this entity's kind.
    #[must_use]
    pub fn half_life_secs(&self, config: &AffinityConfig, channel: Channel) -> f64 {
        config.half_lives.for_kind(self.kind).secs(channel)
    }

    /// Total traces across all channels.
    #[must_use]
    pub fn trace_count(&self) -> usize {
        self.personal_traces.len() + self.group_traces.len() + self.behavior_traces.len()
    }
}

/// Record an event into all three channels of `place`.
///
/// Each touched record is decayed to the event's timestamp, then grows by
/// the saturation-dampened intensity. Saturation itself rises afterwards,
/// so an event never dampens itself.
pub fn record_event(place: &mut Place, event: &AffinityEvent, config: &AffinityConfig) {
    let now = event.timestamp;

    let personal = place.saturation.dampen(Channel::Personal, event.intensity);
    let half_life = place.half_life_secs(config, Channel::Personal);
    upsert(
        &mut place.personal_traces,
        TraceKey::new(&event.actor_id, &event.category),
        personal,
        now,
        half_life,
    );

    let group = place.saturation.dampen(Channel::Group, event.intensity);
    let half_life = place.half_life_secs(config, Channel::Group);
    for tag in &event.actor_tags {
        upsert(
            &mut place.group_traces,
            TraceKey::new(tag, &event.category),
            group,
            now,
            half_life,
        );
    }

    let behavior = place.saturation.dampen(Channel::Behavior, event.intensity);
    let half_life = place.half_life_secs(config, Channel::Behavior);
    upsert(&mut place.behavior_traces, event.category.clone(), behavior, now, half_life);

    for channel in Channel::ALL {
        place.saturation.absorb(channel, &config.saturation);
    }

    trace!(
        place = %place.id,
        actor = %event.actor_id,
        category = %event.category,
        intensity = event.intensity,
        tags = event.actor_tags.len(),
        "recorded affinity event"
    );
}

fn upsert<K: Ord>(
    map: &mut BTreeMap<K, TraceRecord>,
    key: K,
    delta: f64,
    now: Timestamp,
    half_life_secs: f64,
) {
    map.entry(key)
        .and_modify(|record| accumulate(record, delta, now, half_life_secs))
        .or_insert_with(|| TraceRecord::new(delta, now));
}
