//! Affinity scoring: decayed traces × valuations, blended across channels.
//!
//! ```text
//! personal = Σ decayed(actor, c)  × valuation(c)
//! group    = Σ decayed(tag, c)    × valuation(c)   for tag ∈ actor tags
//! behavior = Σ decayed(c)         × valuation(c)
//! raw      = Wp·personal + Wg·group + Wb·behavior
//! affinity = tanh(raw / scale)                      ∈ (−1, 1)
//! ```
//!
//! The same functions score a live [`Place`] and a frozen snapshot, so an
//! audit recomputation can only disagree if the inputs differ.

use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::config::{AffinityConfig, ChannelWeights};
use crate::decay::decayed_record;
use crate::place::Place;
use crate::types::{Channel, ThresholdLabel, Timestamp, TraceKey, TraceRecord};
use crate::valuation::ValuationProfile;

/// Trace contributions kept in a diagnostic trace.
pub const TOP_CONTRIBUTIONS: usize = 10;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Borrowed view of everything scoring reads from a place.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    /// (actor, category) traces.
    pub personal: &'a BTreeMap<TraceKey, TraceRecord>,
    /// (tag, category) traces.
    pub group: &'a BTreeMap<TraceKey, TraceRecord>,
    /// category traces.
    pub behavior: &'a BTreeMap<String, TraceRecord>,
    /// Valuation profile.
    pub valuations: &'a ValuationProfile,
}

impl<'a> From<&'a Place> for MemoryView<'a> {
    fn from(place: &'a Place) -> Self {
        Self {
            personal: &place.personal_traces,
            group: &place.group_traces,
            behavior: &place.behavior_traces,
            valuations: &place.valuations,
        }
    }
}

/// Half-lives (seconds), weights and scale resolved for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringParameters {
    /// Personal half-life in seconds.
    pub personal_half_life_secs: f64,
    /// Group half-life in seconds.
    pub group_half_life_secs: f64,
    /// Behavior half-life in seconds.
    pub behavior_half_life_secs: f64,
    /// Channel weights.
    pub weights: ChannelWeights,
    /// `tanh` divisor.
    pub scale: f64,
}

impl ScoringParameters {
    /// Resolve parameters for `place` from `config`.
    #[must_use]
    pub fn resolve(place: &Place, config: &AffinityConfig) -> Self {
        Self {
            personal_half_life_secs: place.half_life_secs(config, Channel::Personal),
            group_half_life_secs: place.half_life_secs(config, Channel::Group),
            behavior_half_life_secs: place.half_life_secs(config, Channel::Behavior),
            weights: config.channel_weights,
            scale: config.affinity_scale,
        }
    }

    /// Half-life for `channel`.
    #[must_use]
    pub fn half_life_secs(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Personal => self.personal_half_life_secs,
            Channel::Group => self.group_half_life_secs,
            Channel::Behavior => self.behavior_half_life_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Channel scores
// ---------------------------------------------------------------------------

/// Unweighted per-channel sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelScores {
    /// Personal sum.
    pub personal: f64,
    /// Group sum.
    pub group: f64,
    /// Behavior sum.
    pub behavior: f64,
}

impl ChannelScores {
    /// Weighted raw score before squashing.
    #[must_use]
    pub fn raw(&self, weights: &ChannelWeights) -> f64 {
        weights.personal * self.personal + weights.group * self.group + weights.behavior * self.behavior
    }
}

fn subject_traces<'m>(
    traces: &'m BTreeMap<TraceKey, TraceRecord>,
    subject: &'m str,
) -> impl Iterator<Item = (&'m TraceKey, &'m TraceRecord)> + 'm {
    traces
        .range(TraceKey::new(subject, "")..)
        .take_while(move |(key, _)| key.subject == subject)
}

/// Personal channel sum for `actor_id`.
#[must_use]
pub fn score_personal(view: MemoryView<'_>, actor_id: &str, half_life_secs: f64, now: Timestamp) -> f64 {
    subject_traces(view.personal, actor_id)
        .map(|(key, record)| decayed_record(record, now, half_life_secs) * view.valuations.lookup(&key.category))
        .sum()
}

/// Group channel sum over every tag the actor carries.
#[must_use]
pub fn score_group(view: MemoryView<'_>, actor_tags: &BTreeSet<String>, half_life_secs: f64, now: Timestamp) -> f64 {
    actor_tags
        .iter()
        .flat_map(|tag| subject_traces(view.group, tag))
        .map(|(key, record)| decayed_record(record, now, half_life_secs) * view.valuations.lookup(&key.category))
        .sum()
}

/// Behavior channel sum over all categories.
#[must_use]
pub fn score_behavior(view: MemoryView<'_>, half_life_secs: f64, now: Timestamp) -> f64 {
    view.behavior
        .iter()
        .map(|(category, record)| decayed_record(record, now, half_life_secs) * view.valuations.lookup(category))
        .sum()
}

/// All three channel sums.
#[must_use]
pub fn channel_scores(
    view: MemoryView<'_>,
    actor_id: &str,
    actor_tags: &BTreeSet<String>,
    params: &ScoringParameters,
    now: Timestamp,
) -> ChannelScores {
    ChannelScores {
        personal: score_personal(view, actor_id, params.personal_half_life_secs, now),
        group: score_group(view, actor_tags, params.group_half_life_secs, now),
        behavior: score_behavior(view, params.behavior_half_life_secs, now),
    }
}

/// Squash weighted channel sums into (−1, 1).
#[must_use]
pub fn blend(scores: &ChannelScores, params: &ScoringParameters) -> f64 {
    (scores.raw(&params.weights) / params.scale).tanh()
}

/// Affinity from an arbitrary memory view. Shared by live scoring and snapshot audits.
#[must_use]
pub fn affinity_from_view(
    view: MemoryView<'_>,
    actor_id: &str,
    actor_tags: &BTreeSet<String>,
    params: &ScoringParameters,
    now: Timestamp,
) -> f64 {
    blend(&channel_scores(view, actor_id, actor_tags, params, now), params)
}

/// How `place` feels about `actor_id` (carrying `actor_tags`) at `now`.
#[must_use]
pub fn compute_affinity(
    place: &Place,
    actor_id: &str,
    actor_tags: &BTreeSet<String>,
    now: Timestamp,
    config: &AffinityConfig,
) -> f64 {
    let params = ScoringParameters::resolve(place, config);
    affinity_from_view(place.into(), actor_id, actor_tags, &params, now)
}

/// Band name for an affinity value.
#[must_use]
pub fn threshold_label(affinity: f64) -> ThresholdLabel {
    ThresholdLabel::from_affinity(affinity)
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// One trace's share of the raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceContribution {
    /// Channel the trace lives in.
    pub channel: Channel,
    /// Trace key in persisted form.
    pub key: String,
    /// Decayed magnitude at evaluation time.
    pub decayed: f64,
    /// Valuation of the trace's category.
    pub valuation: f64,
    /// `decayed × valuation × channel weight`.
    pub weighted: f64,
}

/// The `limit` traces with the largest absolute weighted contribution.
#[must_use]
pub fn top_contributions(
    view: MemoryView<'_>,
    actor_id: &str,
    actor_tags: &BTreeSet<String>,
    params: &ScoringParameters,
    now: Timestamp,
    limit: usize,
) -> Vec<TraceContribution> {
    let make = |channel: Channel, key: String, category: &str, record: &TraceRecord| {
        let decayed = decayed_record(record, now, params.half_life_secs(channel));
        let valuation = view.valuations.lookup(category);
        TraceContribution {
            channel,
            key,
            decayed,
            valuation,
            weighted: decayed * valuation * params.weights.for_channel(channel),
        }
    };

    let mut all: Vec<TraceContribution> = subject_traces(view.personal, actor_id)
        .map(|(key, record)| make(Channel::Personal, key.encode(), &key.category, record))
        .chain(
            actor_tags
                .iter()
                .flat_map(|tag| subject_traces(view.group, tag))
                .map(|(key, record)| make(Channel::Group, key.encode(), &key.category, record)),
        )
        .chain(
            view.behavior
                .iter()
                .map(|(category, record)| make(Channel::Behavior, category.clone(), category, record)),
        )
        .collect();

    all.sort_by_key(|c| std::cmp::Reverse(OrderedFloat(c.weighted.abs())));
    all.truncate(limit);
    all
}
