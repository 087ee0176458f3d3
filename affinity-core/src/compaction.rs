//! Memory tiering: hot detail, warm summaries, permanent scars.
//!
//! ```text
//! ┌──────────┐     ┌──────────┐     ┌──────────┐
//! │   Hot    │────▶│   Warm   │────▶│   Cold   │
//! │ personal │     │  group,  │     │ folded + │
//! │  < 7 d   │     │  < 90 d  │     │  scars   │
//! └──────────┘     └──────────┘     └──────────┘
//! ```
//!
//! Personal traces live only in the hot tier. Group traces survive the warm
//! tier individually, then institutional ones are folded into coarse
//! categories and the rest are dropped. Strong aged institutional memories
//! additionally leave a [`ScarEvent`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AffinityConfig, CompactionConfig};
use crate::decay::decayed_record;
use crate::place::Place;
use crate::types::{Channel, SECONDS_PER_DAY, ScarEvent, Timestamp, TraceKey, TraceRecord, coarse_category};

// ---------------------------------------------------------------------------
// Tier classification
// ---------------------------------------------------------------------------

/// Which tier a trace belongs to by age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Younger than the hot window.
    Hot,
    /// Past the hot window, younger than the warm window.
    Warm,
    /// Past the warm window.
    Cold,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hot => write!(f, "hot"),
            Self::Warm => write!(f, "warm"),
            Self::Cold => write!(f, "cold"),
        }
    }
}

/// Classify a trace last touched at `last_updated`.
///
/// Ages exactly on a window boundary stay in the younger tier.
#[must_use]
pub fn classify_tier(last_updated: Timestamp, now: Timestamp, config: &CompactionConfig) -> Tier {
    let age_days = now.since(last_updated) / SECONDS_PER_DAY;
    if age_days <= config.hot_window_days {
        Tier::Hot
    } else if age_days <= config.warm_window_days {
        Tier::Warm
    } else {
        Tier::Cold
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What one compaction pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionReport {
    /// Traces dropped by the magnitude prune.
    pub pruned: usize,
    /// Personal traces aged out of the hot tier.
    pub personal_discarded: usize,
    /// Aged group traces without an institutional tag.
    pub group_discarded: usize,
    /// Aged group traces folded into a coarser key.
    pub folded: usize,
    /// Scars appended.
    pub scars_created: usize,
}

impl CompactionReport {
    /// Every trace removed outright: pruned plus both discard counts.
    #[must_use]
    pub fn discarded_count(&self) -> usize {
        self.pruned + self.personal_discarded + self.group_discarded
    }

    /// Whether the pass changed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Prune
// ---------------------------------------------------------------------------

fn prune_map<K: Ord>(map: &mut BTreeMap<K, TraceRecord>, threshold: f64, now: Timestamp, half_life_secs: f64) -> usize {
    let before = map.len();
    map.retain(|_, record| decayed_record(record, now, half_life_secs).abs() >= threshold);
    before - map.len()
}

/// Drop every trace whose decayed magnitude at `now` is below `threshold`.
///
/// Scars are never pruned. Returns the number of traces removed.
pub fn prune(place: &mut Place, threshold: f64, now: Timestamp, config: &AffinityConfig) -> usize {
    let personal = place.half_life_secs(config, Channel::Personal);
    let group = place.half_life_secs(config, Channel::Group);
    let behavior = place.half_life_secs(config, Channel::Behavior);

    let removed = prune_map(&mut place.personal_traces, threshold, now, personal)
        + prune_map(&mut place.group_traces, threshold, now, group)
        + prune_map(&mut place.behavior_traces, threshold, now, behavior);

    if removed > 0 {
        debug!(place = %place.id, removed, threshold, "pruned faded traces");
    }
    removed
}

// ---------------------------------------------------------------------------
// Compact
// ---------------------------------------------------------------------------

/// Prune, then tier `place`'s memory at `now`.
///
/// 1. Prune at the configured threshold.
/// 2. Discard personal traces past the hot window.
/// 3. For group traces past the warm window:
///    strong institutional ones not yet scarred leave a scar (judged before
///    folding), institutional ones fold into `(tag, coarse category)`, and
///    everything else is discarded.
pub fn compact(place: &mut Place, now: Timestamp, config: &AffinityConfig) -> CompactionReport {
    let window = &config.compaction;
    let mut report = CompactionReport {
        pruned: prune(place, window.prune_threshold, now, config),
        ..CompactionReport::default()
    };

    let before = place.personal_traces.len();
    place
        .personal_traces
        .retain(|_, record| classify_tier(record.last_updated, now, window) == Tier::Hot);
    report.personal_discarded = before - place.personal_traces.len();

    let mut kept = BTreeMap::new();
    let mut aged = Vec::new();
    for (key, mut record) in std::mem::take(&mut place.group_traces) {
        if classify_tier(record.last_updated, now, window) != Tier::Cold {
            kept.insert(key, record);
            continue;
        }
        if !config.is_institutional(&key.subject) {
            report.group_discarded += 1;
            continue;
        }
        if !record.is_scar && record.accumulated.abs() > window.scar_intensity_threshold {
            place.scars.push(ScarEvent {
                category: coarse_category(&key.category).to_string(),
                tags: BTreeSet::from([key.subject.clone()]),
                intensity: record.accumulated.abs(),
                timestamp: record.last_updated,
                half_life_secs: window.scar_half_life_days * SECONDS_PER_DAY,
            });
            record.is_scar = true;
            report.scars_created += 1;
        }
        aged.push((key, record));
    }

    for (key, record) in aged {
        let coarse = TraceKey::new(key.subject.as_str(), coarse_category(&key.category));
        if coarse != key {
            report.folded += 1;
        }
        kept.entry(coarse)
            .and_modify(|existing: &mut TraceRecord| merge_into(existing, &record))
            .or_insert(record);
    }
    place.group_traces = kept;

    if report.is_empty() {
        debug!(place = %place.id, "compaction found nothing to do");
    } else {
        info!(
            place = %place.id,
            pruned = report.pruned,
            personal_discarded = report.personal_discarded,
            group_discarded = report.group_discarded,
            folded = report.folded,
            scars = report.scars_created,
            "compacted place memory"
        );
    }
    report
}

fn merge_into(existing: &mut TraceRecord, other: &TraceRecord) {
    existing.accumulated += other.accumulated;
    existing.event_count = existing.event_count.saturating_add(other.event_count);
    if other.last_updated > existing.last_updated {
        existing.last_updated = other.last_updated;
    }
    existing.is_scar |= other.is_scar;
}
