//! Configuration for the affinity system.
//!
//! Every field has a default, so an empty TOML document yields the stock
//! tuning. Reading the document from disk is the host's business; this
//! module only parses and validates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AffinityError, Result};
use crate::types::{Channel, EntityKind, SECONDS_PER_DAY};

/// Top-level affinity configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityConfig {
    /// Half-lives per entity kind and channel.
    #[serde(default)]
    pub half_lives: HalfLifeTable,
    /// How much each channel contributes to the blended score.
    #[serde(default)]
    pub channel_weights: ChannelWeights,
    /// Divisor applied before `tanh`; larger values need more memory to saturate.
    #[serde(default = "default_affinity_scale")]
    pub affinity_scale: f64,
    /// Saturation growth and relief.
    #[serde(default)]
    pub saturation: SaturationConfig,
    /// Memory tiering.
    #[serde(default)]
    pub compaction: CompactionConfig,
    /// Periodic maintenance.
    #[serde(default)]
    pub tick: TickConfig,
    /// Group tags that survive compaction and can leave scars.
    #[serde(default = "default_institutional_tags")]
    pub institutional_tags: BTreeSet<String>,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            half_lives: HalfLifeTable::default(),
            channel_weights: ChannelWeights::default(),
            affinity_scale: default_affinity_scale(),
            saturation: SaturationConfig::default(),
            compaction: CompactionConfig::default(),
            tick: TickConfig::default(),
            institutional_tags: default_institutional_tags(),
        }
    }
}

impl AffinityConfig {
    /// Load and validate configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `AffinityError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| AffinityError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the numeric invariants the scoring math relies on.
    ///
    /// # Errors
    /// Returns `AffinityError::Config` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let w = &self.channel_weights;
        let sum = w.personal + w.group + w.behavior;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(AffinityError::Config(format!("channel weights sum to {sum}, expected 1.0")));
        }
        if [w.personal, w.group, w.behavior].iter().any(|v| *v < 0.0) {
            return Err(AffinityError::Config("channel weights must be non-negative".into()));
        }
        if self.affinity_scale <= 0.0 {
            return Err(AffinityError::Config("affinity_scale must be positive".into()));
        }
        for (kind, row) in [
            ("location", &self.half_lives.location),
            ("artifact", &self.half_lives.artifact),
            ("npc", &self.half_lives.npc),
        ] {
            if [row.personal, row.group, row.behavior].iter().any(|d| *d <= 0.0) {
                return Err(AffinityError::Config(format!("{kind} half-lives must be positive")));
            }
        }
        let s = &self.saturation;
        if s.personal_capacity <= 0.0 || s.group_capacity <= 0.0 || s.behavior_capacity <= 0.0 {
            return Err(AffinityError::Config("saturation capacities must be positive".into()));
        }
        if !(0.0..=1.0).contains(&s.decay_rate_per_day) {
            return Err(AffinityError::Config("saturation decay rate must lie in [0, 1]".into()));
        }
        let c = &self.compaction;
        if c.warm_window_days < c.hot_window_days {
            return Err(AffinityError::Config("warm window must not be shorter than hot window".into()));
        }
        if self.tick.interval_secs < 0.0 {
            return Err(AffinityError::Config("tick interval must not be negative".into()));
        }
        Ok(())
    }

    /// Whether a group tag is institutional.
    #[must_use]
    pub fn is_institutional(&self, tag: &str) -> bool {
        self.institutional_tags.contains(tag)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Half-lives (days) for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelHalfLives {
    /// Personal channel half-life.
    pub personal: f64,
    /// Group channel half-life.
    pub group: f64,
    /// Behavior channel half-life.
    pub behavior: f64,
}

impl ChannelHalfLives {
    /// Half-life for `channel`, in seconds.
    #[must_use]
    pub fn secs(&self, channel: Channel) -> f64 {
        let days = match channel {
            Channel::Personal => self.personal,
            Channel::Group => self.group,
            Channel::Behavior => self.behavior,
        };
        days * SECONDS_PER_DAY
    }
}

/// Half-life rows for every entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfLifeTable {
    /// Places remember longest.
    #[serde(default = "default_location_half_lives")]
    pub location: ChannelHalfLives,
    /// Carried objects.
    #[serde(default = "default_artifact_half_lives")]
    pub artifact: ChannelHalfLives,
    /// Characters forget fastest.
    #[serde(default = "default_npc_half_lives")]
    pub npc: ChannelHalfLives,
}

impl Default for HalfLifeTable {
    fn default() -> Self {
        Self {
            location: default_location_half_lives(),
            artifact: default_artifact_half_lives(),
            npc: default_npc_half_lives(),
        }
    }
}

impl HalfLifeTable {
    /// Row for an entity kind.
    #[must_use]
    pub fn for_kind(&self, kind: EntityKind) -> &ChannelHalfLives {
        match kind {
            EntityKind::Location => &self.location,
            EntityKind::Artifact => &self.artifact,
            EntityKind::Npc => &self.npc,
        }
    }
}

/// Blend weights for the three channels. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelWeights {
    /// Personal weight.
    #[serde(default = "default_0_5")]
    pub personal: f64,
    /// Group weight.
    #[serde(default = "default_0_35")]
    pub group: f64,
    /// Behavior weight.
    #[serde(default = "default_0_15")]
    pub behavior: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            personal: 0.5,
            group: 0.35,
            behavior: 0.15,
        }
    }
}

impl ChannelWeights {
    /// Weight for `channel`.
    #[must_use]
    pub fn for_channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Personal => self.personal,
            Channel::Group => self.group,
            Channel::Behavior => self.behavior,
        }
    }
}

/// Saturation: repeated same-channel events lose marginal effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationConfig {
    /// Events on the personal channel that take saturation from 0 to 1.
    #[serde(default = "default_50")]
    pub personal_capacity: f64,
    /// Events on the group channel that take saturation from 0 to 1.
    #[serde(default = "default_100")]
    pub group_capacity: f64,
    /// Events on the behavior channel that take saturation from 0 to 1.
    #[serde(default = "default_200")]
    pub behavior_capacity: f64,
    /// Fraction of saturation relieved per day.
    #[serde(default = "default_0_05")]
    pub decay_rate_per_day: f64,
    /// Saturation never decays below this.
    #[serde(default)]
    pub floor: f64,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self {
            personal_capacity: 50.0,
            group_capacity: 100.0,
            behavior_capacity: 200.0,
            decay_rate_per_day: 0.05,
            floor: 0.0,
        }
    }
}

impl SaturationConfig {
    /// Capacity for `channel`.
    #[must_use]
    pub fn capacity(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Personal => self.personal_capacity,
            Channel::Group => self.group_capacity,
            Channel::Behavior => self.behavior_capacity,
        }
    }
}

/// Memory tiering: hot detail, warm summaries, cold scars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Personal traces older than this are discarded.
    #[serde(default = "default_7")]
    pub hot_window_days: f64,
    /// Group traces older than this are folded to coarse categories.
    #[serde(default = "default_90")]
    pub warm_window_days: f64,
    /// Folded group traces above this magnitude leave a scar.
    #[serde(default = "default_0_7")]
    pub scar_intensity_threshold: f64,
    /// Scar half-life.
    #[serde(default = "default_365")]
    pub scar_half_life_days: f64,
    /// Traces whose decayed magnitude falls below this are pruned.
    #[serde(default = "default_0_01")]
    pub prune_threshold: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            hot_window_days: 7.0,
            warm_window_days: 90.0,
            scar_intensity_threshold: 0.7,
            scar_half_life_days: 365.0,
            prune_threshold: 0.01,
        }
    }
}

/// Periodic maintenance cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Minimum seconds between executed ticks.
    #[serde(default = "default_3600")]
    pub interval_secs: f64,
    /// Run compaction as part of every executed tick.
    #[serde(default = "default_true")]
    pub compact_on_tick: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600.0,
            compact_on_tick: true,
        }
    }
}

// Default value helpers for serde.
fn default_true() -> bool { true }
fn default_0_01() -> f64 { 0.01 }
fn default_0_05() -> f64 { 0.05 }
fn default_0_15() -> f64 { 0.15 }
fn default_0_35() -> f64 { 0.35 }
fn default_0_5() -> f64 { 0.5 }
fn default_0_7() -> f64 { 0.7 }
fn default_7() -> f64 { 7.0 }
fn default_50() -> f64 { 50.0 }
fn default_90() -> f64 { 90.0 }
fn default_100() -> f64 { 100.0 }
fn default_200() -> f64 { 200.0 }
fn default_365() -> f64 { 365.0 }
fn default_3600() -> f64 { 3600.0 }
fn default_affinity_scale() -> f64 { 10.0 }

fn default_location_half_lives() -> ChannelHalfLives {
    ChannelHalfLives { personal: 7.0, group: 30.0, behavior: 90.0 }
}

fn default_artifact_half_lives() -> ChannelHalfLives {
    ChannelHalfLives { personal: 3.0, group: 14.0, behavior: 30.0 }
}

fn default_npc_half_lives() -> ChannelHalfLives {
    ChannelHalfLives { personal: 1.0, group: 7.0, behavior: 14.0 }
}

fn default_institutional_tags() -> BTreeSet<String> {
    ["human", "elf", "dwarf", "orc", "imperial", "rebel"]
        .into_iter()
        .map(String::from)
        .collect()
}
