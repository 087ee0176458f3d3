//! Affordances: environmental effects gated by affinity.
//!
//! Every effect is described by one [`AffordanceDescriptor`] (thresholds,
//! clamps, handles, narrative pools, cooldown) and run through a single
//! evaluator. Adding an effect means adding a descriptor, not a function.
//!
//! - [`catalog`]: the stock descriptor table and content loading
//! - [`tells`]: narrative pools
//! - [`policy`]: enable, force and debug switches
//! - [`evaluator`]: the shared evaluation pipeline

pub mod catalog;
pub mod evaluator;
pub mod policy;
pub mod tells;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AffinityError;

pub use catalog::AffordanceCatalog;
pub use evaluator::{AffordanceContext, AffordanceOutcome, TriggeredEffect, evaluate_affordances};
pub use policy::AffordancePolicy;

/// Action type of an actor moving through a place without stopping.
///
/// A pass is answered only by descriptors flagged `on_pass`, so a single
/// step yields at most the path effect and a possible misdirection.
pub const PASS_ACTION: &str = "move.pass";

// ---------------------------------------------------------------------------
// Kinds and bands
// ---------------------------------------------------------------------------

/// The ten effect categories, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffordanceKind {
    /// Travel takes longer or shorter.
    PathFriction,
    /// Wildlife and foes gather or keep away.
    EncounterBias,
    /// Harvests come up thin or rich.
    ResourceYield,
    /// Spells are dampened or amplified.
    SpellPotency,
    /// Rest heals less or more.
    RestQuality,
    /// Atmospheric text only.
    AmbientFlavor,
    /// Found items are worse or better.
    LootQuality,
    /// Local weather text only.
    WeatherFlavor,
    /// Animal omen text only.
    MessengerFlavor,
    /// Rarely, travel ends somewhere else.
    Misdirection,
}

impl AffordanceKind {
    /// Every kind in evaluation order. Misdirection is always last.
    pub const ALL: [Self; 10] = [
        Self::PathFriction,
        Self::EncounterBias,
        Self::ResourceYield,
        Self::SpellPotency,
        Self::RestQuality,
        Self::AmbientFlavor,
        Self::LootQuality,
        Self::WeatherFlavor,
        Self::MessengerFlavor,
        Self::Misdirection,
    ];

    /// Snake-case name, also used in cooldown keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PathFriction => "path_friction",
            Self::EncounterBias => "encounter_bias",
            Self::ResourceYield => "resource_yield",
            Self::SpellPotency => "spell_potency",
            Self::RestQuality => "rest_quality",
            Self::AmbientFlavor => "ambient_flavor",
            Self::LootQuality => "loot_quality",
            Self::WeatherFlavor => "weather_flavor",
            Self::MessengerFlavor => "messenger_flavor",
            Self::Misdirection => "misdirection",
        }
    }
}

impl fmt::Display for AffordanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AffordanceKind {
    type Err = AffinityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AffinityError::UnknownAffordance(s.to_string()))
    }
}

/// Which side of neutral an evaluation resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// Below the hostile threshold.
    Hostile,
    /// Above the favorable threshold.
    Favorable,
}

impl Band {
    /// The affinity extreme this band ramps toward.
    #[must_use]
    pub const fn boundary(self) -> f64 {
        match self {
            Self::Hostile => -1.0,
            Self::Favorable => 1.0,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hostile => write!(f, "hostile"),
            Self::Favorable => write!(f, "favorable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Threshold, magnitude and effect label for one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    /// Affinity at which the band starts.
    pub threshold: f64,
    /// Severity reached at the affinity extreme. Signed.
    #[serde(default)]
    pub clamp: f64,
    /// Effect label recorded in snapshots (`slow`, `abundant`, ...).
    pub effect: String,
}

/// How a handle's value is derived once the band and severity are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum HandleRule {
    /// Severity times a per-band factor.
    Severity {
        /// Factor applied in the hostile band.
        hostile_factor: f64,
        /// Factor applied in the favorable band.
        favorable_factor: f64,
    },
    /// A constant per band.
    Fixed {
        /// Value in the hostile band.
        hostile: f64,
        /// Value in the favorable band.
        favorable: f64,
    },
}

impl HandleRule {
    /// Plain severity pass-through.
    pub const SEVERITY: Self = Self::Severity {
        hostile_factor: 1.0,
        favorable_factor: 1.0,
    };

    /// Value for `band` at `severity`.
    #[must_use]
    pub fn value(&self, band: Band, severity: f64) -> f64 {
        match (self, band) {
            (Self::Severity { hostile_factor, .. }, Band::Hostile) => severity * hostile_factor,
            (Self::Severity { favorable_factor, .. }, Band::Favorable) => severity * favorable_factor,
            (Self::Fixed { hostile, .. }, Band::Hostile) => *hostile,
            (Self::Fixed { favorable, .. }, Band::Favorable) => *favorable,
        }
    }
}

/// One named numeric output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleSpec {
    /// Engine-facing handle name; must be on the allowlist.
    pub handle: String,
    /// How its value is derived.
    #[serde(flatten)]
    pub rule: HandleRule,
}

impl HandleSpec {
    /// Handle carrying the severity unchanged.
    #[must_use]
    pub fn severity(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            rule: HandleRule::SEVERITY,
        }
    }

    /// Handle with an explicit rule.
    #[must_use]
    pub fn with_rule(handle: impl Into<String>, rule: HandleRule) -> Self {
        Self {
            handle: handle.into(),
            rule,
        }
    }
}

/// How the trigger probability is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRule {
    /// `base_probability` as-is.
    Flat,
    /// `base_probability × position`, position being the normalized distance past threshold.
    ScaledByDistance,
    /// The severity itself is the probability.
    ScaledBySeverity,
}

/// Extra penalty when the action's element is something the place hates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementPenalty {
    /// Category prefix joined with the element tag (`harm` → `harm.fire`).
    pub category_prefix: String,
    /// The penalty applies when that category's valuation is below this.
    pub valuation_below: f64,
    /// Added to the first handle.
    pub primary_delta: f64,
    /// Added to the second handle, if any.
    pub secondary_delta: f64,
}

/// A narrative intensity tier inside one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TellTier {
    /// Hostile tiers match `affinity ≤ bound`, favorable tiers `affinity ≥ bound`.
    pub bound: f64,
    /// Effect label for this tier.
    pub effect: String,
    /// Narrative pool.
    pub tells: Vec<String>,
}

/// Narrative pools for one affordance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum TellPools {
    /// One pool per band.
    Banded {
        /// Hostile pool.
        hostile: Vec<String>,
        /// Favorable pool.
        #[serde(default)]
        favorable: Vec<String>,
    },
    /// Several intensity tiers per band, most extreme first.
    Tiered {
        /// Hostile tiers.
        hostile: Vec<TellTier>,
        /// Favorable tiers.
        favorable: Vec<TellTier>,
    },
}

impl TellPools {
    /// Every (pool name, pool) pair, for validation.
    #[must_use]
    pub fn named_pools(&self) -> Vec<(String, &[String])> {
        match self {
            Self::Banded { hostile, favorable } => vec![
                ("hostile".to_string(), hostile.as_slice()),
                ("favorable".to_string(), favorable.as_slice()),
            ],
            Self::Tiered { hostile, favorable } => hostile
                .iter()
                .map(|tier| (format!("hostile_{}", tier.effect), tier.tells.as_slice()))
                .chain(
                    favorable
                        .iter()
                        .map(|tier| (format!("favorable_{}", tier.effect), tier.tells.as_slice())),
                )
                .collect(),
        }
    }
}

/// Everything that distinguishes one affordance from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordanceDescriptor {
    /// Which effect this is.
    pub kind: AffordanceKind,
    /// Seconds between triggers for one (actor, place); 0 disables the cooldown.
    #[serde(default)]
    pub cooldown_secs: f64,
    /// Hostile band, if the effect has one.
    #[serde(default)]
    pub hostile: Option<BandSpec>,
    /// Favorable band, if the effect has one.
    #[serde(default)]
    pub favorable: Option<BandSpec>,
    /// Trigger probability before scaling.
    pub base_probability: f64,
    /// How the probability is scaled.
    #[serde(default = "default_trigger")]
    pub trigger: TriggerRule,
    /// Numeric outputs, at most two.
    #[serde(default)]
    pub handles: Vec<HandleSpec>,
    /// Narrative pools.
    pub tells: TellPools,
    /// Action-type prefixes this effect answers; empty means every action.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Action type on which the trigger roll is skipped.
    #[serde(default)]
    pub guaranteed_action: Option<String>,
    /// Optional element penalty.
    #[serde(default)]
    pub element_penalty: Option<ElementPenalty>,
    /// Picks a redirect target from the caller's destinations.
    #[serde(default)]
    pub redirects: bool,
    /// Evaluated when the actor only passes through ([`PASS_ACTION`]).
    #[serde(default)]
    pub on_pass: bool,
}

fn default_trigger() -> TriggerRule {
    TriggerRule::Flat
}

impl AffordanceDescriptor {
    /// Band spec for `band`.
    #[must_use]
    pub fn band(&self, band: Band) -> Option<&BandSpec> {
        match band {
            Band::Hostile => self.hostile.as_ref(),
            Band::Favorable => self.favorable.as_ref(),
        }
    }

    /// Emits numeric adjustments (as opposed to narrative only).
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Whether this effect answers `action_type`.
    ///
    /// A prefix matches the whole action type or its part before the first `.`.
    /// A pass-through only reaches descriptors flagged `on_pass`.
    #[must_use]
    pub fn answers(&self, action_type: &str) -> bool {
        if action_type == PASS_ACTION {
            return self.on_pass;
        }
        self.actions.is_empty()
            || self.actions.iter().any(|prefix| {
                action_type == prefix || crate::types::coarse_category(action_type) == prefix
            })
    }
}
