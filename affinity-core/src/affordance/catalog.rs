//! The affordance descriptor table.
//!
//! [`standard_descriptors`] is the stock tuning. Content packs may supply
//! their own table as TOML; either way the catalog is validated once, when
//! it is built, and is immutable afterwards.

use serde::Deserialize;
use tracing::info;

use super::tells::{self, pool};
use super::{
    AffordanceDescriptor, AffordanceKind, BandSpec, ElementPenalty, HandleRule, HandleSpec, PASS_ACTION, TellPools,
    TellTier, TriggerRule,
};
use crate::error::{AffinityError, Result};
use crate::validation::validate_descriptors;

/// A validated, evaluation-ordered set of descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct AffordanceCatalog {
    descriptors: Vec<AffordanceDescriptor>,
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    affordance: Vec<AffordanceDescriptor>,
}

impl AffordanceCatalog {
    /// Validate and order `descriptors`.
    ///
    /// # Errors
    /// Any handle, tell or threshold problem, or a kind defined twice.
    pub fn new(mut descriptors: Vec<AffordanceDescriptor>) -> Result<Self> {
        let tells_checked = validate_descriptors(&descriptors)?;
        descriptors.sort_by_key(|d| d.kind);
        if let Some(pair) = descriptors.windows(2).find(|pair| pair[0].kind == pair[1].kind) {
            return Err(AffinityError::InvalidDescriptor {
                affordance: pair[0].kind.to_string(),
                reason: "defined more than once".into(),
            });
        }
        info!(
            affordances = descriptors.len(),
            tells = tells_checked,
            "affordance catalog validated"
        );
        Ok(Self { descriptors })
    }

    /// The stock catalog.
    ///
    /// # Errors
    /// Only if the stock content itself is broken.
    pub fn standard() -> Result<Self> {
        Self::new(standard_descriptors())
    }

    /// Parse `[[affordance]]` tables from TOML and validate them.
    ///
    /// # Errors
    /// `AffinityError::Config` for malformed TOML, or any validation failure.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let doc: CatalogDocument = toml::from_str(toml_str).map_err(|e| AffinityError::Config(e.to_string()))?;
        Self::new(doc.affordance)
    }

    /// Descriptor for `kind`, if the catalog defines it.
    #[must_use]
    pub fn get(&self, kind: AffordanceKind) -> Option<&AffordanceDescriptor> {
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    /// Descriptors in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &AffordanceDescriptor> {
        self.descriptors.iter()
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True when the catalog defines nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn band(threshold: f64, clamp: f64, effect: &str) -> Option<BandSpec> {
    Some(BandSpec {
        threshold,
        clamp,
        effect: effect.to_string(),
    })
}

fn banded(hostile: &[&str], favorable: &[&str]) -> TellPools {
    TellPools::Banded {
        hostile: pool(hostile),
        favorable: pool(favorable),
    }
}

fn tier(bound: f64, effect: &str, lines: &[&str]) -> TellTier {
    TellTier {
        bound,
        effect: effect.to_string(),
        tells: pool(lines),
    }
}

fn actions(prefixes: &[&str]) -> Vec<String> {
    pool(prefixes)
}

/// The stock descriptor table.
#[must_use]
pub fn standard_descriptors() -> Vec<AffordanceDescriptor> {
    vec![
        AffordanceDescriptor {
            kind: AffordanceKind::PathFriction,
            cooldown_secs: 3_600.0,
            hostile: band(-0.3, 0.5, "slow"),
            favorable: band(0.3, -0.3, "swift"),
            base_probability: 0.7,
            trigger: TriggerRule::Flat,
            handles: vec![HandleSpec::severity("room.travel_time_modifier")],
            tells: banded(tells::PATH_HOSTILE, tells::PATH_FAVORABLE),
            actions: actions(&["move"]),
            guaranteed_action: Some(PASS_ACTION.to_string()),
            element_penalty: None,
            redirects: false,
            on_pass: true,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::EncounterBias,
            cooldown_secs: 1_800.0,
            hostile: band(-0.4, 1.0, "dangerous"),
            favorable: band(0.4, -0.5, "peaceful"),
            base_probability: 0.6,
            trigger: TriggerRule::Flat,
            handles: vec![
                HandleSpec::severity("room.encounter_rate_modifier"),
                HandleSpec::with_rule(
                    "npc.aggro_radius_modifier",
                    HandleRule::Severity {
                        hostile_factor: 0.5,
                        favorable_factor: 1.0,
                    },
                ),
            ],
            tells: banded(tells::ENCOUNTER_HOSTILE, tells::ENCOUNTER_FAVORABLE),
            actions: actions(&["move", "explore"]),
            guaranteed_action: None,
            element_penalty: None,
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::ResourceYield,
            cooldown_secs: 7_200.0,
            hostile: band(-0.25, -0.4, "scarce"),
            favorable: band(0.25, 0.4, "abundant"),
            base_probability: 0.8,
            trigger: TriggerRule::Flat,
            handles: vec![HandleSpec::severity("harvest.yield_modifier")],
            tells: banded(tells::RESOURCE_HOSTILE, tells::RESOURCE_FAVORABLE),
            actions: actions(&["harvest", "gather"]),
            guaranteed_action: None,
            element_penalty: None,
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::SpellPotency,
            cooldown_secs: 0.0,
            hostile: band(-0.35, -0.25, "dampened"),
            favorable: band(0.35, 0.25, "amplified"),
            base_probability: 0.5,
            trigger: TriggerRule::Flat,
            handles: vec![
                HandleSpec::severity("spell.power_modifier"),
                HandleSpec::with_rule(
                    "spell.backfire_chance",
                    HandleRule::Fixed {
                        hostile: 0.1,
                        favorable: -0.05,
                    },
                ),
            ],
            tells: banded(tells::SPELL_HOSTILE, tells::SPELL_FAVORABLE),
            actions: actions(&["cast"]),
            guaranteed_action: None,
            element_penalty: Some(ElementPenalty {
                category_prefix: "harm".to_string(),
                valuation_below: -0.5,
                primary_delta: -0.15,
                secondary_delta: 0.1,
            }),
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::RestQuality,
            cooldown_secs: 28_800.0,
            hostile: band(-0.2, -0.3, "restless"),
            favorable: band(0.2, 0.3, "restorative"),
            base_probability: 0.9,
            trigger: TriggerRule::Flat,
            handles: vec![HandleSpec::severity("rest.healing_modifier")],
            tells: banded(tells::REST_HOSTILE, tells::REST_FAVORABLE),
            actions: actions(&["rest", "sleep"]),
            guaranteed_action: None,
            element_penalty: None,
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::AmbientFlavor,
            cooldown_secs: 3_600.0,
            hostile: band(-0.25, 0.0, "uneasy"),
            favorable: band(0.25, 0.0, "pleasant"),
            base_probability: 0.6,
            trigger: TriggerRule::ScaledByDistance,
            handles: Vec::new(),
            tells: TellPools::Tiered {
                hostile: vec![
                    tier(-0.8, "menacing", tells::AMBIENT_MENACING),
                    tier(-0.6, "oppressive", tells::AMBIENT_OPPRESSIVE),
                    tier(-0.4, "watchful", tells::AMBIENT_WATCHFUL),
                    tier(-0.25, "uneasy", tells::AMBIENT_UNEASY),
                ],
                favorable: vec![
                    tier(0.8, "blessed", tells::AMBIENT_BLESSED),
                    tier(0.6, "protected", tells::AMBIENT_PROTECTED),
                    tier(0.4, "welcoming", tells::AMBIENT_WELCOMING),
                    tier(0.25, "pleasant", tells::AMBIENT_PLEASANT),
                ],
            },
            actions: Vec::new(),
            guaranteed_action: None,
            element_penalty: None,
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::LootQuality,
            cooldown_secs: 3_600.0,
            hostile: band(-0.3, -2.0, "poor"),
            favorable: band(0.3, 2.0, "rich"),
            base_probability: 0.7,
            trigger: TriggerRule::Flat,
            handles: vec![HandleSpec::severity("loot.quality_modifier")],
            tells: banded(tells::LOOT_HOSTILE, tells::LOOT_FAVORABLE),
            actions: actions(&["loot", "search"]),
            guaranteed_action: None,
            element_penalty: None,
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::WeatherFlavor,
            cooldown_secs: 14_400.0,
            hostile: band(-0.4, 0.0, "harsh"),
            favorable: band(0.4, 0.0, "mild"),
            base_probability: 0.5,
            trigger: TriggerRule::ScaledByDistance,
            handles: Vec::new(),
            tells: banded(tells::WEATHER_HOSTILE, tells::WEATHER_FAVORABLE),
            actions: Vec::new(),
            guaranteed_action: None,
            element_penalty: None,
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::MessengerFlavor,
            cooldown_secs: 7_200.0,
            hostile: band(-0.25, 0.0, "ominous"),
            favorable: band(0.25, 0.0, "auspicious"),
            base_probability: 0.5,
            trigger: TriggerRule::ScaledByDistance,
            handles: Vec::new(),
            tells: banded(tells::MESSENGER_HOSTILE, tells::MESSENGER_FAVORABLE),
            actions: Vec::new(),
            guaranteed_action: None,
            element_penalty: None,
            redirects: false,
            on_pass: false,
        },
        AffordanceDescriptor {
            kind: AffordanceKind::Misdirection,
            cooldown_secs: 14_400.0,
            hostile: band(-0.5, 0.15, "redirect"),
            favorable: None,
            base_probability: 0.05,
            trigger: TriggerRule::ScaledBySeverity,
            handles: Vec::new(),
            tells: banded(tells::MISDIRECTION_HOSTILE, &[]),
            actions: actions(&["move"]),
            guaranteed_action: None,
            element_penalty: None,
            redirects: true,
            on_pass: true,
        },
    ]
}
