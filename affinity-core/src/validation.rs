//! Content validation for affordance definitions.
//!
//! Runs when a catalog is built, so bad content fails at load time instead
//! of during play:
//!   1. Handles must be on the engine allowlist.
//!   2. No affordance may emit more than two handles.
//!   3. Narrative text must not leak mechanics (band names, numbers).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::affordance::AffordanceDescriptor;
use crate::error::{AffinityError, Result};

/// Most handles one affordance may write.
pub const MAX_HANDLES: usize = 2;

/// Engine handles affordances are allowed to write.
pub const HANDLE_ALLOWLIST: &[&str] = &[
    "room.travel_time_modifier",
    "room.encounter_rate_modifier",
    "room.redirect_target",
    "npc.aggro_radius_modifier",
    "npc.disposition_modifier",
    "spell.power_modifier",
    "spell.backfire_chance",
    "spell.cost_modifier",
    "harvest.yield_modifier",
    "harvest.quality_modifier",
    "rest.healing_modifier",
    "rest.duration_modifier",
    "loot.quality_modifier",
    "loot.quantity_modifier",
    "actor.stamina_modifier",
    "actor.luck_modifier",
    "action.skill_modifier",
];

/// (label, pattern) pairs no tell may match.
const FORBIDDEN_TELL_SOURCES: &[(&str, &str)] = &[
    ("affinity", r"(?i)affinity"),
    ("reputation", r"(?i)reputation"),
    ("score", r"(?i)score"),
    ("points", r"(?i)points"),
    ("meter", r"(?i)meter"),
    ("hostile", r"(?i)hostile"),
    ("favorable", r"(?i)favorable"),
    ("neutral", r"(?i)neutral"),
    ("unwelcoming", r"(?i)unwelcoming"),
    ("aligned", r"(?i)aligned"),
    ("%", r"%"),
    ("signed number", r"[+-]\d"),
];

// Constant patterns, checked by `every_forbidden_pattern_compiles`.
#[allow(clippy::expect_used)]
static FORBIDDEN_TELL_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    FORBIDDEN_TELL_SOURCES
        .iter()
        .map(|&(label, pattern)| (label, Regex::new(pattern).expect("forbidden tell pattern compiles")))
        .collect()
});

/// Whether `handle` is on the allowlist.
#[must_use]
pub fn is_allowed_handle(handle: &str) -> bool {
    HANDLE_ALLOWLIST.contains(&handle)
}

/// Check one handle.
///
/// # Errors
/// [`AffinityError::HandleNotAllowed`] if the handle is unknown to the engine.
pub fn validate_handle(handle: &str, affordance: &str) -> Result<()> {
    if is_allowed_handle(handle) {
        Ok(())
    } else {
        Err(AffinityError::HandleNotAllowed {
            affordance: affordance.to_string(),
            handle: handle.to_string(),
        })
    }
}

/// Check the handle count.
///
/// # Errors
/// [`AffinityError::TooManyHandles`] above [`MAX_HANDLES`].
pub fn validate_handle_count(count: usize, affordance: &str) -> Result<()> {
    if count > MAX_HANDLES {
        return Err(AffinityError::TooManyHandles {
            affordance: affordance.to_string(),
            count,
            max: MAX_HANDLES,
        });
    }
    Ok(())
}

/// The first forbidden pattern `tell` matches, if any.
#[must_use]
pub fn forbidden_pattern(tell: &str) -> Option<&'static str> {
    FORBIDDEN_TELL_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(tell))
        .map(|(label, _)| *label)
}

/// Check one narrative string.
///
/// # Errors
/// [`AffinityError::ForbiddenTell`] if it leaks mechanics.
pub fn validate_tell(tell: &str, affordance: &str, pool: &str) -> Result<()> {
    match forbidden_pattern(tell) {
        None => Ok(()),
        Some(pattern) => Err(AffinityError::ForbiddenTell {
            affordance: affordance.to_string(),
            pool: pool.to_string(),
            pattern: pattern.to_string(),
            tell: tell.to_string(),
        }),
    }
}

/// Every problem with one descriptor. Empty means valid.
#[must_use]
pub fn descriptor_errors(descriptor: &AffordanceDescriptor) -> Vec<AffinityError> {
    let name = descriptor.kind.as_str();
    let mut errors = Vec::new();

    if let Err(e) = validate_handle_count(descriptor.handles.len(), name) {
        errors.push(e);
    }
    for spec in &descriptor.handles {
        if let Err(e) = validate_handle(&spec.handle, name) {
            errors.push(e);
        }
    }
    if descriptor.redirects {
        if let Err(e) = validate_handle("room.redirect_target", name) {
            errors.push(e);
        }
    }

    let invalid = |reason: &str| AffinityError::InvalidDescriptor {
        affordance: name.to_string(),
        reason: reason.to_string(),
    };
    if descriptor.hostile.is_none() && descriptor.favorable.is_none() {
        errors.push(invalid("no band defined"));
    }
    if let Some(band) = &descriptor.hostile {
        if !(-1.0..0.0).contains(&band.threshold) {
            errors.push(invalid("hostile threshold must lie in [-1, 0)"));
        }
    }
    if let Some(band) = &descriptor.favorable {
        if band.threshold <= 0.0 || band.threshold >= 1.0 {
            errors.push(invalid("favorable threshold must lie in (0, 1)"));
        }
    }
    if !(0.0..=1.0).contains(&descriptor.base_probability) {
        errors.push(invalid("base probability must lie in [0, 1]"));
    }
    if descriptor.cooldown_secs < 0.0 {
        errors.push(invalid("cooldown must not be negative"));
    }

    for (pool_name, tells) in descriptor.tells.named_pools() {
        let band_defined = if pool_name.starts_with("hostile") {
            descriptor.hostile.is_some()
        } else {
            descriptor.favorable.is_some()
        };
        if band_defined && tells.is_empty() {
            errors.push(AffinityError::EmptyTellPool {
                affordance: name.to_string(),
                pool: pool_name.clone(),
            });
        }
        for tell in tells {
            if let Err(e) = validate_tell(tell, name, &pool_name) {
                errors.push(e);
            }
        }
    }
    errors
}

/// Validate a set of descriptors, collecting every failure.
///
/// Returns the number of tells checked.
///
/// # Errors
/// A single error when exactly one check fails, otherwise
/// [`AffinityError::CatalogInvalid`] carrying all of them.
pub fn validate_descriptors<'a, I>(descriptors: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a AffordanceDescriptor>,
{
    let mut errors = Vec::new();
    let mut tells_checked = 0;
    for descriptor in descriptors {
        tells_checked += descriptor
            .tells
            .named_pools()
            .iter()
            .map(|(_, tells)| tells.len())
            .sum::<usize>();
        errors.extend(descriptor_errors(descriptor));
    }
    match errors.len() {
        0 => Ok(tells_checked),
        1 => Err(errors.remove(0)),
        _ => Err(AffinityError::CatalogInvalid(errors)),
    }
}

/// Check an outcome's adjustments against the allowlist and cap.
///
/// # Errors
/// [`AffinityError::TooManyHandles`] or [`AffinityError::HandleNotAllowed`].
pub fn validate_adjustments(adjustments: &BTreeMap<String, f64>, affordance: &str) -> Result<()> {
    validate_handle_count(adjustments.len(), affordance)?;
    for handle in adjustments.keys() {
        validate_handle(handle, affordance)?;
    }
    Ok(())
}
