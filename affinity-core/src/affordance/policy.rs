//! Operator switches for affordances: enable, force a band, debug logging.
//!
//! A policy is a plain value handed to every evaluation. Two evaluations
//! with equal policies and equal inputs produce equal outcomes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{AffordanceKind, Band};

/// Per-affordance overrides. The default enables everything and forces nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffordancePolicy {
    /// Affordances switched off.
    #[serde(default)]
    pub disabled: BTreeSet<AffordanceKind>,
    /// Affordances pinned to a band regardless of real affinity.
    #[serde(default)]
    pub forced: BTreeMap<AffordanceKind, Band>,
    /// Affordances whose every evaluation is logged with full diagnostics.
    #[serde(default)]
    pub debug: BTreeSet<AffordanceKind>,
}

impl AffordancePolicy {
    /// Everything enabled, nothing forced.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` participates in evaluation.
    #[must_use]
    pub fn is_enabled(&self, kind: AffordanceKind) -> bool {
        !self.disabled.contains(&kind)
    }

    /// Switch `kind` on or off.
    pub fn set_enabled(&mut self, kind: AffordanceKind, enabled: bool) {
        if enabled {
            self.disabled.remove(&kind);
        } else {
            self.disabled.insert(kind);
        }
    }

    /// Band `kind` is pinned to, if any.
    #[must_use]
    pub fn forced_band(&self, kind: AffordanceKind) -> Option<Band> {
        self.forced.get(&kind).copied()
    }

    /// Pin `kind` to `band`, or release it with `None`.
    pub fn force(&mut self, kind: AffordanceKind, band: Option<Band>) {
        match band {
            Some(band) => {
                self.forced.insert(kind, band);
            }
            None => {
                self.forced.remove(&kind);
            }
        }
    }

    /// Release every forced band. Returns how many were released.
    pub fn clear_forced(&mut self) -> usize {
        let count = self.forced.len();
        self.forced.clear();
        count
    }

    /// Whether `kind` logs full diagnostics.
    #[must_use]
    pub fn is_debug(&self, kind: AffordanceKind) -> bool {
        self.debug.contains(&kind)
    }

    /// Toggle diagnostics for `kind`.
    pub fn set_debug(&mut self, kind: AffordanceKind, on: bool) {
        if on {
            self.debug.insert(kind);
        } else {
            self.debug.remove(&kind);
        }
    }
}
