//! Persisted runtime state of a place.
//!
//! The engine never touches disk. A collaborator captures a [`PlaceState`],
//! stores it however it likes (the JSON helpers here are the usual route),
//! and restores it into a place built from static content.
//!
//! Trace maps are keyed by `subject::category` strings on the wire, with
//! colons inside either half escaped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cooldown::CooldownLedger;
use crate::error::{AffinityError, Result};
use crate::place::Place;
use crate::saturation::SaturationState;
use crate::types::{ScarEvent, Timestamp, TraceKey, TraceRecord};

/// Everything about a place that changes during play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceState {
    /// Place this state belongs to.
    pub place_id: String,
    /// Personal traces.
    pub personal_traces: BTreeMap<TraceKey, TraceRecord>,
    /// Group traces.
    pub group_traces: BTreeMap<TraceKey, TraceRecord>,
    /// Behavior traces.
    pub behavior_traces: BTreeMap<String, TraceRecord>,
    /// Saturation levels.
    pub saturation: SaturationState,
    /// Cooldown expiries.
    pub cooldowns: CooldownLedger,
    /// Scars.
    pub scars: Vec<ScarEvent>,
    /// Last executed tick.
    pub last_tick: Timestamp,
}

/// Wire form with raw string keys, so a bad key surfaces as its own error.
#[derive(Deserialize)]
struct RawPlaceState {
    place_id: String,
    #[serde(default)]
    personal_traces: BTreeMap<String, TraceRecord>,
    #[serde(default)]
    group_traces: BTreeMap<String, TraceRecord>,
    #[serde(default)]
    behavior_traces: BTreeMap<String, TraceRecord>,
    #[serde(default)]
    saturation: SaturationState,
    #[serde(default)]
    cooldowns: CooldownLedger,
    #[serde(default)]
    scars: Vec<ScarEvent>,
    #[serde(default)]
    last_tick: Timestamp,
}

fn decode_keys(raw: BTreeMap<String, TraceRecord>) -> Result<BTreeMap<TraceKey, TraceRecord>> {
    raw.into_iter()
        .map(|(key, record)| Ok((TraceKey::decode(&key)?, record)))
        .collect()
}

impl TryFrom<RawPlaceState> for PlaceState {
    type Error = AffinityError;

    fn try_from(raw: RawPlaceState) -> Result<Self> {
        Ok(Self {
            place_id: raw.place_id,
            personal_traces: decode_keys(raw.personal_traces)?,
            group_traces: decode_keys(raw.group_traces)?,
            behavior_traces: raw.behavior_traces,
            saturation: raw.saturation,
            cooldowns: raw.cooldowns,
            scars: raw.scars,
            last_tick: raw.last_tick,
        })
    }
}

impl PlaceState {
    /// Serialize to JSON.
    ///
    /// # Errors
    /// `AffinityError::Serialization` on encoder failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    /// `AffinityError::MalformedTraceKey` for a trace key without `::`,
    /// `AffinityError::Serialization` for anything else malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawPlaceState = serde_json::from_str(json)?;
        raw.try_into()
    }
}

impl Place {
    /// Copy out the runtime state.
    #[must_use]
    pub fn capture_state(&self) -> PlaceState {
        PlaceState {
            place_id: self.id.clone(),
            personal_traces: self.personal_traces.clone(),
            group_traces: self.group_traces.clone(),
            behavior_traces: self.behavior_traces.clone(),
            saturation: self.saturation,
            cooldowns: self.cooldowns.clone(),
            scars: self.scars.clone(),
            last_tick: self.last_tick,
        }
    }

    /// Replace the runtime state with `state`.
    ///
    /// # Errors
    /// [`AffinityError::StateMismatch`] if `state` belongs to another place.
    pub fn restore_state(&mut self, state: PlaceState) -> Result<()> {
        if state.place_id != self.id {
            return Err(AffinityError::StateMismatch {
                expected: self.id.clone(),
                found: state.place_id,
            });
        }
        self.personal_traces = state.personal_traces;
        self.group_traces = state.group_traces;
        self.behavior_traces = state.behavior_traces;
        self.saturation = state.saturation;
        self.cooldowns = state.cooldowns;
        self.scars = state.scars;
        self.last_tick = state.last_tick;
        debug!(place = %self.id, traces = self.trace_count(), scars = self.scars.len(), "restored place state");
        Ok(())
    }
}
