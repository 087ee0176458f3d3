//! Core types shared across the affinity system.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AffinityError;

/// Seconds in one day; half-lives and windows are configured in days.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Separator joining the two halves of a composite trace key.
pub const KEY_SEPARATOR: &str = "::";

/// Escapes `:` and itself inside either half of an encoded key.
pub const KEY_ESCAPE: char = '\\';

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A caller-supplied point in time, in seconds.
///
/// The engine never reads a wall clock. Every operation that depends on time
/// takes one of these explicitly, which keeps evaluation replayable.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub f64);

impl Timestamp {
    /// Construct from seconds.
    #[must_use]
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Construct from days.
    #[must_use]
    pub fn from_days(days: f64) -> Self {
        Self(days * SECONDS_PER_DAY)
    }

    /// Seconds value.
    #[must_use]
    pub const fn secs(self) -> f64 {
        self.0
    }

    /// Signed seconds elapsed since `earlier` (negative if `earlier` is later).
    #[must_use]
    pub fn since(self, earlier: Self) -> f64 {
        self.0 - earlier.0
    }

    /// This timestamp shifted forward by `secs`.
    #[must_use]
    pub fn plus_secs(self, secs: f64) -> Self {
        Self(self.0 + secs)
    }

    /// This timestamp shifted forward by `days`.
    #[must_use]
    pub fn plus_days(self, days: f64) -> Self {
        self.plus_secs(days * SECONDS_PER_DAY)
    }

    /// Whole milliseconds, used for seed derivation.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn millis(self) -> i64 {
        (self.0 * 1000.0).floor() as i64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.3}s", self.0)
    }
}

// ---------------------------------------------------------------------------
// Classification enums
// ---------------------------------------------------------------------------

/// What kind of entity carries the memory. Selects the half-life row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A place in the world (room, grove, crossing).
    #[default]
    Location,
    /// A carried object that remembers its bearers.
    Artifact,
    /// A non-player character.
    Npc,
}

/// The three memory channels a place keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Memory of one specific actor.
    Personal,
    /// Memory of a social tag (faction, ancestry).
    Group,
    /// Memory of what was done, regardless of who did it.
    Behavior,
}

impl Channel {
    /// All channels in scoring order.
    pub const ALL: [Self; 3] = [Self::Personal, Self::Group, Self::Behavior];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Group => write!(f, "group"),
            Self::Behavior => write!(f, "behavior"),
        }
    }
}

/// Discrete band of an affinity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdLabel {
    /// affinity ≤ −0.7
    Hostile,
    /// −0.7 < affinity ≤ −0.3
    Unwelcoming,
    /// −0.3 < affinity ≤ 0.3
    Neutral,
    /// 0.3 < affinity ≤ 0.7
    Favorable,
    /// affinity > 0.7
    Aligned,
}

impl ThresholdLabel {
    /// Classify an affinity value. Boundaries belong to the lower band.
    #[must_use]
    pub fn from_affinity(affinity: f64) -> Self {
        match affinity {
            a if a <= -0.7 => Self::Hostile,
            a if a <= -0.3 => Self::Unwelcoming,
            a if a <= 0.3 => Self::Neutral,
            a if a <= 0.7 => Self::Favorable,
            _ => Self::Aligned,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hostile => "hostile",
            Self::Unwelcoming => "unwelcoming",
            Self::Neutral => "neutral",
            Self::Favorable => "favorable",
            Self::Aligned => "aligned",
        }
    }
}

impl fmt::Display for ThresholdLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Traces
// ---------------------------------------------------------------------------

/// Two-part key for personal (actor, category) and group (tag, category) traces.
///
/// Serializes as `"subject::category"` so trace maps persist as plain JSON
/// objects. Ordering is lexicographic on (subject, category), which keeps
/// every scan over a place's traces deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceKey {
    /// Actor id or social tag.
    pub subject: String,
    /// Event category, e.g. `harm.fire`.
    pub category: String,
}

impl TraceKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(subject: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            category: category.into(),
        }
    }

    /// Join into the composite persisted form.
    ///
    /// `:` and [`KEY_ESCAPE`] inside either half are escaped, so ids that
    /// themselves contain the separator survive a round trip.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.subject.len() + self.category.len() + KEY_SEPARATOR.len());
        escape_into(&self.subject, &mut out);
        out.push_str(KEY_SEPARATOR);
        escape_into(&self.category, &mut out);
        out
    }

    /// Split a composite key on its first unescaped separator.
    ///
    /// Escapes are undone in both halves. Unescaped colons after the
    /// separator are kept as category text.
    ///
    /// # Errors
    /// Returns [`AffinityError::MalformedTraceKey`] when the separator is missing.
    pub fn decode(raw: &str) -> crate::error::Result<Self> {
        let mut subject = String::new();
        let mut category = String::new();
        let mut in_category = false;
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            let part = if in_category { &mut category } else { &mut subject };
            match c {
                KEY_ESCAPE => part.push(chars.next().unwrap_or(KEY_ESCAPE)),
                ':' if !in_category && chars.peek() == Some(&':') => {
                    chars.next();
                    in_category = true;
                }
                c => part.push(c),
            }
        }
        if in_category {
            Ok(Self { subject, category })
        } else {
            Err(AffinityError::MalformedTraceKey(raw.to_string()))
        }
    }
}

fn escape_into(part: &str, out: &mut String) {
    for c in part.chars() {
        if c == ':' || c == KEY_ESCAPE {
            out.push(KEY_ESCAPE);
        }
        out.push(c);
    }
}

impl fmt::Display for TraceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for TraceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TraceKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}

/// Accumulated, time-decaying memory under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Signed running total, already decayed to `last_updated`.
    pub accumulated: f64,
    /// When `accumulated` was last brought current.
    pub last_updated: Timestamp,
    /// Events folded into this record.
    pub event_count: u32,
    /// Set once this record has produced a scar, so it never produces another.
    #[serde(default)]
    pub is_scar: bool,
}

impl TraceRecord {
    /// A fresh record holding a single contribution.
    #[must_use]
    pub fn new(accumulated: f64, at: Timestamp) -> Self {
        Self {
            accumulated,
            last_updated: at,
            event_count: 1,
            is_scar: false,
        }
    }
}

/// A permanent, slowly decaying mark left by a strong old group memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScarEvent {
    /// Coarse category (prefix before the first `.`).
    pub category: String,
    /// Social tags the scar attaches to.
    pub tags: BTreeSet<String>,
    /// Magnitude of the source trace when the scar formed.
    pub intensity: f64,
    /// Timestamp of the source trace.
    pub timestamp: Timestamp,
    /// Decay half-life in seconds.
    pub half_life_secs: f64,
}

impl ScarEvent {
    /// Intensity decayed to `now`.
    #[must_use]
    pub fn current_intensity(&self, now: Timestamp) -> f64 {
        crate::decay::decayed_value(self.intensity, self.timestamp, now, self.half_life_secs)
    }
}

/// Coarse form of a category: everything before the first `.`.
#[must_use]
pub fn coarse_category(category: &str) -> &str {
    category.split_once('.').map_or(category, |(head, _)| head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundaries_belong_to_lower_band() {
        assert_eq!(ThresholdLabel::from_affinity(-1.0), ThresholdLabel::Hostile);
        assert_eq!(ThresholdLabel::from_affinity(-0.7), ThresholdLabel::Hostile);
        assert_eq!(ThresholdLabel::from_affinity(-0.5), ThresholdLabel::Unwelcoming);
        assert_eq!(ThresholdLabel::from_affinity(-0.3), ThresholdLabel::Unwelcoming);
        assert_eq!(ThresholdLabel::from_affinity(0.0), ThresholdLabel::Neutral);
        assert_eq!(ThresholdLabel::from_affinity(0.3), ThresholdLabel::Neutral);
        assert_eq!(ThresholdLabel::from_affinity(0.7), ThresholdLabel::Favorable);
        assert_eq!(ThresholdLabel::from_affinity(0.71), ThresholdLabel::Aligned);
    }

    #[test]
    fn trace_key_splits_on_first_separator() {
        let key = TraceKey::decode("actor_1::harm.fire").expect("valid key");
        assert_eq!(key.subject, "actor_1");
        assert_eq!(key.category, "harm.fire");

        let nested = TraceKey::decode("a::b::c").expect("valid key");
        assert_eq!(nested.subject, "a");
        assert_eq!(nested.category, "b::c");
    }

    #[test]
    fn trace_key_without_separator_is_malformed() {
        assert!(matches!(
            TraceKey::decode("no-separator"),
            Err(AffinityError::MalformedTraceKey(_))
        ));
    }

    #[test]
    fn trace_key_serializes_as_string() {
        let key = TraceKey::new("elf", "trespass.enter");
        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, "\"elf::trespass.enter\"");
        let back: TraceKey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, key);
    }

    #[test]
    fn trace_key_escapes_separator_inside_parts() {
        let key = TraceKey::new("guild::bob", "harm:fire\\odd");
        let encoded = key.encode();
        assert_eq!(encoded, "guild\\:\\:bob::harm\\:fire\\\\odd");
        assert_eq!(TraceKey::decode(&encoded).expect("valid key"), key);
    }

    #[test]
    fn coarse_category_takes_prefix() {
        assert_eq!(coarse_category("harm.fire"), "harm");
        assert_eq!(coarse_category("harm"), "harm");
        assert_eq!(coarse_category("a.b.c"), "a");
    }

    #[test]
    fn timestamp_arithmetic() {
        let t = Timestamp::from_days(1.0);
        assert!((t.secs() - SECONDS_PER_DAY).abs() < f64::EPSILON);
        assert!((t.plus_days(1.0).since(t) - SECONDS_PER_DAY).abs() < f64::EPSILON);
        assert_eq!(Timestamp::from_secs(1.2345).millis(), 1234);
    }
}
