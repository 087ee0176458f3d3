//! Per-(affordance, actor, place) cooldowns.
//!
//! A cooldown stores its expiry. It is active while `expiry > now` and is
//! cleared by the tick once `now >= expiry`. Missing keys are simply inactive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Cooldown expiries keyed by `"{affordance}:{actor}:{place}"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CooldownLedger {
    expiries: BTreeMap<String, Timestamp>,
}

impl CooldownLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose the ledger key for one affordance, actor and place.
    #[must_use]
    pub fn key(affordance: &str, actor_id: &str, place_id: &str) -> String {
        format!("{affordance}:{actor_id}:{place_id}")
    }

    /// Whether `key` is still cooling down at `now`.
    #[must_use]
    pub fn is_active(&self, key: &str, now: Timestamp) -> bool {
        self.expiries.get(key).is_some_and(|expiry| *expiry > now)
    }

    /// Seconds until `key` expires, or 0.0 if inactive.
    #[must_use]
    pub fn remaining(&self, key: &str, now: Timestamp) -> f64 {
        self.expiries
            .get(key)
            .map_or(0.0, |expiry| expiry.since(now).max(0.0))
    }

    /// Start a cooldown of `duration_secs` from `now`.
    pub fn consume(&mut self, key: impl Into<String>, duration_secs: f64, now: Timestamp) {
        self.expiries.insert(key.into(), now.plus_secs(duration_secs));
    }

    /// Drop every cooldown with `expiry <= now`. Returns how many were dropped.
    pub fn clear_expired(&mut self, now: Timestamp) -> usize {
        let before = self.expiries.len();
        self.expiries.retain(|_, expiry| *expiry > now);
        before - self.expiries.len()
    }

    /// Drop every cooldown, active or not. Returns how many were dropped.
    pub fn reset(&mut self) -> usize {
        let count = self.expiries.len();
        self.expiries.clear();
        count
    }

    /// Number of stored cooldowns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    /// True when no cooldowns are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    /// Iterate over (key, expiry) pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Timestamp)> {
        self.expiries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        assert_eq!(CooldownLedger::key("path_friction", "kira", "grove"), "path_friction:kira:grove");
    }

    #[test]
    fn active_until_expiry() {
        let mut ledger = CooldownLedger::new();
        let t0 = Timestamp::from_secs(100.0);
        ledger.consume("k", 60.0, t0);
        assert!(ledger.is_active("k", t0));
        assert!(ledger.is_active("k", t0.plus_secs(59.0)));
        assert!(!ledger.is_active("k", t0.plus_secs(60.0)));
        assert!((ledger.remaining("k", t0.plus_secs(20.0)) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_key_is_inactive() {
        let ledger = CooldownLedger::new();
        assert!(!ledger.is_active("missing", Timestamp::from_secs(0.0)));
        assert!(ledger.remaining("missing", Timestamp::from_secs(0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn clear_expired_drops_at_expiry() {
        let mut ledger = CooldownLedger::new();
        let t0 = Timestamp::from_secs(0.0);
        ledger.consume("short", 10.0, t0);
        ledger.consume("long", 100.0, t0);
        assert_eq!(ledger.clear_expired(t0.plus_secs(10.0)), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_active("long", t0.plus_secs(10.0)));
    }

    #[test]
    fn reset_clears_everything() {
        let mut ledger = CooldownLedger::new();
        ledger.consume("a", 10.0, Timestamp::from_secs(0.0));
        ledger.consume("b", 10.0, Timestamp::from_secs(0.0));
        assert_eq!(ledger.reset(), 2);
        assert!(ledger.is_empty());
    }
}
