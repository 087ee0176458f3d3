//! A place's value system: how it feels about each kind of event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::coarse_category;

/// Category → valuation in [−1, 1].
///
/// Lookups fall back from a refined category (`harm.fire`) to its coarse
/// prefix (`harm`), and to 0.0 when neither is known. A place therefore
/// only needs to list what it actually cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuationProfile {
    values: BTreeMap<String, f64>,
}

impl ValuationProfile {
    /// Empty profile; every lookup returns 0.0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one valuation, clamped to [−1, 1]. Chainable.
    #[must_use]
    pub fn with(mut self, category: impl Into<String>, value: f64) -> Self {
        self.set(category, value);
        self
    }

    /// Set one valuation, clamped to [−1, 1].
    pub fn set(&mut self, category: impl Into<String>, value: f64) {
        self.values.insert(category.into(), value.clamp(-1.0, 1.0));
    }

    /// Valuation of `category`: exact match, else coarse prefix, else 0.0.
    #[must_use]
    pub fn lookup(&self, category: &str) -> f64 {
        if let Some(v) = self.values.get(category) {
            return *v;
        }
        self.values
            .get(coarse_category(category))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of explicit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the profile lists nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over explicit entries in category order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ValuationProfile {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut profile = Self::new();
        for (category, value) in iter {
            profile.set(category, value);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grove() -> ValuationProfile {
        ValuationProfile::new()
            .with("harm", -0.2)
            .with("harm.fire", -0.8)
            .with("magic", 0.1)
    }

    #[test]
    fn exact_match_wins() {
        assert!((grove().lookup("harm.fire") + 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn falls_back_to_coarse_prefix() {
        assert!((grove().lookup("harm.poison") + 0.2).abs() < f64::EPSILON);
        assert!((grove().lookup("magic.ward.deep") - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_is_zero() {
        assert!(grove().lookup("trade.silk").abs() < f64::EPSILON);
        assert!(ValuationProfile::new().lookup("anything").abs() < f64::EPSILON);
    }

    #[test]
    fn values_are_clamped() {
        let profile: ValuationProfile = [("harm", -3.0), ("help", 2.0)].into_iter().collect();
        assert!((profile.lookup("harm") + 1.0).abs() < f64::EPSILON);
        assert!((profile.lookup("help") - 1.0).abs() < f64::EPSILON);
    }
}
