//! Saturation: diminishing returns for repeated same-channel events.
//!
//! Each channel carries a level in [0, 1]. Incoming intensity is scaled by
//! `1 − s²`, so a fresh place reacts fully and a saturated one barely moves.
//! Levels rise with every recorded event and relax during ticks.

use serde::{Deserialize, Serialize};

use crate::config::SaturationConfig;
use crate::types::{Channel, SECONDS_PER_DAY};

/// Per-channel saturation levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SaturationState {
    /// Personal channel level.
    pub personal: f64,
    /// Group channel level.
    pub group: f64,
    /// Behavior channel level.
    pub behavior: f64,
}

impl SaturationState {
    /// Level for `channel`.
    #[must_use]
    pub fn level(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Personal => self.personal,
            Channel::Group => self.group,
            Channel::Behavior => self.behavior,
        }
    }

    fn level_mut(&mut self, channel: Channel) -> &mut f64 {
        match channel {
            Channel::Personal => &mut self.personal,
            Channel::Group => &mut self.group,
            Channel::Behavior => &mut self.behavior,
        }
    }

    /// Scale `intensity` by this channel's dampening factor.
    #[must_use]
    pub fn dampen(&self, channel: Channel, intensity: f64) -> f64 {
        dampened_intensity(intensity, self.level(channel))
    }

    /// Register one event on `channel`: the level rises by `1 / capacity`, capped at 1.
    pub fn absorb(&mut self, channel: Channel, config: &SaturationConfig) {
        let capacity = config.capacity(channel);
        if capacity <= 0.0 {
            return;
        }
        let level = self.level_mut(channel);
        *level = (*level + 1.0 / capacity).min(1.0);
    }

    /// Relax every channel for `elapsed_secs`. Returns true if any level changed.
    pub fn relax(&mut self, elapsed_secs: f64, config: &SaturationConfig) -> bool {
        if elapsed_secs <= 0.0 {
            return false;
        }
        let retain = (1.0 - config.decay_rate_per_day).powf(elapsed_secs / SECONDS_PER_DAY);
        let mut changed = false;
        for channel in Channel::ALL {
            let level = self.level_mut(channel);
            let next = (*level * retain).max(config.floor).min(*level);
            if next < *level {
                *level = next;
                changed = true;
            }
        }
        changed
    }
}

/// `intensity × (1 − saturation²)`, with saturation clamped to [0, 1].
#[must_use]
pub fn dampened_intensity(intensity: f64, saturation: f64) -> f64 {
    let s = saturation.clamp(0.0, 1.0);
    intensity * (1.0 - s * s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_channel_passes_full_intensity() {
        assert!((dampened_intensity(0.8, 0.0) - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn half_saturation_keeps_three_quarters() {
        assert!((dampened_intensity(1.0, 0.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn full_saturation_blocks_everything() {
        assert!(dampened_intensity(1.0, 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn absorb_rises_by_inverse_capacity_and_caps() {
        let config = SaturationConfig::default();
        let mut state = SaturationState::default();
        state.absorb(Channel::Personal, &config);
        assert!((state.personal - 0.02).abs() < 1e-12);
        assert!(state.group.abs() < f64::EPSILON);

        for _ in 0..500 {
            state.absorb(Channel::Behavior, &config);
        }
        assert!((state.behavior - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn relax_decays_five_percent_per_day() {
        let config = SaturationConfig::default();
        let mut state = SaturationState { personal: 1.0, group: 0.5, behavior: 0.0 };
        assert!(state.relax(SECONDS_PER_DAY, &config));
        assert!((state.personal - 0.95).abs() < 1e-12);
        assert!((state.group - 0.475).abs() < 1e-12);
        assert!(state.behavior.abs() < f64::EPSILON);
    }

    #[test]
    fn relax_respects_floor_and_reports_no_change() {
        let config = SaturationConfig { floor: 0.3, ..SaturationConfig::default() };
        let mut state = SaturationState { personal: 0.3, group: 0.2, behavior: 0.0 };
        assert!(!state.relax(30.0 * SECONDS_PER_DAY, &config));
        assert!((state.personal - 0.3).abs() < f64::EPSILON);
        assert!((state.group - 0.2).abs() < f64::EPSILON);
    }
}
