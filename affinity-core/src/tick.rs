//! Periodic maintenance.
//!
//! A tick is cheap to call every frame: inside the configured interval it
//! returns an all-zero report and touches nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compaction::{CompactionReport, compact, prune};
use crate::config::AffinityConfig;
use crate::place::Place;
use crate::types::Timestamp;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// False when the call fell inside the interval and did nothing.
    pub ran: bool,
    /// Prune and compaction counts. Only `pruned` is set when compaction is off.
    pub compaction: CompactionReport,
    /// Cooldowns whose expiry had passed.
    pub cooldowns_expired: usize,
    /// Whether any saturation level relaxed.
    pub saturation_changed: bool,
}

/// Run maintenance on `place` if at least one interval has passed since the last run.
///
/// Order: prune (and compact when `compact_on_tick`), expire cooldowns,
/// relax saturation by the time since the last run, then stamp `last_tick`.
pub fn tick(place: &mut Place, now: Timestamp, config: &AffinityConfig) -> TickReport {
    let elapsed = now.since(place.last_tick);
    if elapsed < config.tick.interval_secs {
        return TickReport::default();
    }

    let compaction = if config.tick.compact_on_tick {
        compact(place, now, config)
    } else {
        CompactionReport {
            pruned: prune(place, config.compaction.prune_threshold, now, config),
            ..CompactionReport::default()
        }
    };
    let cooldowns_expired = place.cooldowns.clear_expired(now);
    let saturation_changed = place.saturation.relax(elapsed, &config.saturation);
    place.last_tick = now;

    let report = TickReport {
        ran: true,
        compaction,
        cooldowns_expired,
        saturation_changed,
    };
    if report.compaction.is_empty() && cooldowns_expired == 0 {
        debug!(place = %place.id, saturation_changed, "tick");
    } else {
        info!(
            place = %place.id,
            discarded = report.compaction.discarded_count(),
            folded = report.compaction.folded,
            scars = report.compaction.scars_created,
            cooldowns_expired,
            saturation_changed,
            "tick maintenance"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::types::{SECONDS_PER_DAY, TraceKey, TraceRecord};
    use crate::valuation::ValuationProfile;

    fn place() -> Place {
        Place::new("well", "Village Well", ValuationProfile::new())
    }

    #[test]
    fn repeat_within_interval_is_all_zero() {
        let config = AffinityConfig::default();
        let mut place = place();
        place.cooldowns.consume("path_friction:kira:well", 10.0, Timestamp::from_secs(0.0));

        let first = tick(&mut place, Timestamp::from_secs(5_000.0), &config);
        assert!(first.ran);
        assert_eq!(first.cooldowns_expired, 1);

        let second = tick(&mut place, Timestamp::from_secs(5_100.0), &config);
        assert_eq!(second, TickReport::default());
        assert_eq!(place.last_tick, Timestamp::from_secs(5_000.0));
    }

    #[test]
    fn only_expired_cooldowns_are_cleared() {
        let config = AffinityConfig::default();
        let mut place = place();
        let t0 = Timestamp::from_secs(10_000.0);
        place.cooldowns.consume("rest_quality:kira:well", 28_800.0, t0);
        place.cooldowns.consume("path_friction:kira:well", 3_600.0, t0);

        let report = tick(&mut place, t0.plus_secs(3_600.0), &config);
        assert_eq!(report.cooldowns_expired, 1);
        assert_eq!(place.cooldowns.len(), 1);
        assert!(place.cooldowns.is_active("rest_quality:kira:well", t0.plus_secs(3_600.0)));
    }

    #[test]
    fn saturation_relaxes_with_elapsed_time() {
        let config = AffinityConfig::default();
        let mut place = place();
        place.saturation.personal = 0.8;
        place.last_tick = Timestamp::from_secs(0.0);

        let report = tick(&mut place, Timestamp::from_secs(SECONDS_PER_DAY), &config);
        assert!(report.saturation_changed);
        assert!((place.saturation.personal - 0.8 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn tick_reports_real_compaction_counts() {
        let mut config = AffinityConfig::default();
        config.institutional_tags = BTreeSet::from(["guard".to_string()]);
        let mut place = place();
        let now = Timestamp::from_secs(100.0 * SECONDS_PER_DAY);
        place.personal_traces.insert(TraceKey::new("kira", "harm"), TraceRecord::new(9.0, now.plus_days(-8.0)));
        place.group_traces.insert(TraceKey::new("guard", "harm.fire"), TraceRecord::new(9.0, now.plus_days(-95.0)));

        let report = tick(&mut place, now, &config);
        assert_eq!(report.compaction.personal_discarded, 1);
        assert_eq!(report.compaction.folded, 1);
        assert_eq!(report.compaction.scars_created, 1);
        assert_eq!(place.scars.len(), 1);
    }

    #[test]
    fn compaction_can_be_switched_off() {
        let mut config = AffinityConfig::default();
        config.tick.compact_on_tick = false;
        let mut place = place();
        let now = Timestamp::from_secs(100.0 * SECONDS_PER_DAY);
        place.personal_traces.insert(TraceKey::new("kira", "harm"), TraceRecord::new(9.0, now.plus_days(-8.0)));
        place.behavior_traces.insert("harm".into(), TraceRecord::new(0.001, now));

        let report = tick(&mut place, now, &config);
        assert_eq!(report.compaction.pruned, 1);
        assert_eq!(report.compaction.personal_discarded, 0);
        assert_eq!(place.personal_traces.len(), 1);
    }
}
