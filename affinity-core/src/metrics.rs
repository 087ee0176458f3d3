//! Runtime counters.
//!
//! Lock-free `AtomicU64` counters bumped on the hot path and read on export.
//! Every engine call in this crate is synchronous, so `Relaxed` ordering is
//! enough: a snapshot is a consistent-enough view for dashboards.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compaction::CompactionReport;

/// Atomic counters for engine activity.
#[derive(Debug)]
pub struct AffinityCounters {
    /// Events recorded.
    pub events_recorded: AtomicU64,
    /// Affordance evaluations.
    pub evaluations: AtomicU64,
    /// Individual affordances that fired.
    pub triggers: AtomicU64,
    /// Cooldowns started.
    pub cooldowns_consumed: AtomicU64,
    /// Traces pruned for low magnitude.
    pub traces_pruned: AtomicU64,
    /// Traces discarded by tiering.
    pub traces_discarded: AtomicU64,
    /// Group traces folded into coarse keys.
    pub traces_folded: AtomicU64,
    /// Scars created.
    pub scars_created: AtomicU64,
    /// Ticks that actually ran.
    pub ticks_run: AtomicU64,
    /// Snapshots that failed verification.
    pub snapshot_drift: AtomicU64,
}

impl AffinityCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events_recorded: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
            triggers: AtomicU64::new(0),
            cooldowns_consumed: AtomicU64::new(0),
            traces_pruned: AtomicU64::new(0),
            traces_discarded: AtomicU64::new(0),
            traces_folded: AtomicU64::new(0),
            scars_created: AtomicU64::new(0),
            ticks_run: AtomicU64::new(0),
            snapshot_drift: AtomicU64::new(0),
        }
    }

    /// Add the counts from one compaction or tick.
    pub fn add_compaction(&self, report: &CompactionReport) {
        self.traces_pruned.fetch_add(report.pruned as u64, Ordering::Relaxed);
        self.traces_discarded.fetch_add(
            (report.personal_discarded + report.group_discarded) as u64,
            Ordering::Relaxed,
        );
        self.traces_folded.fetch_add(report.folded as u64, Ordering::Relaxed);
        self.scars_created.fetch_add(report.scars_created as u64, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            triggers: self.triggers.load(Ordering::Relaxed),
            cooldowns_consumed: self.cooldowns_consumed.load(Ordering::Relaxed),
            traces_pruned: self.traces_pruned.load(Ordering::Relaxed),
            traces_discarded: self.traces_discarded.load(Ordering::Relaxed),
            traces_folded: self.traces_folded.load(Ordering::Relaxed),
            scars_created: self.scars_created.load(Ordering::Relaxed),
            ticks_run: self.ticks_run.load(Ordering::Relaxed),
            snapshot_drift: self.snapshot_drift.load(Ordering::Relaxed),
        }
    }
}

impl Default for AffinityCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Events recorded.
    pub events_recorded: u64,
    /// Affordance evaluations.
    pub evaluations: u64,
    /// Affordances fired.
    pub triggers: u64,
    /// Cooldowns started.
    pub cooldowns_consumed: u64,
    /// Traces pruned.
    pub traces_pruned: u64,
    /// Traces discarded by tiering.
    pub traces_discarded: u64,
    /// Traces folded.
    pub traces_folded: u64,
    /// Scars created.
    pub scars_created: u64,
    /// Ticks run.
    pub ticks_run: u64,
    /// Snapshots that failed verification.
    pub snapshot_drift: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            ("events_recorded", "Affinity events recorded", self.events_recorded),
            ("evaluations", "Affordance evaluations", self.evaluations),
            ("triggers", "Affordances triggered", self.triggers),
            ("cooldowns_consumed", "Affordance cooldowns started", self.cooldowns_consumed),
            ("traces_pruned", "Traces pruned below magnitude threshold", self.traces_pruned),
            ("traces_discarded", "Traces discarded by tiering", self.traces_discarded),
            ("traces_folded", "Group traces folded to coarse categories", self.traces_folded),
            ("scars_created", "Scars created", self.scars_created),
            ("ticks_run", "Maintenance ticks executed", self.ticks_run),
            ("snapshot_drift", "Snapshots failing verification", self.snapshot_drift),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "# HELP affinity_{name}_total {help}");
            let _ = writeln!(out, "# TYPE affinity_{name}_total counter");
            let _ = writeln!(out, "affinity_{name}_total {value}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_default_zero() {
        let c = AffinityCounters::new();
        assert_eq!(c.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn compaction_reports_accumulate() {
        let c = AffinityCounters::new();
        let report = CompactionReport {
            pruned: 2,
            personal_discarded: 3,
            group_discarded: 1,
            folded: 4,
            scars_created: 1,
        };
        c.add_compaction(&report);
        c.add_compaction(&report);
        let snap = c.snapshot();
        assert_eq!(snap.traces_pruned, 4);
        assert_eq!(snap.traces_discarded, 8);
        assert_eq!(snap.traces_folded, 8);
        assert_eq!(snap.scars_created, 2);
    }

    #[test]
    fn prometheus_format_valid() {
        let c = AffinityCounters::new();
        c.evaluations.fetch_add(42, Ordering::Relaxed);
        let prom = c.snapshot().to_prometheus();
        assert!(prom.contains("affinity_evaluations_total 42"));
        assert!(prom.contains("# TYPE affinity_ticks_run_total counter"));
        assert!(prom.contains("# HELP"));
    }

    #[test]
    fn prometheus_emits_three_lines_per_counter() {
        let prom = CounterSnapshot::default().to_prometheus();
        let lines: Vec<_> = prom.lines().collect();
        assert_eq!(lines.len() % 3, 0);
        assert_eq!(lines[0], "# HELP affinity_events_recorded_total Affinity events recorded");
        assert_eq!(lines[1], "# TYPE affinity_events_recorded_total counter");
        assert_eq!(lines[2], "affinity_events_recorded_total 0");
        assert!(prom.ends_with('\n'));
    }
}
