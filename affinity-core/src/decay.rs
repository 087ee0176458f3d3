//! Half-life decay of accumulated trace values.
//!
//! Every stored magnitude follows:
//!   V(now) = V₀ × 0.5^((now − t₀) / half_life)
//!
//! Values are never decayed in the background. They are brought current
//! lazily, on read and on write, against a caller-supplied `now`.

use crate::types::{Timestamp, TraceRecord};

/// Decay `accumulated` from `last_updated` to `now`.
///
/// Identity when `now ≤ last_updated` (clock skew never inflates a value)
/// and when the half-life is non-positive.
#[must_use]
pub fn decayed_value(accumulated: f64, last_updated: Timestamp, now: Timestamp, half_life_secs: f64) -> f64 {
    let elapsed = now.since(last_updated);
    if elapsed <= 0.0 || half_life_secs <= 0.0 {
        return accumulated;
    }
    accumulated * 0.5_f64.powf(elapsed / half_life_secs)
}

/// Current value of a trace record.
#[must_use]
pub fn decayed_record(record: &TraceRecord, now: Timestamp, half_life_secs: f64) -> f64 {
    decayed_value(record.accumulated, record.last_updated, now, half_life_secs)
}

/// Bring a record current and add `delta` to it.
///
/// `last_updated` only moves forward, so an out-of-order write lands on the
/// newer timestamp without undoing decay.
pub fn accumulate(record: &mut TraceRecord, delta: f64, now: Timestamp, half_life_secs: f64) {
    record.accumulated = decayed_record(record, now, half_life_secs) + delta;
    if now > record.last_updated {
        record.last_updated = now;
    }
    record.event_count = record.event_count.saturating_add(1);
}
