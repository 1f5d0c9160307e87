//! SM-2 variant with day-granularity intervals.

use chrono::{DateTime, Duration, Utc};

use crate::config::BasicParameters;
use crate::quality::Quality;
use crate::record::{MIN_EASE_FACTOR, ReviewEntry, ReviewRecord};

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
///
/// There is no ceiling here; the scheduler clamps the result to 2.5.
pub(crate) fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let q = 5.0 - quality.as_f64();
    (ease_factor + (0.1 - q * (0.08 + q * 0.02))).max(MIN_EASE_FACTOR)
}

/// Applies one review to `record`. Failures reset the card to the first step
/// and keep its ease factor; passes walk 1 day, 6 days, then multiply by the
/// ease factor.
pub fn basic_update(
    record: &ReviewRecord,
    quality: Quality,
    params: &BasicParameters,
    now: DateTime<Utc>,
) -> ReviewRecord {
    let mut next = record.clone();

    if quality.is_pass() {
        next.repetitions = record.repetitions.saturating_add(1);
        next.interval = match next.repetitions {
            1 => params.first_interval_days,
            2 => params.second_interval_days,
            _ => (record.interval as f64 * record.ease_factor).round() as u32,
        };
        next.ease_factor = next_ease_factor(record.ease_factor, quality);
    } else {
        next.repetitions = 0;
        next.interval = params.first_interval_days;
    }

    next.next_review = now
        .checked_add_signed(Duration::days(next.interval as i64))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let minutes_since_last_review = record
        .last_reviewed_at
        .map(|last| (now - last).num_minutes().max(0))
        .unwrap_or_default();
    next.record_review(ReviewEntry {
        quality,
        response_time_ms: None,
        interval_before: record.interval,
        interval_after: next.interval,
        ease_factor: next.ease_factor,
        minutes_since_last_review,
        timestamp: now,
    });
    next
}
