//! Minute-granularity variant that adapts to learner accuracy, response
//! latency and overdue reviews.
//!
//! Early passes climb through fixed learning steps (about an hour, then about
//! six hours, then about a day) scaled by the learner's skill. From the fourth
//! consecutive pass on, the interval grows by the ease factor. Lapses drop the
//! card back to minutes, softened by a forgetting-curve term for a quality-2
//! lapse on an overdue card.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use log::debug;
use snafu::{OptionExt, ensure};

use crate::config::AdaptiveParameters;
use crate::error::{
    AlgorithmError, InvalidAccuracySnafu, InvalidPreferredTimeSnafu, InvalidResponseTimeSnafu,
    NonFiniteIntervalSnafu, TimestampOverflowSnafu,
};
use crate::quality::Quality;
use crate::record::{MAX_EASE_FACTOR, MIN_EASE_FACTOR, ReviewEntry, ReviewHistory, ReviewRecord};
use crate::stats::{Difficulty, UserStats};

/// Ease adjustment per quality once a card has left the learning steps.
const QUALITY_BONUS: [f64; 6] = [-0.8, -0.54, -0.32, -0.14, 0.0, 0.15];

/// A review record together with the tags the adaptive variant reads.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveCard<'a> {
    pub record: &'a ReviewRecord,
    pub category: Option<&'a str>,
    pub difficulty: Difficulty,
}

pub fn adaptive_update(
    card: &AdaptiveCard<'_>,
    quality: Quality,
    response_time_ms: Option<u64>,
    user_stats: Option<&UserStats>,
    params: &AdaptiveParameters,
    now: DateTime<Utc>,
) -> Result<ReviewRecord, AlgorithmError> {
    let record = card.record;
    let minutes_since_last_review = record
        .last_reviewed_at
        .map(|last| (now - last).num_minutes().max(0))
        .unwrap_or_default();

    let adaptive = adaptive_factor(user_stats, card.category, params)?;
    let forgetting = forgetting_curve_adjustment(
        minutes_since_last_review as f64,
        record.interval as f64,
        record.ease_factor,
    );
    let expected_ms = params.expected_response_ms.for_difficulty(card.difficulty);
    let response_bonus = response_time_bonus(response_time_ms, expected_ms, card.difficulty)?;

    let mut next = record.clone();
    let interval = if quality.is_pass() {
        next.repetitions = record.repetitions.saturating_add(1);
        let [first, second, third] = params.learning_steps;
        match next.repetitions {
            1 => {
                let bonus = match quality.value() {
                    5 => 4.0,
                    4 => 2.0,
                    _ => 1.0,
                };
                (first * adaptive * bonus).ceil()
            }
            2 => {
                let bonus = if quality.value() == 5 { 2.0 } else { 1.0 };
                (second * adaptive * bonus).ceil()
            }
            3 => (third * adaptive * quality.as_f64() / 3.0).ceil(),
            _ => {
                next.ease_factor = (record.ease_factor
                    + quality_bonus(quality)
                    + consistency_bonus(&record.review_history, params))
                .clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR);
                (record.interval as f64 * next.ease_factor * adaptive * response_bonus).ceil()
            }
        }
    } else {
        next.repetitions = 0;
        next.ease_factor = (record.ease_factor - params.lapse_ease_penalty).max(MIN_EASE_FACTOR);
        if quality.value() <= 1 {
            params.lapse_interval as f64
        } else {
            (record.interval as f64 * forgetting * params.hard_lapse_factor)
                .floor()
                .max(params.hard_lapse_floor as f64)
        }
    };
    ensure!(interval.is_finite(), NonFiniteIntervalSnafu);
    next.interval = interval.clamp(params.min_interval as f64, params.max_interval as f64) as u32;

    debug!(
        "quality {quality}: adaptive factor {adaptive:.2}, forgetting {forgetting:.3}, \
         response bonus {response_bonus:.2}, interval {} -> {} min",
        record.interval, next.interval
    );

    let due = now
        .checked_add_signed(Duration::minutes(next.interval as i64))
        .context(TimestampOverflowSnafu)?;
    next.next_review = if next.interval >= params.snap_threshold {
        snap_to_review_time(due, now, user_stats, params)?
    } else {
        due
    };

    next.record_review(ReviewEntry {
        quality,
        response_time_ms,
        interval_before: record.interval,
        interval_after: next.interval,
        ease_factor: next.ease_factor,
        minutes_since_last_review,
        timestamp: now,
    });
    Ok(next)
}

/// Scales intervals by learner skill: longer for strong performers (more so
/// on a streak), shorter for struggling ones.
pub(crate) fn adaptive_factor(
    user_stats: Option<&UserStats>,
    category: Option<&str>,
    params: &AdaptiveParameters,
) -> Result<f64, AlgorithmError> {
    let Some(stats) = user_stats else {
        return Ok(1.0);
    };
    let accuracy = stats.accuracy_for(category);
    ensure!(
        (0.0..=1.0).contains(&accuracy),
        InvalidAccuracySnafu {
            field: match category {
                Some(c) if stats.category_accuracy.contains_key(c) => format!("category `{c}`"),
                _ => "overall".to_string(),
            },
            value: accuracy,
        }
    );

    Ok(if accuracy > params.high_accuracy {
        params.strong_factor
            + (stats.streak as f64 * params.streak_step).min(params.max_streak_bonus)
    } else if accuracy < params.low_accuracy {
        params.weak_factor
    } else {
        1.0
    })
}

/// 1.0 for on-time or early reviews; decays exponentially with how far past
/// the scheduled interval the review came, faster for low ease factors.
pub(crate) fn forgetting_curve_adjustment(
    minutes_since_last_review: f64,
    scheduled_interval: f64,
    ease_factor: f64,
) -> f64 {
    if scheduled_interval <= 0.0 {
        return 1.0;
    }
    let overdue_ratio = minutes_since_last_review / scheduled_interval;
    if overdue_ratio <= 1.0 {
        1.0
    } else {
        (-(1.0 / ease_factor) * (overdue_ratio - 1.0)).exp()
    }
}

pub(crate) fn response_time_bonus(
    response_time_ms: Option<u64>,
    expected_ms: f64,
    difficulty: Difficulty,
) -> Result<f64, AlgorithmError> {
    ensure!(
        expected_ms.is_finite() && expected_ms > 0.0,
        InvalidResponseTimeSnafu {
            difficulty: difficulty.to_string()
        }
    );
    let Some(actual) = response_time_ms else {
        return Ok(1.0);
    };
    let ratio = actual as f64 / expected_ms;
    Ok(if ratio < 0.5 {
        1.1
    } else if ratio < 1.0 {
        1.05
    } else if ratio < 2.0 {
        1.0
    } else {
        0.95
    })
}

pub(crate) fn quality_bonus(quality: Quality) -> f64 {
    QUALITY_BONUS
        .get(quality.value() as usize)
        .copied()
        .unwrap_or_default()
}

/// Rewards a steady run of good recalls across the last few reviews.
pub(crate) fn consistency_bonus(history: &ReviewHistory, params: &AdaptiveParameters) -> f64 {
    let window = params.consistency_window;
    if window == 0 || history.len() < window {
        return 0.0;
    }
    let average = history
        .recent(window)
        .map(|entry| entry.quality.as_f64())
        .sum::<f64>()
        / window as f64;
    if average >= params.consistency_high {
        params.consistency_high_bonus
    } else if average >= params.consistency_mid {
        params.consistency_mid_bonus
    } else {
        0.0
    }
}

/// Moves `due` to the learner's best time of day on the same date, or the
/// next day when that moment is not after `now`.
fn snap_to_review_time(
    due: DateTime<Utc>,
    now: DateTime<Utc>,
    user_stats: Option<&UserStats>,
    params: &AdaptiveParameters,
) -> Result<DateTime<Utc>, AlgorithmError> {
    let (hour, minute) = user_stats
        .and_then(UserStats::best_time)
        .map(|t| (t.hour, t.minute))
        .unwrap_or((params.default_review_time.hour, params.default_review_time.minute));
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .context(InvalidPreferredTimeSnafu { hour, minute })?;
    let snapped = due.date_naive().and_time(time).and_utc();
    if snapped > now {
        Ok(snapped)
    } else {
        snapped
            .checked_add_signed(Duration::days(1))
            .context(TimestampOverflowSnafu)
    }
}
