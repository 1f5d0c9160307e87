use std::collections::VecDeque;

use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::quality::Quality;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_EASE_FACTOR: f64 = 2.5;
pub const INITIAL_EASE_FACTOR: f64 = 2.5;
pub const INITIAL_INTERVAL: u32 = 1;
pub const HISTORY_CAPACITY: usize = 20;

fn default_interval() -> u32 {
    INITIAL_INTERVAL
}

fn default_ease_factor() -> f64 {
    INITIAL_EASE_FACTOR
}

/// Reads an interval leniently. Fractions are rounded; `null` and values
/// below one become [`INITIAL_INTERVAL`].
fn interval_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<f64>::deserialize(deserializer)? {
        Some(value) if value.is_finite() && value >= 1.0 => {
            value.round().min(u32::MAX as f64) as u32
        }
        _ => INITIAL_INTERVAL,
    })
}

/// `null` (how JSON carries NaN) and infinities become [`INITIAL_EASE_FACTOR`].
fn ease_factor_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|value| value.is_finite())
        .unwrap_or(INITIAL_EASE_FACTOR))
}

/// Scheduling state attached to one card.
///
/// `interval` is measured in days when the basic variant produced the record,
/// and in minutes when the adaptive variant did. A basic fallback leaves a
/// day count behind, which a later adaptive review reads as minutes and so
/// schedules the card early rather than late.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// Consecutive passes since the last failure.
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default = "default_interval", deserialize_with = "interval_or_default")]
    pub interval: u32,
    #[serde(default = "default_ease_factor", deserialize_with = "ease_factor_or_default")]
    pub ease_factor: f64,
    #[serde(default, with = "ts_milliseconds")]
    pub next_review: DateTime<Utc>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub review_history: ReviewHistory,
}

impl ReviewRecord {
    /// A never-reviewed card, due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            repetitions: 0,
            interval: INITIAL_INTERVAL,
            ease_factor: INITIAL_EASE_FACTOR,
            next_review: now,
            last_reviewed_at: None,
            total_reviews: 0,
            review_history: ReviewHistory::default(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    pub(crate) fn record_review(&mut self, entry: ReviewEntry) {
        self.last_reviewed_at = Some(entry.timestamp);
        self.total_reviews = self.total_reviews.saturating_add(1);
        self.review_history.push(entry);
    }
}

/// One historical data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub quality: Quality,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(default = "default_interval", deserialize_with = "interval_or_default")]
    pub interval_before: u32,
    #[serde(default = "default_interval", deserialize_with = "interval_or_default")]
    pub interval_after: u32,
    #[serde(default = "default_ease_factor", deserialize_with = "ease_factor_or_default")]
    pub ease_factor: f64,
    /// Zero for the first review of a card.
    #[serde(default)]
    pub minutes_since_last_review: i64,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Most-recent-last review log holding at most [`HISTORY_CAPACITY`] entries;
/// the oldest entry is evicted first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ReviewEntry>", into = "Vec<ReviewEntry>")]
pub struct ReviewHistory {
    entries: VecDeque<ReviewEntry>,
}

impl ReviewHistory {
    pub fn push(&mut self, entry: ReviewEntry) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ReviewEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ReviewEntry> {
        self.entries.back()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut ReviewEntry> {
        self.entries.back_mut()
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ReviewEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }
}

impl From<Vec<ReviewEntry>> for ReviewHistory {
    fn from(entries: Vec<ReviewEntry>) -> Self {
        let skip = entries.len().saturating_sub(HISTORY_CAPACITY);
        Self {
            entries: entries.into_iter().skip(skip).collect(),
        }
    }
}

impl From<ReviewHistory> for Vec<ReviewEntry> {
    fn from(history: ReviewHistory) -> Self {
        history.entries.into()
    }
}

impl<'a> IntoIterator for &'a ReviewHistory {
    type Item = &'a ReviewEntry;
    type IntoIter = std::collections::vec_deque::Iter<'a, ReviewEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
