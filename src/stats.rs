use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Card difficulty tag, which selects the expected response time.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// A time of day the learner has reviewed at, with the accuracy achieved then.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferredTime {
    pub hour: u32,
    pub minute: u32,
    pub accuracy: f64,
}

/// Aggregate learner performance, supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    /// Overall fraction of passed reviews.
    pub accuracy: f64,
    pub category_accuracy: HashMap<String, f64>,
    /// Consecutive days with at least one review.
    pub streak: u32,
    pub preferred_times: Vec<PreferredTime>,
}

impl UserStats {
    /// Category accuracy when known, overall accuracy otherwise.
    pub fn accuracy_for(&self, category: Option<&str>) -> f64 {
        category
            .and_then(|c| self.category_accuracy.get(c))
            .copied()
            .unwrap_or(self.accuracy)
    }

    /// The preferred time with the best accuracy. Ties go to the earliest entry.
    pub fn best_time(&self) -> Option<PreferredTime> {
        self.preferred_times
            .iter()
            .copied()
            .rev()
            .max_by(|a, b| a.accuracy.total_cmp(&b.accuracy))
    }

    pub(crate) fn categories_below(&self, threshold: f64) -> Vec<&str> {
        self.category_accuracy
            .iter()
            .filter(|(_, accuracy)| **accuracy < threshold)
            .map(|(category, _)| category.as_str())
            .sorted()
            .collect()
    }
}
