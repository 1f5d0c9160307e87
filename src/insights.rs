use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::{BatchSizeParameters, InsightThresholds};
use crate::record::ReviewHistory;
use crate::stats::UserStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Timing,
    Difficulty,
    Motivation,
}

/// Advisory message for the learner. Purely informational: nothing in the
/// schedule depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInsight {
    pub kind: InsightKind,
    pub message: String,
}

impl LearningInsight {
    fn new(kind: InsightKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// How many cards fit into `time_available_ms`, budgeting more time per card
/// for struggling learners and less for confident ones.
pub fn suggest_optimal_batch_size(
    user_stats: &UserStats,
    time_available_ms: u64,
    params: &BatchSizeParameters,
) -> usize {
    let multiplier = if user_stats.accuracy < params.struggling_below {
        params.struggling_multiplier
    } else if user_stats.accuracy > params.confident_above {
        params.confident_multiplier
    } else {
        1.0
    };
    let cards = (time_available_ms as f64 / (params.ms_per_card * multiplier)).floor();
    (cards as usize).clamp(params.min, params.max)
}

pub fn generate_learning_insights(
    user_stats: &UserStats,
    history: &ReviewHistory,
    thresholds: &InsightThresholds,
) -> Vec<LearningInsight> {
    let mut insights = vec![];
    let percent = (user_stats.accuracy * 100.0).round();

    if user_stats.accuracy < thresholds.low_accuracy {
        insights.push(LearningInsight::new(
            InsightKind::Difficulty,
            format!(
                "Accuracy is {percent}%. Introduce fewer new words per session and revisit missed cards sooner."
            ),
        ));
    } else if user_stats.accuracy > thresholds.high_accuracy {
        insights.push(LearningInsight::new(
            InsightKind::Difficulty,
            format!("Accuracy is {percent}%. You are ready for more challenging vocabulary."),
        ));
    }

    let weak = user_stats.categories_below(thresholds.weak_category);
    if !weak.is_empty() {
        insights.push(LearningInsight::new(
            InsightKind::Difficulty,
            format!("Spend extra time on: {}.", weak.iter().join(", ")),
        ));
    }

    if let Some(best) = user_stats.best_time() {
        insights.push(LearningInsight::new(
            InsightKind::Timing,
            format!(
                "You recall best around {:02}:{:02}. Try to review at that time.",
                best.hour, best.minute
            ),
        ));
    }

    let response_times = history
        .recent(thresholds.recent_window)
        .filter_map(|entry| entry.response_time_ms)
        .collect_vec();
    if !response_times.is_empty() {
        let average = response_times.iter().map(|&ms| ms as f64).sum::<f64>()
            / response_times.len() as f64;
        if average > thresholds.slow_response_ms as f64 {
            insights.push(LearningInsight::new(
                InsightKind::Timing,
                format!(
                    "Answers take {:.1}s on average lately. Shorter sessions may keep recall sharp.",
                    average / 1000.0
                ),
            ));
        }
    }

    if user_stats.streak >= thresholds.long_streak {
        insights.push(LearningInsight::new(
            InsightKind::Motivation,
            format!("{}-day streak! Keep it going.", user_stats.streak),
        ));
    } else if user_stats.streak == 0 {
        insights.push(LearningInsight::new(
            InsightKind::Motivation,
            "Start a new streak with a short review today.",
        ));
    }

    insights
}
