use serde::{Deserialize, Serialize};
use snafu::ensure;
use strum::{Display, EnumIter, EnumString};

use crate::error::{InvalidConfigSnafu, Result};
use crate::stats::Difficulty;

/// Weight vector carried over from earlier releases of the scheduler. No
/// formula reads it; it is validated and round-tripped only.
pub static DEFAULT_WEIGHTS: [f64; 17] = [
    0.4, 0.6, 2.4, 5.8, 4.93, 0.94, 0.86, 0.01, 1.49, 0.14, 0.94, 2.18, 0.05, 0.34, 1.26, 0.29,
    2.61,
];

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
pub enum Algorithm {
    /// SM-2 family, intervals in days.
    #[default]
    Basic,
    /// Stats-aware, intervals in minutes.
    Adaptive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    pub algorithm: Algorithm,
    pub basic: BasicParameters,
    pub adaptive: AdaptiveParameters,
    pub insights: InsightThresholds,
    pub batch_size: BatchSizeParameters,
    pub weights: [f64; 17],
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            basic: BasicParameters::default(),
            adaptive: AdaptiveParameters::default(),
            insights: InsightThresholds::default(),
            batch_size: BatchSizeParameters::default(),
            weights: DEFAULT_WEIGHTS,
        }
    }
}

impl SchedulerConfig {
    pub fn adaptive() -> Self {
        Self {
            algorithm: Algorithm::Adaptive,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.weights.iter().all(|w| w.is_finite()),
            InvalidConfigSnafu {
                reason: "weights must be finite"
            }
        );
        ensure!(
            self.basic.first_interval_days >= 1
                && self.basic.second_interval_days >= self.basic.first_interval_days,
            InvalidConfigSnafu {
                reason: "basic intervals must be at least one day and non-decreasing"
            }
        );
        self.adaptive.validate()?;
        self.insights.validate()?;
        self.batch_size.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicParameters {
    pub first_interval_days: u32,
    pub second_interval_days: u32,
}

impl Default for BasicParameters {
    fn default() -> Self {
        Self {
            first_interval_days: 1,
            second_interval_days: 6,
        }
    }
}

/// Expected response time per difficulty, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedResponseTimes {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

impl Default for ExpectedResponseTimes {
    fn default() -> Self {
        Self {
            easy: 3000.0,
            medium: 5000.0,
            hard: 8000.0,
        }
    }
}

impl ExpectedResponseTimes {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTime {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdaptiveParameters {
    /// Bounds applied to every adaptive interval, in minutes.
    pub min_interval: u32,
    pub max_interval: u32,
    /// Interval after a blackout (quality 0 or 1).
    pub lapse_interval: u32,
    /// Floor and multiplier for the quality-2 lapse.
    pub hard_lapse_floor: u32,
    pub hard_lapse_factor: f64,
    pub lapse_ease_penalty: f64,
    /// Learning-phase base intervals for the first three passes, in minutes.
    pub learning_steps: [f64; 3],
    pub high_accuracy: f64,
    pub low_accuracy: f64,
    pub strong_factor: f64,
    pub streak_step: f64,
    pub max_streak_bonus: f64,
    pub weak_factor: f64,
    pub expected_response_ms: ExpectedResponseTimes,
    /// Intervals at or above this many minutes are snapped to a review time.
    pub snap_threshold: u32,
    pub default_review_time: ReviewTime,
    pub consistency_window: usize,
    pub consistency_high: f64,
    pub consistency_high_bonus: f64,
    pub consistency_mid: f64,
    pub consistency_mid_bonus: f64,
}

impl Default for AdaptiveParameters {
    fn default() -> Self {
        Self {
            min_interval: 10,
            max_interval: 525_600,
            lapse_interval: 10,
            hard_lapse_floor: 30,
            hard_lapse_factor: 0.3,
            lapse_ease_penalty: 0.2,
            learning_steps: [60.0, 360.0, 1440.0],
            high_accuracy: 0.9,
            low_accuracy: 0.7,
            strong_factor: 1.2,
            streak_step: 0.01,
            max_streak_bonus: 0.2,
            weak_factor: 0.8,
            expected_response_ms: ExpectedResponseTimes::default(),
            snap_threshold: 120,
            default_review_time: ReviewTime { hour: 9, minute: 0 },
            consistency_window: 5,
            consistency_high: 4.0,
            consistency_high_bonus: 0.05,
            consistency_mid: 3.5,
            consistency_mid_bonus: 0.02,
        }
    }
}

impl AdaptiveParameters {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.min_interval >= 1 && self.min_interval <= self.max_interval,
            InvalidConfigSnafu {
                reason: "adaptive interval bounds must satisfy 1 <= min <= max"
            }
        );
        let floats = [
            self.hard_lapse_factor,
            self.lapse_ease_penalty,
            self.high_accuracy,
            self.low_accuracy,
            self.strong_factor,
            self.streak_step,
            self.max_streak_bonus,
            self.weak_factor,
            self.consistency_high,
            self.consistency_high_bonus,
            self.consistency_mid,
            self.consistency_mid_bonus,
        ];
        ensure!(
            floats
                .iter()
                .chain(&self.learning_steps)
                .all(|v| v.is_finite()),
            InvalidConfigSnafu {
                reason: "adaptive parameters must be finite"
            }
        );
        ensure!(
            self.low_accuracy <= self.high_accuracy,
            InvalidConfigSnafu {
                reason: "low accuracy threshold exceeds high accuracy threshold"
            }
        );
        let ExpectedResponseTimes { easy, medium, hard } = self.expected_response_ms;
        ensure!(
            [easy, medium, hard].iter().all(|t| t.is_finite() && *t > 0.0),
            InvalidConfigSnafu {
                reason: "expected response times must be positive"
            }
        );
        let ReviewTime { hour, minute } = self.default_review_time;
        ensure!(
            hour < 24 && minute < 60,
            InvalidConfigSnafu {
                reason: "default review time must be a valid time of day"
            }
        );
        Ok(())
    }
}

/// Thresholds behind the advisory messages of
/// [`generate_learning_insights`](crate::generate_learning_insights).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightThresholds {
    pub low_accuracy: f64,
    pub high_accuracy: f64,
    pub weak_category: f64,
    pub long_streak: u32,
    pub recent_window: usize,
    pub slow_response_ms: u64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            low_accuracy: 0.7,
            high_accuracy: 0.9,
            weak_category: 0.6,
            long_streak: 7,
            recent_window: 10,
            slow_response_ms: 8000,
        }
    }
}

impl InsightThresholds {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.low_accuracy.is_finite()
                && self.high_accuracy.is_finite()
                && self.weak_category.is_finite()
                && self.low_accuracy <= self.high_accuracy,
            InvalidConfigSnafu {
                reason: "insight accuracy thresholds must be finite and ordered"
            }
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchSizeParameters {
    pub min: usize,
    pub max: usize,
    /// Time budget per card for an average learner.
    pub ms_per_card: f64,
    /// Accuracy below which each card is budgeted more time.
    pub struggling_below: f64,
    pub struggling_multiplier: f64,
    /// Accuracy above which each card is budgeted less time.
    pub confident_above: f64,
    pub confident_multiplier: f64,
}

impl Default for BatchSizeParameters {
    fn default() -> Self {
        Self {
            min: 5,
            max: 50,
            ms_per_card: 30_000.0,
            struggling_below: 0.7,
            struggling_multiplier: 1.5,
            confident_above: 0.9,
            confident_multiplier: 0.8,
        }
    }
}

impl BatchSizeParameters {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.min >= 1 && self.min <= self.max,
            InvalidConfigSnafu {
                reason: "batch size bounds must satisfy 1 <= min <= max"
            }
        );
        ensure!(
            [
                self.ms_per_card,
                self.struggling_below,
                self.struggling_multiplier,
                self.confident_above,
                self.confident_multiplier
            ]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0),
            InvalidConfigSnafu {
                reason: "batch timing parameters must be positive"
            }
        );
        Ok(())
    }
}
