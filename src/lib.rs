mod adaptive;
mod basic;
mod clock;
mod config;
mod error;
mod insights;
mod quality;
mod record;
mod scheduler;
mod simulation;
mod stats;
#[cfg(test)]
mod test_helpers;

pub use adaptive::{AdaptiveCard, adaptive_update};
pub use basic::basic_update;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    AdaptiveParameters, Algorithm, BasicParameters, BatchSizeParameters, DEFAULT_WEIGHTS,
    ExpectedResponseTimes, InsightThresholds, ReviewTime, SchedulerConfig,
};
pub use error::{AlgorithmError, Result, SchedulerError};
pub use insights::{
    InsightKind, LearningInsight, generate_learning_insights, suggest_optimal_batch_size,
};
pub use quality::Quality;
pub use record::{
    HISTORY_CAPACITY, INITIAL_EASE_FACTOR, INITIAL_INTERVAL, MAX_EASE_FACTOR, MIN_EASE_FACTOR,
    ReviewEntry, ReviewHistory, ReviewRecord,
};
pub use scheduler::{ReviewOptions, ReviewRequest, Scheduler, normalize};
pub use simulation::{SimulationResult, SimulatorConfig, simulate};
pub use stats::{Difficulty, PreferredTime, UserStats};
