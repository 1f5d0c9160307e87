use chrono::{DateTime, Utc};
use log::warn;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::adaptive::{AdaptiveCard, adaptive_update};
use crate::basic::basic_update;
use crate::clock::{Clock, SystemClock};
use crate::config::{Algorithm, SchedulerConfig};
use crate::error::Result;
use crate::insights::{LearningInsight, generate_learning_insights, suggest_optimal_batch_size};
use crate::quality::Quality;
use crate::record::{
    INITIAL_EASE_FACTOR, INITIAL_INTERVAL, MAX_EASE_FACTOR, MIN_EASE_FACTOR, ReviewHistory,
    ReviewRecord,
};
use crate::stats::{Difficulty, UserStats};

/// Per-review inputs beyond the record and the quality rating.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewOptions<'a> {
    /// Overrides the configured algorithm for this review.
    pub algorithm: Option<Algorithm>,
    pub category: Option<&'a str>,
    pub difficulty: Difficulty,
    pub response_time_ms: Option<u64>,
    pub user_stats: Option<&'a UserStats>,
}

#[derive(Debug, Clone)]
pub struct ReviewRequest<'a> {
    pub record: ReviewRecord,
    pub quality: Quality,
    pub options: ReviewOptions<'a>,
}

/// Entry point for scheduling updates. Holds validated configuration and the
/// clock consulted by [`Scheduler::update_card`].
///
/// Updates to distinct cards may run concurrently. Updates to the same card
/// must be serialized by the caller, which owns the stored record.
#[derive(Debug, Clone)]
pub struct Scheduler<C: Clock = SystemClock> {
    config: SchedulerConfig,
    clock: C,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(config: SchedulerConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, clock })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn update_card(
        &self,
        record: &ReviewRecord,
        quality: Quality,
        options: &ReviewOptions<'_>,
    ) -> ReviewRecord {
        self.update_card_at(record, quality, options, self.clock.now())
    }

    /// Produces the replacement record for one review at `now`. Never fails:
    /// malformed numbers are coerced to defaults, and an adaptive failure is
    /// answered with the basic algorithm.
    pub fn update_card_at(
        &self,
        record: &ReviewRecord,
        quality: Quality,
        options: &ReviewOptions<'_>,
        now: DateTime<Utc>,
    ) -> ReviewRecord {
        let record = normalize(record.clone());
        let algorithm = options.algorithm.unwrap_or(self.config.algorithm);
        let next = match algorithm {
            Algorithm::Basic => basic_update(&record, quality, &self.config.basic, now),
            Algorithm::Adaptive => {
                let card = AdaptiveCard {
                    record: &record,
                    category: options.category,
                    difficulty: options.difficulty,
                };
                adaptive_update(
                    &card,
                    quality,
                    options.response_time_ms,
                    options.user_stats,
                    &self.config.adaptive,
                    now,
                )
                .unwrap_or_else(|error| {
                    warn!("adaptive scheduling failed, falling back to basic: {error}");
                    basic_update(&record, quality, &self.config.basic, now)
                })
            }
        };
        normalize(next)
    }

    /// Applies independent reviews of distinct cards in parallel, all at the
    /// same instant. Output order matches input order.
    pub fn update_batch(&self, requests: Vec<ReviewRequest<'_>>) -> Vec<ReviewRecord> {
        let now = self.clock.now();
        requests
            .into_par_iter()
            .map(|request| {
                self.update_card_at(&request.record, request.quality, &request.options, now)
            })
            .collect()
    }

    /// The interval each quality 0..=5 would produce, without committing anything.
    pub fn preview_intervals(
        &self,
        record: &ReviewRecord,
        options: &ReviewOptions<'_>,
        now: DateTime<Utc>,
    ) -> [u32; 6] {
        std::array::from_fn(|q| {
            self.update_card_at(record, Quality::clamped(q as i32), options, now)
                .interval
        })
    }

    pub fn suggest_optimal_batch_size(
        &self,
        user_stats: &UserStats,
        time_available_ms: u64,
    ) -> usize {
        suggest_optimal_batch_size(user_stats, time_available_ms, &self.config.batch_size)
    }

    pub fn learning_insights(
        &self,
        user_stats: &UserStats,
        history: &ReviewHistory,
    ) -> Vec<LearningInsight> {
        generate_learning_insights(user_stats, history, &self.config.insights)
    }
}

/// Coerces a record into its invariants: interval at least 1 and ease factor
/// within [1.3, 2.5], with a non-finite ease factor reset to the initial value.
/// The latest history entry is rewritten to the coerced values so it keeps
/// describing the record's current state.
pub fn normalize(mut record: ReviewRecord) -> ReviewRecord {
    if record.interval < 1 {
        record.interval = INITIAL_INTERVAL;
    }
    record.ease_factor = if record.ease_factor.is_finite() {
        record.ease_factor.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
    } else {
        INITIAL_EASE_FACTOR
    };
    if let Some(last) = record.review_history.last_mut() {
        last.ease_factor = record.ease_factor;
        last.interval_after = record.interval;
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::BasicParameters;
    use crate::stats::PreferredTime;
    use crate::test_helpers::init_logger;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 7, 45, 0).unwrap()
    }

    fn scheduler(config: SchedulerConfig) -> Scheduler<FixedClock> {
        Scheduler::with_clock(config, FixedClock(now())).unwrap()
    }

    fn q(value: i32) -> Quality {
        Quality::clamped(value)
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = SchedulerConfig::default();
        config.batch_size.min = 0;
        assert!(Scheduler::new(config).is_err());
    }

    #[test]
    fn basic_result_is_capped_after_normalization() {
        let scheduler = scheduler(SchedulerConfig::default());
        let fresh = ReviewRecord::new(now());
        let next = scheduler.update_card(&fresh, q(5), &ReviewOptions::default());
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.interval, 1);
        assert_eq!(next.ease_factor, MAX_EASE_FACTOR);
        assert_eq!(next.next_review, now() + Duration::days(1));
    }

    #[test]
    fn latest_history_entry_matches_the_returned_record() {
        let scheduler = scheduler(SchedulerConfig::default());
        let mut record = ReviewRecord::new(now());
        for quality in [5, 5, 5, 1, 5] {
            record = scheduler.update_card(&record, q(quality), &ReviewOptions::default());
            let last = record.review_history.last().unwrap();
            assert_eq!(last.ease_factor, record.ease_factor);
            assert_eq!(last.interval_after, record.interval);
            assert!(
                record
                    .review_history
                    .iter()
                    .all(|e| (MIN_EASE_FACTOR..=MAX_EASE_FACTOR).contains(&e.ease_factor))
            );
        }
    }

    #[test]
    fn options_select_the_algorithm() {
        let scheduler = scheduler(SchedulerConfig::default());
        let fresh = ReviewRecord::new(now());
        let options = ReviewOptions {
            algorithm: Some(Algorithm::Adaptive),
            ..Default::default()
        };
        assert_eq!(scheduler.update_card(&fresh, q(4), &options).interval, 120);

        let scheduler = self::scheduler(SchedulerConfig::adaptive());
        assert_eq!(
            scheduler
                .update_card(&fresh, q(4), &ReviewOptions::default())
                .interval,
            120
        );
        let options = ReviewOptions {
            algorithm: Some(Algorithm::Basic),
            ..Default::default()
        };
        assert_eq!(scheduler.update_card(&fresh, q(4), &options).interval, 1);
    }

    #[test]
    fn malformed_stats_fall_back_to_basic() {
        init_logger();
        let scheduler = scheduler(SchedulerConfig::adaptive());
        let mut record = ReviewRecord::new(now());
        record.repetitions = 1;
        let stats = UserStats {
            accuracy: f64::NAN,
            ..Default::default()
        };
        let options = ReviewOptions {
            user_stats: Some(&stats),
            response_time_ms: Some(1500),
            ..Default::default()
        };
        let next = scheduler.update_card(&record, q(4), &options);
        let expected = normalize(basic_update(
            &record,
            q(4),
            &BasicParameters::default(),
            now(),
        ));
        assert_eq!(next, expected);
        assert_eq!(next.interval, 6);
        assert_eq!(next.total_reviews, 1);
    }

    #[test]
    fn impossible_preferred_time_falls_back_to_basic() {
        init_logger();
        let scheduler = scheduler(SchedulerConfig::adaptive());
        let stats = UserStats {
            accuracy: 0.8,
            preferred_times: vec![PreferredTime {
                hour: 7,
                minute: 75,
                accuracy: 0.9,
            }],
            ..Default::default()
        };
        let options = ReviewOptions {
            user_stats: Some(&stats),
            ..Default::default()
        };
        let next = scheduler.update_card(&ReviewRecord::new(now()), q(5), &options);
        assert_eq!(next.interval, 1);
        assert_eq!(next.next_review, now() + Duration::days(1));
    }

    #[test]
    fn malformed_record_is_coerced() {
        let scheduler = scheduler(SchedulerConfig::default());
        let record = ReviewRecord {
            interval: 0,
            ease_factor: f64::NAN,
            repetitions: 2,
            ..ReviewRecord::new(now())
        };
        let next = scheduler.update_card(&record, q(4), &ReviewOptions::default());
        assert_eq!(next.repetitions, 3);
        assert_eq!(next.interval, 3);
        assert_eq!(next.ease_factor, 2.5);
    }

    #[test]
    fn normalization_bounds() {
        let mut record = ReviewRecord::new(now());
        record.ease_factor = 0.4;
        record.interval = 0;
        let normalized = normalize(record.clone());
        assert_eq!(normalized.ease_factor, MIN_EASE_FACTOR);
        assert_eq!(normalized.interval, 1);

        record.ease_factor = f64::INFINITY;
        assert_eq!(normalize(record).ease_factor, INITIAL_EASE_FACTOR);
    }

    #[test]
    fn invariants_hold_over_long_runs() {
        let stats = UserStats {
            accuracy: 0.93,
            streak: 12,
            ..Default::default()
        };
        for config in [SchedulerConfig::default(), SchedulerConfig::adaptive()] {
            let scheduler = scheduler(config);
            let mut record = ReviewRecord::new(now());
            let options = ReviewOptions {
                user_stats: Some(&stats),
                response_time_ms: Some(2000),
                ..Default::default()
            };
            for (i, quality) in [5, 5, 4, 0, 3, 5, 2, 4, 5, 5, 1, 4, 4, 5]
                .into_iter()
                .cycle()
                .take(60)
                .enumerate()
            {
                let at = now() + Duration::hours(i as i64 * 30);
                let previous_total = record.total_reviews;
                record = scheduler.update_card_at(&record, q(quality), &options, at);
                assert!((MIN_EASE_FACTOR..=MAX_EASE_FACTOR).contains(&record.ease_factor));
                assert!(record.interval >= 1);
                assert_eq!(record.total_reviews, previous_total + 1);
                assert!(record.next_review > at);
                if quality < 3 {
                    assert_eq!(record.repetitions, 0);
                }
            }
            assert_eq!(record.review_history.len(), 20);
        }
    }

    #[test]
    fn batch_matches_sequential_updates() {
        let scheduler = scheduler(SchedulerConfig::adaptive());
        let stats = UserStats {
            accuracy: 0.75,
            ..Default::default()
        };
        let requests = (0..64)
            .map(|i| ReviewRequest {
                record: ReviewRecord {
                    repetitions: i % 6,
                    interval: 10 + i * 37,
                    ..ReviewRecord::new(now())
                },
                quality: q((i % 6) as i32),
                options: ReviewOptions {
                    user_stats: Some(&stats),
                    difficulty: Difficulty::Hard,
                    ..Default::default()
                },
            })
            .collect::<Vec<_>>();
        let sequential = requests
            .iter()
            .map(|r| scheduler.update_card(&r.record, r.quality, &r.options))
            .collect::<Vec<_>>();
        assert_eq!(scheduler.update_batch(requests), sequential);
    }

    #[test]
    fn advisory_helpers_use_configured_thresholds() {
        let mut config = SchedulerConfig::default();
        config.batch_size.ms_per_card = 60_000.0;
        config.insights.long_streak = 3;
        let scheduler = scheduler(config);
        let stats = UserStats {
            accuracy: 0.8,
            streak: 3,
            ..Default::default()
        };
        assert_eq!(scheduler.suggest_optimal_batch_size(&stats, 900_000), 15);
        let insights = scheduler.learning_insights(&stats, &ReviewHistory::default());
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].message, "3-day streak! Keep it going.");
    }

    #[test]
    fn preview_lists_every_quality() {
        let scheduler = scheduler(SchedulerConfig::default());
        let record = ReviewRecord {
            repetitions: 2,
            interval: 6,
            ..ReviewRecord::new(now())
        };
        let intervals = scheduler.preview_intervals(&record, &ReviewOptions::default(), now());
        assert_eq!(intervals, [1, 1, 1, 15, 15, 15]);
    }
}
