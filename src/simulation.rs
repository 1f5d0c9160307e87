use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use log::info;
use priority_queue::PriorityQueue;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snafu::ensure;

use crate::clock::Clock;
use crate::error::{InvalidDeckSizeSnafu, InvalidProbabilitiesSnafu, Result, SchedulerError};
use crate::quality::Quality;
use crate::record::ReviewRecord;
use crate::scheduler::{ReviewOptions, Scheduler};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub review_cnt_per_day: Vec<usize>,
    pub learn_cnt_per_day: Vec<usize>,
    // Passed reviews on a given day, first reviews of new cards included.
    pub pass_cnt_per_day: Vec<usize>,
    pub records: Vec<ReviewRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub deck_size: usize,
    /// Number of simulated days.
    pub learn_span: usize,
    pub learn_limit: usize,
    pub review_limit: usize,
    /// Recall probability for a review taken exactly on schedule. Recall at
    /// other times is `retention_on_time ^ (elapsed / scheduled)`.
    pub retention_on_time: f64,
    /// Weights for qualities 3, 4, 5 given a successful recall.
    pub pass_quality_prob: [f64; 3],
    /// Weights for qualities 0, 1, 2 given a failed recall.
    pub fail_quality_prob: [f64; 3],
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            deck_size: 1000,
            learn_span: 90,
            learn_limit: 20,
            review_limit: 200,
            retention_on_time: 0.9,
            pass_quality_prob: [0.25, 0.5, 0.25],
            fail_quality_prob: [0.2, 0.3, 0.5],
        }
    }
}

fn recall_probability(record: &ReviewRecord, now: DateTime<Utc>, retention_on_time: f64) -> f64 {
    let Some(last) = record.last_reviewed_at else {
        return retention_on_time;
    };
    let scheduled = (record.next_review - last).num_seconds();
    if scheduled <= 0 {
        return retention_on_time;
    }
    let elapsed = (now - last).num_seconds().max(0);
    retention_on_time.powf(elapsed as f64 / scheduled as f64)
}

/// Replays `config.learn_span` days of study starting at `start`, drawing
/// recall outcomes from `seed` (42 when absent) and scheduling every review
/// through `scheduler`.
pub fn simulate<C: Clock>(
    config: &SimulatorConfig,
    scheduler: &Scheduler<C>,
    options: &ReviewOptions<'_>,
    start: DateTime<Utc>,
    seed: Option<u64>,
) -> Result<SimulationResult> {
    ensure!(config.deck_size > 0, InvalidDeckSizeSnafu);
    ensure!(
        config.retention_on_time > 0.0 && config.retention_on_time <= 1.0,
        InvalidProbabilitiesSnafu
    );
    let pass_dist = WeightedIndex::new(config.pass_quality_prob)
        .map_err(|_| SchedulerError::InvalidProbabilities)?;
    let fail_dist = WeightedIndex::new(config.fail_quality_prob)
        .map_err(|_| SchedulerError::InvalidProbabilities)?;

    let mut review_cnt_per_day = vec![0; config.learn_span];
    let mut learn_cnt_per_day = vec![0; config.learn_span];
    let mut pass_cnt_per_day = vec![0; config.learn_span];

    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(42));
    let day_start = |day: usize| start + Duration::days(day as i64);

    // `None` marks a card that has not been introduced yet.
    let mut cards: Vec<Option<ReviewRecord>> = vec![None; config.deck_size];
    let mut queue = PriorityQueue::new();
    if config.learn_limit > 0 {
        for i in 0..config.deck_size {
            let day = i / config.learn_limit;
            if day < config.learn_span {
                queue.push(i, Reverse((day_start(day), i)));
            }
        }
    }

    while let Some((&card_index, &Reverse((due, _)))) = queue.peek() {
        let day_index = (due - start).num_days().max(0) as usize;
        if day_index >= config.learn_span {
            queue.pop();
            continue;
        }

        let is_learn = cards[card_index].is_none();
        let over_limit = if is_learn {
            learn_cnt_per_day[day_index] >= config.learn_limit
        } else {
            review_cnt_per_day[day_index] >= config.review_limit
        };
        if over_limit {
            queue.change_priority(&card_index, Reverse((day_start(day_index + 1), card_index)));
            continue;
        }

        let record = cards[card_index]
            .take()
            .unwrap_or_else(|| ReviewRecord::new(due));
        let passed =
            rng.random::<f64>() < recall_probability(&record, due, config.retention_on_time);
        let quality = if passed {
            Quality::clamped(3 + pass_dist.sample(&mut rng) as i32)
        } else {
            Quality::clamped(fail_dist.sample(&mut rng) as i32)
        };

        let next = scheduler.update_card_at(&record, quality, options, due);
        if is_learn {
            learn_cnt_per_day[day_index] += 1;
        } else {
            review_cnt_per_day[day_index] += 1;
        }
        if passed {
            pass_cnt_per_day[day_index] += 1;
        }
        queue.change_priority(&card_index, Reverse((next.next_review, card_index)));
        cards[card_index] = Some(next);
    }

    let records = cards.into_iter().flatten().collect::<Vec<_>>();
    info!(
        "simulated {} days: {} cards learned, {} reviews",
        config.learn_span,
        records.len(),
        review_cnt_per_day.iter().sum::<usize>()
    );

    Ok(SimulationResult {
        review_cnt_per_day,
        learn_cnt_per_day,
        pass_cnt_per_day,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::SchedulerConfig;
    use crate::record::{MAX_EASE_FACTOR, MIN_EASE_FACTOR};
    use crate::test_helpers::init_logger;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn scheduler(config: SchedulerConfig) -> Scheduler<FixedClock> {
        Scheduler::with_clock(config, FixedClock(start())).unwrap()
    }

    #[test]
    fn simulate_with_zero_cards() {
        let config = SimulatorConfig {
            deck_size: 0,
            ..Default::default()
        };
        let result = simulate(
            &config,
            &scheduler(SchedulerConfig::default()),
            &ReviewOptions::default(),
            start(),
            None,
        );
        assert_eq!(result.unwrap_err(), SchedulerError::InvalidDeckSize);
    }

    #[test]
    fn simulate_with_unusable_probabilities() {
        let scheduler = scheduler(SchedulerConfig::default());
        for config in [
            SimulatorConfig {
                pass_quality_prob: [0.0; 3],
                ..Default::default()
            },
            SimulatorConfig {
                retention_on_time: 0.0,
                ..Default::default()
            },
        ] {
            let result = simulate(&config, &scheduler, &ReviewOptions::default(), start(), None);
            assert_eq!(result.unwrap_err(), SchedulerError::InvalidProbabilities);
        }
    }

    #[test]
    fn simulate_with_learn_limit() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 9,
            learn_limit: 3,
            learn_span: 3,
            ..Default::default()
        };
        let SimulationResult {
            learn_cnt_per_day,
            records,
            ..
        } = simulate(
            &config,
            &scheduler(SchedulerConfig::default()),
            &ReviewOptions::default(),
            start(),
            None,
        )?;
        assert_eq!(learn_cnt_per_day, vec![3, 3, 3]);
        assert_eq!(records.len(), 9);
        Ok(())
    }

    #[test]
    fn simulate_perfect_recall_follows_basic_schedule() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 1,
            learn_span: 30,
            retention_on_time: 1.0,
            pass_quality_prob: [0.0, 1.0, 0.0],
            ..Default::default()
        };
        let SimulationResult {
            review_cnt_per_day,
            pass_cnt_per_day,
            records,
            ..
        } = simulate(
            &config,
            &scheduler(SchedulerConfig::default()),
            &ReviewOptions::default(),
            start(),
            Some(7),
        )?;
        let review_days = review_cnt_per_day
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(day, _)| day)
            .collect::<Vec<_>>();
        assert_eq!(review_days, [1, 7, 22]);
        assert_eq!(pass_cnt_per_day.iter().sum::<usize>(), 4);
        assert_eq!(records[0].interval, 38);
        assert_eq!(records[0].total_reviews, 4);
        Ok(())
    }

    #[test]
    fn simulate_respects_review_limit() -> Result<()> {
        init_logger();
        let config = SimulatorConfig {
            deck_size: 200,
            learn_span: 20,
            learn_limit: 40,
            review_limit: 25,
            ..Default::default()
        };
        let SimulationResult {
            review_cnt_per_day,
            learn_cnt_per_day,
            records,
            ..
        } = simulate(
            &config,
            &scheduler(SchedulerConfig::adaptive()),
            &ReviewOptions::default(),
            start(),
            None,
        )?;
        assert!(review_cnt_per_day.iter().all(|&count| count <= 25));
        assert!(learn_cnt_per_day.iter().all(|&count| count <= 40));
        assert_eq!(learn_cnt_per_day.iter().sum::<usize>(), records.len());
        for record in &records {
            assert!((MIN_EASE_FACTOR..=MAX_EASE_FACTOR).contains(&record.ease_factor));
            assert!(record.interval >= 10);
        }
        Ok(())
    }

    #[test]
    fn simulate_is_deterministic_for_a_seed() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 50,
            learn_span: 30,
            learn_limit: 10,
            ..Default::default()
        };
        let scheduler = scheduler(SchedulerConfig::adaptive());
        let run = |seed| {
            simulate(
                &config,
                &scheduler,
                &ReviewOptions::default(),
                start(),
                Some(seed),
            )
        };
        assert_eq!(run(3)?, run(3)?);
        assert_ne!(run(3)?.pass_cnt_per_day, run(4)?.pass_cnt_per_day);
        Ok(())
    }
}
