use std::collections::HashMap;

use chrono::{Duration, Utc};
use vocab_srs::{
    Algorithm, Difficulty, PreferredTime, Quality, ReviewOptions, ReviewRecord, Scheduler,
    SchedulerConfig, UserStats,
};

fn setup_logging() -> Result<(), Box<dyn std::error::Error>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message))
        })
        .level(log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn schedule_new_card() -> Result<(), Box<dyn std::error::Error>> {
    // Basic (SM-2) scheduling, intervals in days
    let scheduler = Scheduler::new(SchedulerConfig::default())?;
    let mut card = ReviewRecord::new(Utc::now());

    let preview = scheduler.preview_intervals(&card, &ReviewOptions::default(), Utc::now());
    println!("Intervals by quality 0..=5: {preview:?} days");

    for quality in [4, 5, 2, 3] {
        card = scheduler.update_card(&card, Quality::try_from(quality)?, &ReviewOptions::default());
        println!(
            "quality {quality}: repetitions {}, interval {} days, ease {:.2}, due {}",
            card.repetitions, card.interval, card.ease_factor, card.next_review
        );
    }
    Ok(())
}

fn schedule_existing_card() -> Result<(), Box<dyn std::error::Error>> {
    // Adaptive scheduling, intervals in minutes
    let scheduler = Scheduler::new(SchedulerConfig::adaptive())?;
    let stats = UserStats {
        accuracy: 0.88,
        category_accuracy: HashMap::from([("verbs".to_string(), 0.93)]),
        streak: 12,
        preferred_times: vec![PreferredTime {
            hour: 19,
            minute: 30,
            accuracy: 0.95,
        }],
    };
    let card = ReviewRecord {
        repetitions: 4,
        interval: 4320,
        ease_factor: 2.3,
        last_reviewed_at: Some(Utc::now() - Duration::days(3)),
        ..ReviewRecord::new(Utc::now())
    };
    let options = ReviewOptions {
        category: Some("verbs"),
        difficulty: Difficulty::Hard,
        response_time_ms: Some(3500),
        user_stats: Some(&stats),
        ..Default::default()
    };

    let card = scheduler.update_card(&card, Quality::try_from(4)?, &options);
    println!(
        "adaptive: interval {} minutes, ease {:.2}, due {}",
        card.interval, card.ease_factor, card.next_review
    );

    println!(
        "Suggested batch for 15 minutes: {} cards",
        scheduler.suggest_optimal_batch_size(&stats, 15 * 60 * 1000)
    );
    for insight in scheduler.learning_insights(&stats, &card.review_history) {
        println!("[{}] {}", insight.kind, insight.message);
    }

    // An impossible preferred time makes the adaptive variant fail; the
    // scheduler logs a warning and answers with the basic variant.
    let broken = UserStats {
        preferred_times: vec![PreferredTime {
            hour: 31,
            minute: 0,
            accuracy: 1.0,
        }],
        ..stats.clone()
    };
    let fallback = scheduler.update_card(
        &card,
        Quality::try_from(5)?,
        &ReviewOptions {
            user_stats: Some(&broken),
            algorithm: Some(Algorithm::Adaptive),
            ..options
        },
    );
    println!("fallback interval: {} days", fallback.interval);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging()?;

    println!("Scheduling a new card:");
    schedule_new_card()?;

    println!("\nScheduling an existing card:");
    schedule_existing_card()?;

    Ok(())
}
