//! Simulates one workout end to end and prints the summary.
//!
//! Run with:
//! ```
//! SIM_SPORT=running SIM_REGION=amsterdam SIM_DISTANCE_M=5000 cargo run -p test-data --bin simulate
//! ```

use std::sync::Arc;

use test_data::prelude::*;
use time::{Duration, OffsetDateTime};
use tracing_subscriber::EnvFilter;
use tracking::{
    TrackingController,
    clock::ManualClock,
    config::TrackingConfig,
    format::{format_distance, format_duration, format_elevation, format_sport_pace, format_speed},
    provider::ScriptedProvider,
    reminders::{LoggingReminderScheduler, Reminder, ReminderScheduler},
    segments::{SegmentDefinition, SegmentType, TargetType},
    store::{InMemoryWorkoutStore, save_workout},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let sim = SimulationConfig::from_env()?;
    let config = TrackingConfig::from_env()?;
    let use_metric = std::env::var("SIM_IMPERIAL").is_err();
    tracing::info!(
        sport = ?sim.sport,
        area = ?sim.area,
        distance = sim.distance_meters,
        seed = sim.seed,
        "Simulating workout"
    );

    let started = OffsetDateTime::now_utc();
    let clock = ManualClock::new(started);
    let tracking_starts = started + Duration::seconds(i64::from(config.countdown_seconds));

    let mut rng = StdRng::seed_from_u64(sim.seed);
    let profile = profile_for(sim.sport);
    let (lat, lon) = sim.area.bounds().random_point(&mut rng);
    let fixes = SampleStreamBuilder::new(tracking_starts, sim.seed as u32)
        .with_start(lat, lon)
        .with_terrain(sim.area.terrain(sim.seed as u32))
        .with_distance(sim.distance_meters)
        .with_stop(sim.distance_meters / 2.0, 30)
        .generate(profile.as_ref(), &mut rng)?;

    let mut controller = TrackingController::new(
        config,
        Arc::new(clock.clone()),
        Box::new(ScriptedProvider::new()),
        sim.sport,
    );
    if let Some((count, meters)) = sim.intervals {
        controller.with_segments(&[
            SegmentDefinition::new("warmup", 1, SegmentType::Warmup, TargetType::Time, 300.0),
            SegmentDefinition::new("rep", 2, SegmentType::Work, TargetType::Distance, meters)
                .repeated(count),
            SegmentDefinition::new("cooldown", 3, SegmentType::Cooldown, TargetType::Open, 0.0),
        ])?;
    }

    let report = replay(&mut controller, &clock, &fixes)?;
    let metrics = &report.metrics;

    tracing::info!("Workout complete!");
    tracing::info!("  Time: {}", format_duration(metrics.actual_duration_seconds as f64));
    tracing::info!(
        "  Distance: {}",
        format_distance(metrics.actual_distance_meters, use_metric)
    );
    tracing::info!(
        "  Pace: {}",
        format_sport_pace(metrics.average_pace_seconds_per_km, metrics.sport, use_metric)
    );
    tracing::info!("  Max speed: {}", format_speed(metrics.max_speed_kmh, use_metric));
    tracing::info!(
        "  Elevation: {} / {}",
        format_elevation(metrics.elevation_gain_meters, use_metric),
        format_elevation(-metrics.elevation_loss_meters, use_metric)
    );
    if let Some(bpm) = metrics.average_heart_rate {
        tracing::info!("  Avg heart rate: {bpm} bpm");
    }
    tracing::info!("  Auto-pauses: {}", report.auto_pauses);
    for segment in &metrics.segments {
        let progress = segment
            .progress()
            .map(|p| format!(" ({:.0}%)", p * 100.0))
            .unwrap_or_default();
        tracing::info!(
            "  Segment {}: {:?}, {} in {}{}",
            segment.segment_id,
            segment.outcome,
            format_distance(segment.actual_distance_meters, use_metric),
            format_duration(segment.actual_duration_seconds),
            progress
        );
    }

    let workout = controller.save()?;
    let store = InMemoryWorkoutStore::new();
    let saved = save_workout(&store, &workout).await?;
    controller.reset()?;

    let reminder = Reminder::new(
        "Time to move",
        format!(
            "Last workout {} saved as {}",
            format_distance(workout.actual_distance_meters, use_metric),
            saved.id
        ),
        workout.completed_at + Duration::days(1),
    );
    LoggingReminderScheduler.schedule(&reminder);

    println!("{}", serde_json::to_string_pretty(&workout)?);
    Ok(())
}
