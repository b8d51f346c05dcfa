//! Importing workouts already recorded by the device's health platform.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    errors::HealthError,
    models::{DataSource, Sport, TrackedWorkoutMetrics},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl DateRange {
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.start && at <= self.end
    }
}

/// A workout as listed by the health platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthWorkout {
    pub id: String,
    pub sport: Sport,
    pub source: DataSource,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub distance_meters: Option<f64>,
}

#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn list_workouts(&self, range: DateRange) -> Result<Vec<HealthWorkout>, HealthError>;
    async fn import(&self, workout_id: &str) -> Result<TrackedWorkoutMetrics, HealthError>;
}

/// Workouts in `range` that have not been imported yet, newest first.
pub async fn importable_workouts(
    source: &dyn HealthSource,
    range: DateRange,
    already_imported: &HashSet<String>,
) -> Result<Vec<HealthWorkout>, HealthError> {
    let mut workouts: Vec<HealthWorkout> = source
        .list_workouts(range)
        .await?
        .into_iter()
        .filter(|w| range.contains(w.started_at))
        .filter(|w| !already_imported.contains(&w.id))
        .collect();
    workouts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    tracing::debug!(count = workouts.len(), "Health workouts available for import");
    Ok(workouts)
}

/// Imports a workout and checks that it carries its dedup key.
pub async fn import_workout(
    source: &dyn HealthSource,
    workout_id: &str,
) -> Result<TrackedWorkoutMetrics, HealthError> {
    let mut metrics = source.import(workout_id).await?;
    if metrics.health_workout_id.is_none() {
        metrics.health_workout_id = Some(workout_id.to_string());
    }
    Ok(metrics)
}
