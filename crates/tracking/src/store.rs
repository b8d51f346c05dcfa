//! Persistence boundary for finished workouts.
//!
//! The backend schema is owned elsewhere; the tracking core only hands
//! finished metrics over and reports failures back without retrying.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{errors::PersistenceError, models::TrackedWorkoutMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedWorkout {
    pub id: Uuid,
}

#[async_trait]
pub trait WorkoutStore: Send + Sync {
    async fn save(&self, metrics: &TrackedWorkoutMetrics) -> Result<SavedWorkout, PersistenceError>;
    async fn load(&self, session_id: Uuid)
    -> Result<Option<TrackedWorkoutMetrics>, PersistenceError>;
}

/// Saves metrics handed over by the controller, logging the outcome.
pub async fn save_workout(
    store: &dyn WorkoutStore,
    metrics: &TrackedWorkoutMetrics,
) -> Result<SavedWorkout, PersistenceError> {
    match store.save(metrics).await {
        Ok(saved) => {
            tracing::info!(
                session = %metrics.session_id,
                workout = %saved.id,
                "Workout saved"
            );
            Ok(saved)
        }
        Err(e) => {
            tracing::error!(session = %metrics.session_id, "Failed to save workout: {e}");
            Err(e)
        }
    }
}

/// Process-local store keyed by session id.
#[derive(Debug, Default)]
pub struct InMemoryWorkoutStore {
    workouts: Mutex<HashMap<Uuid, (Uuid, TrackedWorkoutMetrics)>>,
    unavailable: Mutex<Option<String>>,
}

impl InMemoryWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `Unavailable` until cleared.
    pub async fn set_unavailable(&self, reason: Option<&str>) {
        *self.unavailable.lock().await = reason.map(str::to_string);
    }

    pub async fn len(&self) -> usize {
        self.workouts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workouts.lock().await.is_empty()
    }

    async fn check_available(&self) -> Result<(), PersistenceError> {
        match self.unavailable.lock().await.as_ref() {
            Some(reason) => Err(PersistenceError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkoutStore for InMemoryWorkoutStore {
    async fn save(&self, metrics: &TrackedWorkoutMetrics) -> Result<SavedWorkout, PersistenceError> {
        self.check_available().await?;
        if !metrics.actual_distance_meters.is_finite() || metrics.actual_duration_seconds < 0 {
            return Err(PersistenceError::Rejected(
                "metrics contain invalid values".to_string(),
            ));
        }

        let mut workouts = self.workouts.lock().await;
        // Saving the same session twice keeps the first id.
        let id = workouts
            .get(&metrics.session_id)
            .map(|(id, _)| *id)
            .unwrap_or_else(Uuid::new_v4);
        workouts.insert(metrics.session_id, (id, metrics.clone()));
        Ok(SavedWorkout { id })
    }

    async fn load(
        &self,
        session_id: Uuid,
    ) -> Result<Option<TrackedWorkoutMetrics>, PersistenceError> {
        self.check_available().await?;
        Ok(self
            .workouts
            .lock()
            .await
            .get(&session_id)
            .map(|(_, metrics)| metrics.clone()))
    }
}
