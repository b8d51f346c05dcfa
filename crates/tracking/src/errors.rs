use thiserror::Error;
use uuid::Uuid;

use crate::models::SessionStatus;

/// Failures of the tracking session itself.
///
/// Permission and sampler failures are terminal for the current attempt: the
/// session goes back to idle with the error recorded and the caller decides
/// whether to retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Failed to start location updates: {0}")]
    SamplerStart(String),

    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },

    #[error("Workout was stopped before tracking started")]
    NotStarted,

    #[error("Invalid segments: {0}")]
    InvalidSegments(String),
}

impl TrackingError {
    pub(crate) fn invalid(from: SessionStatus, action: &'static str) -> Self {
        TrackingError::InvalidTransition { from, action }
    }
}

/// Failures reported by a location provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("{0}")]
    Unavailable(String),
}

impl From<ProviderError> for TrackingError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::PermissionDenied => TrackingError::PermissionDenied,
            ProviderError::Unavailable(msg) => TrackingError::SamplerStart(msg),
        }
    }
}

/// Failures from the workout store. Always surfaced to the caller, never
/// retried by the tracking core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("Workout store unavailable: {0}")]
    Unavailable(String),

    #[error("Workout rejected: {0}")]
    Rejected(String),

    #[error("Workout {0} not found")]
    NotFound(Uuid),
}

impl PersistenceError {
    /// Whether offering the user a retry makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistenceError::Unavailable(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HealthError {
    #[error("Health data unavailable: {0}")]
    Unavailable(String),

    #[error("Health workout {0} not found")]
    WorkoutNotFound(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}
