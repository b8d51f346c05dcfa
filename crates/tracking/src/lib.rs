//! Live workout tracking core.
//!
//! A [`TrackingController`] runs one workout at a time: countdown, GPS
//! tracking with auto-pause, optional multi-segment progress, and a final
//! [`TrackedWorkoutMetrics`] handed to the caller on stop. Device location,
//! persistence, health-platform import and reminders are collaborators
//! behind traits.
//!
//! ```rust,ignore
//! use tracking::prelude::*;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(64);
//! let (provider, feed) = location_channel(tx.clone());
//! let controller = TrackingController::new(
//!     TrackingConfig::from_env()?,
//!     Arc::new(SystemClock),
//!     Box::new(provider),
//!     Sport::Running,
//! );
//! let (driver, snapshots) = SessionDriver::new(controller, rx);
//! tokio::spawn(driver.run());
//! tx.send(SessionEvent::Command(SessionCommand::StartCountdown)).await?;
//! ```

pub mod clock;
pub mod config;
pub mod controller;
pub mod driver;
pub mod errors;
pub mod format;
pub mod health;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod reminders;
pub mod segments;
pub mod store;
pub mod timers;

pub use controller::{SessionSnapshot, TrackingController};
pub use errors::{HealthError, PersistenceError, ProviderError, TrackingError};
pub use models::{
    DataSource, GpsQuality, GpsSignal, LocationSample, SessionStatus, Sport,
    TrackedWorkoutMetrics,
};

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::TrackingConfig;
    pub use crate::controller::{SessionSnapshot, TrackingController};
    pub use crate::driver::{
        SessionCommand, SessionDriver, SessionEvent, SessionOutcome, location_channel,
    };
    pub use crate::format::{
        format_distance, format_duration, format_elevation, format_pace, format_speed,
        format_sport_pace,
    };
    pub use crate::models::{LocationSample, SessionStatus, Sport, TrackedWorkoutMetrics};
    pub use crate::segments::{SegmentDefinition, SegmentType, TargetType};
    pub use crate::store::{InMemoryWorkoutStore, WorkoutStore, save_workout};
}
