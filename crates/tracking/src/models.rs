use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::segments::SegmentProgress;

/// A raw fix delivered by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude above sea level in meters, when the device reports one.
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Device-reported ground speed in m/s.
    pub speed: Option<f64>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: OffsetDateTime) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy,
            timestamp,
            speed: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn point(&self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Countdown,
    Tracking,
    Paused,
    AutoPaused,
    SegmentTransition,
    Stopping,
    Summary,
    Saving,
}

impl SessionStatus {
    /// States in which a sampler subscription may be live.
    pub fn is_recording(self) -> bool {
        matches!(
            self,
            SessionStatus::Tracking
                | SessionStatus::Paused
                | SessionStatus::AutoPaused
                | SessionStatus::SegmentTransition
        )
    }

    pub fn is_paused(self) -> bool {
        matches!(self, SessionStatus::Paused | SessionStatus::AutoPaused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Countdown => "countdown",
            SessionStatus::Tracking => "tracking",
            SessionStatus::Paused => "paused",
            SessionStatus::AutoPaused => "auto_paused",
            SessionStatus::SegmentTransition => "segment_transition",
            SessionStatus::Stopping => "stopping",
            SessionStatus::Summary => "summary",
            SessionStatus::Saving => "saving",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Running,
    Walking,
    Hiking,
    Cycling,
    Swimming,
    Rowing,
    Other,
}

impl Sport {
    /// Rough metabolic equivalent used for calorie estimates.
    pub fn met(self, average_speed_kmh: Option<f64>) -> f64 {
        let speed = average_speed_kmh.unwrap_or(0.0);
        match self {
            Sport::Running => match speed {
                s if s >= 14.0 => 12.5,
                s if s >= 11.0 => 11.0,
                s if s >= 8.0 => 9.0,
                _ => 7.0,
            },
            Sport::Walking => {
                if speed >= 5.5 {
                    4.3
                } else {
                    3.5
                }
            }
            Sport::Hiking => 6.0,
            Sport::Cycling => match speed {
                s if s >= 25.0 => 10.0,
                s if s >= 19.0 => 8.0,
                _ => 6.0,
            },
            Sport::Swimming => 8.0,
            Sport::Rowing => 7.0,
            Sport::Other => 5.0,
        }
    }
}

/// Where a workout's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    GpsTracking,
    HealthKit,
    HealthConnect,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsQuality {
    None,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl GpsQuality {
    /// Buckets a horizontal accuracy radius (meters) into a label.
    pub fn from_accuracy(accuracy: f64) -> Self {
        match accuracy {
            a if !a.is_finite() || a < 0.0 => GpsQuality::None,
            a if a <= 5.0 => GpsQuality::Excellent,
            a if a <= 10.0 => GpsQuality::Good,
            a if a <= 20.0 => GpsQuality::Fair,
            _ => GpsQuality::Poor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSignal {
    pub accuracy: Option<f64>,
    pub quality: GpsQuality,
}

impl GpsSignal {
    pub fn none() -> Self {
        Self {
            accuracy: None,
            quality: GpsQuality::None,
        }
    }

    pub fn from_accuracy(accuracy: f64) -> Self {
        Self {
            accuracy: Some(accuracy),
            quality: GpsQuality::from_accuracy(accuracy),
        }
    }
}

impl Default for GpsSignal {
    fn default() -> Self {
        Self::none()
    }
}

/// Final numbers for one workout, built once when a session stops or a
/// health-platform workout is imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedWorkoutMetrics {
    pub session_id: Uuid,
    pub sport: Sport,
    pub actual_duration_seconds: i64,
    pub actual_distance_meters: f64,
    pub average_pace_seconds_per_km: Option<f64>,
    pub average_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub average_heart_rate: Option<u16>,
    pub max_heart_rate: Option<u16>,
    pub elevation_gain_meters: f64,
    pub elevation_loss_meters: f64,
    pub calories: Option<u32>,
    pub average_cadence: Option<u16>,
    pub data_source: DataSource,
    /// Identifier of the health-platform workout this was imported from.
    pub health_workout_id: Option<String>,
    #[serde(default)]
    pub segments: Vec<SegmentProgress>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

impl TrackedWorkoutMetrics {
    pub fn is_imported(&self) -> bool {
        self.health_workout_id.is_some()
    }
}

/// Running heart-rate aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeartRateStats {
    sum: u64,
    count: u32,
    max: u16,
}

impl HeartRateStats {
    pub fn record(&mut self, bpm: u16) {
        if bpm == 0 {
            return;
        }
        self.sum += u64::from(bpm);
        self.count += 1;
        self.max = self.max.max(bpm);
    }

    pub fn average(&self) -> Option<u16> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum as f64 / f64::from(self.count)).round() as u16)
    }

    pub fn max(&self) -> Option<u16> {
        (self.count > 0).then_some(self.max)
    }
}
