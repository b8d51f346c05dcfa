//! Tunables for a tracking session.
//!
//! Values that the mobile app never pinned down in one place (auto-pause
//! window, accuracy cut-offs) live here so deployments can adjust them
//! without code changes.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Options passed to the location provider on subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerOptions {
    /// Desired interval between fixes in milliseconds.
    pub interval_ms: u64,
    /// Minimum movement in meters before the provider emits a new fix.
    pub distance_filter_meters: f64,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            distance_filter_meters: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// Samples with a worse horizontal accuracy do not add distance.
    pub max_accuracy_meters: f64,
    /// Altitude changes smaller than this are treated as jitter.
    pub min_elevation_delta_meters: f64,
    /// Number of recent samples used for current pace.
    pub pace_window_samples: usize,
    /// Pace stays unset until at least this much distance is covered.
    pub min_pace_distance_meters: f64,
    /// Pace stays unset until at least this much active time has passed.
    pub min_pace_elapsed_seconds: f64,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            max_accuracy_meters: 30.0,
            min_elevation_delta_meters: 2.0,
            pace_window_samples: 5,
            min_pace_distance_meters: 10.0,
            min_pace_elapsed_seconds: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPauseConfig {
    pub enabled: bool,
    /// Displacement between consecutive samples below this counts as still.
    pub displacement_threshold_meters: f64,
    /// Consecutive still samples before the session auto-pauses.
    pub still_sample_count: u32,
}

impl Default for AutoPauseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            displacement_threshold_meters: 1.0,
            still_sample_count: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Battery fraction (0.0 - 1.0) below which a warning is raised.
    pub low_battery_level: f64,
    /// Accuracy in meters above which the signal is reported as weak.
    pub weak_accuracy_meters: f64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            low_battery_level: 0.2,
            weak_accuracy_meters: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub countdown_seconds: u32,
    pub segment_transition_seconds: u32,
    pub auto_advance_segments: bool,
    /// Seconds without a fix before the signal is shown as lost.
    pub signal_stale_seconds: u32,
    /// Body mass for calorie estimates; no estimate without it.
    pub body_mass_kg: Option<f64>,
    pub sampler: SamplerOptions,
    pub accumulator: AccumulatorConfig,
    pub auto_pause: AutoPauseConfig,
    pub readiness: ReadinessConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 3,
            segment_transition_seconds: 5,
            auto_advance_segments: true,
            signal_stale_seconds: 10,
            body_mass_kg: None,
            sampler: SamplerOptions::default(),
            accumulator: AccumulatorConfig::default(),
            auto_pause: AutoPauseConfig::default(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl TrackingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by any `TRACKING_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        override_from_env("TRACKING_COUNTDOWN_SECONDS", &mut self.countdown_seconds)?;
        override_from_env(
            "TRACKING_SEGMENT_TRANSITION_SECONDS",
            &mut self.segment_transition_seconds,
        )?;
        override_from_env(
            "TRACKING_AUTO_ADVANCE_SEGMENTS",
            &mut self.auto_advance_segments,
        )?;
        override_from_env(
            "TRACKING_SIGNAL_STALE_SECONDS",
            &mut self.signal_stale_seconds,
        )?;
        override_from_env("TRACKING_INTERVAL_MS", &mut self.sampler.interval_ms)?;
        override_from_env(
            "TRACKING_MAX_ACCURACY_METERS",
            &mut self.accumulator.max_accuracy_meters,
        )?;
        override_from_env("TRACKING_AUTO_PAUSE", &mut self.auto_pause.enabled)?;
        override_from_env(
            "TRACKING_AUTO_PAUSE_THRESHOLD_METERS",
            &mut self.auto_pause.displacement_threshold_meters,
        )?;
        override_from_env(
            "TRACKING_AUTO_PAUSE_SAMPLES",
            &mut self.auto_pause.still_sample_count,
        )?;

        if let Ok(raw) = env::var("TRACKING_BODY_MASS_KG") {
            self.body_mass_kg = Some(parse_env("TRACKING_BODY_MASS_KG", &raw)?);
        }
        Ok(())
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(raw) = env::var(key) {
        *target = parse_env(key, &raw)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
