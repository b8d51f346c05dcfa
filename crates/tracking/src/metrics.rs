//! Running totals computed from accepted location samples.

use std::collections::VecDeque;

use geo::{Distance as _, Haversine};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    config::AccumulatorConfig,
    models::{LocationSample, SessionStatus},
};

/// Current pace needs at least this much movement inside the window.
const MIN_WINDOW_DISTANCE_METERS: f64 = 1.0;

/// Great-circle distance in meters between two fixes.
pub fn displacement_meters(from: &LocationSample, to: &LocationSample) -> f64 {
    Haversine.distance(from.point(), to.point())
}

/// A single running metric fed one accepted sample at a time.
pub trait SampleMetric {
    type Value;
    fn next_sample(&mut self, previous: Option<&LocationSample>, sample: &LocationSample);
    fn value(&self) -> Self::Value;
}

#[derive(Debug, Clone, Default)]
struct DistanceMetric {
    total_meters: f64,
}

impl SampleMetric for DistanceMetric {
    type Value = f64;

    fn next_sample(&mut self, previous: Option<&LocationSample>, sample: &LocationSample) {
        self.total_meters += previous.map_or(0.0, |prev| displacement_meters(prev, sample));
    }

    fn value(&self) -> f64 {
        self.total_meters
    }
}

/// Gain and loss against a reference altitude that only moves once the
/// change exceeds the jitter threshold.
#[derive(Debug, Clone, Default)]
struct ElevationMetric {
    min_delta: f64,
    reference: Option<f64>,
    gain: f64,
    loss: f64,
}

impl SampleMetric for ElevationMetric {
    type Value = (f64, f64);

    fn next_sample(&mut self, _previous: Option<&LocationSample>, sample: &LocationSample) {
        let Some(altitude) = sample.altitude else {
            return;
        };
        let Some(reference) = self.reference else {
            self.reference = Some(altitude);
            return;
        };

        let delta = altitude - reference;
        if delta.abs() < self.min_delta {
            return;
        }
        if delta > 0.0 {
            self.gain += delta;
        } else {
            self.loss += -delta;
        }
        self.reference = Some(altitude);
    }

    fn value(&self) -> (f64, f64) {
        (self.gain, self.loss)
    }
}

impl ElevationMetric {
    /// Moves the reference without counting the change.
    fn rebase(&mut self, sample: &LocationSample) {
        if let Some(altitude) = sample.altitude {
            self.reference = Some(altitude);
        }
    }
}

/// Rolling window of (timestamp, cumulative distance) for current pace.
#[derive(Debug, Clone, Default)]
struct PaceWindow {
    capacity: usize,
    entries: VecDeque<(OffsetDateTime, f64)>,
}

impl PaceWindow {
    fn push(&mut self, at: OffsetDateTime, cumulative_meters: f64) {
        if self.entries.len() == self.capacity.max(2) {
            self.entries.pop_front();
        }
        self.entries.push_back((at, cumulative_meters));
    }

    /// Distance (m) and time (s) spanned by the window.
    fn span(&self) -> Option<(f64, f64)> {
        let (first_at, first_dist) = self.entries.front()?;
        let (last_at, last_dist) = self.entries.back()?;
        let seconds = (*last_at - *first_at).as_seconds_f64();
        let meters = last_dist - first_dist;
        (seconds > 0.0 && meters >= MIN_WINDOW_DISTANCE_METERS).then_some((meters, seconds))
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// What happened to a sample handed to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// Session was not tracking; only `last_location` moved.
    Ignored,
    /// Accuracy too poor to trust for distance.
    Inaccurate,
    /// First trusted fix, nothing to measure against.
    First,
    Accepted { delta_meters: f64 },
}

/// Point-in-time view of the accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AccumulatedMetrics {
    pub distance_meters: f64,
    pub elevation_gain_meters: f64,
    pub elevation_loss_meters: f64,
    pub current_pace_seconds_per_km: Option<f64>,
    pub current_speed_kmh: Option<f64>,
    pub average_pace_seconds_per_km: Option<f64>,
    pub average_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    config: AccumulatorConfig,
    distance: DistanceMetric,
    elevation: ElevationMetric,
    window: PaceWindow,
    last_location: Option<LocationSample>,
    has_trusted_fix: bool,
    current_pace: Option<f64>,
    current_speed: Option<f64>,
    average_pace: Option<f64>,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
}

impl MetricsAccumulator {
    pub fn new(config: AccumulatorConfig) -> Self {
        Self {
            config,
            distance: DistanceMetric::default(),
            elevation: ElevationMetric {
                min_delta: config.min_elevation_delta_meters,
                ..Default::default()
            },
            window: PaceWindow {
                capacity: config.pace_window_samples,
                entries: VecDeque::new(),
            },
            last_location: None,
            has_trusted_fix: false,
            current_pace: None,
            current_speed: None,
            average_pace: None,
            average_speed: None,
            max_speed: None,
        }
    }

    /// Feeds one fix. Only a `Tracking` session changes the totals; in every
    /// state the fix becomes the new `last_location` and elevation reference,
    /// so movement while not tracking is never credited later.
    pub fn accept(
        &mut self,
        sample: LocationSample,
        status: SessionStatus,
        active_elapsed: Duration,
    ) -> SampleOutcome {
        if status != SessionStatus::Tracking {
            self.elevation.rebase(&sample);
            self.last_location = Some(sample);
            return SampleOutcome::Ignored;
        }

        let outcome = if sample.accuracy > self.config.max_accuracy_meters {
            tracing::debug!(
                accuracy = sample.accuracy,
                "Discarding inaccurate sample for distance"
            );
            SampleOutcome::Inaccurate
        } else {
            let before = self.distance.value();
            let previous = self.last_location.as_ref().filter(|_| self.has_trusted_fix);
            let first = previous.is_none();
            self.distance.next_sample(previous, &sample);
            self.elevation.next_sample(previous, &sample);
            self.has_trusted_fix = true;

            self.window.push(sample.timestamp, self.distance.value());
            self.refresh_current();

            if first {
                SampleOutcome::First
            } else {
                SampleOutcome::Accepted {
                    delta_meters: self.distance.value() - before,
                }
            }
        };

        self.last_location = Some(sample);
        self.refresh_averages(active_elapsed);
        outcome
    }

    /// Recomputes the cumulative averages for the given active time.
    pub fn refresh_averages(&mut self, active_elapsed: Duration) {
        let seconds = active_elapsed.as_seconds_f64();
        let meters = self.distance.value();
        if meters >= self.config.min_pace_distance_meters
            && seconds >= self.config.min_pace_elapsed_seconds
        {
            self.average_pace = Some(seconds / (meters / 1000.0));
            self.average_speed = Some(meters / seconds * 3.6);
        } else {
            self.average_pace = None;
            self.average_speed = None;
        }
    }

    /// Forgets the rolling window, e.g. after a pause, so current pace does
    /// not span the stopped interval.
    pub fn reset_window(&mut self) {
        self.window.clear();
        self.current_pace = None;
        self.current_speed = None;
    }

    fn refresh_current(&mut self) {
        match self.window.span() {
            Some((meters, seconds)) => {
                let speed = meters / seconds * 3.6;
                self.current_pace = Some(seconds / (meters / 1000.0));
                self.current_speed = Some(speed);
                self.max_speed = Some(self.max_speed.map_or(speed, |max| max.max(speed)));
            }
            None => {
                self.current_pace = None;
                self.current_speed = None;
            }
        }
    }

    pub fn last_location(&self) -> Option<&LocationSample> {
        self.last_location.as_ref()
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance.value()
    }

    pub fn snapshot(&self) -> AccumulatedMetrics {
        let (gain, loss) = self.elevation.value();
        AccumulatedMetrics {
            distance_meters: self.distance.value(),
            elevation_gain_meters: gain,
            elevation_loss_meters: loss,
            current_pace_seconds_per_km: self.current_pace,
            current_speed_kmh: self.current_speed,
            average_pace_seconds_per_km: self.average_pace,
            average_speed_kmh: self.average_speed,
            max_speed_kmh: self.max_speed,
        }
    }
}
