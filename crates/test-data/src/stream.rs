//! Synthetic location sample streams.
//!
//! The builder walks a heading random walk over [`ElevationModel`] terrain,
//! moving at the speed an [`AthleteProfile`] would hold on the local grade,
//! and reports one noisy fix per interval the way a phone sampler would.

use geo::{Destination as _, Haversine, Point};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use time::{Duration, OffsetDateTime};
use tracking::LocationSample;

use crate::profiles::{self, AthleteProfile};
use crate::terrain::ElevationModel;

/// Look-ahead used to estimate the grade in front of the athlete.
const GRADE_LOOKAHEAD_METERS: f64 = 10.0;

/// A standing break at a point along the route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedStop {
    pub after_meters: f64,
    pub seconds: i64,
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Starting point (lat, lon).
    pub start: (f64, f64),
    pub started_at: OffsetDateTime,
    pub distance_meters: f64,
    pub interval_seconds: i64,
    /// Horizontal position noise, standard deviation in meters.
    pub gps_jitter_m: f64,
    pub altitude_jitter_m: f64,
    /// Reported accuracy of a normal fix.
    pub base_accuracy_m: f64,
    /// Chance that a fix is a poor one (tunnel, tree cover).
    pub dropout_probability: f64,
    pub dropout_accuracy_m: f64,
    pub stops: Vec<PlannedStop>,
}

impl StreamConfig {
    pub fn new(started_at: OffsetDateTime) -> Self {
        Self {
            start: crate::config::Region::BOULDER.center(),
            started_at,
            distance_meters: 5000.0,
            interval_seconds: 1,
            gps_jitter_m: 0.5,
            altitude_jitter_m: 0.3,
            base_accuracy_m: 5.0,
            dropout_probability: 0.01,
            dropout_accuracy_m: 45.0,
            stops: Vec::new(),
        }
    }
}

/// One generated fix with the ground truth behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedFix {
    pub sample: LocationSample,
    pub heart_rate: u16,
    /// Distance actually covered up to this fix.
    pub true_distance_meters: f64,
}

pub struct SampleStreamBuilder {
    config: StreamConfig,
    terrain: ElevationModel,
}

impl SampleStreamBuilder {
    pub fn new(started_at: OffsetDateTime, seed: u32) -> Self {
        Self {
            config: StreamConfig::new(started_at),
            terrain: ElevationModel::new(seed),
        }
    }

    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.config.start = (lat, lon);
        self
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.config.distance_meters = meters;
        self
    }

    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.config.gps_jitter_m = meters;
        self
    }

    pub fn with_dropouts(mut self, probability: f64, accuracy_m: f64) -> Self {
        self.config.dropout_probability = probability;
        self.config.dropout_accuracy_m = accuracy_m;
        self
    }

    pub fn with_stop(mut self, after_meters: f64, seconds: i64) -> Self {
        self.config.stops.push(PlannedStop {
            after_meters,
            seconds,
        });
        self
    }

    pub fn with_terrain(mut self, terrain: ElevationModel) -> Self {
        self.terrain = terrain;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn generate<R: Rng>(
        &self,
        profile: &dyn AthleteProfile,
        rng: &mut R,
    ) -> anyhow::Result<Vec<SimulatedFix>> {
        let cfg = &self.config;
        anyhow::ensure!(cfg.interval_seconds > 0, "sample interval must be positive");
        let jitter = Normal::new(0.0, cfg.gps_jitter_m)?;
        let altitude_jitter = Normal::new(0.0, cfg.altitude_jitter_m)?;
        let dt = Duration::seconds(cfg.interval_seconds);

        let mut stops = cfg.stops.clone();
        stops.sort_by(|a, b| a.after_meters.total_cmp(&b.after_meters));
        let mut stops = stops.into_iter().peekable();

        let mut position = Point::new(cfg.start.1, cfg.start.0);
        let mut heading: f64 = rng.gen_range(0.0..360.0);
        let mut travelled = 0.0;
        let mut at = cfg.started_at;

        let observe = |position: Point, speed: f64, travelled: f64, at: OffsetDateTime, rng: &mut R| {
            let noise = (jitter.sample(rng), jitter.sample(rng));
            let reported = offset(position, noise.0, noise.1);
            let altitude = self.terrain.elevation_at(position.y(), position.x())
                + altitude_jitter.sample(rng);
            let accuracy = if rng.gen_bool(cfg.dropout_probability.clamp(0.0, 1.0)) {
                cfg.dropout_accuracy_m
            } else {
                cfg.base_accuracy_m * rng.gen_range(0.8..1.2)
            };
            SimulatedFix {
                sample: LocationSample::new(reported.y(), reported.x(), accuracy, at)
                    .with_altitude(altitude)
                    .with_speed(speed),
                heart_rate: profiles::heart_rate_at(profile, speed),
                true_distance_meters: travelled,
            }
        };

        let mut fixes = vec![observe(position, 0.0, travelled, at, &mut *rng)];
        while travelled < cfg.distance_meters {
            while let Some(stop) = stops.next_if(|s| travelled >= s.after_meters) {
                tracing::debug!(after = stop.after_meters, seconds = stop.seconds, "Planned stop");
                for _ in 0..stop.seconds / cfg.interval_seconds {
                    at += dt;
                    fixes.push(observe(position, 0.0, travelled, at, &mut *rng));
                }
            }

            heading = (heading + rng.gen_range(-8.0..8.0)).rem_euclid(360.0);
            let here = self.terrain.elevation_at(position.y(), position.x());
            let ahead = Haversine.destination(position, heading, GRADE_LOOKAHEAD_METERS);
            let grade = (self.terrain.elevation_at(ahead.y(), ahead.x()) - here) / GRADE_LOOKAHEAD_METERS;

            let speed = profiles::speed_at_grade(profile, grade, profiles::sample_variance(profile, rng));
            let step = (speed * cfg.interval_seconds as f64).min(cfg.distance_meters - travelled);
            position = Haversine.destination(position, heading, step);
            travelled += step;
            at += dt;
            fixes.push(observe(position, speed, travelled, at, &mut *rng));
        }

        tracing::debug!(
            fixes = fixes.len(),
            distance = travelled,
            "Generated sample stream"
        );
        Ok(fixes)
    }
}

/// Moves a point `north` and `east` meters.
fn offset(point: Point, north: f64, east: f64) -> Point {
    let distance = north.hypot(east);
    if distance == 0.0 {
        return point;
    }
    Haversine.destination(point, east.atan2(north).to_degrees(), distance)
}

/// Noise-free fixes `step_meters` apart along one bearing. Handy for
/// reproducing exact distances.
pub fn straight_line(
    start: (f64, f64),
    bearing: f64,
    step_meters: f64,
    count: usize,
    interval_seconds: i64,
    started_at: OffsetDateTime,
) -> Vec<LocationSample> {
    let mut position = Point::new(start.1, start.0);
    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        if i > 0 {
            position = Haversine.destination(position, bearing, step_meters);
        }
        let at = started_at + Duration::seconds(interval_seconds * i as i64);
        samples.push(LocationSample::new(position.y(), position.x(), 4.0, at));
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::RunnerProfile;
    use rand::{SeedableRng, rngs::StdRng};
    use time::macros::datetime;
    use tracking::metrics::displacement_meters;

    #[test]
    fn test_straight_line_spacing() {
        let samples = straight_line((40.0, -105.3), 45.0, 25.0, 5, 10, datetime!(2024-05-01 07:00 UTC));
        assert_eq!(samples.len(), 5);
        for pair in samples.windows(2) {
            assert!((displacement_meters(&pair[0], &pair[1]) - 25.0).abs() < 0.01);
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::seconds(10));
        }
    }

    #[test]
    fn test_stream_reaches_target_distance() {
        let mut rng = StdRng::seed_from_u64(1);
        let fixes = SampleStreamBuilder::new(datetime!(2024-05-01 07:00 UTC), 1)
            .with_distance(1000.0)
            .generate(&RunnerProfile::default(), &mut rng)
            .unwrap();
        let last = fixes.last().unwrap();
        assert!((last.true_distance_meters - 1000.0).abs() < 1e-6);
        // ~3.5 m/s give or take terrain and variance
        assert!(fixes.len() > 150 && fixes.len() < 700);
        assert!(
            fixes
                .windows(2)
                .all(|w| w[1].sample.timestamp > w[0].sample.timestamp)
        );
    }

    #[test]
    fn test_planned_stop_holds_position() {
        let mut rng = StdRng::seed_from_u64(2);
        let fixes = SampleStreamBuilder::new(datetime!(2024-05-01 07:00 UTC), 2)
            .with_distance(300.0)
            .with_stop(100.0, 20)
            .generate(&RunnerProfile::default(), &mut rng)
            .unwrap();
        let stationary = fixes
            .iter()
            .filter(|f| f.sample.speed == Some(0.0))
            .count();
        // Start fix plus twenty seconds standing.
        assert_eq!(stationary, 21);
    }
}
