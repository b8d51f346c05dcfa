//! Athlete pacing profiles.
//!
//! A profile turns terrain grade into a target speed. The stream builder
//! uses it to decide how far the athlete moves between fixes.

mod cyclist;
mod hiker;
mod runner;

pub use cyclist::CyclistProfile;
pub use hiker::HikerProfile;
pub use runner::RunnerProfile;

use rand_distr::{Distribution, Normal};
use tracking::Sport;

pub trait AthleteProfile: Send + Sync {
    /// Speed on flat ground in meters per second.
    fn base_speed_mps(&self) -> f64;

    /// Speed multiplier for a grade given as a fraction (0.05 = 5% climb).
    fn grade_factor(&self, grade: f64) -> f64;

    /// Sample-to-sample variation as a coefficient of variation.
    fn variance(&self) -> f64;

    /// Heart rate at base speed on the flat.
    fn cruising_heart_rate(&self) -> u16 {
        150
    }
}

/// Target speed at `grade`, scaled by a sampled variance factor.
pub fn speed_at_grade(profile: &dyn AthleteProfile, grade: f64, variance_factor: f64) -> f64 {
    let target = profile.base_speed_mps() * profile.grade_factor(grade);
    (target * variance_factor).max(0.5)
}

/// Samples a multiplier around 1.0 from the profile's variance.
pub fn sample_variance(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    match Normal::new(1.0, profile.variance()) {
        Ok(normal) if profile.variance() > 0.0 => normal.sample(rng).clamp(0.7, 1.4),
        _ => 1.0,
    }
}

/// Heart rate for the effort implied by `speed_mps`.
pub fn heart_rate_at(profile: &dyn AthleteProfile, speed_mps: f64) -> u16 {
    let effort = speed_mps / profile.base_speed_mps();
    let bpm = f64::from(profile.cruising_heart_rate()) * (0.75 + 0.25 * effort);
    bpm.clamp(70.0, 200.0).round() as u16
}

pub fn profile_for(sport: Sport) -> Box<dyn AthleteProfile> {
    match sport {
        Sport::Cycling => Box::new(CyclistProfile::default()),
        Sport::Walking | Sport::Hiking => Box::new(HikerProfile::default()),
        _ => Box::new(RunnerProfile::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_variance_is_clamped() {
        let profile = RunnerProfile::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let factor = sample_variance(&profile, &mut rng);
            assert!((0.7..=1.4).contains(&factor));
        }
    }

    #[test]
    fn test_heart_rate_follows_effort() {
        let profile = RunnerProfile::default();
        let easy = heart_rate_at(&profile, 2.5);
        let cruise = heart_rate_at(&profile, profile.base_speed_mps());
        let hard = heart_rate_at(&profile, 4.5);
        assert_eq!(cruise, profile.cruising_heart_rate());
        assert!(easy < cruise && cruise < hard);
    }

    #[test]
    fn test_profile_for_sport() {
        assert!(profile_for(Sport::Cycling).base_speed_mps() > 5.0);
        assert!(profile_for(Sport::Hiking).base_speed_mps() < 2.0);
    }
}
