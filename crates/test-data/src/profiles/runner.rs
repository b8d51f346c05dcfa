use super::AthleteProfile;

/// Runner pacing: roughly 3% slower per 1% of climb, 1.5% faster per 1% of
/// descent.
#[derive(Debug, Clone)]
pub struct RunnerProfile {
    base_speed: f64,
    variance: f64,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self {
            base_speed: 3.5, // ~4:45/km
            variance: 0.05,
        }
    }
}

impl RunnerProfile {
    /// Profile running at `pace_min_per_km` on the flat (5.0 for 5:00/km).
    pub fn with_pace(pace_min_per_km: f64) -> Self {
        Self {
            base_speed: 1000.0 / (pace_min_per_km * 60.0),
            ..Default::default()
        }
    }

    pub fn recreational() -> Self {
        Self::with_pace(6.0)
    }
}

impl AthleteProfile for RunnerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            (1.0 - grade * 3.0).max(0.4)
        } else {
            (1.0 - grade * 1.5).min(1.2)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn cruising_heart_rate(&self) -> u16 {
        155
    }
}
