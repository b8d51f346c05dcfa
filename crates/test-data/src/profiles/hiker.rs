use super::AthleteProfile;

/// Walking and hiking pace, ~5.5 km/h on the flat.
#[derive(Debug, Clone)]
pub struct HikerProfile {
    base_speed: f64,
    variance: f64,
}

impl Default for HikerProfile {
    fn default() -> Self {
        Self {
            base_speed: 1.5,
            variance: 0.06,
        }
    }
}

impl AthleteProfile for HikerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        // Careful on descents.
        if grade >= 0.0 {
            (1.0 - grade * 4.0).max(0.5)
        } else {
            (1.0 - grade * 2.0).min(1.2)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn cruising_heart_rate(&self) -> u16 {
        115
    }
}
