use super::AthleteProfile;

/// Cyclist pacing. Grade matters far more than for runners: about 8%
/// slower per 1% of climb, 5% faster per 1% of descent.
#[derive(Debug, Clone)]
pub struct CyclistProfile {
    base_speed: f64,
    variance: f64,
}

impl Default for CyclistProfile {
    fn default() -> Self {
        Self {
            base_speed: 8.0, // ~28 km/h
            variance: 0.08,
        }
    }
}

impl CyclistProfile {
    pub fn with_speed(speed_kmh: f64) -> Self {
        Self {
            base_speed: speed_kmh / 3.6,
            ..Default::default()
        }
    }
}

impl AthleteProfile for CyclistProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            (1.0 - grade * 8.0).max(0.25)
        } else {
            (1.0 - grade * 5.0).min(1.8)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn cruising_heart_rate(&self) -> u16 {
        140
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steep_climb() {
        let profile = CyclistProfile::with_speed(30.0);
        assert!((profile.base_speed_mps() - 8.333).abs() < 0.01);
        assert!(profile.grade_factor(0.10) < 0.5);
        assert!(profile.grade_factor(-0.05) > 1.2);
    }
}
