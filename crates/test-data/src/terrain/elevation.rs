//! Perlin noise-based terrain heights.

use noise::{NoiseFn, Perlin};

const METERS_PER_DEGREE: f64 = 111_195.0;

/// Terrain height as a function of position.
///
/// Several octaves of Perlin noise are summed (fractal Brownian motion) so
/// that long climbs carry smaller bumps on top of them.
#[derive(Debug, Clone)]
pub struct ElevationModel {
    perlin: Perlin,
    base_elevation: f64,
    height_scale: f64,
    /// Cycles per meter of the lowest octave.
    frequency: f64,
    octaves: u32,
}

impl ElevationModel {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 1650.0,
            height_scale: 60.0,
            frequency: 1.0 / 2000.0,
            octaves: 4,
        }
    }

    /// Barely rolling terrain, for city runs.
    pub fn flat(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 2.0,
            height_scale: 3.0,
            frequency: 1.0 / 4000.0,
            octaves: 2,
        }
    }

    pub fn height_scale(&self) -> f64 {
        self.height_scale
    }

    pub fn base_elevation(&self) -> f64 {
        self.base_elevation
    }

    /// Height in meters at a latitude/longitude.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> f64 {
        let north = lat * METERS_PER_DEGREE;
        let east = lon * METERS_PER_DEGREE * lat.to_radians().cos();

        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut max_amplitude = 0.0;
        for _ in 0..self.octaves {
            total += self.perlin.get([north * frequency, east * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        self.base_elevation + (total / max_amplitude) * self.height_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevation_is_deterministic() {
        let terrain = ElevationModel::new(42);
        let a = terrain.elevation_at(40.0, -105.3);
        let b = terrain.elevation_at(40.0, -105.3);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_elevation_range() {
        let terrain = ElevationModel::new(42);
        for step in 0..50 {
            let h = terrain.elevation_at(40.0 + f64::from(step) * 0.001, -105.3);
            assert!(h >= terrain.base_elevation() - terrain.height_scale());
            assert!(h <= terrain.base_elevation() + terrain.height_scale());
        }
    }

    #[test]
    fn test_flat_terrain_stays_low() {
        let terrain = ElevationModel::flat(42);
        for step in 0..50 {
            let h = terrain.elevation_at(52.35 + f64::from(step) * 0.001, 4.9);
            assert!((-1.0..=5.0).contains(&h), "height {h}");
        }
    }
}
