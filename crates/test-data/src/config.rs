//! Geographic areas and environment settings for simulations.

use serde::{Deserialize, Serialize};
use tracking::Sport;

use crate::terrain::ElevationModel;

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> (f64, f64) {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        (lat, lon)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Pre-defined areas to start simulated workouts in.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Boulder, CO foothills.
    pub const BOULDER: BoundingBox = BoundingBox::new(39.9, -105.5, 40.1, -105.2);

    /// Amsterdam: flat, mostly city streets.
    pub const AMSTERDAM: BoundingBox = BoundingBox::new(52.33, 4.84, 52.40, 4.95);
}

/// Where a simulated workout takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationArea {
    #[default]
    Boulder,
    Amsterdam,
}

impl SimulationArea {
    pub fn bounds(self) -> BoundingBox {
        match self {
            SimulationArea::Boulder => Region::BOULDER,
            SimulationArea::Amsterdam => Region::AMSTERDAM,
        }
    }

    pub fn terrain(self, seed: u32) -> ElevationModel {
        match self {
            SimulationArea::Boulder => ElevationModel::new(seed),
            SimulationArea::Amsterdam => ElevationModel::flat(seed),
        }
    }
}

/// Settings for the `simulate` binary, read from `SIM_*` variables.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub sport: Sport,
    pub area: SimulationArea,
    pub distance_meters: f64,
    /// Optional interval plan: `count x meters`, e.g. `4x400`.
    pub intervals: Option<(u32, f64)>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            sport: Sport::Running,
            area: SimulationArea::default(),
            distance_meters: 5000.0,
            intervals: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(seed) = std::env::var("SIM_SEED") {
            config.seed = seed.parse()?;
        }
        if let Ok(sport) = std::env::var("SIM_SPORT") {
            config.sport = serde_json::from_value(serde_json::Value::String(sport))?;
        }
        if let Ok(area) = std::env::var("SIM_REGION") {
            config.area = serde_json::from_value(serde_json::Value::String(area))?;
        }
        if let Ok(distance) = std::env::var("SIM_DISTANCE_M") {
            config.distance_meters = distance.parse()?;
        }
        if let Ok(plan) = std::env::var("SIM_INTERVALS") {
            config.intervals = Some(parse_intervals(&plan)?);
        }
        Ok(config)
    }
}

fn parse_intervals(plan: &str) -> anyhow::Result<(u32, f64)> {
    let (count, meters) = plan
        .split_once('x')
        .ok_or_else(|| anyhow::anyhow!("expected COUNTxMETERS, got {plan:?}"))?;
    Ok((count.trim().parse()?, meters.trim().parse()?))
}
