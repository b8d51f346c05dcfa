//! Synthetic workouts for the tracking core.
//!
//! Generates realistic GPS sample streams (terrain-driven pacing, position
//! noise, poor fixes, standing breaks) and replays them through a
//! [`tracking::TrackingController`] on a manual clock.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(12345);
//! let fixes = SampleStreamBuilder::new(started_at, 12345)
//!     .with_distance(5000.0)
//!     .with_stop(2500.0, 30)
//!     .generate(&RunnerProfile::default(), &mut rng)?;
//! let report = replay(&mut controller, &clock, &fixes)?;
//! ```

pub mod config;
pub mod profiles;
pub mod replay;
pub mod stream;
pub mod terrain;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{BoundingBox, Region, SimulationArea, SimulationConfig};
    pub use crate::profiles::{
        AthleteProfile, CyclistProfile, HikerProfile, RunnerProfile, profile_for,
    };
    pub use crate::replay::{ReplayReport, replay};
    pub use crate::stream::{SampleStreamBuilder, SimulatedFix, StreamConfig, straight_line};
    pub use crate::terrain::ElevationModel;
    pub use rand::{SeedableRng, rngs::StdRng};
}
