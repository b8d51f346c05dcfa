//! Synthetic terrain for simulated workouts.

mod elevation;

pub use elevation::ElevationModel;
