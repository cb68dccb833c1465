//! Particle-based fluid simulation using smoothed-particle hydrodynamics.
//!
//! [`solver::Simulation`] owns the particle store and runs the per-pass
//! pipeline; every stage is a data-parallel map scheduled by a
//! [`exec::StageExecutor`]. Neighbor search goes through the sorted spatial
//! hash in [`grid`]. Static obstacles are triangle soups built by
//! [`obstacle::builder`] and tested per particle in [`integrate`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod fluids;
pub mod forces;
pub mod grid;
pub mod integrate;
pub mod math;
pub mod obstacle;
pub mod particle;
pub mod solver;
pub mod spawn;

pub use config::{ObstacleResponse, SimBounds, SimSettings, StepParams, TimestepMode};
pub use diagnostics::StepStats;
pub use error::{ModelError, SimError};
pub use obstacle::ObstacleMesh;
pub use particle::{ParticleSet, ParticleSnapshot};
pub use solver::{RunState, Simulation};
pub use spawn::{SpawnData, SpawnSettings, Spawner};
