use glam::{Vec2, Vec3};

use crate::error::SimError;
use crate::spawn::SpawnData;

/// SoA particle storage
///
/// Allocated once per simulation run; the count never changes and every
/// buffer stays index-aligned with `position`.
pub struct ParticleSet {
    pub count: usize,
    pub position: Vec<Vec3>,
    /// Position estimate used for neighbor search and force evaluation
    pub predicted: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    /// x = density, y = near-density
    pub densities: Vec<Vec2>,
    /// x = pressure, y = near-pressure
    pub pressures: Vec<Vec2>,
    pub pressure_force: Vec<Vec3>,
    pub viscosity_force: Vec<Vec3>,
    pub mass: Vec<f32>,
    /// Visibility flag; inactive particles are still simulated
    pub active: Vec<bool>,
}

impl ParticleSet {
    pub fn new(count: usize, mass: f32) -> Self {
        Self {
            count,
            position: vec![Vec3::ZERO; count],
            predicted: vec![Vec3::ZERO; count],
            velocity: vec![Vec3::ZERO; count],
            densities: vec![Vec2::ZERO; count],
            pressures: vec![Vec2::ZERO; count],
            pressure_force: vec![Vec3::ZERO; count],
            viscosity_force: vec![Vec3::ZERO; count],
            mass: vec![mass; count],
            active: vec![true; count],
        }
    }

    /// Create a particle set initialised from spawn data.
    pub fn from_spawn(spawn: &SpawnData, mass: f32) -> Result<Self, SimError> {
        spawn.check_lengths()?;
        let mut particles = Self::new(spawn.len(), mass);
        particles.load_spawn(spawn);
        Ok(particles)
    }

    /// Overwrite kinematic state from a spawn snapshot and clear every stage
    /// output. `spawn` must have `self.count` entries.
    pub fn load_spawn(&mut self, spawn: &SpawnData) {
        self.position.copy_from_slice(&spawn.positions);
        self.predicted.copy_from_slice(&spawn.positions);
        self.velocity.copy_from_slice(&spawn.velocities);
        self.densities.fill(Vec2::ZERO);
        self.pressures.fill(Vec2::ZERO);
        self.pressure_force.fill(Vec3::ZERO);
        self.viscosity_force.fill(Vec3::ZERO);
        self.active.fill(true);
    }

    /// Verify every buffer has `count` entries.
    pub fn check_lengths(&self) -> Result<(), SimError> {
        let lengths = [
            ("position", self.position.len()),
            ("predicted", self.predicted.len()),
            ("velocity", self.velocity.len()),
            ("densities", self.densities.len()),
            ("pressures", self.pressures.len()),
            ("pressure_force", self.pressure_force.len()),
            ("viscosity_force", self.viscosity_force.len()),
            ("mass", self.mass.len()),
            ("active", self.active.len()),
        ];
        for (buffer, actual) in lengths {
            if actual != self.count {
                return Err(SimError::BufferLengthMismatch {
                    buffer,
                    expected: self.count,
                    actual,
                });
            }
        }
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Copy out the data a renderer needs.
    pub fn snapshot(&self) -> ParticleSnapshot {
        ParticleSnapshot {
            positions: self.position.clone(),
            velocities: self.velocity.clone(),
            active: self.active.clone(),
        }
    }
}

/// Read-only copy of particle state taken between passes.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSnapshot {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub active: Vec<bool>,
}

impl ParticleSnapshot {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions of visible particles only.
    pub fn visible_positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.positions
            .iter()
            .zip(&self.active)
            .filter(|(_, &a)| a)
            .map(|(&p, _)| p)
    }
}
