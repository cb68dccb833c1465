//! Initial particle layout.
//!
//! Particles are laid out as `layers` stacked in y, each holding `lines`
//! spread along x, each line holding particles spread along z. A seeded
//! jitter in the xz-plane breaks up the lattice; the same seed always
//! reproduces the same layout.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::error::SimError;

/// Immutable initial state, kept so a reset restores it exactly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnData {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl SpawnData {
    pub fn new(positions: Vec<Vec3>, velocities: Vec<Vec3>) -> Result<Self, SimError> {
        let data = Self {
            positions,
            velocities,
        };
        data.check_lengths()?;
        Ok(data)
    }

    /// All particles at rest.
    pub fn at_rest(positions: Vec<Vec3>) -> Self {
        let velocities = vec![Vec3::ZERO; positions.len()];
        Self {
            positions,
            velocities,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn check_lengths(&self) -> Result<(), SimError> {
        if self.velocities.len() != self.positions.len() {
            return Err(SimError::BufferLengthMismatch {
                buffer: "spawn velocities",
                expected: self.positions.len(),
                actual: self.velocities.len(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    pub particle_count: usize,
    /// Lines per layer, spread along x.
    pub lines: u32,
    /// Layers, spread along y.
    pub layers: u32,
    pub centre: Vec3,
    /// `x` is the extent along x; `y` is used for both y and z.
    pub size: Vec2,
    pub initial_velocity: Vec3,
    pub jitter_strength: f32,
    pub seed: u64,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            particle_count: 4096,
            lines: 20,
            layers: 10,
            centre: Vec3::ZERO,
            size: Vec2::new(4.0, 4.0),
            initial_velocity: Vec3::ZERO,
            jitter_strength: 0.05,
            seed: 42,
        }
    }
}

pub struct Spawner {
    pub settings: SpawnSettings,
}

impl Spawner {
    pub fn new(settings: SpawnSettings) -> Self {
        Self { settings }
    }

    /// Generate the spawn layout.
    ///
    /// When `layers * lines * per_line` exceeds `particle_count` the last
    /// line is left short; the returned data always has exactly
    /// `particle_count` entries.
    pub fn spawn(&self) -> SpawnData {
        let s = &self.settings;
        let count = s.particle_count;
        let lines = s.lines.max(1) as usize;
        let layers = s.layers.max(1) as usize;
        let per_line = count.div_ceil(lines * layers).max(1);

        let mut rng = ChaCha8Rng::seed_from_u64(s.seed);
        let mut positions = Vec::with_capacity(count);

        'fill: for layer in 0..layers {
            let ty = normalized(layer, layers);
            for line in 0..lines {
                let tx = normalized(line, lines);
                for k in 0..per_line {
                    if positions.len() >= count {
                        break 'fill;
                    }
                    let tz = normalized(k, per_line);
                    let base = Vec3::new(
                        lerp(-0.5 * s.size.x, 0.5 * s.size.x, tx),
                        lerp(-0.5 * s.size.y, 0.5 * s.size.y, ty),
                        lerp(-0.5 * s.size.y, 0.5 * s.size.y, tz),
                    ) + s.centre;

                    let angle = rng.gen::<f32>() * TAU;
                    let dir = Vec3::new(angle.cos(), 0.0, angle.sin());
                    let jitter = dir * s.jitter_strength * (rng.gen::<f32>() - 0.5);
                    positions.push(base + jitter);
                }
            }
        }

        let velocities = vec![s.initial_velocity; positions.len()];
        log::info!(
            "spawned {} particles ({} layers x {} lines x {} per line)",
            positions.len(),
            layers,
            lines,
            per_line
        );
        SpawnData {
            positions,
            velocities,
        }
    }
}

/// Position of `i` in `0..n` mapped to [0, 1]; a single slot sits at 0.5.
#[inline]
fn normalized(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.5
    } else {
        i as f32 / (n - 1) as f32
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
