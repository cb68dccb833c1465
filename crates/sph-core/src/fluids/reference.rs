//! All-pairs O(n^2) versions of the neighbor-based stages.
//!
//! Only meant as a correctness oracle for the grid-accelerated stages on
//! small particle counts.

use glam::{Vec2, Vec3};

use crate::fluids::{poly6, spiky, spiky_grad1, DENSITY_EPSILON};

/// Indices of every particle within `h` of particle `i` (including `i`).
pub fn brute_force_neighbors(positions: &[Vec3], i: usize, h: f32) -> Vec<usize> {
    let pos_i = positions[i];
    positions
        .iter()
        .enumerate()
        .filter(|(_, &p)| (pos_i - p).length() < h)
        .map(|(j, _)| j)
        .collect()
}

/// Density and near-density for every particle.
pub fn brute_force_densities(positions: &[Vec3], mass: &[f32], h: f32) -> Vec<Vec2> {
    positions
        .iter()
        .map(|&pos_i| {
            let mut rho = Vec2::ZERO;
            for (j, &pos_j) in positions.iter().enumerate() {
                let r_len = (pos_i - pos_j).length();
                rho.x += mass[j] * poly6(r_len, h);
                rho.y += mass[j] * spiky(r_len, h);
            }
            rho
        })
        .collect()
}

/// Pressure force for every particle. Coincident pairs are skipped rather
/// than given a substitute direction.
pub fn brute_force_pressure_forces(
    positions: &[Vec3],
    densities: &[Vec2],
    pressures: &[Vec2],
    mass: &[f32],
    h: f32,
) -> Vec<Vec3> {
    (0..positions.len())
        .map(|i| {
            let mut force = Vec3::ZERO;
            for j in 0..positions.len() {
                if j == i {
                    continue;
                }
                let offset = positions[i] - positions[j];
                let r_len = offset.length();
                if r_len >= h || r_len <= 1e-6 || densities[j].x < DENSITY_EPSILON {
                    continue;
                }
                let shared = (pressures[i].x + pressures[j].x) / (2.0 * densities[j].x);
                let shared_near = if densities[j].y >= DENSITY_EPSILON {
                    (pressures[i].y + pressures[j].y) / (2.0 * densities[j].y)
                } else {
                    0.0
                };
                force -= offset / r_len * mass[j] * (shared + shared_near) * spiky_grad1(r_len, h);
            }
            force
        })
        .collect()
}
