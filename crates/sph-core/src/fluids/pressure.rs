use glam::{Vec2, Vec3};

use crate::config::StepParams;
use crate::diagnostics::StageCounters;
use crate::exec::StageExecutor;
use crate::fluids::{spiky_grad1, DENSITY_EPSILON};
use crate::grid::SpatialHashGrid;
use crate::math::fallback_direction;
use crate::particle::ParticleSet;

/// Pressure force on particle `i` from its neighbors.
///
/// Formula: f_i = -sum_j { dir_ij * m_j * [ (P_i + P_j) / (2 rho_j)
///                                       + (N_i + N_j) / (2 nrho_j) ] * W'(r) }
/// where dir_ij = (x_i - x_j) / r and W' = spiky_grad1 <= 0, so positive
/// pressure pushes i away from j. Coincident pairs get a deterministic
/// substitute direction; neighbors with ~0 density are skipped.
#[allow(clippy::too_many_arguments)]
pub fn pressure_force_at(
    i: usize,
    predicted: &[Vec3],
    densities: &[Vec2],
    pressures: &[Vec2],
    mass: &[f32],
    grid: &SpatialHashGrid,
    smoothing_radius: f32,
    counters: &StageCounters,
) -> Vec3 {
    let h = smoothing_radius;
    let pos_i = predicted[i];
    let p_i = pressures[i];
    let mut force = Vec3::ZERO;

    grid.query_neighbors(pos_i, |j| {
        let j = j as usize;
        if j == i {
            return;
        }
        let offset = pos_i - predicted[j];
        let r_len = offset.length();
        if r_len >= h {
            return;
        }

        let rho_j = densities[j];
        if rho_j.x < DENSITY_EPSILON {
            StageCounters::bump(&counters.low_density_neighbors);
            return;
        }

        let dir = if r_len > 1e-6 {
            offset / r_len
        } else {
            StageCounters::bump(&counters.coincident_pairs);
            fallback_direction(i, j)
        };

        let p_j = pressures[j];
        let shared = (p_i.x + p_j.x) / (2.0 * rho_j.x);
        let shared_near = if rho_j.y >= DENSITY_EPSILON {
            (p_i.y + p_j.y) / (2.0 * rho_j.y)
        } else {
            0.0
        };

        force -= dir * mass[j] * (shared + shared_near) * spiky_grad1(r_len, h);
    });

    force
}

/// Pressure force stage: fills `particles.pressure_force`.
pub fn compute_pressure_forces<E: StageExecutor>(
    exec: &E,
    particles: &mut ParticleSet,
    grid: &SpatialHashGrid,
    params: &StepParams,
    counters: &StageCounters,
) {
    let h = params.smoothing_radius;
    let ParticleSet {
        predicted,
        densities,
        pressures,
        mass,
        pressure_force,
        ..
    } = particles;
    let (predicted, densities, pressures, mass) = (
        predicted.as_slice(),
        densities.as_slice(),
        pressures.as_slice(),
        mass.as_slice(),
    );

    exec.map_into(pressure_force.as_mut_slice(), |i| {
        pressure_force_at(i, predicted, densities, pressures, mass, grid, h, counters)
    });
}
