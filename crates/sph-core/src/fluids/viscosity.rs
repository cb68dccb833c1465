use glam::{Vec2, Vec3};

use crate::config::StepParams;
use crate::diagnostics::StageCounters;
use crate::exec::StageExecutor;
use crate::fluids::{spiky_grad2, DENSITY_EPSILON};
use crate::grid::SpatialHashGrid;
use crate::particle::ParticleSet;

/// Viscosity force on particle `i`.
///
/// Formula: f_i = mu * sum_j { m_j * (v_j - v_i) / rho_j * W''(r) }
/// where mu = viscosity strength and W'' = spiky_grad2.
///
/// Pulls each particle's velocity toward its neighbors', which damps
/// relative motion without touching bulk flow.
#[allow(clippy::too_many_arguments)]
pub fn viscosity_force_at(
    i: usize,
    predicted: &[Vec3],
    velocity: &[Vec3],
    densities: &[Vec2],
    mass: &[f32],
    grid: &SpatialHashGrid,
    smoothing_radius: f32,
    viscosity_strength: f32,
    counters: &StageCounters,
) -> Vec3 {
    let h = smoothing_radius;
    let pos_i = predicted[i];
    let vel_i = velocity[i];
    let mut force = Vec3::ZERO;

    grid.query_neighbors(pos_i, |j| {
        let j = j as usize;
        if j == i {
            return;
        }
        let r_len = (pos_i - predicted[j]).length();
        if r_len >= h {
            return;
        }
        let rho_j = densities[j].x;
        if rho_j < DENSITY_EPSILON {
            StageCounters::bump(&counters.low_density_neighbors);
            return;
        }
        force += (velocity[j] - vel_i) * (mass[j] / rho_j * spiky_grad2(r_len, h));
    });

    force * viscosity_strength
}

/// Viscosity stage: fills `particles.viscosity_force`. Reads velocities but
/// never writes them, so the result is independent of evaluation order.
pub fn compute_viscosity_forces<E: StageExecutor>(
    exec: &E,
    particles: &mut ParticleSet,
    grid: &SpatialHashGrid,
    params: &StepParams,
    counters: &StageCounters,
) {
    let ParticleSet {
        predicted,
        velocity,
        densities,
        mass,
        viscosity_force,
        ..
    } = particles;
    let (predicted, velocity, densities, mass) = (
        predicted.as_slice(),
        velocity.as_slice(),
        densities.as_slice(),
        mass.as_slice(),
    );

    if params.viscosity_strength == 0.0 {
        viscosity_force.fill(Vec3::ZERO);
        return;
    }

    exec.map_into(viscosity_force.as_mut_slice(), |i| {
        viscosity_force_at(
            i,
            predicted,
            velocity,
            densities,
            mass,
            grid,
            params.smoothing_radius,
            params.viscosity_strength,
            counters,
        )
    });
}
