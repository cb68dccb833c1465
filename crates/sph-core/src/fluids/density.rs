use glam::{Vec2, Vec3};

use crate::config::StepParams;
use crate::exec::StageExecutor;
use crate::fluids::{poly6, spiky};
use crate::grid::SpatialHashGrid;
use crate::particle::ParticleSet;

/// Density and near-density of a point, summed over grid candidates
/// (including the particle itself when it is in `predicted`).
pub fn density_at(
    pos: Vec3,
    predicted: &[Vec3],
    mass: &[f32],
    grid: &SpatialHashGrid,
    smoothing_radius: f32,
) -> Vec2 {
    let h = smoothing_radius;
    let mut rho = Vec2::ZERO;
    grid.query_neighbors(pos, |j| {
        let j = j as usize;
        let r_len = (pos - predicted[j]).length();
        if r_len < h {
            rho.x += mass[j] * poly6(r_len, h);
            rho.y += mass[j] * spiky(r_len, h);
        }
    });
    rho
}

/// Linear equation of state. Returns (pressure, near-pressure).
///
/// Near-pressure is proportional to near-density alone, so it only ever
/// pushes particles apart.
#[inline]
pub fn pressure_from_density(rho: Vec2, params: &StepParams) -> Vec2 {
    Vec2::new(
        params.pressure_multiplier * (rho.x - params.target_density),
        params.near_pressure_multiplier * rho.y,
    )
}

/// Density/pressure stage.
///
/// Two passes: densities from `predicted` positions, then pressures from
/// densities. Neither pass reads the buffer it writes. No division happens
/// here, so isolated particles with ~0 density are harmless at this point.
pub fn compute_density_pressure<E: StageExecutor>(
    exec: &E,
    particles: &mut ParticleSet,
    grid: &SpatialHashGrid,
    params: &StepParams,
) {
    let h = params.smoothing_radius;
    let ParticleSet {
        predicted,
        mass,
        densities,
        pressures,
        ..
    } = particles;
    let predicted = predicted.as_slice();
    let mass = mass.as_slice();

    exec.map_into(densities.as_mut_slice(), |i| {
        density_at(predicted[i], predicted, mass, grid, h)
    });

    let densities = densities.as_slice();
    exec.map_into(pressures.as_mut_slice(), |i| {
        pressure_from_density(densities[i], params)
    });
}
