use glam::Vec3;

use crate::config::StepParams;
use crate::exec::StageExecutor;
use crate::particle::ParticleSet;

/// Acceleration from gravity and wind.
///
/// Wind is a constant directional acceleration; it is not scaled by mass.
#[inline]
pub fn external_acceleration(params: &StepParams) -> Vec3 {
    params.gravity + params.wind_direction * params.wind_strength
}

/// External-forces stage.
///
/// Applies gravity and wind to velocities, then predicts where each
/// particle will be after `delta_time`. The predicted positions feed the
/// spatial hash and every neighbor-based stage of the pass.
pub fn apply_external_forces<E: StageExecutor>(
    exec: &E,
    particles: &mut ParticleSet,
    params: &StepParams,
) {
    let dt = params.delta_time;
    let dv = external_acceleration(params) * dt;
    let ParticleSet {
        position,
        velocity,
        predicted,
        ..
    } = particles;

    exec.for_each_mut(velocity.as_mut_slice(), |_, v| *v += dv);

    let (position, velocity) = (position.as_slice(), velocity.as_slice());
    exec.map_into(predicted.as_mut_slice(), |i| position[i] + velocity[i] * dt);
}
