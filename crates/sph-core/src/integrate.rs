use glam::{Affine3A, Vec3};

use crate::config::{ObstacleResponse, StepParams};
use crate::diagnostics::StageCounters;
use crate::exec::StageExecutor;
use crate::fluids::DENSITY_EPSILON;
use crate::obstacle::ObstacleMesh;
use crate::particle::ParticleSet;

const HALF: f32 = 0.5;

/// Per-particle result of the integrator, committed after the parallel pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Kinematics {
    pub position: Vec3,
    pub velocity: Vec3,
    pub active: bool,
}

/// Clamp `pos` into the bounds box and reflect the velocity of every
/// violated axis, scaled by `1 - damping`.
///
/// Works in the box's local unit-cube space. Returns `true` on contact;
/// `pos`/`vel` are only rewritten in that case.
pub fn resolve_bounds(
    pos: &mut Vec3,
    vel: &mut Vec3,
    local_to_world: &Affine3A,
    world_to_local: &Affine3A,
    damping: f32,
) -> bool {
    let mut local_pos = world_to_local.transform_point3(*pos);
    let mut local_vel = world_to_local.transform_vector3(*vel);
    let restitution = 1.0 - damping;
    let mut hit = false;

    for axis in 0..3 {
        if local_pos[axis].abs() > HALF {
            local_pos[axis] = HALF.copysign(local_pos[axis]);
            local_vel[axis] *= -restitution;
            hit = true;
        }
    }

    if hit {
        *pos = local_to_world.transform_point3(local_pos);
        *vel = local_to_world.transform_vector3(local_vel);
    }
    hit
}

/// Advance one particle by `dt` and resolve its collisions.
fn integrate_particle(
    i: usize,
    particles: &ParticleSet,
    obstacles: &ObstacleMesh,
    params: &StepParams,
    world_to_local: &Affine3A,
    counters: &StageCounters,
) -> Kinematics {
    let dt = params.delta_time;
    let old_pos = particles.position[i];
    let old_vel = particles.velocity[i];
    let mut active = particles.active[i];

    let rho = particles.densities[i].x;
    let mut vel = old_vel;
    if rho >= DENSITY_EPSILON {
        vel += (particles.pressure_force[i] + particles.viscosity_force[i]) / rho * dt;
    } else {
        StageCounters::bump(&counters.unsupported_particles);
    }
    let mut pos = old_pos + vel * dt;

    if resolve_bounds(
        &mut pos,
        &mut vel,
        &params.bounds_transform,
        world_to_local,
        params.collision_damping,
    ) {
        StageCounters::bump(&counters.boundary_hits);
    }

    if let Some(hit) = obstacles.first_hit(pos, params.sphere_radius) {
        StageCounters::bump(&counters.obstacle_hits);
        match params.obstacle_response {
            ObstacleResponse::Deactivate => active = false,
            ObstacleResponse::Reflect => {
                pos += hit.normal * (params.sphere_radius - hit.distance);
                let vn = vel.dot(hit.normal);
                if vn < 0.0 {
                    vel -= hit.normal * vn * (2.0 - params.collision_damping);
                }
            }
        }
    }

    if !pos.is_finite() || !vel.is_finite() {
        StageCounters::bump(&counters.non_finite_repairs);
        log::trace!("particle {i} went non-finite, reverting");
        pos = old_pos;
        vel = Vec3::ZERO;
    }

    Kinematics {
        position: pos,
        velocity: vel,
        active,
    }
}

/// Integrator stage: semi-implicit Euler followed by bounds and obstacle
/// collision.
///
/// Results go to `scratch` first so every particle reads the same
/// pre-step state; they are then copied back into `particles`.
pub fn integrate_and_collide<E: StageExecutor>(
    exec: &E,
    particles: &mut ParticleSet,
    obstacles: &ObstacleMesh,
    params: &StepParams,
    counters: &StageCounters,
    scratch: &mut Vec<Kinematics>,
) {
    scratch.resize(particles.count, Kinematics::default());
    let world_to_local = params.bounds_transform.inverse();

    {
        let particles = &*particles;
        exec.map_into(scratch.as_mut_slice(), |i| {
            integrate_particle(i, particles, obstacles, params, &world_to_local, counters)
        });
    }

    for (i, k) in scratch.iter().enumerate() {
        particles.position[i] = k.position;
        particles.velocity[i] = k.velocity;
        particles.active[i] = k.active;
    }
}
