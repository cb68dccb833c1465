use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use sph_core::config::SimSettings;
use sph_core::diagnostics::StageCounters;
use sph_core::exec::SerialExecutor;
use sph_core::fluids::density::compute_density_pressure;
use sph_core::fluids::pressure::compute_pressure_forces;
use sph_core::fluids::reference::{brute_force_densities, brute_force_pressure_forces};
use sph_core::fluids::viscosity::compute_viscosity_forces;
use sph_core::fluids::{poly6, spiky, spiky_grad1, spiky_grad2, spiky_gradient};
use sph_core::grid::SpatialHashGrid;
use sph_core::particle::ParticleSet;

/// Integral of a radial kernel over the 3D ball of radius h.
fn integrate_3d(kernel: fn(f32, f32) -> f32, h: f32) -> f64 {
    let steps = 20_000;
    let dr = h as f64 / steps as f64;
    (0..steps)
        .map(|k| {
            let r = (k as f64 + 0.5) * dr;
            4.0 * std::f64::consts::PI * r * r * kernel(r as f32, h) as f64 * dr
        })
        .sum()
}

fn particles_at(positions: &[Vec3]) -> ParticleSet {
    let mut particles = ParticleSet::new(positions.len(), 1.0);
    particles.position.copy_from_slice(positions);
    particles.predicted.copy_from_slice(positions);
    particles
}

#[test]
fn test_kernels_normalized_in_3d() {
    for h in [0.1_f32, 1.0, 5.0] {
        let p6 = integrate_3d(poly6, h);
        let sp = integrate_3d(spiky, h);
        assert!((p6 - 1.0).abs() < 1e-3, "poly6 integral for h={h} is {p6}");
        assert!((sp - 1.0).abs() < 1e-3, "spiky integral for h={h} is {sp}");
    }
}

#[test]
fn test_kernel_support() {
    for h in [0.1_f32, 1.0, 5.0] {
        for k in 0..100 {
            let r = h * k as f32 / 100.0;
            assert!(poly6(r, h) > 0.0, "poly6({r}, {h}) should be positive");
            assert!(spiky(r, h) > 0.0, "spiky({r}, {h}) should be positive");
        }
        for r in [h, h * 1.001, h * 2.0, h + 10.0] {
            assert_eq!(poly6(r, h), 0.0, "poly6({r}, {h}) should be 0.0");
            assert_eq!(spiky(r, h), 0.0, "spiky({r}, {h}) should be 0.0");
            assert_eq!(spiky_grad1(r, h), 0.0);
            assert_eq!(spiky_grad2(r, h), 0.0);
        }
    }
}

#[test]
fn test_poly6_kernel_zero_distance() {
    let h = 0.1_f32;
    let result = poly6(0.0, h);
    // At r=0 the (h^2 - r^2)^3 term equals h^6, so peak = coeff * h^6
    let peak = 315.0 / (64.0 * PI * h.powi(9)) * h.powi(6);
    assert!(
        (result - peak).abs() < peak * 1e-5,
        "poly6(0, {h}) = {result}, expected {peak}"
    );
}

#[test]
fn test_spiky_derivatives_match_finite_difference() {
    let h = 0.5_f32;
    let eps = 1e-3_f32;
    for r in [0.1_f32, 0.2, 0.35] {
        let fd1 = (spiky(r + eps, h) - spiky(r - eps, h)) / (2.0 * eps);
        let g1 = spiky_grad1(r, h);
        assert!((fd1 - g1).abs() < g1.abs() * 1e-2, "grad1 at {r}: {g1} vs {fd1}");

        let fd2 = (spiky_grad1(r + eps, h) - spiky_grad1(r - eps, h)) / (2.0 * eps);
        let g2 = spiky_grad2(r, h);
        assert!((fd2 - g2).abs() < g2.abs() * 1e-2, "grad2 at {r}: {g2} vs {fd2}");
    }
}

#[test]
fn test_spiky_gradient_direction() {
    let h = 0.1_f32;
    let r = Vec3::new(0.05, 0.0, 0.0);
    let grad = spiky_gradient(r, r.length(), h);
    assert!(grad.x < 0.0, "spiky gradient x should be negative, got {}", grad.x);
    assert!(grad.y.abs() < 1e-6 && grad.z.abs() < 1e-6);
    assert_eq!(spiky_gradient(Vec3::ZERO, 0.0, h), Vec3::ZERO);
    assert_eq!(spiky_gradient(Vec3::X, 1.0, h), Vec3::ZERO);
}

#[test]
fn test_lattice_density_is_uniform_in_interior() {
    let n = 12;
    let spacing = 0.1;
    let mut positions = Vec::new();
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                positions.push(Vec3::new(x as f32, y as f32, z as f32) * spacing);
            }
        }
    }
    let settings = SimSettings::default();
    let params = settings.step_params(0.01);
    let mut particles = particles_at(&positions);
    let mut grid = SpatialHashGrid::new(settings.smoothing_radius, positions.len()).unwrap();
    grid.build(&particles.predicted);
    compute_density_pressure(&SerialExecutor, &mut particles, &grid, &params);

    // Interior: at least a full smoothing radius from every face.
    let interior: Vec<f32> = (0..positions.len())
        .filter(|&i| {
            let c = positions[i] / spacing;
            c.min_element() >= 2.0 - 1e-3 && c.max_element() <= (n - 3) as f32 + 1e-3
        })
        .map(|i| particles.densities[i].x)
        .collect();
    assert!(!interior.is_empty());
    let mean = interior.iter().sum::<f32>() / interior.len() as f32;
    for &rho in &interior {
        assert!(
            (rho - mean).abs() < mean * 1e-3,
            "interior density {rho} deviates from mean {mean}"
        );
    }

    let corner = particles.densities[0].x;
    assert!(corner < mean, "corner density {corner} should be below interior {mean}");
}

#[test]
fn test_hashed_stages_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(99);
    let positions: Vec<Vec3> = (0..300)
        .map(|_| Vec3::new(rng.gen(), rng.gen(), rng.gen()))
        .collect();
    let settings = SimSettings {
        smoothing_radius: 0.2,
        target_density: 200.0,
        ..Default::default()
    };
    let params = settings.step_params(0.01);
    let h = params.smoothing_radius;

    let mut particles = particles_at(&positions);
    let mut grid = SpatialHashGrid::new(h, positions.len()).unwrap();
    grid.build(&particles.predicted);
    let counters = StageCounters::default();
    compute_density_pressure(&SerialExecutor, &mut particles, &grid, &params);
    compute_pressure_forces(&SerialExecutor, &mut particles, &grid, &params, &counters);

    let expected_rho = brute_force_densities(&positions, &particles.mass, h);
    for (i, (got, want)) in particles.densities.iter().zip(&expected_rho).enumerate() {
        assert!(
            (*got - *want).abs().max_element() <= want.abs().max_element() * 1e-4,
            "density of {i}: hashed {got} vs brute force {want}"
        );
    }

    let expected_f = brute_force_pressure_forces(
        &positions,
        &particles.densities,
        &particles.pressures,
        &particles.mass,
        h,
    );
    // Pair terms largely cancel, so rounding scales with the largest force.
    let scale = expected_f.iter().map(|f| f.length()).fold(1.0_f32, f32::max);
    for (i, (got, want)) in particles.pressure_force.iter().zip(&expected_f).enumerate() {
        let tol = 1e-4 * scale + 1e-3 * want.length();
        assert!(
            (*got - *want).length() <= tol,
            "pressure force of {i}: hashed {got} vs brute force {want}"
        );
    }
}

#[test]
fn test_two_particles_repel_along_x() {
    let settings = SimSettings {
        smoothing_radius: 0.2,
        target_density: 0.0,
        pressure_multiplier: 1.0,
        near_pressure_multiplier: 0.0,
        viscosity_strength: 0.0,
        gravity: 0.0,
        wind_strength: 0.0,
        ..Default::default()
    };
    let params = settings.step_params(0.01);
    let mut particles = particles_at(&[Vec3::ZERO, Vec3::new(0.05, 0.0, 0.0)]);
    let mut grid = SpatialHashGrid::new(0.2, 2).unwrap();
    grid.build(&particles.predicted);
    let counters = StageCounters::default();
    compute_density_pressure(&SerialExecutor, &mut particles, &grid, &params);
    compute_pressure_forces(&SerialExecutor, &mut particles, &grid, &params, &counters);

    // Equal densities make the shared pressure term exactly 1.
    let expected = spiky_grad1(0.05, 0.2).abs();
    let f0 = particles.pressure_force[0];
    let f1 = particles.pressure_force[1];
    assert!(f0.x < 0.0 && f1.x > 0.0, "forces should push apart: {f0} {f1}");
    assert!(
        (f0.x.abs() - expected).abs() < expected * 1e-4,
        "force magnitude {} vs closed form {expected}",
        f0.x.abs()
    );
    assert!((f0 + f1).length() < expected * 1e-5, "forces should be equal and opposite");
    assert!(f0.y.abs() < 1e-6 && f0.z.abs() < 1e-6);
}

#[test]
fn test_coincident_particles_get_opposite_forces() {
    let settings = SimSettings {
        target_density: 0.0,
        ..Default::default()
    };
    let params = settings.step_params(0.01);
    let mut particles = particles_at(&[Vec3::ZERO, Vec3::ZERO]);
    let mut grid = SpatialHashGrid::new(settings.smoothing_radius, 2).unwrap();
    grid.build(&particles.predicted);
    let counters = StageCounters::default();
    compute_density_pressure(&SerialExecutor, &mut particles, &grid, &params);
    compute_pressure_forces(&SerialExecutor, &mut particles, &grid, &params, &counters);

    let (f0, f1) = (particles.pressure_force[0], particles.pressure_force[1]);
    assert!(f0.is_finite() && f1.is_finite());
    assert!(f0.length() > 0.0, "coincident pair should still repel");
    assert!((f0 + f1).length() < f0.length() * 1e-5);
    assert_eq!(
        counters.coincident_pairs.load(std::sync::atomic::Ordering::Relaxed),
        2
    );
}

#[test]
fn test_viscosity_pulls_toward_neighbor_velocity() {
    let settings = SimSettings {
        viscosity_strength: 0.5,
        ..Default::default()
    };
    let params = settings.step_params(0.01);
    let mut particles = particles_at(&[Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0)]);
    particles.velocity[1] = Vec3::new(0.0, 1.0, 0.0);
    let mut grid = SpatialHashGrid::new(settings.smoothing_radius, 2).unwrap();
    grid.build(&particles.predicted);
    let counters = StageCounters::default();
    compute_density_pressure(&SerialExecutor, &mut particles, &grid, &params);
    compute_viscosity_forces(&SerialExecutor, &mut particles, &grid, &params, &counters);

    assert!(particles.viscosity_force[0].y > 0.0, "slow particle is dragged along");
    assert!(particles.viscosity_force[1].y < 0.0, "fast particle is held back");
}

#[test]
fn test_isolated_particle_density_is_self_contribution() {
    let settings = SimSettings::default();
    let params = settings.step_params(0.01);
    let mut particles = particles_at(&[Vec3::ZERO, Vec3::splat(5.0)]);
    let mut grid = SpatialHashGrid::new(settings.smoothing_radius, 2).unwrap();
    grid.build(&particles.predicted);
    compute_density_pressure(&SerialExecutor, &mut particles, &grid, &params);

    let h = settings.smoothing_radius;
    let expected = Vec2::new(poly6(0.0, h), spiky(0.0, h));
    assert!((particles.densities[0] - expected).abs().max_element() < expected.x * 1e-6);
}
