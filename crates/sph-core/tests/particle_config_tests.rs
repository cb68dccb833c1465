use glam::{Vec2, Vec3};
use sph_core::config::{ObstacleResponse, SimSettings, TimestepMode};
use sph_core::particle::ParticleSet;
use sph_core::spawn::{SpawnData, SpawnSettings, Spawner};
use sph_core::SimError;

#[test]
fn test_particle_set_new_initializes_correctly() {
    let particles = ParticleSet::new(10, 2.0);

    assert_eq!(particles.count, 10);
    assert!(particles.check_lengths().is_ok());

    for i in 0..10 {
        assert_eq!(particles.position[i], Vec3::ZERO, "position[{i}] should be ZERO");
        assert_eq!(particles.predicted[i], Vec3::ZERO, "predicted[{i}] should be ZERO");
        assert_eq!(particles.velocity[i], Vec3::ZERO, "velocity[{i}] should be ZERO");
        assert_eq!(particles.densities[i], Vec2::ZERO, "densities[{i}] should be ZERO");
        assert_eq!(particles.pressures[i], Vec2::ZERO, "pressures[{i}] should be ZERO");
        assert_eq!(particles.mass[i], 2.0, "mass[{i}] should be 2.0");
        assert!(particles.active[i], "active[{i}] should be true");
    }
}

#[test]
fn test_particle_set_detects_length_mismatch() {
    let mut particles = ParticleSet::new(4, 1.0);
    particles.velocity.pop();
    match particles.check_lengths() {
        Err(SimError::BufferLengthMismatch {
            buffer,
            expected,
            actual,
        }) => {
            assert_eq!(buffer, "velocity");
            assert_eq!((expected, actual), (4, 3));
        }
        other => panic!("expected length mismatch, got {other:?}"),
    }
}

#[test]
fn test_spawn_data_rejects_mismatched_lengths() {
    let result = SpawnData::new(vec![Vec3::ZERO; 3], vec![Vec3::ZERO; 2]);
    assert!(matches!(result, Err(SimError::BufferLengthMismatch { .. })));
}

#[test]
fn test_load_spawn_clears_stage_buffers() {
    let spawn = SpawnData::new(
        vec![Vec3::X, Vec3::Y],
        vec![Vec3::Z, Vec3::NEG_Z],
    )
    .unwrap();
    let mut particles = ParticleSet::from_spawn(&spawn, 1.0).unwrap();
    particles.densities[0] = Vec2::ONE;
    particles.pressure_force[1] = Vec3::ONE;
    particles.active[1] = false;

    particles.load_spawn(&spawn);
    assert_eq!(particles.position, spawn.positions);
    assert_eq!(particles.predicted, spawn.positions);
    assert_eq!(particles.velocity, spawn.velocities);
    assert_eq!(particles.densities[0], Vec2::ZERO);
    assert_eq!(particles.pressure_force[1], Vec3::ZERO);
    assert_eq!(particles.active_count(), 2);
}

#[test]
fn test_spawner_stays_in_volume() {
    let settings = SpawnSettings {
        particle_count: 1000,
        centre: Vec3::new(1.0, 2.0, 3.0),
        size: Vec2::new(2.0, 1.0),
        jitter_strength: 0.1,
        ..Default::default()
    };
    let data = Spawner::new(settings.clone()).spawn();
    let half = Vec3::new(1.0, 0.5, 0.5) + Vec3::splat(settings.jitter_strength);
    for p in &data.positions {
        let local = (*p - settings.centre).abs();
        assert!(local.cmple(half).all(), "spawned {p} outside the volume");
    }
    assert!(data.velocities.iter().all(|&v| v == settings.initial_velocity));
}

#[test]
fn test_settings_default_values() {
    let s = SimSettings::default();

    assert_eq!(s.time_scale, 1.0);
    assert_eq!(s.timestep, TimestepMode::Fixed { dt: 1.0 / 60.0 });
    assert_eq!(s.iterations_per_frame, 3);
    assert_eq!(s.warmup_frames, 10);
    assert_eq!(s.gravity, -10.0);
    assert_eq!(s.collision_damping, 0.05);
    assert_eq!(s.smoothing_radius, 0.2);
    assert_eq!(s.target_density, 630.0);
    assert_eq!(s.pressure_multiplier, 288.0);
    assert_eq!(s.near_pressure_multiplier, 2.25);
    assert_eq!(s.viscosity_strength, 0.001);
    assert_eq!(s.obstacle_response, ObstacleResponse::Deactivate);
    assert_eq!(s.hash_table_size, None);
}

#[test]
fn test_settings_save_and_load() {
    let path = std::env::temp_dir().join(format!("sph-settings-{}.json", std::process::id()));
    let settings = SimSettings {
        smoothing_radius: 0.35,
        timestep: TimestepMode::Variable,
        obstacle_response: ObstacleResponse::Reflect,
        hash_table_size: Some(4096),
        ..Default::default()
    };
    settings.save(&path).unwrap();
    let loaded = SimSettings::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, settings);
}

#[test]
fn test_settings_load_rejects_invalid_values() {
    let path = std::env::temp_dir().join(format!("sph-bad-settings-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "collision_damping": 2.0 }"#).unwrap();
    let result = SimSettings::load(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(
        result,
        Err(SimError::InvalidSetting { name: "collision_damping", .. })
    ));
}

#[test]
fn test_settings_load_reports_missing_file() {
    let result = SimSettings::load("/nonexistent/sph/settings.json");
    assert!(matches!(result, Err(SimError::Io(_))));
}
