//! Run the fluid simulation without a renderer and log per-tick stats.
//!
//! Usage: `sph-headless [settings.json] [ticks] [model.3ds]`
//!
//! Pass `-` as the settings path to use the defaults. Set `RUST_LOG=debug`
//! to see per-pass diagnostics.

use std::error::Error;
use std::sync::{Arc, Mutex};

use glam::{Affine3A, Vec3};
use sph_core::obstacle::builder::{build_obstacle, MeshNode};
use sph_core::obstacle::model_3ds::read_model;
use sph_core::{ObstacleMesh, SimSettings, Simulation, SpawnSettings, Spawner, StepStats};

const DEFAULT_TICKS: u32 = 600;
const SIMPLIFY_TOLERANCE: f32 = 0.01;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let settings = match args.get(1).map(String::as_str) {
        None | Some("-") => SimSettings::default(),
        Some(path) => SimSettings::load(path)?,
    };
    let ticks = match args.get(2) {
        Some(n) => n.parse::<u32>()?,
        None => DEFAULT_TICKS,
    };
    let obstacles = match args.get(3) {
        Some(path) => {
            let root = MeshNode::from(read_model(path));
            build_obstacle(&root, Affine3A::IDENTITY, SIMPLIFY_TOLERANCE).mesh
        }
        None => ObstacleMesh::empty(),
    };

    let spawn = Spawner::new(SpawnSettings::default()).spawn();
    let mut sim = Simulation::new(settings, spawn, obstacles)?;

    let totals = Arc::new(Mutex::new(StepStats::default()));
    {
        let totals = Arc::clone(&totals);
        sim.on_step_completed(Box::new(move |stats| {
            if let Ok(mut t) = totals.lock() {
                t.total_ms += stats.total_ms;
                t.boundary_hits += stats.boundary_hits;
                t.obstacle_hits += stats.obstacle_hits;
                t.non_finite_repairs += stats.non_finite_repairs;
            }
        }));
    }

    let frame_time = 1.0 / 60.0;
    for tick in 0..ticks {
        sim.tick(frame_time)?;
        if tick % 60 == 0 {
            let snap = sim.snapshot();
            let (sum, n) = snap
                .visible_positions()
                .fold((Vec3::ZERO, 0u32), |(s, n), p| (s + p, n + 1));
            let centroid = if n > 0 { sum / n as f32 } else { Vec3::ZERO };
            log::info!(
                "tick {tick}: {} / {} visible, centroid {:.3?}",
                n,
                snap.len(),
                centroid.to_array()
            );
        }
    }

    if let Ok(t) = totals.lock() {
        let passes = sim.steps_taken().max(1);
        log::info!(
            "{} passes, {:.3} ms/pass, {} boundary hits, {} obstacle hits, {} repairs",
            sim.steps_taken(),
            t.total_ms / passes as f32,
            t.boundary_hits,
            t.obstacle_hits,
            t.non_finite_repairs
        );
    }
    Ok(())
}
