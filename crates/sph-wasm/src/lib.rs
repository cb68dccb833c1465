use glam::Vec3;
use sph_core::obstacle::builder::{build_obstacle, MeshNode};
use sph_core::obstacle::model_3ds::parse_3ds_partial;
use sph_core::{ObstacleMesh, RunState, SimSettings, Simulation, SpawnSettings, Spawner};
use wasm_bindgen::prelude::*;

/// GPU-compatible particle struct: 32 bytes, matches the WGSL `Particle`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParticle {
    position: [f32; 3], // 12 bytes
    /// 1 = visible, 0 = hidden, 0.5 = hidden but drawn in debug view
    visible: f32, //  4 bytes
    velocity: [f32; 3], // 12 bytes
    _pad: f32,          //  4 bytes
}

const DEBUG_HIDDEN: f32 = 0.5;

fn log(msg: &str) {
    web_sys::console::log_1(&msg.into());
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct FluidWorld {
    sim: Simulation,
    gpu_buffer: Vec<GpuParticle>,
    debug_view: bool,
}

#[wasm_bindgen]
impl FluidWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(particle_count: usize, seed: u32) -> Result<FluidWorld, JsValue> {
        let spawn = Spawner::new(SpawnSettings {
            particle_count,
            seed: seed as u64,
            ..Default::default()
        })
        .spawn();
        let sim = Simulation::new(SimSettings::default(), spawn, ObstacleMesh::empty())
            .map_err(to_js)?;
        log(&format!("WASM FluidWorld created: {} particles", particle_count));

        let mut world = FluidWorld {
            gpu_buffer: vec![bytemuck::Zeroable::zeroed(); sim.particles().count],
            sim,
            debug_view: false,
        };
        world.write_gpu_output();
        Ok(world)
    }

    /// Advance one frame; returns the elapsed wall time in ms.
    #[wasm_bindgen]
    pub fn tick(&mut self, frame_time: f32) -> Result<f32, JsValue> {
        let start = js_sys::Date::now();
        let passes = self.sim.tick(frame_time).map_err(to_js)?;
        if passes > 0 {
            self.write_gpu_output();
        }
        Ok((js_sys::Date::now() - start) as f32)
    }

    /// Returns true while running.
    #[wasm_bindgen]
    pub fn toggle_pause(&mut self) -> bool {
        self.sim.toggle_pause() == RunState::Running
    }

    #[wasm_bindgen]
    pub fn step_once(&mut self) -> Result<bool, JsValue> {
        let stepped = self.sim.step_once().map_err(to_js)?;
        if stepped {
            self.write_gpu_output();
        }
        Ok(stepped)
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.sim.reset().map_err(to_js)?;
        self.write_gpu_output();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn toggle_debug_view(&mut self) -> bool {
        self.debug_view = !self.debug_view;
        self.write_gpu_output();
        self.debug_view
    }

    #[wasm_bindgen]
    pub fn is_paused(&self) -> bool {
        self.sim.state() == RunState::Paused
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_ptr(&self) -> *const f32 {
        self.gpu_buffer.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_byte_length(&self) -> usize {
        std::mem::size_of_val(self.gpu_buffer.as_slice())
    }

    #[wasm_bindgen]
    pub fn particle_count(&self) -> usize {
        self.sim.particles().count
    }

    #[wasm_bindgen]
    pub fn active_count(&self) -> u32 {
        self.sim.particles().active_count() as u32
    }

    #[wasm_bindgen]
    pub fn set_fluid_config(
        &mut self,
        smoothing_radius: f32,
        target_density: f32,
        pressure_multiplier: f32,
        near_pressure_multiplier: f32,
        viscosity_strength: f32,
    ) {
        let s = self.sim.settings_mut();
        s.smoothing_radius = smoothing_radius;
        s.target_density = target_density;
        s.pressure_multiplier = pressure_multiplier;
        s.near_pressure_multiplier = near_pressure_multiplier;
        s.viscosity_strength = viscosity_strength;
    }

    #[wasm_bindgen]
    pub fn set_forces(&mut self, gravity: f32, wind_x: f32, wind_y: f32, wind_z: f32, wind_strength: f32) {
        let s = self.sim.settings_mut();
        s.gravity = gravity;
        s.wind_direction = Vec3::new(wind_x, wind_y, wind_z);
        s.wind_strength = wind_strength;
    }

    #[wasm_bindgen]
    pub fn set_time_config(&mut self, time_scale: f32, iterations_per_frame: u32, fixed_dt: f32) {
        let s = self.sim.settings_mut();
        s.time_scale = time_scale;
        s.iterations_per_frame = iterations_per_frame;
        s.timestep = if fixed_dt > 0.0 {
            sph_core::TimestepMode::Fixed { dt: fixed_dt }
        } else {
            sph_core::TimestepMode::Variable
        };
    }

    /// Axis-aligned bounds box; rotation is left unchanged.
    #[wasm_bindgen]
    pub fn set_bounds(&mut self, cx: f32, cy: f32, cz: f32, sx: f32, sy: f32, sz: f32, collision_damping: f32) {
        let s = self.sim.settings_mut();
        s.bounds.center = Vec3::new(cx, cy, cz);
        s.bounds.size = Vec3::new(sx, sy, sz);
        s.collision_damping = collision_damping;
    }

    /// Replace the obstacle with a flat triangle vertex array (xyz per
    /// vertex, 3 vertices per triangle). Pause first once the simulation
    /// has stepped.
    #[wasm_bindgen]
    pub fn load_obstacle(&mut self, vertices: &[f32]) -> Result<usize, JsValue> {
        let points: Vec<Vec3> = vertices.chunks_exact(3).map(Vec3::from_slice).collect();
        let mesh = ObstacleMesh::new(points).map_err(to_js)?;
        let triangles = mesh.triangle_count();
        self.sim.set_obstacles(mesh).map_err(to_js)?;
        Ok(triangles)
    }

    /// Replace the obstacle with a 3DS model. Unreadable trailing data is
    /// logged and the part read so far is used.
    #[wasm_bindgen]
    pub fn load_obstacle_3ds(&mut self, bytes: &[u8], tolerance: f32) -> Result<usize, JsValue> {
        let (model, err) = parse_3ds_partial(bytes);
        if let Some(e) = err {
            log(&format!("Error reading 3DS file: {e}"));
        }
        let build = build_obstacle(&MeshNode::from(model), glam::Affine3A::IDENTITY, tolerance);
        let triangles = build.mesh.triangle_count();
        self.sim.set_obstacles(build.mesh).map_err(to_js)?;
        Ok(triangles)
    }
}

impl FluidWorld {
    fn write_gpu_output(&mut self) {
        let particles = self.sim.particles();
        let hidden = if self.debug_view { DEBUG_HIDDEN } else { 0.0 };
        for (i, slot) in self.gpu_buffer.iter_mut().enumerate() {
            let pos = particles.position[i];
            let vel = particles.velocity[i];
            *slot = GpuParticle {
                position: pos.to_array(),
                visible: if particles.active[i] { 1.0 } else { hidden },
                velocity: vel.to_array(),
                _pad: 0.0,
            };
        }
    }
}
