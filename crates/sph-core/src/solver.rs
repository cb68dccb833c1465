use crate::config::{SimSettings, StepParams, TimestepMode};
use crate::diagnostics::{StageCounters, StepStats};
use crate::error::SimError;
use crate::exec::{DefaultExecutor, StageExecutor};
use crate::fluids::density::compute_density_pressure;
use crate::fluids::pressure::compute_pressure_forces;
use crate::fluids::viscosity::compute_viscosity_forces;
use crate::forces::external::apply_external_forces;
use crate::grid::SpatialHashGrid;
use crate::integrate::{integrate_and_collide, Kinematics};
use crate::obstacle::ObstacleMesh;
use crate::particle::{ParticleSet, ParticleSnapshot};
use crate::spawn::SpawnData;

/// Driver state. `SingleStep` only exists while `step_once` runs its pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Paused,
    Running,
    SingleStep,
}

/// Callback run after every completed pipeline pass.
pub type StepListener = Box<dyn FnMut(&StepStats) + Send>;

const DEFAULT_FRAME_TIME: f32 = 1.0 / 60.0;

/// Owns the particle store and runs the SPH pipeline.
///
/// One pass is: external forces, hash rebuild and sort, density/pressure,
/// pressure force, viscosity force, integrate and collide. Passes never
/// overlap; pause and reset only take effect between them.
pub struct Simulation<E: StageExecutor = DefaultExecutor> {
    exec: E,
    settings: SimSettings,
    spawn: SpawnData,
    particles: ParticleSet,
    grid: SpatialHashGrid,
    obstacles: ObstacleMesh,
    counters: StageCounters,
    scratch: Vec<Kinematics>,
    state: RunState,
    steps_taken: u64,
    ticks_seen: u64,
    last_frame_time: f32,
    last_stats: StepStats,
    listeners: Vec<StepListener>,
}

impl Simulation<DefaultExecutor> {
    pub fn new(
        settings: SimSettings,
        spawn: SpawnData,
        obstacles: ObstacleMesh,
    ) -> Result<Self, SimError> {
        Self::with_executor(DefaultExecutor::default(), settings, spawn, obstacles)
    }
}

impl<E: StageExecutor> Simulation<E> {
    /// Build a simulation that schedules its stages on `exec`.
    ///
    /// Starts `Running`, with the particle store loaded from `spawn`.
    pub fn with_executor(
        exec: E,
        settings: SimSettings,
        spawn: SpawnData,
        obstacles: ObstacleMesh,
    ) -> Result<Self, SimError> {
        settings.validate()?;
        if spawn.is_empty() {
            return Err(SimError::ZeroParticles);
        }
        let particles = ParticleSet::from_spawn(&spawn, settings.particle_mass)?;
        let grid = Self::make_grid(&settings, particles.count)?;

        log::info!(
            "simulation created: {} particles, {} obstacle triangles, h = {}",
            particles.count,
            obstacles.triangle_count(),
            settings.smoothing_radius
        );

        Ok(Self {
            exec,
            settings,
            spawn,
            particles,
            grid,
            obstacles,
            counters: StageCounters::default(),
            scratch: Vec::new(),
            state: RunState::Running,
            steps_taken: 0,
            ticks_seen: 0,
            last_frame_time: DEFAULT_FRAME_TIME,
            last_stats: StepStats::default(),
            listeners: Vec::new(),
        })
    }

    fn make_grid(settings: &SimSettings, count: usize) -> Result<SpatialHashGrid, SimError> {
        let table_size = settings.hash_table_size.unwrap_or(count);
        SpatialHashGrid::new(settings.smoothing_radius, table_size)
    }

    /// Restore the spawn state, drop all hash state and pause.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.particles.load_spawn(&self.spawn);
        self.particles.mass.fill(self.settings.particle_mass);
        self.grid = Self::make_grid(&self.settings, self.particles.count)?;
        self.scratch.clear();
        self.counters.reset();
        self.steps_taken = 0;
        self.ticks_seen = 0;
        self.last_stats = StepStats::default();
        self.state = RunState::Paused;
        log::info!("simulation reset to spawn state ({} particles)", self.particles.count);
        Ok(())
    }

    /// Switch between `Paused` and `Running`.
    pub fn toggle_pause(&mut self) -> RunState {
        self.state = match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused | RunState::SingleStep => RunState::Running,
        };
        self.state
    }

    /// Run exactly one pass if paused. Returns whether a pass ran.
    pub fn step_once(&mut self) -> Result<bool, SimError> {
        if self.state != RunState::Paused {
            return Ok(false);
        }
        self.state = RunState::SingleStep;
        let result = self.prepare(self.last_frame_time).map(|params| self.run_pass(&params));
        self.state = RunState::Paused;
        result.map(|_| true)
    }

    /// Advance by one frame. Returns the number of passes run.
    ///
    /// In `Variable` mode the first `warmup_frames` ticks after start or
    /// reset are ignored.
    pub fn tick(&mut self, frame_time: f32) -> Result<u32, SimError> {
        if self.state != RunState::Running {
            return Ok(0);
        }
        self.ticks_seen += 1;
        if self.settings.timestep == TimestepMode::Variable {
            if self.ticks_seen <= self.settings.warmup_frames as u64 {
                return Ok(0);
            }
            self.last_frame_time = frame_time;
        }

        let params = self.prepare(frame_time)?;
        let iterations = self.settings.iterations_per_frame;
        for _ in 0..iterations {
            self.run_pass(&params);
        }
        Ok(iterations)
    }

    /// Validate settings, rebuild the grid if the radius changed and
    /// snapshot the per-pass parameters.
    fn prepare(&mut self, frame_time: f32) -> Result<StepParams, SimError> {
        self.settings.validate()?;
        let table_size = self.settings.hash_table_size.unwrap_or(self.particles.count);
        if self.grid.cell_size() != self.settings.smoothing_radius
            || self.grid.table_size() != table_size.max(1)
        {
            self.grid = Self::make_grid(&self.settings, self.particles.count)?;
        }
        let dt = self.settings.step_dt(frame_time);
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimError::InvalidSetting {
                name: "frame_time",
                value: frame_time,
            });
        }
        Ok(self.settings.step_params(dt))
    }

    fn run_pass(&mut self, params: &StepParams) {
        let timer = PassTimer::start();
        self.counters.reset();

        apply_external_forces(&self.exec, &mut self.particles, params);
        self.grid.build(&self.particles.predicted);
        compute_density_pressure(&self.exec, &mut self.particles, &self.grid, params);
        compute_pressure_forces(&self.exec, &mut self.particles, &self.grid, params, &self.counters);
        compute_viscosity_forces(&self.exec, &mut self.particles, &self.grid, params, &self.counters);
        integrate_and_collide(
            &self.exec,
            &mut self.particles,
            &self.obstacles,
            params,
            &self.counters,
            &mut self.scratch,
        );

        self.steps_taken += 1;
        let mut stats = StepStats {
            step_index: self.steps_taken,
            delta_time: params.delta_time,
            total_ms: timer.elapsed_ms(),
            particle_count: self.particles.count as u32,
            active_count: self.particles.active_count() as u32,
            ..Default::default()
        };
        stats.collect(&self.counters);

        if stats.had_degeneracy() {
            log::debug!(
                "pass {}: {} low-density neighbors, {} unsupported, {} coincident, {} repaired",
                stats.step_index,
                stats.low_density_neighbors,
                stats.unsupported_particles,
                stats.coincident_pairs,
                stats.non_finite_repairs
            );
        }
        log::trace!(
            "pass {} took {:.3} ms ({} active)",
            stats.step_index,
            stats.total_ms,
            stats.active_count
        );

        for listener in &mut self.listeners {
            listener(&stats);
        }
        self.last_stats = stats;
    }

    /// Register a callback for every completed pass.
    pub fn on_step_completed(&mut self, listener: StepListener) {
        self.listeners.push(listener);
    }

    /// Replace the obstacle geometry.
    ///
    /// Only allowed before the first pass or while paused; the mesh stays
    /// fixed while the simulation is running.
    pub fn set_obstacles(&mut self, obstacles: ObstacleMesh) -> Result<(), SimError> {
        if self.state != RunState::Paused && self.steps_taken > 0 {
            return Err(SimError::ObstaclesLocked);
        }
        log::info!("obstacle mesh replaced: {} triangles", obstacles.triangle_count());
        self.obstacles = obstacles;
        Ok(())
    }

    pub fn snapshot(&self) -> ParticleSnapshot {
        self.particles.snapshot()
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    pub fn obstacles(&self) -> &ObstacleMesh {
        &self.obstacles
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    /// Settings are re-validated and re-read at the start of every tick.
    pub fn settings_mut(&mut self) -> &mut SimSettings {
        &mut self.settings
    }

    pub fn spawn_data(&self) -> &SpawnData {
        &self.spawn
    }

    pub fn last_stats(&self) -> &StepStats {
        &self.last_stats
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }
}

/// Wall-clock pass timing. `Instant` is unavailable on wasm32, where the
/// binding layer times ticks itself.
struct PassTimer {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
}

impl PassTimer {
    fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> f32 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_secs_f32() * 1000.0
        }
        #[cfg(target_arch = "wasm32")]
        {
            0.0
        }
    }
}
