use std::sync::atomic::{AtomicU32, Ordering};

/// Counters the stages bump while running, possibly from several threads.
///
/// Every counter records a case that was handled locally (skipped
/// contribution, substituted direction, reverted state) so the run could
/// continue without NaN/Inf reaching the particle store.
#[derive(Default)]
pub struct StageCounters {
    pub low_density_neighbors: AtomicU32,
    pub unsupported_particles: AtomicU32,
    pub coincident_pairs: AtomicU32,
    pub boundary_hits: AtomicU32,
    pub obstacle_hits: AtomicU32,
    pub non_finite_repairs: AtomicU32,
}

impl StageCounters {
    #[inline]
    pub fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        for c in [
            &self.low_density_neighbors,
            &self.unsupported_particles,
            &self.coincident_pairs,
            &self.boundary_hits,
            &self.obstacle_hits,
            &self.non_finite_repairs,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// Statistics from a single pipeline pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Passes completed since start or last reset, including this one.
    pub step_index: u64,
    /// Step length used for this pass in seconds.
    pub delta_time: f32,
    /// Wall-clock time spent in this pass in milliseconds.
    pub total_ms: f32,
    pub particle_count: u32,
    /// Particles still visible after this pass.
    pub active_count: u32,
    /// Neighbor contributions skipped because the neighbor's density was ~0.
    pub low_density_neighbors: u32,
    /// Particles with ~0 density of their own; internal forces skipped.
    pub unsupported_particles: u32,
    /// Neighbor pairs at zero distance that got a substitute direction.
    pub coincident_pairs: u32,
    pub boundary_hits: u32,
    pub obstacle_hits: u32,
    pub non_finite_repairs: u32,
}

impl StepStats {
    pub(crate) fn collect(&mut self, counters: &StageCounters) {
        let load = |c: &AtomicU32| c.load(Ordering::Relaxed);
        self.low_density_neighbors = load(&counters.low_density_neighbors);
        self.unsupported_particles = load(&counters.unsupported_particles);
        self.coincident_pairs = load(&counters.coincident_pairs);
        self.boundary_hits = load(&counters.boundary_hits);
        self.obstacle_hits = load(&counters.obstacle_hits);
        self.non_finite_repairs = load(&counters.non_finite_repairs);
    }

    /// True when any numeric guard fired during the pass.
    pub fn had_degeneracy(&self) -> bool {
        self.low_density_neighbors > 0
            || self.unsupported_particles > 0
            || self.coincident_pairs > 0
            || self.non_finite_repairs > 0
    }
}
