use std::fs;
use std::path::Path;

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// How the driver turns wall-clock frame time into a simulation step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimestepMode {
    /// Every tick advances by `dt`, whatever frame time is passed in.
    Fixed { dt: f32 },
    /// Every tick advances by the measured frame time.
    Variable,
}

/// What happens to a particle whose sphere touches an obstacle triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleResponse {
    /// Hide the particle (`active = false`) and keep simulating it.
    Deactivate,
    /// Push the particle out along the triangle normal and reflect its
    /// normal velocity, damped by `collision_damping`.
    Reflect,
}

/// Axis-aligned simulation box before rotation: the unit cube
/// `[-0.5, 0.5]^3` scaled by `size`, rotated, and moved to `center`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimBounds {
    pub center: Vec3,
    pub size: Vec3,
    pub rotation: Quat,
}

impl Default for SimBounds {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            size: Vec3::new(10.0, 10.0, 10.0),
            rotation: Quat::IDENTITY,
        }
    }
}

impl SimBounds {
    pub fn new(center: Vec3, size: Vec3) -> Self {
        Self {
            center,
            size,
            rotation: Quat::IDENTITY,
        }
    }

    /// Transform taking bounds-local unit-cube coordinates to world space.
    pub fn local_to_world(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.size, self.rotation, self.center)
    }
}

/// Simulation-wide settings. Read once per tick and pushed to the stages as
/// `StepParams`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub time_scale: f32,
    pub timestep: TimestepMode,
    /// Sub-steps per tick; each one is a full pipeline pass.
    pub iterations_per_frame: u32,
    /// Variable-timestep ticks ignored after start/reset.
    pub warmup_frames: u32,
    /// Vertical gravity acceleration (negative is down).
    pub gravity: f32,
    pub wind_direction: Vec3,
    pub wind_strength: f32,
    /// 0 = elastic bounce off the bounds, 1 = velocity killed on contact.
    pub collision_damping: f32,
    pub smoothing_radius: f32,
    pub target_density: f32,
    pub pressure_multiplier: f32,
    pub near_pressure_multiplier: f32,
    pub viscosity_strength: f32,
    pub particle_mass: f32,
    pub bounds: SimBounds,
    /// Radius of the sphere each particle is treated as for obstacle tests.
    pub sphere_radius: f32,
    pub obstacle_response: ObstacleResponse,
    /// Hash table size; `None` uses the particle count.
    pub hash_table_size: Option<usize>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            timestep: TimestepMode::Fixed { dt: 1.0 / 60.0 },
            iterations_per_frame: 3,
            warmup_frames: 10,
            gravity: -10.0,
            wind_direction: Vec3::X,
            wind_strength: 0.01,
            collision_damping: 0.05,
            smoothing_radius: 0.2,
            target_density: 630.0,
            pressure_multiplier: 288.0,
            near_pressure_multiplier: 2.25,
            viscosity_strength: 0.001,
            particle_mass: 1.0,
            bounds: SimBounds::default(),
            sphere_radius: 0.05,
            obstacle_response: ObstacleResponse::Deactivate,
            hash_table_size: None,
        }
    }
}

impl SimSettings {
    /// Fail fast on settings the solver cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.smoothing_radius > 0.0) || !self.smoothing_radius.is_finite() {
            return Err(SimError::InvalidSmoothingRadius(self.smoothing_radius));
        }
        if self.iterations_per_frame == 0 {
            return Err(SimError::InvalidIterations);
        }
        if !(self.particle_mass > 0.0) || !self.particle_mass.is_finite() {
            return Err(SimError::InvalidSetting {
                name: "particle_mass",
                value: self.particle_mass,
            });
        }
        if !(0.0..=1.0).contains(&self.collision_damping) {
            return Err(SimError::InvalidSetting {
                name: "collision_damping",
                value: self.collision_damping,
            });
        }
        if !(self.sphere_radius >= 0.0) {
            return Err(SimError::InvalidSetting {
                name: "sphere_radius",
                value: self.sphere_radius,
            });
        }
        if let TimestepMode::Fixed { dt } = self.timestep {
            if !(dt > 0.0) || !dt.is_finite() {
                return Err(SimError::InvalidSetting {
                    name: "timestep.dt",
                    value: dt,
                });
            }
        }
        if self.bounds.size.min_element() <= 0.0 {
            return Err(SimError::InvalidSetting {
                name: "bounds.size",
                value: self.bounds.size.min_element(),
            });
        }
        Ok(())
    }

    /// Step length for one pass given a tick's frame time.
    pub fn step_dt(&self, frame_time: f32) -> f32 {
        let frame_time = match self.timestep {
            TimestepMode::Fixed { dt } => dt,
            TimestepMode::Variable => frame_time,
        };
        frame_time / self.iterations_per_frame.max(1) as f32 * self.time_scale
    }

    /// Snapshot the settings into the per-step parameter block.
    pub fn step_params(&self, delta_time: f32) -> StepParams {
        StepParams {
            delta_time,
            gravity: Vec3::new(0.0, self.gravity, 0.0),
            wind_direction: self.wind_direction,
            wind_strength: self.wind_strength,
            collision_damping: self.collision_damping,
            smoothing_radius: self.smoothing_radius,
            target_density: self.target_density,
            pressure_multiplier: self.pressure_multiplier,
            near_pressure_multiplier: self.near_pressure_multiplier,
            viscosity_strength: self.viscosity_strength,
            bounds_transform: self.bounds.local_to_world(),
            sphere_radius: self.sphere_radius,
            obstacle_response: self.obstacle_response,
        }
    }

    /// Save the settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate settings from a JSON file. Missing fields take
    /// their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let json = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Scalars every stage reads for one pass. Built once per tick.
#[derive(Clone, Copy, Debug)]
pub struct StepParams {
    pub delta_time: f32,
    pub gravity: Vec3,
    pub wind_direction: Vec3,
    pub wind_strength: f32,
    pub collision_damping: f32,
    pub smoothing_radius: f32,
    pub target_density: f32,
    pub pressure_multiplier: f32,
    pub near_pressure_multiplier: f32,
    pub viscosity_strength: f32,
    pub bounds_transform: Affine3A,
    pub sphere_radius: f32,
    pub obstacle_response: ObstacleResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(SimSettings::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let settings = SimSettings {
            smoothing_radius: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SimError::InvalidSmoothingRadius(_))
        ));

        let settings = SimSettings {
            smoothing_radius: f32::NAN,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let settings = SimSettings {
            iterations_per_frame: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(SimError::InvalidIterations)));
    }

    #[test]
    fn test_step_dt_divides_by_iterations() {
        let settings = SimSettings {
            timestep: TimestepMode::Variable,
            iterations_per_frame: 4,
            time_scale: 2.0,
            ..Default::default()
        };
        assert!((settings.step_dt(0.02) - 0.01).abs() < 1e-7);

        let fixed = SimSettings {
            timestep: TimestepMode::Fixed { dt: 0.03 },
            iterations_per_frame: 3,
            time_scale: 1.0,
            ..Default::default()
        };
        // Frame time is ignored in fixed mode.
        assert!((fixed.step_dt(5.0) - 0.01).abs() < 1e-7);
    }

    #[test]
    fn test_json_round_trip_fills_defaults() {
        let settings: SimSettings =
            serde_json::from_str(r#"{ "smoothing_radius": 0.35, "gravity": 0.0 }"#).unwrap();
        assert_eq!(settings.smoothing_radius, 0.35);
        assert_eq!(settings.gravity, 0.0);
        assert_eq!(settings.iterations_per_frame, 3);
    }

    #[test]
    fn test_bounds_transform_maps_unit_cube() {
        let bounds = SimBounds::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 4.0, 6.0));
        let corner = bounds.local_to_world().transform_point3(Vec3::splat(0.5));
        assert!((corner - Vec3::new(2.0, 4.0, 6.0)).length() < 1e-5);
    }
}
