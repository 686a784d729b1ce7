//! Solver configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{field} = {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: &'static str,
    },
}

/// Tuning knobs of the particle solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Particle radius
    pub radius: f32,
    /// Constraint iterations per substep (>= 1)
    pub iterations: u32,
    /// Substeps per timestep (>= 1)
    pub substeps: u32,
    /// Maximum particle speed (>= 0)
    pub max_speed: f32,
    /// Maximum particle acceleration (>= 0)
    pub max_acceleration: f32,

    /// Fluid rest distance as a multiple of the radius
    pub fluid_rest_distance_mult: f32,
    /// Number of boundary planes in use (0..=5)
    pub planes_count: u32,

    pub adhesion: f32,
    pub cohesion: f32,
    pub surface_tension: f32,
    pub viscosity: f32,
    pub relaxation_factor: f32,
    pub solid_pressure: f32,
    pub vorticity_confinement: f32,
    pub buoyancy: f32,

    pub dynamic_friction: f32,
    pub static_friction: f32,
    pub particle_friction: f32,
    /// Cloth drag (>= 0)
    pub drag: f32,
    /// Cloth lift (>= 0)
    pub lift: f32,

    pub shape_collision_margin: f32,
    pub particle_collision_margin: f32,
    pub collision_distance: f32,

    /// Particle slots per container
    pub max_particles: usize,
    /// Remove proxies of colliders no longer related to the object
    pub evict_stale_proxies: bool,
    /// Skip constraint rebuilds when topology and constraint attributes are unchanged
    pub skip_unchanged_constraints: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            radius: 0.1,
            iterations: 3,
            substeps: 6,
            max_speed: f32::MAX,
            max_acceleration: 1000.0,
            fluid_rest_distance_mult: 0.55,
            planes_count: 5,
            adhesion: 0.0,
            cohesion: 0.025,
            surface_tension: 0.0,
            viscosity: 0.0,
            relaxation_factor: 1.0,
            solid_pressure: 0.1,
            vorticity_confinement: 0.0,
            buoyancy: 1.0,
            dynamic_friction: 0.0,
            static_friction: 0.0,
            particle_friction: 0.0,
            drag: 0.0,
            lift: 0.0,
            shape_collision_margin: 0.05,
            particle_collision_margin: 0.0,
            collision_distance: 0.0275,
            max_particles: 65_536,
            evict_stale_proxies: false,
            skip_unchanged_constraints: true,
        }
    }
}

/// Number of fixed boundary planes available.
pub const BOUNDARY_PLANE_COUNT: u32 = 5;

/// Largest container capacity. Slots are read back into the `iid` int attribute.
pub const MAX_PARTICLES: usize = i32::MAX as usize;

impl SolverConfig {
    /// Check restricted fields. Reports the first one out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let out_of_range = |field, value: f64, range| ConfigError::OutOfRange {
            field,
            value,
            range,
        };

        if self.iterations < 1 {
            return Err(out_of_range("iterations", self.iterations as f64, ">= 1"));
        }
        if self.substeps < 1 {
            return Err(out_of_range("substeps", self.substeps as f64, ">= 1"));
        }
        if !(self.max_speed >= 0.0) {
            return Err(out_of_range("max_speed", self.max_speed as f64, ">= 0"));
        }
        if !(self.max_acceleration >= 0.0) {
            return Err(out_of_range(
                "max_acceleration",
                self.max_acceleration as f64,
                ">= 0",
            ));
        }
        if self.planes_count > BOUNDARY_PLANE_COUNT {
            return Err(out_of_range("planes_count", self.planes_count as f64, "0..=5"));
        }
        if !(self.drag >= 0.0) {
            return Err(out_of_range("drag", self.drag as f64, ">= 0"));
        }
        if !(self.lift >= 0.0) {
            return Err(out_of_range("lift", self.lift as f64, ">= 0"));
        }
        if self.max_particles > MAX_PARTICLES {
            return Err(out_of_range(
                "max_particles",
                self.max_particles as f64,
                "0..=2147483647",
            ));
        }
        Ok(())
    }

    /// Copy with every restricted field clamped into range.
    pub fn clamped(&self) -> Self {
        Self {
            iterations: self.iterations.max(1),
            substeps: self.substeps.max(1),
            max_speed: non_negative(self.max_speed),
            max_acceleration: non_negative(self.max_acceleration),
            planes_count: self.planes_count.min(BOUNDARY_PLANE_COUNT),
            drag: non_negative(self.drag),
            lift: non_negative(self.lift),
            max_particles: self.max_particles.min(MAX_PARTICLES),
            ..self.clone()
        }
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn save_yaml(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load configuration from YAML file
    pub fn load_yaml(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&yaml)?;
        Ok(config)
    }
}

// NaN maps to 0.
fn non_negative(v: f32) -> f32 {
    if v >= 0.0 {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{ "radius": 0.2, "substeps": 2 }"#).unwrap();
        assert_eq!(config.radius, 0.2);
        assert_eq!(config.substeps, 2);
        assert_eq!(config.iterations, 3);
        assert_eq!(config.cohesion, 0.025);
        assert!(config.skip_unchanged_constraints);
    }

    #[test]
    fn test_validate_reports_first_bad_field() {
        let config = SolverConfig {
            substeps: 0,
            planes_count: 9,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, "substeps"),
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_clamped_fixes_restricted_fields() {
        let config = SolverConfig {
            iterations: 0,
            substeps: 0,
            max_speed: -1.0,
            planes_count: 9,
            drag: f32::NAN,
            ..Default::default()
        };
        let clamped = config.clamped();
        assert!(clamped.validate().is_ok());
        assert_eq!(clamped.iterations, 1);
        assert_eq!(clamped.substeps, 1);
        assert_eq!(clamped.max_speed, 0.0);
        assert_eq!(clamped.planes_count, 5);
        assert_eq!(clamped.drag, 0.0);
        assert_eq!(clamped.radius, config.radius);
    }

    #[test]
    fn test_capacity_beyond_int_range_is_rejected_and_clamped() {
        let config = SolverConfig {
            max_particles: MAX_PARTICLES + 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "max_particles",
                ..
            })
        ));
        assert_eq!(config.clamped().max_particles, MAX_PARTICLES);
        assert!(config.clamped().validate().is_ok());
    }
}
