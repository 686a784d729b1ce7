//! Global solver parameters.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Maximum number of collision planes a container evaluates.
pub const MAX_PLANES: usize = 8;

/// How constraint corrections are averaged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelaxationMode {
    /// Corrections to a particle are averaged over its constraint count.
    #[default]
    Local,
    /// Corrections are scaled by the relaxation factor only.
    Global,
}

/// The flat parameter record pushed to a container before every tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    /// Particle interaction radius
    pub radius: f32,
    /// Constant acceleration applied to every particle
    pub gravity: Vec3,
    pub fluid_rest_distance: f32,
    pub solid_rest_distance: f32,
    /// Constraint iterations per substep
    pub num_iterations: u32,
    pub max_speed: f32,
    pub max_acceleration: f32,
    pub fluid: bool,

    pub viscosity: f32,
    pub dynamic_friction: f32,
    pub static_friction: f32,
    pub particle_friction: f32,
    pub free_surface_drag: f32,
    pub drag: f32,
    pub lift: f32,

    /// Collision planes `n.x + w >= 0`; only the first `num_planes` are used.
    pub planes: [Vec4; MAX_PLANES],
    pub num_planes: u32,

    pub anisotropy_scale: f32,
    pub anisotropy_min: f32,
    pub anisotropy_max: f32,
    pub smoothing: f32,

    pub shape_collision_margin: f32,
    pub particle_collision_margin: f32,
    pub collision_distance: f32,

    pub relaxation_mode: RelaxationMode,
    pub relaxation_factor: f32,
    pub solid_pressure: f32,
    pub adhesion: f32,
    pub cohesion: f32,
    pub surface_tension: f32,
    pub vorticity_confinement: f32,
    pub buoyancy: f32,
}

impl Default for SolverParams {
    fn default() -> Self {
        let radius = 0.1;
        Self {
            radius,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            fluid_rest_distance: radius * 0.55,
            solid_rest_distance: radius * 0.55,
            num_iterations: 3,
            max_speed: f32::MAX,
            max_acceleration: 1000.0,
            fluid: true,
            viscosity: 0.0,
            dynamic_friction: 0.0,
            static_friction: 0.0,
            particle_friction: 0.0,
            free_surface_drag: 0.0,
            drag: 0.0,
            lift: 0.0,
            planes: [Vec4::ZERO; MAX_PLANES],
            num_planes: 0,
            anisotropy_scale: 0.0,
            anisotropy_min: 0.1,
            anisotropy_max: 2.0,
            smoothing: 0.0,
            shape_collision_margin: 0.05,
            particle_collision_margin: 0.0,
            collision_distance: 0.0275,
            relaxation_mode: RelaxationMode::Local,
            relaxation_factor: 1.0,
            solid_pressure: 0.1,
            adhesion: 0.0,
            cohesion: 0.025,
            surface_tension: 0.0,
            vorticity_confinement: 0.0,
            buoyancy: 1.0,
        }
    }
}

impl SolverParams {
    /// The active collision planes.
    pub fn active_planes(&self) -> &[Vec4] {
        let n = (self.num_planes as usize).min(MAX_PLANES);
        &self.planes[..n]
    }
}
