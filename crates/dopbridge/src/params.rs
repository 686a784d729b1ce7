//! Build the engine parameter record from configuration and forces.

use glam::{Vec3, Vec4};
use partsim::{RelaxationMode, SolverParams, MAX_PLANES};

use crate::config::SolverConfig;
use crate::scene::{Force, ForceKind};

/// Fixed boundary planes `n.x + w >= 0`: ground, then the four walls.
pub const BOUNDARY_PLANES: [Vec4; 5] = [
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 4.0),
    Vec4::new(1.0, 0.0, 0.0, 2.0),
    Vec4::new(-1.0, 0.0, 0.0, 2.0),
    Vec4::new(0.0, 0.0, -1.0, 4.0),
];

/// Sum of every gravity contributor sampled as a uniform field.
pub fn gravity(forces: &[Box<dyn Force>]) -> Vec3 {
    forces
        .iter()
        .filter(|f| f.kind() == ForceKind::Gravity)
        .map(|f| f.force(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 1.0).0)
        .sum()
}

/// The full parameter record for one tick.
pub fn build_params(config: &SolverConfig, gravity: Vec3) -> SolverParams {
    let fluid_rest_distance = config.radius * config.fluid_rest_distance_mult;

    let mut planes = [Vec4::ZERO; MAX_PLANES];
    planes[..BOUNDARY_PLANES.len()].copy_from_slice(&BOUNDARY_PLANES);

    SolverParams {
        radius: config.radius,
        gravity,
        fluid_rest_distance,
        solid_rest_distance: fluid_rest_distance,
        num_iterations: config.iterations,
        max_speed: config.max_speed,
        max_acceleration: config.max_acceleration,
        fluid: true,
        viscosity: config.viscosity,
        dynamic_friction: config.dynamic_friction,
        static_friction: config.static_friction,
        particle_friction: config.particle_friction,
        free_surface_drag: 0.0,
        drag: config.drag,
        lift: config.lift,
        planes,
        num_planes: config.planes_count.min(BOUNDARY_PLANES.len() as u32),
        anisotropy_scale: 0.0,
        anisotropy_min: 0.1,
        anisotropy_max: 2.0,
        smoothing: 0.0,
        shape_collision_margin: config.shape_collision_margin,
        particle_collision_margin: config.particle_collision_margin,
        collision_distance: config.collision_distance,
        relaxation_mode: RelaxationMode::Local,
        relaxation_factor: config.relaxation_factor,
        solid_pressure: config.solid_pressure,
        adhesion: config.adhesion,
        cohesion: config.cohesion,
        surface_tension: config.surface_tension,
        vorticity_confinement: config.vorticity_confinement,
        buoyancy: config.buoyancy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{UniformForce, UniformGravity};

    #[test]
    fn test_only_gravity_contributes() {
        let forces: Vec<Box<dyn Force>> = vec![
            Box::new(UniformGravity::default()),
            Box::new(UniformGravity {
                acceleration: Vec3::new(1.0, 0.0, 0.0),
            }),
            Box::new(UniformForce {
                force: Vec3::splat(100.0),
                torque: Vec3::ZERO,
            }),
        ];
        assert_eq!(gravity(&forces), Vec3::new(1.0, -9.8, 0.0));
        assert_eq!(gravity(&[]), Vec3::ZERO);
    }

    #[test]
    fn test_derived_fields() {
        let config = SolverConfig {
            radius: 0.2,
            planes_count: 2,
            ..Default::default()
        };
        let params = build_params(&config, Vec3::NEG_Y);
        assert!((params.fluid_rest_distance - 0.11).abs() < 1e-6);
        assert_eq!(params.solid_rest_distance, params.fluid_rest_distance);
        assert_eq!(params.gravity, Vec3::NEG_Y);
        assert_eq!(params.num_iterations, 3);
        assert!(params.fluid);
        assert_eq!(params.relaxation_mode, RelaxationMode::Local);
        assert_eq!(
            params.active_planes(),
            &[Vec4::new(0.0, 1.0, 0.0, 0.0), Vec4::new(0.0, 0.0, 1.0, 4.0)]
        );
    }
}
