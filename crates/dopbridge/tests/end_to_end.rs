//! End-to-end scenarios
//!
//! Whole objects stepped through several ticks with the CPU container:
//! - A tetrahedron falls under gravity and keeps its primitives
//! - A stretched spring contracts towards its rest length
//! - The ground plane holds particles up

use dopbridge::geometry::names;
use dopbridge::{
    AttribOwner, Detail, DopSolver, ObjectId, RelationshipTable, SimObject, SolverConfig,
    UniformGravity,
};
use glam::Vec3;
use partsim::{Container, CpuContainer};

const DT: f32 = 1.0 / 24.0;

fn config() -> SolverConfig {
    SolverConfig {
        max_particles: 64,
        ..Default::default()
    }
}

fn particle_detail(points: &[Vec3]) -> Detail {
    let mut detail = Detail::from_points(points);
    detail.add_attribute(AttribOwner::Point, names::VELOCITY, Vec3::ZERO);
    detail.add_attribute(AttribOwner::Point, names::INSTANCE_ID, -1i32);
    detail.add_attribute(AttribOwner::Point, names::PHASE, 0i32);
    detail.add_attribute(AttribOwner::Point, names::INVERSE_MASS, 1.0f32);
    detail
}

fn tetrahedron() -> Detail {
    let mut detail = particle_detail(&[
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(0.0, 2.0, 0.0),
    ]);
    for face in [[0, 1, 2], [0, 3, 1], [1, 3, 2], [2, 3, 0]] {
        detail.add_primitive(&face);
    }
    detail.add_attribute(AttribOwner::Primitive, names::REST_LENGTH, 1.0f32);
    detail.add_attribute(AttribOwner::Primitive, names::STRENGTH, 0.5f32);
    detail
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_tetrahedron_falls_under_gravity() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut solver = DopSolver::new(config());
    let relationships = RelationshipTable::new();
    let mut objects = vec![SimObject::<CpuContainer>::new(ObjectId(1), "tetra")
        .with_geometry(tetrahedron())
        .with_force(UniformGravity::default())];

    let summary = solver.solve_objects(&mut objects, &relationships, DT);
    assert_eq!(summary.processed, 1);
    assert!(objects[0].warnings().is_empty(), "{:?}", objects[0].warnings());
    assert_eq!(solver.params().gravity, Vec3::new(0.0, -9.8, 0.0));

    let data = objects[0].solver_data().unwrap();
    assert_eq!(data.container().triangles().len(), 4);
    assert!(data.container().springs().is_empty());

    let out = objects[0].geometry.as_ref().unwrap();
    assert_eq!(out.point_count(), 4);
    assert_eq!(out.primitive_count(), 4);
    assert_eq!(
        out.find_attribute::<f32>(AttribOwner::Primitive, names::REST_LENGTH),
        Some(&[1.0; 4][..])
    );

    let velocities = out.find_attribute::<Vec3>(AttribOwner::Point, names::VELOCITY).unwrap();
    for (point, v) in velocities.iter().enumerate() {
        assert!(v.y < 0.0, "point {point} should fall, v = {v}");
        assert!((v.y + 9.8 * DT).abs() < 1e-3, "point {point}: v.y = {}", v.y);
    }
    let heights: Vec<f32> = out.positions().iter().map(|p| p.y).collect();
    assert!(heights[0] < 1.0 && heights[3] < 2.0);

    // Keeps falling on the next tick without a re-ingest.
    solver.solve_objects(&mut objects, &relationships, DT);
    let out = objects[0].geometry.as_ref().unwrap();
    assert!(out.positions()[0].y < heights[0]);
    assert_eq!(objects[0].solver_data().unwrap().container().stats().particle_pushes, 1);
}

#[test]
fn test_stretched_spring_contracts() {
    let mut detail = particle_detail(&[Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)]);
    detail.add_primitive(&[0, 1]);
    detail.add_attribute(AttribOwner::Primitive, names::REST_LENGTH, 1.0f32);
    detail.add_attribute(AttribOwner::Primitive, names::STRENGTH, 1.0f32);

    let mut solver = DopSolver::new(config());
    let relationships = RelationshipTable::new();
    let mut objects =
        vec![SimObject::<CpuContainer>::new(ObjectId(1), "spring").with_geometry(detail)];

    for tick in 0..3 {
        solver.solve_objects(&mut objects, &relationships, DT);
        let p = objects[0].geometry.as_ref().unwrap().positions();
        let d = p[0].distance(p[1]);
        assert!(d < 2.0, "tick {tick}: spring did not contract, d = {d}");
        assert!((d - 1.0).abs() < 0.25, "tick {tick}: d = {d}");
        assert!((p[0].y - 1.0).abs() < 1e-4, "no gravity, so no vertical motion");
    }
    assert_eq!(objects[0].solver_data().unwrap().container().springs().len(), 1);
}

#[test]
fn test_ground_plane_holds_particles() {
    let mut solver = DopSolver::new(config());
    let relationships = RelationshipTable::new();
    let mut objects = vec![SimObject::<CpuContainer>::new(ObjectId(1), "drop")
        .with_geometry(particle_detail(&[Vec3::new(0.0, 0.1, 0.0)]))
        .with_force(UniformGravity::default())];

    for _ in 0..12 {
        solver.solve_objects(&mut objects, &relationships, DT);
    }
    let y = objects[0].geometry.as_ref().unwrap().positions()[0].y;
    let contact = solver.config().collision_distance;
    assert!(y >= contact - 1e-4, "particle sank below the ground: y = {y}");
    assert!(y < 0.1);
}
