//! Simulated objects and the host collaborators around them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use partsim::Container;

use crate::data::SolverData;
use crate::error::SolverWarning;
use crate::geometry::Detail;

/// Stable identity of an object in the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of force a contributor represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceKind {
    Gravity,
    Other,
}

/// A force contributor attached to an object.
pub trait Force: Send + Sync {
    fn kind(&self) -> ForceKind;

    /// Force and torque on a sample at `position` moving with `velocity`
    /// and `angular_velocity`, scaled by `mass`.
    fn force(&self, position: Vec3, velocity: Vec3, angular_velocity: Vec3, mass: f32)
        -> (Vec3, Vec3);
}

/// Constant acceleration field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformGravity {
    pub acceleration: Vec3,
}

impl Default for UniformGravity {
    fn default() -> Self {
        Self {
            acceleration: Vec3::new(0.0, -9.8, 0.0),
        }
    }
}

impl Force for UniformGravity {
    fn kind(&self) -> ForceKind {
        ForceKind::Gravity
    }

    fn force(&self, _: Vec3, _: Vec3, _: Vec3, mass: f32) -> (Vec3, Vec3) {
        (self.acceleration * mass, Vec3::ZERO)
    }
}

/// Constant force, independent of mass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformForce {
    pub force: Vec3,
    pub torque: Vec3,
}

impl Force for UniformForce {
    fn kind(&self) -> ForceKind {
        ForceKind::Other
    }

    fn force(&self, _: Vec3, _: Vec3, _: Vec3, _: f32) -> (Vec3, Vec3) {
        (self.force, self.torque)
    }
}

/// An object driven by the solver.
pub struct SimObject<C: Container> {
    pub id: ObjectId,
    pub name: String,
    /// Geometry as of the last completed tick.
    pub geometry: Option<Arc<Detail>>,
    pub forces: Vec<Box<dyn Force>>,
    pub(crate) solver_data: Option<SolverData<C>>,
    pub(crate) warnings: Vec<SolverWarning>,
}

impl<C: Container> SimObject<C> {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            geometry: None,
            forces: Vec::new(),
            solver_data: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, geometry: Detail) -> Self {
        self.geometry = Some(Arc::new(geometry));
        self
    }

    pub fn with_force(mut self, force: impl Force + 'static) -> Self {
        self.forces.push(Box::new(force));
        self
    }

    /// Writable geometry. Clones it first if a previous tick still shares it.
    pub fn geometry_mut(&mut self) -> Option<&mut Detail> {
        self.geometry.as_mut().map(Arc::make_mut)
    }

    pub fn solver_data(&self) -> Option<&SolverData<C>> {
        self.solver_data.as_ref()
    }

    pub fn solver_data_mut(&mut self) -> Option<&mut SolverData<C>> {
        self.solver_data.as_mut()
    }

    /// Warnings raised during the last tick.
    pub fn warnings(&self) -> &[SolverWarning] {
        &self.warnings
    }

    /// Drop all solver state. The next tick starts from scratch.
    pub fn reset(&mut self) {
        self.solver_data = None;
        self.warnings.clear();
    }
}

/// Geometry of a collider together with its identity.
#[derive(Clone, Debug)]
pub struct Collider {
    pub id: ObjectId,
    pub geometry: Option<Arc<Detail>>,
}

/// The collision relationships of a scene.
pub trait Relationships {
    /// Objects `object` collides with.
    fn colliders(&self, object: ObjectId) -> Vec<ObjectId>;

    /// Geometry of an object that is not being solved, if known.
    fn static_geometry(&self, _object: ObjectId) -> Option<Arc<Detail>> {
        None
    }
}

/// Collision relationships held in memory.
#[derive(Clone, Debug, Default)]
pub struct RelationshipTable {
    collide: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
    statics: BTreeMap<ObjectId, Arc<Detail>>,
}

impl RelationshipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `object` collide with `collider`.
    pub fn add_collision(&mut self, object: ObjectId, collider: ObjectId) {
        self.collide.entry(object).or_default().insert(collider);
    }

    pub fn remove_collision(&mut self, object: ObjectId, collider: ObjectId) -> bool {
        self.collide
            .get_mut(&object)
            .is_some_and(|set| set.remove(&collider))
    }

    /// Register or replace the geometry of a static collider.
    pub fn set_static_geometry(&mut self, object: ObjectId, geometry: Detail) {
        self.statics.insert(object, Arc::new(geometry));
    }

    /// Writable geometry of a static collider.
    pub fn static_geometry_mut(&mut self, object: ObjectId) -> Option<&mut Detail> {
        self.statics.get_mut(&object).map(Arc::make_mut)
    }

    /// Forget `object` entirely.
    pub fn remove_object(&mut self, object: ObjectId) {
        self.collide.remove(&object);
        self.statics.remove(&object);
        for set in self.collide.values_mut() {
            set.remove(&object);
        }
    }
}

impl Relationships for RelationshipTable {
    fn colliders(&self, object: ObjectId) -> Vec<ObjectId> {
        self.collide
            .get(&object)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn static_geometry(&self, object: ObjectId) -> Option<Arc<Detail>> {
        self.statics.get(&object).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_scales_with_mass() {
        let gravity = UniformGravity::default();
        let (f, t) = gravity.force(Vec3::ONE, Vec3::ONE, Vec3::ZERO, 2.0);
        assert_eq!(f, Vec3::new(0.0, -19.6, 0.0));
        assert_eq!(t, Vec3::ZERO);
        assert_eq!(gravity.kind(), ForceKind::Gravity);
    }

    #[test]
    fn test_relationship_table() {
        let mut table = RelationshipTable::new();
        table.add_collision(ObjectId(1), ObjectId(2));
        table.add_collision(ObjectId(1), ObjectId(3));
        table.add_collision(ObjectId(1), ObjectId(2));
        assert_eq!(table.colliders(ObjectId(1)), vec![ObjectId(2), ObjectId(3)]);
        assert!(table.colliders(ObjectId(2)).is_empty());

        assert!(table.remove_collision(ObjectId(1), ObjectId(3)));
        assert!(!table.remove_collision(ObjectId(1), ObjectId(3)));

        table.remove_object(ObjectId(2));
        assert!(table.colliders(ObjectId(1)).is_empty());
    }

    #[test]
    fn test_static_geometry_lookup() {
        let mut table = RelationshipTable::new();
        table.set_static_geometry(ObjectId(9), Detail::from_points(&[Vec3::ONE]));
        assert_eq!(
            table.static_geometry(ObjectId(9)).map(|g| g.point_count()),
            Some(1)
        );
        assert!(table.static_geometry(ObjectId(8)).is_none());
    }
}
