//! The container surface and its CPU implementation.
//!
//! A container is one independent particle simulation: a slot pool, a set of
//! host-visible buffers reached through map guards, global parameters,
//! collision proxies, and a device that runs the solver asynchronously.
//!
//! ```text
//! map_particles ─┐       push_particles ─┐
//! map_springs   ─┼─ host ─ push_springs  ─┼─► device queue ─► tick ─► pull_from_device
//! map_triangles ─┘       push_triangles ─┘                            (blocks)
//! ```

use std::sync::Arc;

use crate::buffers::{
    MapState, Mapped, ParticleBuffers, SpringBuffers, TriangleBuffers, TriangleMeshBuffers,
};
use crate::collision::{CollisionSet, ProxyId};
use crate::device::{Command, Device, DeviceStats};
use crate::error::EngineError;
use crate::params::SolverParams;
use crate::slots::SlotPool;

/// Function-call surface of a particle engine.
///
/// Map guards borrow the container mutably, so a buffer can only be resized,
/// pushed or ticked once every guard on it has been dropped.
pub trait Container {
    /// Create a container able to address `capacity` particle slots.
    fn create(capacity: usize) -> Self
    where
        Self: Sized;

    /// Whether the container can still be used.
    fn is_valid(&self) -> bool;

    /// Number of slots the container can address.
    fn capacity(&self) -> usize;

    /// Number of slots currently active.
    fn active_count(&self) -> usize;

    /// Append `count` slots to the active list. Returns the new active count.
    fn alloc_particles(&mut self, count: usize) -> Result<usize, EngineError>;

    /// Release `slots`. Returns the number actually freed.
    fn free_particles(&mut self, slots: &[u32]) -> Result<usize, EngineError>;

    /// Copy the active list into `out`. Returns its length.
    fn active_list(&self, out: &mut Vec<u32>) -> usize;

    fn map_particles(&mut self) -> Mapped<'_, ParticleBuffers>;

    /// Queue an upload of the whole particle buffer.
    fn push_particles(&mut self);

    fn resize_springs(&mut self, count: usize);

    fn map_springs(&mut self) -> Mapped<'_, SpringBuffers>;

    fn push_springs(&mut self);

    fn resize_triangles(&mut self, count: usize);

    fn map_triangles(&mut self) -> Mapped<'_, TriangleBuffers>;

    /// Queue an upload of the triangle constraints, with or without normals.
    fn push_triangles(&mut self, with_normals: bool);

    fn set_params(&mut self, params: &SolverParams);

    fn params(&self) -> &SolverParams;

    /// Queue one step of `dt` split into `substeps` equal substeps.
    fn tick(&mut self, dt: f32, substeps: u32);

    /// Wait for every queued command, then copy the device particle state
    /// into the host buffers.
    fn pull_from_device(&mut self) -> Result<(), EngineError>;

    /// Get or create the collision proxy registered under `key`.
    fn add_triangle_mesh(&mut self, key: &str) -> ProxyId;

    fn map_triangle_mesh(
        &mut self,
        id: ProxyId,
    ) -> Result<Mapped<'_, TriangleMeshBuffers>, EngineError>;

    fn remove_triangle_mesh(&mut self, id: ProxyId) -> bool;

    /// Bind the current proxy set for the following ticks.
    fn bind_collision(&mut self);

    fn stats(&self) -> ContainerStats;
}

/// Operation counters for one container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub particle_maps: u64,
    pub spring_maps: u64,
    pub triangle_maps: u64,
    pub particle_pushes: u64,
    pub spring_pushes: u64,
    pub triangle_pushes: u64,
    pub param_pushes: u64,
    pub ticks: u64,
    pub pulls: u64,
    pub allocated: u64,
    pub freed: u64,
    pub proxy_rebuilds: u64,
    pub proxies: usize,
    pub collision_binds: u64,
    pub device: DeviceStats,
}

/// Container backed by a worker thread running the reference solver.
pub struct CpuContainer {
    slots: SlotPool,
    particles: ParticleBuffers,
    particle_state: MapState,
    springs: SpringBuffers,
    spring_state: MapState,
    triangles: TriangleBuffers,
    triangle_state: MapState,
    params: SolverParams,
    collision: CollisionSet,
    device: Device,
    stats: ContainerStats,
}

impl CpuContainer {
    pub fn new(capacity: usize) -> Self {
        let device = Device::spawn(capacity);
        if !device.is_lost() {
            log::info!("Created particle container with {} slots", capacity);
        }
        Self {
            slots: SlotPool::new(capacity),
            particles: ParticleBuffers::with_capacity(capacity),
            particle_state: MapState::default(),
            springs: SpringBuffers::default(),
            spring_state: MapState::default(),
            triangles: TriangleBuffers::default(),
            triangle_state: MapState::default(),
            params: SolverParams::default(),
            collision: CollisionSet::default(),
            device,
            stats: ContainerStats::default(),
        }
    }

    /// Stop the device worker. The container is invalid afterwards.
    pub fn shutdown_device(&mut self) {
        self.device = Device::lost();
    }

    /// Read-only view of the host particle buffers.
    pub fn particles(&self) -> &ParticleBuffers {
        &self.particles
    }

    /// Read-only view of the host spring buffers.
    pub fn springs(&self) -> &SpringBuffers {
        &self.springs
    }

    /// Read-only view of the host triangle buffers.
    pub fn triangles(&self) -> &TriangleBuffers {
        &self.triangles
    }

    pub fn collision(&self) -> &CollisionSet {
        &self.collision
    }

    fn submit(&mut self, command: Command) {
        // Loss is logged by the device and reported through is_valid().
        if self.device.submit(command).is_err() {
            log::debug!("Dropped command for lost device");
        }
    }
}

impl Container for CpuContainer {
    fn create(capacity: usize) -> Self {
        Self::new(capacity)
    }

    fn is_valid(&self) -> bool {
        !self.device.is_lost()
    }

    fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    fn active_count(&self) -> usize {
        self.slots.active_count()
    }

    fn alloc_particles(&mut self, count: usize) -> Result<usize, EngineError> {
        self.slots.alloc(count)?;
        self.stats.allocated += count as u64;
        Ok(self.slots.active_count())
    }

    fn free_particles(&mut self, slots: &[u32]) -> Result<usize, EngineError> {
        let freed = self.slots.free(slots)?;
        self.stats.freed += freed as u64;
        Ok(freed)
    }

    fn active_list(&self, out: &mut Vec<u32>) -> usize {
        out.clear();
        out.extend_from_slice(self.slots.active());
        out.len()
    }

    fn map_particles(&mut self) -> Mapped<'_, ParticleBuffers> {
        Mapped::new(&mut self.particles, &mut self.particle_state)
    }

    fn push_particles(&mut self) {
        self.stats.particle_pushes += 1;
        let command = Command::UploadParticles {
            particles: self.particles.clone(),
            active: self.slots.active().to_vec(),
        };
        self.submit(command);
    }

    fn resize_springs(&mut self, count: usize) {
        self.springs.resize(count);
    }

    fn map_springs(&mut self) -> Mapped<'_, SpringBuffers> {
        Mapped::new(&mut self.springs, &mut self.spring_state)
    }

    fn push_springs(&mut self) {
        self.stats.spring_pushes += 1;
        let command = Command::UploadSprings(self.springs.clone());
        self.submit(command);
    }

    fn resize_triangles(&mut self, count: usize) {
        self.triangles.resize(count);
    }

    fn map_triangles(&mut self) -> Mapped<'_, TriangleBuffers> {
        Mapped::new(&mut self.triangles, &mut self.triangle_state)
    }

    fn push_triangles(&mut self, with_normals: bool) {
        self.stats.triangle_pushes += 1;
        let command = Command::UploadTriangles {
            triangles: self.triangles.clone(),
            normals: with_normals,
        };
        self.submit(command);
    }

    fn set_params(&mut self, params: &SolverParams) {
        self.stats.param_pushes += 1;
        self.params = params.clone();
        self.submit(Command::UploadParams(params.clone()));
    }

    fn params(&self) -> &SolverParams {
        &self.params
    }

    fn tick(&mut self, dt: f32, substeps: u32) {
        self.stats.ticks += 1;
        self.submit(Command::Tick {
            dt,
            substeps: substeps.max(1),
        });
    }

    fn pull_from_device(&mut self) -> Result<(), EngineError> {
        self.particles = self.device.download()?;
        self.stats.pulls += 1;
        Ok(())
    }

    fn add_triangle_mesh(&mut self, key: &str) -> ProxyId {
        self.collision.add_triangle_mesh(key)
    }

    fn map_triangle_mesh(
        &mut self,
        id: ProxyId,
    ) -> Result<Mapped<'_, TriangleMeshBuffers>, EngineError> {
        let slot = self
            .collision
            .slot_mut(id)
            .ok_or(EngineError::UnknownProxy(id))?;
        Ok(Mapped::new(Arc::make_mut(&mut slot.mesh), &mut slot.state))
    }

    fn remove_triangle_mesh(&mut self, id: ProxyId) -> bool {
        self.collision.remove(id)
    }

    fn bind_collision(&mut self) {
        self.stats.collision_binds += 1;
        let meshes = self.collision.snapshot();
        self.submit(Command::BindCollision(meshes));
    }

    fn stats(&self) -> ContainerStats {
        ContainerStats {
            particle_maps: self.particle_state.map_count(),
            spring_maps: self.spring_state.map_count(),
            triangle_maps: self.triangle_state.map_count(),
            proxy_rebuilds: self.collision.rebuild_count(),
            proxies: self.collision.len(),
            device: self.device.stats(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_alloc_returns_active_count() {
        let mut container = CpuContainer::new(8);
        assert_eq!(container.alloc_particles(3).unwrap(), 3);
        assert_eq!(container.alloc_particles(2).unwrap(), 5);

        let mut list = Vec::new();
        assert_eq!(container.active_list(&mut list), 5);
        assert_eq!(list, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pull_overwrites_host_with_device_state() {
        let mut container = CpuContainer::new(1);
        container.alloc_particles(1).unwrap();
        {
            let mut particles = container.map_particles();
            particles.positions[0] = Vec4::new(0.0, 5.0, 0.0, 1.0);
        }
        container.push_particles();
        container.tick(1.0 / 60.0, 2);
        container.pull_from_device().unwrap();

        assert!(container.particles().positions[0].y < 5.0);
        let stats = container.stats();
        assert_eq!(stats.particle_maps, 1);
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.pulls, 1);
    }

    #[test]
    fn test_shutdown_invalidates_container() {
        let mut container = CpuContainer::new(4);
        assert!(container.is_valid());
        container.shutdown_device();
        assert!(!container.is_valid());
        assert_eq!(container.pull_from_device(), Err(EngineError::DeviceLost));
    }

    #[test]
    fn test_unknown_proxy_cannot_be_mapped() {
        let mut container = CpuContainer::new(4);
        let id = container.add_triangle_mesh("collider");
        assert!(container.remove_triangle_mesh(id));
        assert!(matches!(
            container.map_triangle_mesh(id),
            Err(EngineError::UnknownProxy(_))
        ));
    }
}
