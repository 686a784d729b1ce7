//! Host-visible buffers and their map guards.
//!
//! Every buffer the container exposes is reached through [`Mapped`], which
//! borrows the container mutably for as long as the mapping lives. A second
//! map, a resize, a push or a tick on the same container cannot be written
//! while a guard is alive, and dropping the guard is the unmap.

use std::ops::{Deref, DerefMut};

use glam::{Vec3, Vec4};

/// Map bookkeeping for one logical buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapState {
    mapped: bool,
    maps: u64,
}

impl MapState {
    /// Whether a guard for this buffer is currently alive.
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Number of times this buffer has been mapped.
    pub fn map_count(&self) -> u64 {
        self.maps
    }
}

/// Scoped write access to a host-visible buffer. Unmaps on drop.
pub struct Mapped<'a, T> {
    data: &'a mut T,
    state: &'a mut MapState,
}

impl<'a, T> Mapped<'a, T> {
    pub(crate) fn new(data: &'a mut T, state: &'a mut MapState) -> Self {
        debug_assert!(!state.mapped, "buffer mapped twice");
        state.mapped = true;
        state.maps += 1;
        Self { data, state }
    }
}

impl<T> Deref for Mapped<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for Mapped<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T> Drop for Mapped<'_, T> {
    fn drop(&mut self) {
        self.state.mapped = false;
    }
}

/// Per-slot particle data, indexed by slot.
#[derive(Clone, Debug, Default)]
pub struct ParticleBuffers {
    /// xyz = position, w = inverse mass
    pub positions: Vec<Vec4>,
    pub velocities: Vec<Vec3>,
    /// Phase tag (group and behaviour bits)
    pub phases: Vec<i32>,
    /// xyz = rest position, w = 1
    pub rest_positions: Vec<Vec4>,
}

impl ParticleBuffers {
    /// Allocate buffers for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: vec![Vec4::ZERO; capacity],
            velocities: vec![Vec3::ZERO; capacity],
            phases: vec![0; capacity],
            rest_positions: vec![Vec4::W; capacity],
        }
    }

    /// Number of slots the buffers can address.
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// Positions as the flat `x, y, z, invmass` float array a device expects.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Velocities as a flat `x, y, z` float array.
    pub fn velocities_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.velocities)
    }

    /// Size of one full upload in bytes.
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.positions_flat())
            + std::mem::size_of_val(self.velocities_flat())
            + std::mem::size_of_val(self.phases.as_slice())
            + std::mem::size_of_val(self.rest_positions.as_slice())
    }
}

/// Distance constraints between particle pairs.
#[derive(Clone, Debug, Default)]
pub struct SpringBuffers {
    pub ids: Vec<[u32; 2]>,
    pub rest_lengths: Vec<f32>,
    pub stiffness: Vec<f32>,
}

impl SpringBuffers {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resize to `count` springs. Capacity never shrinks.
    pub fn resize(&mut self, count: usize) {
        self.ids.resize(count, [0, 0]);
        self.rest_lengths.resize(count, 0.0);
        self.stiffness.resize(count, 0.0);
    }

    /// Capacity high-water mark.
    pub fn capacity(&self) -> usize {
        self.ids.capacity()
    }

    /// Pair indices as one flat array.
    pub fn ids_flat(&self) -> &[u32] {
        bytemuck::cast_slice(&self.ids)
    }
}

/// Triangle constraints with an optional per-triangle normal.
#[derive(Clone, Debug, Default)]
pub struct TriangleBuffers {
    pub ids: Vec<[u32; 3]>,
    pub normals: Vec<Vec3>,
}

impl TriangleBuffers {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resize to `count` triangles. Capacity never shrinks.
    pub fn resize(&mut self, count: usize) {
        self.ids.resize(count, [0, 0, 0]);
        self.normals.resize(count, Vec3::ZERO);
    }

    /// Capacity high-water mark.
    pub fn capacity(&self) -> usize {
        self.ids.capacity()
    }

    pub fn ids_flat(&self) -> &[u32] {
        bytemuck::cast_slice(&self.ids)
    }
}

/// Geometry of one triangle-mesh collision proxy.
#[derive(Clone, Debug)]
pub struct TriangleMeshBuffers {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Lower corner of the bounds.
    pub lower: Vec3,
    /// Upper corner of the bounds.
    pub upper: Vec3,
}

impl Default for TriangleMeshBuffers {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            lower: Vec3::splat(f32::MAX),
            upper: Vec3::splat(-f32::MAX),
        }
    }
}

impl TriangleMeshBuffers {
    pub fn set_vertex_count(&mut self, count: usize) {
        self.vertices.resize(count, Vec3::ZERO);
    }

    pub fn set_triangle_count(&mut self, count: usize) {
        self.triangles.resize(count, [0, 0, 0]);
    }

    /// Whether the bounds enclose at least one point.
    pub fn has_bounds(&self) -> bool {
        self.lower.cmple(self.upper).all()
    }
}
