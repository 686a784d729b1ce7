//! Reference position-based solver run by the device worker.
//!
//! Per substep:
//! 1. predict positions from velocity and gravity (clamped by the max
//!    acceleration / max speed limits)
//! 2. iterate spring constraints, collision planes and triangle-mesh proxies
//! 3. derive velocities from the position change and commit
//!
//! Inverse mass 0 pins a particle. Triangle constraints and rest positions
//! are carried but not solved here.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use rayon::prelude::*;

use crate::buffers::{ParticleBuffers, SpringBuffers, TriangleBuffers, TriangleMeshBuffers};
use crate::params::{RelaxationMode, SolverParams};

const EPSILON: f32 = 1e-6;

/// Everything the device side owns.
#[derive(Clone, Debug, Default)]
pub struct DeviceState {
    pub particles: ParticleBuffers,
    pub active: Vec<u32>,
    pub springs: SpringBuffers,
    pub triangles: TriangleBuffers,
    pub triangle_normals: bool,
    pub params: SolverParams,
    pub meshes: Vec<Arc<TriangleMeshBuffers>>,
}

/// Advance `state` by `dt`, split into `substeps` equal substeps.
pub fn step(state: &mut DeviceState, dt: f32, substeps: u32) {
    if dt <= 0.0 || substeps == 0 || state.active.is_empty() {
        return;
    }
    let h = dt / substeps as f32;
    for _ in 0..substeps {
        substep(state, h);
    }
}

fn substep(state: &mut DeviceState, h: f32) {
    let params = &state.params;
    let capacity = state.particles.capacity();

    let mut active_mask = vec![false; capacity];
    for &slot in &state.active {
        if let Some(flag) = active_mask.get_mut(slot as usize) {
            *flag = true;
        }
    }

    // 1. Predict
    let gravity = clamp_length(params.gravity, params.max_acceleration);
    let max_speed = params.max_speed;
    let mut predicted: Vec<Vec3> = state
        .particles
        .positions
        .par_iter()
        .zip(state.particles.velocities.par_iter())
        .zip(active_mask.par_iter())
        .map(|((p, v), &active)| {
            let x = p.truncate();
            if !active || p.w == 0.0 {
                return x;
            }
            let v = clamp_length(*v + gravity * h, max_speed);
            x + v * h
        })
        .collect();

    // 2. Constraints
    let relax = match params.relaxation_mode {
        RelaxationMode::Local => params.relaxation_factor,
        RelaxationMode::Global => params.relaxation_factor.min(1.0),
    };
    let contact_offset = params.collision_distance.max(EPSILON);
    let mesh_offset = contact_offset + params.shape_collision_margin.max(0.0);
    let mut contact_normals = vec![Vec3::ZERO; capacity];

    for _ in 0..params.num_iterations.max(1) {
        solve_springs(
            &state.springs,
            &state.particles.positions,
            &active_mask,
            &mut predicted,
            relax,
        );

        for &slot in &state.active {
            let i = slot as usize;
            if state.particles.positions[i].w == 0.0 {
                continue;
            }
            for plane in params.active_planes() {
                let n = plane.truncate();
                let dist = n.dot(predicted[i]) + plane.w - contact_offset;
                if dist < 0.0 {
                    predicted[i] -= n * dist;
                    contact_normals[i] = n;
                }
            }
            for mesh in &state.meshes {
                if let Some(n) = push_out_of_mesh(mesh, &mut predicted[i], mesh_offset) {
                    contact_normals[i] = n;
                }
            }
        }
    }

    // 3. Velocity update and commit
    let friction = params.dynamic_friction.clamp(0.0, 1.0);
    for &slot in &state.active {
        let i = slot as usize;
        let p = state.particles.positions[i];
        if p.w == 0.0 {
            state.particles.velocities[i] = Vec3::ZERO;
            continue;
        }
        let mut v = (predicted[i] - p.truncate()) / h;
        let n = contact_normals[i];
        if friction > 0.0 && n != Vec3::ZERO {
            let vn = n * v.dot(n);
            v = vn + (v - vn) * (1.0 - friction);
        }
        state.particles.velocities[i] = clamp_length(v, max_speed);
        state.particles.positions[i] = predicted[i].extend(p.w);
    }
}

fn solve_springs(
    springs: &SpringBuffers,
    positions: &[Vec4],
    active_mask: &[bool],
    predicted: &mut [Vec3],
    relax: f32,
) {
    for ((&[a, b], &rest), &stiffness) in springs
        .ids
        .iter()
        .zip(&springs.rest_lengths)
        .zip(&springs.stiffness)
    {
        let (a, b) = (a as usize, b as usize);
        if a == b || !active_mask.get(a).copied().unwrap_or(false) {
            continue;
        }
        if !active_mask.get(b).copied().unwrap_or(false) {
            continue;
        }
        let (wa, wb) = (positions[a].w, positions[b].w);
        let w = wa + wb;
        if w <= 0.0 {
            continue;
        }
        let d = predicted[a] - predicted[b];
        let len = d.length();
        if len < EPSILON {
            continue;
        }
        let c = len - rest;
        let correction = d / len * (c / w) * stiffness.clamp(0.0, 1.0) * relax;
        predicted[a] -= correction * wa;
        predicted[b] += correction * wb;
    }
}

/// Push `p` out to `offset` from the nearest triangle of `mesh`.
/// Returns the push direction on contact.
fn push_out_of_mesh(mesh: &TriangleMeshBuffers, p: &mut Vec3, offset: f32) -> Option<Vec3> {
    if !mesh.has_bounds() {
        return None;
    }
    let lower = mesh.lower - Vec3::splat(offset);
    let upper = mesh.upper + Vec3::splat(offset);
    if p.cmplt(lower).any() || p.cmpgt(upper).any() {
        return None;
    }

    let mut best: Option<(f32, Vec3, Vec3)> = None;
    for tri in &mesh.triangles {
        let [ia, ib, ic] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(&a), Some(&b), Some(&c)) =
            (mesh.vertices.get(ia), mesh.vertices.get(ib), mesh.vertices.get(ic))
        else {
            continue;
        };
        let q = closest_point_on_triangle(*p, a, b, c);
        let dist = p.distance(q);
        if dist < offset && best.map_or(true, |(d, _, _)| dist < d) {
            let face = (b - a).cross(c - a).normalize_or_zero();
            best = Some((dist, q, face));
        }
    }

    let (dist, q, face) = best?;
    let n = if dist > EPSILON { (*p - q) / dist } else { face };
    if n == Vec3::ZERO {
        return None;
    }
    *p = q + n * offset;
    Some(n)
}

/// Closest point on triangle `abc` to `p` (Ericson, Real-Time Collision Detection 5.1.5).
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

fn clamp_length(v: Vec3, max: f32) -> Vec3 {
    if max < f32::MAX {
        v.clamp_length_max(max.max(0.0))
    } else {
        v
    }
}
