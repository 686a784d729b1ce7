//! Collision proxy geometry from a detail.

use glam::Vec3;
use partsim::TriangleMeshBuffers;

use crate::geometry::Detail;

/// Exact bounds of `points` as `(lower, upper)`.
///
/// Empty input leaves `lower = +MAX` and `upper = -MAX`.
pub fn bounds(points: &[Vec3]) -> (Vec3, Vec3) {
    points.iter().fold(
        (Vec3::splat(f32::MAX), Vec3::splat(-f32::MAX)),
        |(lower, upper), &p| (lower.min(p), upper.max(p)),
    )
}

/// Triangles produced by fan-triangulating every primitive of `detail`.
pub fn fan_triangle_count(detail: &Detail) -> usize {
    (0..detail.primitive_count())
        .map(|prim| detail.primitive_vertex_count(prim).saturating_sub(2))
        .sum()
}

/// Fan-triangulate `points` around its first entry with reversed winding.
///
/// For `p0, p1, .., pn` this emits `(p0, p2, p1), (p0, p3, p2), ..`.
pub fn fan_triangulate(points: &[u32], out: &mut Vec<[u32; 3]>) {
    let Some((&anchor, rest)) = points.split_first() else {
        return;
    };
    out.extend(rest.windows(2).map(|w| [anchor, w[1], w[0]]));
}

/// Rebuild `mesh` from the points and primitives of `detail`.
pub fn write_proxy(detail: &Detail, mesh: &mut TriangleMeshBuffers) {
    let positions = detail.positions();
    mesh.set_vertex_count(positions.len());
    mesh.vertices.copy_from_slice(positions);

    let (lower, upper) = bounds(positions);
    mesh.lower = lower;
    mesh.upper = upper;

    mesh.triangles.clear();
    mesh.triangles.reserve(fan_triangle_count(detail));
    for prim in 0..detail.primitive_count() {
        fan_triangulate(detail.primitive_points(prim), &mut mesh.triangles);
    }
}
