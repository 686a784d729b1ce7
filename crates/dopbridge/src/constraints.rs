//! Spring and triangle constraints from mesh topology.
//!
//! Every 2-vertex primitive becomes a spring and every 3-vertex primitive a
//! triangle. Both need the `restlength` and `strength` primitive attributes;
//! without them nothing is rebuilt. Other primitives are ignored.

use glam::Vec3;
use partsim::Container;

use crate::error::{ConstraintKind, SolveError, SolverWarning};
use crate::geometry::{names, AttribOwner, DataId, Detail};
use crate::index_table::ParticleIndexTable;

/// Largest constraint count the engine can index.
pub const MAX_CONSTRAINTS: usize = i32::MAX as usize;

/// Where triangle normals come from, highest priority first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalSource {
    Primitive,
    Vertex,
    Point,
    None,
}

impl NormalSource {
    pub fn detect(detail: &Detail) -> Self {
        let has = move |owner| {
            detail
                .find_attribute::<Vec3>(owner, names::NORMAL)
                .is_some()
        };
        if has(AttribOwner::Primitive) {
            NormalSource::Primitive
        } else if has(AttribOwner::Vertex) {
            NormalSource::Vertex
        } else if has(AttribOwner::Point) {
            NormalSource::Point
        } else {
            NormalSource::None
        }
    }
}

/// Constraints written by one rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConstraintCounts {
    pub springs: usize,
    pub triangles: usize,
    pub normals: bool,
}

/// Everything a constraint rebuild reads. Equal signatures produce equal
/// constraint buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstraintSignature {
    topology: DataId,
    rest_length: Option<DataId>,
    strength: Option<DataId>,
    normals: [Option<DataId>; 3],
    table_generation: u64,
}

impl ConstraintSignature {
    pub fn of(detail: &Detail, table: &ParticleIndexTable) -> Self {
        let id = move |owner, name: &str| detail.attribute_data_id(owner, name);
        Self {
            topology: detail.topology_data_id(),
            rest_length: id(AttribOwner::Primitive, names::REST_LENGTH),
            strength: id(AttribOwner::Primitive, names::STRENGTH),
            normals: [
                id(AttribOwner::Primitive, names::NORMAL),
                id(AttribOwner::Vertex, names::NORMAL),
                id(AttribOwner::Point, names::NORMAL),
            ],
            table_generation: table.generation(),
        }
    }
}

/// Rebuild and push the spring and triangle buffers of `container`.
///
/// Returns `None` without touching the container when `restlength` or
/// `strength` is missing, with a warning per missing attribute.
pub fn build_constraints<C: Container>(
    detail: &Detail,
    table: &ParticleIndexTable,
    container: &mut C,
    warnings: &mut Vec<SolverWarning>,
) -> Option<ConstraintCounts> {
    let rest_lengths = detail.find_attribute::<f32>(AttribOwner::Primitive, names::REST_LENGTH);
    let strengths = detail.find_attribute::<f32>(AttribOwner::Primitive, names::STRENGTH);
    let (Some(rest_lengths), Some(strengths)) = (rest_lengths, strengths) else {
        for (name, found) in [
            (names::REST_LENGTH, rest_lengths.is_some()),
            (names::STRENGTH, strengths.is_some()),
        ] {
            if !found {
                warnings.push(SolverWarning::MissingAttribute {
                    owner: AttribOwner::Primitive,
                    name,
                });
            }
        }
        return None;
    };

    let primitives = detail.primitive_count();
    let source = NormalSource::detect(detail);

    // Sized to the upper bound, trimmed to the exact count afterwards.
    container.resize_springs(primitives);
    let mut springs = 0;
    {
        let mut buf = container.map_springs();
        for prim in 0..primitives {
            let &[a, b] = detail.primitive_points(prim) else {
                continue;
            };
            let (Some(a), Some(b)) = (table.get(a as usize), table.get(b as usize)) else {
                continue;
            };
            buf.ids[springs] = [a, b];
            buf.rest_lengths[springs] = rest_lengths[prim];
            buf.stiffness[springs] = strengths[prim];
            springs += 1;
        }
    }
    let springs = clamp_count(ConstraintKind::Spring, springs, warnings);
    container.resize_springs(springs);

    container.resize_triangles(primitives);
    let mut triangles = 0;
    {
        let mut buf = container.map_triangles();
        for prim in 0..primitives {
            let &[a, b, c] = detail.primitive_points(prim) else {
                continue;
            };
            let slots = (
                table.get(a as usize),
                table.get(b as usize),
                table.get(c as usize),
            );
            let (Some(a), Some(b), Some(c)) = slots else {
                continue;
            };
            buf.ids[triangles] = [a, c, b];
            buf.normals[triangles] = triangle_normal(detail, prim, source);
            triangles += 1;
        }
    }
    let triangles = clamp_count(ConstraintKind::Triangle, triangles, warnings);
    container.resize_triangles(triangles);

    let normals = source != NormalSource::None;
    container.push_springs();
    container.push_triangles(normals);

    Some(ConstraintCounts {
        springs,
        triangles,
        normals,
    })
}

/// Normal of 3-vertex primitive `prim` taken from `source`.
pub fn triangle_normal(detail: &Detail, prim: usize, source: NormalSource) -> Vec3 {
    let normal = move |owner| detail.find_attribute::<Vec3>(owner, names::NORMAL);
    match source {
        NormalSource::Primitive => normal(AttribOwner::Primitive)
            .and_then(|n| n.get(prim).copied())
            .unwrap_or(Vec3::ZERO),
        NormalSource::Vertex => normal(AttribOwner::Vertex)
            .map(|n| {
                detail
                    .primitive_vertices(prim)
                    .map(|v| n[v])
                    .sum::<Vec3>()
                    .normalize_or_zero()
            })
            .unwrap_or(Vec3::ZERO),
        NormalSource::Point => normal(AttribOwner::Point)
            .map(|n| {
                detail
                    .primitive_points(prim)
                    .iter()
                    .map(|&p| n[p as usize])
                    .sum::<Vec3>()
                    .normalize_or_zero()
            })
            .unwrap_or(Vec3::ZERO),
        NormalSource::None => Vec3::ZERO,
    }
}

fn clamp_count(kind: ConstraintKind, count: usize, warnings: &mut Vec<SolverWarning>) -> usize {
    if count <= MAX_CONSTRAINTS {
        return count;
    }
    warnings.push(SolveError::ConstraintOverflow { kind, count }.into());
    MAX_CONSTRAINTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use partsim::CpuContainer;

    fn strip() -> Detail {
        let mut detail = Detail::from_points(&[
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::Z,
        ]);
        detail.add_primitive(&[0, 1, 2]);
        detail.add_primitive(&[0, 2, 3]);
        detail.add_primitive(&[1, 3]);
        detail.add_primitive(&[0, 1, 2, 3]);
        detail.add_attribute(AttribOwner::Primitive, names::REST_LENGTH, 1.0f32);
        detail.add_attribute(AttribOwner::Primitive, names::STRENGTH, 0.5f32);
        detail
    }

    fn container_for(detail: &Detail) -> (CpuContainer, ParticleIndexTable) {
        let mut container = CpuContainer::new(16);
        let mut table = ParticleIndexTable::new();
        table
            .reconcile(&mut container, detail.point_count())
            .unwrap();
        (container, table)
    }

    #[test]
    fn test_springs_and_triangles_by_vertex_count() {
        let detail = strip();
        let (mut container, table) = container_for(&detail);
        let mut warnings = Vec::new();

        let counts = build_constraints(&detail, &table, &mut container, &mut warnings).unwrap();
        assert_eq!(counts.springs, 1);
        assert_eq!(counts.triangles, 2);
        assert!(!counts.normals);
        assert!(warnings.is_empty());

        let springs = container.springs();
        assert_eq!(springs.ids, vec![[1, 3]]);
        assert_eq!(springs.rest_lengths, vec![1.0]);
        assert_eq!(springs.stiffness, vec![0.5]);
        assert_eq!(container.triangles().ids, vec![[0, 2, 1], [0, 3, 2]]);
        assert_eq!(container.stats().spring_pushes, 1);
        assert_eq!(container.stats().triangle_pushes, 1);
    }

    #[test]
    fn test_missing_strength_disables_rebuild() {
        let mut detail = strip();
        detail.remove_attribute(AttribOwner::Primitive, names::STRENGTH);
        let (mut container, table) = container_for(&detail);

        let mut warnings = Vec::new();
        let counts = build_constraints(&detail, &table, &mut container, &mut warnings);
        assert!(counts.is_none());
        assert_eq!(
            warnings,
            vec![SolverWarning::MissingAttribute {
                owner: AttribOwner::Primitive,
                name: names::STRENGTH,
            }]
        );
        assert_eq!(container.stats().spring_maps, 0);
        assert_eq!(container.stats().spring_pushes, 0);
    }

    #[test]
    fn test_primitive_normal_is_copied_verbatim() {
        let mut detail = strip();
        detail.add_attribute(AttribOwner::Primitive, names::NORMAL, Vec3::ZERO)[1] =
            Vec3::new(0.0, 2.0, 0.0);
        detail.add_attribute(AttribOwner::Point, names::NORMAL, Vec3::X);
        let (mut container, table) = container_for(&detail);

        let counts = build_constraints(&detail, &table, &mut container, &mut Vec::new()).unwrap();
        assert!(counts.normals);
        assert_eq!(container.triangles().normals[1], Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_vertex_normals_beat_point_normals() {
        let mut detail = strip();
        detail.add_attribute(AttribOwner::Point, names::NORMAL, Vec3::X);
        let vertex_n = detail.add_attribute(AttribOwner::Vertex, names::NORMAL, Vec3::Y);
        vertex_n[0] = Vec3::Z;

        assert_eq!(NormalSource::detect(&detail), NormalSource::Vertex);
        let n = triangle_normal(&detail, 0, NormalSource::Vertex);
        assert!((n - Vec3::new(0.0, 2.0, 1.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_point_normals_are_averaged() {
        let mut detail = strip();
        let point_n = detail.add_attribute(AttribOwner::Point, names::NORMAL, Vec3::Y);
        point_n[2] = Vec3::X;

        assert_eq!(NormalSource::detect(&detail), NormalSource::Point);
        let n = triangle_normal(&detail, 0, NormalSource::Point);
        assert!((n - Vec3::new(1.0, 2.0, 0.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_signature_tracks_constraint_inputs() {
        let mut detail = strip();
        let table = ParticleIndexTable::new();
        let before = ConstraintSignature::of(&detail, &table);
        assert_eq!(before, ConstraintSignature::of(&detail, &table));

        detail.set_position(0, Vec3::ONE);
        assert_eq!(before, ConstraintSignature::of(&detail, &table));

        detail
            .find_attribute_mut::<f32>(AttribOwner::Primitive, names::REST_LENGTH)
            .unwrap()[0] = 2.0;
        assert_ne!(before, ConstraintSignature::of(&detail, &table));
    }

    #[test]
    fn test_capacity_survives_shrink() {
        let detail = strip();
        let (mut container, table) = container_for(&detail);
        build_constraints(&detail, &table, &mut container, &mut Vec::new());
        assert!(container.springs().capacity() >= detail.primitive_count());
        assert_eq!(container.springs().len(), 1);
    }
}
