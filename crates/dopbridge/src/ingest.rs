//! Copy a detail into the particle container.

use glam::Vec3;
use partsim::Container;

use crate::config::SolverConfig;
use crate::constraints::{self, ConstraintCounts, ConstraintSignature};
use crate::data::SolverData;
use crate::error::{SolveError, SolverWarning};
use crate::geometry::{names, AttribOwner, AttribType, Detail, POSITION};
use crate::index_table::Reconcile;

/// What happened to the constraint buffers during an ingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintUpdate {
    /// The detail has no primitives.
    NoPrimitives,
    /// `restlength` or `strength` is missing; device buffers left as they were.
    Disabled,
    /// Topology and constraint attributes unchanged since the last rebuild.
    Unchanged,
    Rebuilt(ConstraintCounts),
    /// All primitives are gone; device buffers emptied.
    Cleared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Positions are as last read back; nothing was written.
    Unchanged,
    Ingested {
        points: usize,
        reconcile: Reconcile,
        constraints: ConstraintUpdate,
    },
}

fn point_attribute<'a, T: AttribType>(
    detail: &'a Detail,
    name: &'static str,
) -> Result<&'a [T], SolveError> {
    detail
        .find_attribute(AttribOwner::Point, name)
        .ok_or(SolveError::MissingAttribute {
            owner: AttribOwner::Point,
            name,
        })
}

/// Write `detail` into the container of `data` and queue the uploads.
///
/// Skipped when the position data id matches the last readback. Missing
/// required point attributes fail before anything is allocated.
pub fn ingest<C: Container>(
    data: &mut SolverData<C>,
    detail: &Detail,
    config: &SolverConfig,
    warnings: &mut Vec<SolverWarning>,
) -> Result<IngestOutcome, SolveError> {
    let stamp = detail.position_data_id();
    if data.last_position_stamp == Some(stamp) {
        log::debug!("Positions unchanged (data id {}), skipping ingest", stamp);
        return Ok(IngestOutcome::Unchanged);
    }

    let positions = point_attribute::<Vec3>(detail, POSITION)?;
    let velocities = point_attribute::<Vec3>(detail, names::VELOCITY)?;
    point_attribute::<i32>(detail, names::INSTANCE_ID)?;
    let phases = point_attribute::<i32>(detail, names::PHASE)?;
    let inverse_masses = point_attribute::<f32>(detail, names::INVERSE_MASS)?;
    let rest_positions = detail.find_attribute::<Vec3>(AttribOwner::Point, names::REST_POSITION);

    let points = detail.point_count();
    let reconcile = data.index_table.reconcile(&mut data.container, points)?;
    if reconcile != Reconcile::Unchanged {
        log::debug!("Particle count reconciled to {}: {:?}", points, reconcile);
    }

    {
        let mut particles = data.container.map_particles();
        let capacity = particles.capacity();
        let slots = data.index_table.slots();
        for point in 0..points {
            // Never write past the active list.
            let Some(&slot) = slots.get(point) else {
                break;
            };
            let i = slot as usize;
            if i >= capacity {
                break;
            }
            particles.positions[i] = positions[point].extend(inverse_masses[point]);
            particles.velocities[i] = velocities[point];
            particles.phases[i] = phases[point];
            if let Some(rest) = rest_positions {
                particles.rest_positions[i] = rest[point].extend(1.0);
            }
        }
    }
    // Queued before constraint building so the upload overlaps it.
    data.container.push_particles();

    let constraints = update_constraints(data, detail, config, warnings);
    Ok(IngestOutcome::Ingested {
        points,
        reconcile,
        constraints,
    })
}

fn update_constraints<C: Container>(
    data: &mut SolverData<C>,
    detail: &Detail,
    config: &SolverConfig,
    warnings: &mut Vec<SolverWarning>,
) -> ConstraintUpdate {
    if detail.primitive_count() == 0 {
        if data.constraint_signature.take().is_none() {
            return ConstraintUpdate::NoPrimitives;
        }
        data.container.resize_springs(0);
        data.container.resize_triangles(0);
        data.container.push_springs();
        data.container.push_triangles(false);
        return ConstraintUpdate::Cleared;
    }

    let signature = ConstraintSignature::of(detail, &data.index_table);
    if config.skip_unchanged_constraints && data.constraint_signature == Some(signature) {
        log::debug!("Constraint inputs unchanged, skipping rebuild");
        return ConstraintUpdate::Unchanged;
    }

    match constraints::build_constraints(detail, &data.index_table, &mut data.container, warnings)
    {
        Some(counts) => {
            data.constraint_signature = Some(signature);
            ConstraintUpdate::Rebuilt(counts)
        }
        None => ConstraintUpdate::Disabled,
    }
}
