//! Copy simulated particles back into a new detail.

use glam::Vec3;
use partsim::Container;

use crate::data::SolverData;
use crate::error::{SolveError, SolverWarning};
use crate::geometry::{names, AttribOwner, Detail};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadbackReport {
    pub points: usize,
    /// The point block was recreated because the active count changed.
    pub rebuilt: bool,
}

/// Wait for the device, then build the output detail from `input`.
///
/// Positions, `v`, `iid` and `phs` come from the container; everything else
/// is carried over from `input`. The new position data id is remembered so
/// the next ingest of this output is skipped.
pub fn readback<C: Container>(
    data: &mut SolverData<C>,
    input: Option<&Detail>,
    warnings: &mut Vec<SolverWarning>,
) -> Result<(Detail, ReadbackReport), SolveError> {
    data.container.pull_from_device()?;
    let active = data.index_table.refresh(&data.container);

    let mut out = input.cloned().unwrap_or_default();
    let rebuilt = active != out.point_count();
    if rebuilt {
        log::debug!(
            "Active particles {} != points {}, rebuilding point block",
            active,
            out.point_count()
        );
        warnings.push(SolverWarning::StructuralRebuild {
            active,
            points: out.point_count(),
        });
        out.reset_points(active);
    }

    {
        let particles = data.container.map_particles();
        let slots = data.index_table.slots();

        for (dst, &slot) in out.positions_mut().iter_mut().zip(slots) {
            *dst = particles.positions[slot as usize].truncate();
        }
        let velocities = out.add_attribute(AttribOwner::Point, names::VELOCITY, Vec3::ZERO);
        for (dst, &slot) in velocities.iter_mut().zip(slots) {
            *dst = particles.velocities[slot as usize];
        }
        let ids = out.add_attribute(AttribOwner::Point, names::INSTANCE_ID, -1i32);
        for (dst, &slot) in ids.iter_mut().zip(slots) {
            *dst = instance_id(slot);
        }
        let phases = out.add_attribute(AttribOwner::Point, names::PHASE, 0i32);
        for (dst, &slot) in phases.iter_mut().zip(slots) {
            *dst = particles.phases[slot as usize];
        }
    }

    out.bump_all_data_ids();
    data.last_position_stamp = Some(out.position_data_id());

    Ok((
        out,
        ReadbackReport {
            points: active,
            rebuilt,
        },
    ))
}

/// `iid` value for `slot`, -1 when the slot does not fit an int.
fn instance_id(slot: u32) -> i32 {
    i32::try_from(slot).unwrap_or(-1)
}
