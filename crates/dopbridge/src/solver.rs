//! Per-timestep orchestration over every simulated object.
//!
//! Each object goes through the same sequence, with no retry inside a tick:
//!
//! ```text
//! validate ─► ingest ─► collision update ─► parameter sync ─► tick ─► readback
//! ```
//!
//! A failure is contained to the object it happened on and recorded as a
//! warning on that object. [`DopSolver::solve_objects`] itself never fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use partsim::{Container, EngineError, SolverParams};

use crate::collision;
use crate::config::SolverConfig;
use crate::data::SolverData;
use crate::error::{SolveError, SolverWarning};
use crate::geometry::Detail;
use crate::ingest::{self, IngestOutcome};
use crate::params;
use crate::readback;
use crate::scene::{Collider, ObjectId, Relationships, SimObject};

/// Counts for one call to [`DopSolver::solve_objects`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolveSummary {
    /// Objects that went through every stage
    pub processed: usize,
    /// Objects abandoned part way
    pub skipped: usize,
    /// Objects carrying at least one warning
    pub warned: usize,
}

/// Drives particle containers from host objects.
#[derive(Clone, Debug)]
pub struct DopSolver {
    config: SolverConfig,
    params: SolverParams,
}

impl Default for DopSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl DopSolver {
    pub fn new(config: SolverConfig) -> Self {
        let mut solver = Self {
            config: SolverConfig::default(),
            params: SolverParams::default(),
        };
        solver.set_config(config);
        solver
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replace the configuration. Out-of-range fields are clamped.
    pub fn set_config(&mut self, config: SolverConfig) {
        if let Err(e) = config.validate() {
            log::warn!("{}, clamping", e);
        }
        self.config = config.clamped();
        self.initialize();
    }

    /// The parameter record last pushed to a container.
    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Rebuild the parameter record from the configuration, without gravity.
    pub fn initialize(&mut self) {
        self.params = params::build_params(&self.config, Vec3::ZERO);
    }

    /// Copy configuration and parameter record from `other`.
    pub fn make_equal(&mut self, other: &DopSolver) {
        self.config = other.config.clone();
        self.params = other.params.clone();
    }

    /// Advance every object in `objects` by `timestep`.
    pub fn solve_objects<C: Container>(
        &mut self,
        objects: &mut [SimObject<C>],
        relationships: &dyn Relationships,
        timestep: f32,
    ) -> SolveSummary {
        let geometries: BTreeMap<ObjectId, Option<Arc<Detail>>> = objects
            .iter()
            .map(|o| (o.id, o.geometry.clone()))
            .collect();

        let mut summary = SolveSummary::default();
        for object in objects.iter_mut() {
            object.warnings.clear();

            let colliders: Vec<Collider> = relationships
                .colliders(object.id)
                .into_iter()
                .map(|id| Collider {
                    id,
                    geometry: geometries
                        .get(&id)
                        .cloned()
                        .flatten()
                        .or_else(|| relationships.static_geometry(id)),
                })
                .collect();

            match self.solve_object(object, &colliders, timestep) {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    summary.skipped += 1;
                    object.warnings.push(err.into());
                }
            }

            for warning in &object.warnings {
                match warning {
                    // Expected after a point count change; readback logs it.
                    SolverWarning::StructuralRebuild { .. } => {}
                    _ => log::warn!("{}: {}", object.name, warning),
                }
            }
            if !object.warnings.is_empty() {
                summary.warned += 1;
            }
        }
        summary
    }

    fn solve_object<C: Container>(
        &mut self,
        object: &mut SimObject<C>,
        colliders: &[Collider],
        timestep: f32,
    ) -> Result<(), SolveError> {
        let config = &self.config;
        let data = object
            .solver_data
            .get_or_insert_with(|| SolverData::new(config.max_particles));
        if !data.is_valid() {
            return Err(SolveError::EngineUnavailable(EngineError::DeviceLost));
        }
        let warnings = &mut object.warnings;

        if let Some(geometry) = object.geometry.as_deref() {
            match ingest::ingest(data, geometry, config, warnings) {
                Ok(IngestOutcome::Unchanged) => {}
                Ok(IngestOutcome::Ingested {
                    points,
                    constraints,
                    ..
                }) => {
                    log::debug!(
                        "{}: ingested {} points, constraints {:?}",
                        object.name,
                        points,
                        constraints
                    );
                }
                // Only the geometry copy is lost; the object still ticks.
                Err(err @ SolveError::MissingAttribute { .. }) => warnings.push(err.into()),
                Err(err) => return Err(err),
            }
        }

        let report = collision::update_collision(data, object.id, colliders, config)?;
        if report.rebuilt > 0 || report.evicted > 0 {
            log::debug!(
                "{}: {} proxies rebuilt, {} evicted, {} bound",
                object.name,
                report.rebuilt,
                report.evicted,
                report.bound
            );
        }

        let params = params::build_params(config, params::gravity(&object.forces));
        data.container.set_params(&params);
        data.container.tick(timestep, config.substeps);

        let (geometry, _) = readback::readback(data, object.geometry.as_deref(), warnings)?;
        object.geometry = Some(Arc::new(geometry));
        self.params = params;
        Ok(())
    }
}
