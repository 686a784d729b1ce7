//! Per-object failures and the warnings they become.

use partsim::EngineError;
use thiserror::Error;

use crate::geometry::AttribOwner;

/// Constraint kind reported on overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    Spring,
    Triangle,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintKind::Spring => f.write_str("spring"),
            ConstraintKind::Triangle => f.write_str("triangle"),
        }
    }
}

/// Failure of one stage for one object.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// The container cannot be used this tick.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(#[from] EngineError),

    /// A required attribute is missing or has the wrong type.
    #[error("missing {owner} attribute '{name}'")]
    MissingAttribute {
        owner: AttribOwner,
        name: &'static str,
    },

    /// More constraints than the engine can index.
    #[error("{count} {kind} constraints exceed the engine limit")]
    ConstraintOverflow { kind: ConstraintKind, count: usize },
}

/// Non-fatal condition attached to an object after a tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverWarning {
    #[error(
        "particle container is in an invalid state (maybe insufficient resources): {0}. \
         Try resetting the simulation."
    )]
    EngineUnavailable(EngineError),

    #[error("missing {owner} attribute '{name}', geometry was not copied to the engine")]
    MissingAttribute {
        owner: AttribOwner,
        name: &'static str,
    },

    #[error("{count} {kind} constraints clamped to {limit}")]
    ConstraintsClamped {
        kind: ConstraintKind,
        count: usize,
        limit: usize,
    },

    #[error("active particle count {active} differs from point count {points}, points rebuilt")]
    StructuralRebuild { active: usize, points: usize },
}

impl From<SolveError> for SolverWarning {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::EngineUnavailable(e) => SolverWarning::EngineUnavailable(e),
            SolveError::MissingAttribute { owner, name } => {
                SolverWarning::MissingAttribute { owner, name }
            }
            SolveError::ConstraintOverflow { kind, count } => SolverWarning::ConstraintsClamped {
                kind,
                count,
                limit: crate::constraints::MAX_CONSTRAINTS,
            },
        }
    }
}
