//! Bridge between host dynamics objects and a particle container.
//!
//! Once per timestep and per object the solver copies the object's mesh into
//! the container (only when positions changed), rebuilds spring and triangle
//! constraints from its primitives, refreshes collision proxies for related
//! objects, pushes the parameter record, ticks, and reads the particles back
//! into a fresh mesh.
//!
//! ```no_run
//! use dopbridge::{DopSolver, RelationshipTable, SimObject, ObjectId, UniformGravity};
//! use partsim::CpuContainer;
//!
//! let mut solver = DopSolver::default();
//! let mut objects = vec![SimObject::<CpuContainer>::new(ObjectId(1), "fluid")
//!     .with_force(UniformGravity::default())];
//! let relationships = RelationshipTable::new();
//! let summary = solver.solve_objects(&mut objects, &relationships, 1.0 / 24.0);
//! assert_eq!(summary.processed, 1);
//! ```

pub mod collision;
pub mod config;
pub mod constraints;
pub mod data;
pub mod error;
pub mod geometry;
pub mod index_table;
pub mod ingest;
pub mod params;
pub mod proxy_cache;
pub mod readback;
pub mod scene;
pub mod solver;
pub mod trimesh;

pub use config::{ConfigError, SolverConfig};
pub use data::SolverData;
pub use error::{SolveError, SolverWarning};
pub use geometry::{AttribOwner, DataId, Detail};
pub use index_table::ParticleIndexTable;
pub use proxy_cache::{ProxyCache, ProxyEntry};
pub use scene::{
    Collider, Force, ForceKind, ObjectId, RelationshipTable, Relationships, SimObject,
    UniformForce, UniformGravity,
};
pub use solver::{DopSolver, SolveSummary};
