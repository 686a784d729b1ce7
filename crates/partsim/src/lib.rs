//! Particle container used as the simulation backend of the dynamics bridge.
//!
//! The surface mirrors a GPU particle engine: slots are allocated from a free
//! list, buffers are written through scoped map guards and pushed to a device
//! asynchronously, and results come back through a single blocking pull.
//! [`CpuContainer`] implements it with a worker thread standing in for the
//! device and a small position-based solver.

pub mod buffers;
pub mod collision;
pub mod container;
pub mod device;
pub mod error;
pub mod params;
pub mod slots;
pub mod solver;

pub use buffers::{Mapped, ParticleBuffers, SpringBuffers, TriangleBuffers, TriangleMeshBuffers};
pub use collision::ProxyId;
pub use container::{Container, ContainerStats, CpuContainer};
pub use error::EngineError;
pub use params::{RelaxationMode, SolverParams, MAX_PLANES};
