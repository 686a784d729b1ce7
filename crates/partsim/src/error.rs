//! Errors reported by a particle container.

use thiserror::Error;

use crate::collision::ProxyId;

/// Failure of a container operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The slot pool cannot satisfy an allocation. Nothing was allocated.
    #[error("out of particle slots: requested {requested}, {available} available")]
    OutOfSlots { requested: usize, available: usize },

    /// A slot passed to `free_particles` is not in the active list.
    #[error("slot {0} is not active")]
    SlotNotActive(u32),

    /// The device worker is gone (panicked or disconnected).
    #[error("device lost")]
    DeviceLost,

    /// No collision proxy is registered under this id.
    #[error("unknown collision proxy {0}")]
    UnknownProxy(ProxyId),
}
