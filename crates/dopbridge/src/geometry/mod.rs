//! Host mesh representation.
//!
//! A [`Detail`] is what a simulated object carries between timesteps: points,
//! primitives and typed attributes, each attribute stamped with a [`DataId`].

mod attribute;
mod detail;

pub use attribute::{AttribData, AttribOwner, AttribType, Attribute, DataId, Values};
pub use detail::{Detail, POSITION};

/// Attribute names shared with the host.
pub mod names {
    /// Point velocity (vector)
    pub const VELOCITY: &str = "v";
    /// Engine slot a point was read back from (int)
    pub const INSTANCE_ID: &str = "iid";
    /// Particle phase tag (int)
    pub const PHASE: &str = "phs";
    /// Inverse mass (float)
    pub const INVERSE_MASS: &str = "imass";
    /// Rest position (vector)
    pub const REST_POSITION: &str = "restP";
    /// Normal on point, vertex or primitive (vector)
    pub const NORMAL: &str = "N";
    /// Spring rest length, per primitive (float)
    pub const REST_LENGTH: &str = "restlength";
    /// Spring stiffness, per primitive (float)
    pub const STRENGTH: &str = "strength";
}
