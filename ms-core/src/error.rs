//! Error types for physics configuration.
//!
//! Everything here is a construction-time rejection. Once a world is built,
//! ticking it cannot fail.

use thiserror::Error;

use crate::types::ParticleId;

/// Result type for physics construction.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// Invalid parameters passed to a physics constructor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("mass must be positive and finite, got {0}")]
    InvalidMass(f64),

    #[error("radius must be non-negative, got {0}")]
    InvalidRadius(f64),

    #[error("restitution must be in [0, 1], got {0}")]
    InvalidRestitution(f64),

    #[error("friction coefficient must be non-negative, got {0}")]
    InvalidFriction(f64),

    #[error("spring stiffness must be positive, got {0}")]
    InvalidStiffness(f64),

    #[error("damping must be non-negative, got {0}")]
    InvalidDamping(f64),

    #[error("rest length must be non-negative, got {0}")]
    InvalidRestLength(f64),

    #[error("rope length must be positive, got {0}")]
    InvalidRopeLength(f64),

    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error("bisection tolerance must be positive, got {0}")]
    InvalidTolerance(f64),

    #[error("interval start {start} is after end {end}")]
    InvalidInterval { start: f64, end: f64 },

    #[error("particle {id} does not exist (world has {count})")]
    UnknownParticle { id: ParticleId, count: usize },

    #[error("constraint endpoints must differ, both are particle {0}")]
    DegenerateConstraint(ParticleId),
}
