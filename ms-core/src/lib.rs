//! # MS Core
//!
//! A fixed-timestep physics kernel for particles joined by springs and
//! ropes, bouncing off a ground plane and off each other.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec3, point state, particles, events)
//! - `error`: Construction-time validation errors
//! - `integrator`: Numerical integration (Euler, RK4, Verlet)
//! - `forces`: Gravity, drag, ramp, springs and rope tension
//! - `constraint`: Springs, ropes and the ground plane
//! - `collision`: Ground time of impact, sphere overlap, impulse response
//! - `broadphase`: Sweep-and-prune over 1-D intervals
//! - `world`: Particle arena and tick orchestrator
//! - `scenario`: YAML scenario loader
//!
//! ## Example
//!
//! ```
//! use ms_core::{Particle, Vec3, World};
//!
//! let mut world = World::default();
//! let ball = Particle::new(Vec3::new(0.0, 10.0, 0.0), 1.0, 1.0).unwrap();
//! let ball = world.add_particle(ball).unwrap();
//!
//! for _ in 0..100 {
//!     world.tick();
//! }
//! assert!(world.particle(ball).unwrap().pos().y >= 0.0);
//! ```

pub mod broadphase;
pub mod collision;
pub mod constraint;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod scenario;
pub mod types;
pub mod world;

pub use broadphase::{find_overlaps_brute_force, Axis, Interval, OverlapPair, SweepAndPrune};
pub use constraint::{Anchor, Constraint, GroundPlane, Rope, Spring};
pub use error::{PhysicsError, PhysicsResult};
pub use integrator::{IntegrationMethod, Integrator};
pub use scenario::{ScenarioConfig, ScenarioError, ScenarioLoader};
pub use types::{
    CollisionEvent, CollisionTarget, Friction, GroundResponse, Particle, ParticleId, PointState,
    Vec3,
};
pub use world::{SimulationConfig, StepReport, World};
