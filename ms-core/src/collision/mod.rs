//! Collision detection and resolution.
//!
//! This module handles:
//! - **Detection**: ground crossings with a sub-step time of impact, and
//!   end-of-step sphere-sphere overlap
//! - **Resolution**: restitution bounce and settling on the ground, and
//!   an elastic impulse exchange between two particles
//!
//! ## Ground Time of Impact
//!
//! A particle that starts the step above the ground and ends it at or below
//! has crossed the plane somewhere inside the step. The crossing instant is
//! found by bisecting the kinematic path from the start-of-step state:
//!
//! ```text
//!   y(t) = y0 + v0·t + ½·a·t²       a = start-of-step acceleration
//!
//!  t=0  ●
//!        \
//!         ●  t_c
//! ═════════╳══════ ground
//!           \
//!            ●  t=dt
//! ```
//!
//! The state at `t_c` is rebuilt from the same formula rather than by
//! re-running the integrator, then handed to the resolver.
//!
//! Particle-particle contact is discrete only: fast bodies can tunnel
//! through each other within a single step.

pub mod detection;
pub mod resolution;

pub use detection::*;
pub use resolution::*;
