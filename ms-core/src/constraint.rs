//! Links between particles: springs, ropes, and the ground plane.
//!
//! Constraints refer to particles by [`ParticleId`] into the world arena,
//! never by reference, so a spring between two bodies is just a pair of
//! indices.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::types::{constants, ParticleId, Vec3};

/// The far end of a spring or rope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// A point fixed in world space.
    Fixed(Vec3),
    /// Another particle in the same world.
    Particle(ParticleId),
}

impl Anchor {
    pub fn particle(&self) -> Option<ParticleId> {
        match self {
            Anchor::Fixed(_) => None,
            Anchor::Particle(id) => Some(*id),
        }
    }
}

/// Hookean spring-damper between a particle and an anchor.
///
/// Force on `particle` is `-k·(|Δ| - ℓ₀)·Δ̂ - c·Δv` with `Δ = particle - anchor`.
/// When the anchor is a particle it receives the opposite force.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub particle: ParticleId,
    pub anchor: Anchor,
    pub rest_length: f64,
    pub stiffness: f64,
    pub damping: f64,
}

impl Spring {
    /// # Errors
    /// Rejects negative rest length, non-positive stiffness, negative damping,
    /// and a spring from a particle to itself.
    pub fn new(
        particle: ParticleId,
        anchor: Anchor,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
    ) -> PhysicsResult<Self> {
        if !(rest_length.is_finite() && rest_length >= 0.0) {
            return Err(PhysicsError::InvalidRestLength(rest_length));
        }
        if !(stiffness.is_finite() && stiffness > 0.0) {
            return Err(PhysicsError::InvalidStiffness(stiffness));
        }
        if !(damping.is_finite() && damping >= 0.0) {
            return Err(PhysicsError::InvalidDamping(damping));
        }
        if anchor.particle() == Some(particle) {
            return Err(PhysicsError::DegenerateConstraint(particle));
        }
        Ok(Self {
            particle,
            anchor,
            rest_length,
            stiffness,
            damping,
        })
    }

    /// Spring between two particles.
    pub fn between(
        a: ParticleId,
        b: ParticleId,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
    ) -> PhysicsResult<Self> {
        Self::new(a, Anchor::Particle(b), rest_length, stiffness, damping)
    }

    /// Spring from a particle to a fixed point.
    pub fn anchored(
        particle: ParticleId,
        anchor: Vec3,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
    ) -> PhysicsResult<Self> {
        Self::new(particle, Anchor::Fixed(anchor), rest_length, stiffness, damping)
    }
}

/// Inextensible-ish rope of maximum length `length`.
///
/// Two corrections act on the same limit. A soft pull toward the anchor,
/// proportional to `measured_length - length`, is part of the force model;
/// after integration a hard clamp projects the particle back onto the sphere
/// of radius `length` whenever it ends up further away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rope {
    pub particle: ParticleId,
    pub anchor: Anchor,
    pub length: f64,
    pub tension_scale: f64,
    /// Anchor distance measured by the last clamp pass; feeds the soft pull.
    pub measured_length: f64,
}

impl Rope {
    /// # Errors
    /// Rejects non-positive length and a rope from a particle to itself.
    pub fn new(particle: ParticleId, anchor: Anchor, length: f64) -> PhysicsResult<Self> {
        if !(length.is_finite() && length > 0.0) {
            return Err(PhysicsError::InvalidRopeLength(length));
        }
        if anchor.particle() == Some(particle) {
            return Err(PhysicsError::DegenerateConstraint(particle));
        }
        Ok(Self {
            particle,
            anchor,
            length,
            tension_scale: constants::ROPE_TENSION_SCALE,
            measured_length: length,
        })
    }

    pub fn with_tension_scale(mut self, tension_scale: f64) -> Self {
        self.tension_scale = tension_scale;
        self
    }

    /// Project `pos` back inside the rope sphere around `anchor`.
    ///
    /// Records the pre-clamp distance in `measured_length` and returns the
    /// corrected position, or `None` when the rope is slack.
    pub fn clamp(&mut self, pos: Vec3, anchor: Vec3) -> Option<Vec3> {
        self.measured_length = pos.distance(&anchor);
        self.project(pos, anchor)
    }

    /// Same projection as [`Rope::clamp`] without touching `measured_length`.
    pub fn project(&self, pos: Vec3, anchor: Vec3) -> Option<Vec3> {
        let to_anchor = anchor - pos;
        if to_anchor.magnitude() <= self.length {
            return None;
        }
        Some(anchor - to_anchor.normalized() * self.length)
    }
}

/// Any link the world knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    Spring(Spring),
    Rope(Rope),
}

impl Constraint {
    /// Particles this constraint reads or writes.
    pub fn particles(&self) -> (ParticleId, Option<ParticleId>) {
        match self {
            Constraint::Spring(s) => (s.particle, s.anchor.particle()),
            Constraint::Rope(r) => (r.particle, r.anchor.particle()),
        }
    }
}

impl From<Spring> for Constraint {
    fn from(spring: Spring) -> Self {
        Constraint::Spring(spring)
    }
}

impl From<Rope> for Constraint {
    fn from(rope: Rope) -> Self {
        Constraint::Rope(rope)
    }
}

/// Infinite horizontal ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundPlane {
    pub enabled: bool,
    pub height: f64,
    /// Combined with each particle's restitution by taking the minimum.
    pub restitution: f64,
}

impl GroundPlane {
    pub fn normal(&self) -> Vec3 {
        Vec3::UP
    }
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self {
            enabled: true,
            height: 0.0,
            restitution: 1.0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
