//! Collision response.
//!
//! ## Model Assumptions
//!
//! - **Ground as infinite mass**: the plane never moves; only the vertical
//!   velocity component is touched by a bounce.
//! - **Elastic pairs**: particle-particle impulses ignore restitution and
//!   always conserve kinetic energy along the contact normal.
//! - **Instantaneous contact**: responses are velocity jumps plus a position
//!   snap, with no contact duration.

use crate::collision::detection::SphereContact;
use crate::types::{PointState, Vec3};

/// Outcome of a particle-particle response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairResponse {
    /// Scalar impulse `2·(v_rel·n) / (m_A + m_B)`.
    pub impulse: f64,
    pub a: PointState,
    pub b: PointState,
}

/// Collision resolver for ground and particle contacts.
pub struct CollisionResolver;

impl CollisionResolver {
    /// Snap onto the plane and reflect the vertical velocity.
    ///
    /// `v.y' = -e·v.y`; horizontal velocity is untouched.
    pub fn bounce(state: &PointState, restitution: f64, height: f64) -> PointState {
        let mut pos = state.pos;
        pos.y = height;
        let mut vel = state.vel;
        vel.y = -restitution * vel.y;
        PointState { pos, vel }
    }

    /// Snap onto the plane and stop dead.
    pub fn settle(state: &PointState, height: f64) -> PointState {
        let mut pos = state.pos;
        pos.y = height;
        PointState {
            pos,
            vel: Vec3::ZERO,
        }
    }

    /// Elastic impulse exchange between two overlapping spheres.
    ///
    /// The contact normal points from B toward A. Returns `None` when the
    /// pair is separating, at rest relative to each other, or has no usable
    /// normal; otherwise the new states, with both bodies pushed apart by
    /// half the penetration each.
    pub fn resolve_pair(
        a: &PointState,
        mass_a: f64,
        b: &PointState,
        mass_b: f64,
        contact: &SphereContact,
    ) -> Option<PairResponse> {
        let n = contact.normal;
        let approach = (a.vel - b.vel).dot(&n);
        if approach >= 0.0 {
            return None;
        }

        let j = 2.0 * approach / (mass_a + mass_b);
        let correction = n * (contact.penetration * 0.5);

        Some(PairResponse {
            impulse: j,
            a: PointState {
                pos: a.pos + correction,
                vel: a.vel - n * (j * mass_b),
            },
            b: PointState {
                pos: b.pos - correction,
                vel: b.vel + n * (j * mass_a),
            },
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
