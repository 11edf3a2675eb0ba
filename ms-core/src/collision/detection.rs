//! Ground crossing and sphere overlap tests.

use crate::constraint::GroundPlane;
use crate::error::{PhysicsError, PhysicsResult};
use crate::types::{constants, PointState, Vec3};

/// A ground crossing found inside a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Time of impact measured from the start of the step.
    pub time: f64,
    /// Kinematic state at `time`, before any response.
    pub state: PointState,
    /// Depth below the plane of the end-of-step position.
    pub penetration: f64,
    /// False when the contact came from the discrete fallback.
    pub continuous: bool,
}

/// Overlap between two spheres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereContact {
    /// Unit vector from B toward A, or zero for coincident centres.
    pub normal: Vec3,
    pub distance: f64,
    /// `r_A + r_B - distance`, never negative.
    pub penetration: f64,
}

/// Collision detector for the ground plane and particle pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionDetector {
    /// Bisection stops once the bracket is narrower than this.
    pub tolerance: f64,
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self {
            tolerance: constants::TOI_TOLERANCE,
        }
    }
}

impl CollisionDetector {
    /// # Errors
    /// Rejects non-positive or non-finite tolerances.
    pub fn new(tolerance: f64) -> PhysicsResult<Self> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(PhysicsError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    /// True when a path from `y0` to `y1` crosses the plane at `height`.
    pub fn crosses(y0: f64, y1: f64, height: f64) -> bool {
        y0 > height && y1 <= height
    }

    /// Bisect `y(t) = y0 + v0·t + ½·a·t² = height` over `[0, dt]`.
    ///
    /// Returns the midpoint of the last bracket examined, or the midpoint of
    /// `[0, dt]` when `dt` is already within tolerance. Always lies inside
    /// `[0, dt]`.
    pub fn time_of_impact(&self, y0: f64, v0: f64, a: f64, height: f64, dt: f64) -> f64 {
        let above = |t: f64| y0 + v0 * t + 0.5 * a * t * t - height > 0.0;

        let mut lower = 0.0;
        let mut upper = dt;
        let mut mid = 0.5 * (lower + upper);
        while upper - lower > self.tolerance {
            mid = 0.5 * (lower + upper);
            if above(mid) {
                lower = mid;
            } else {
                upper = mid;
            }
        }
        mid
    }

    /// Constant-acceleration state `t` after `start`.
    pub fn state_at(start: &PointState, acceleration: Vec3, t: f64) -> PointState {
        PointState {
            pos: start.pos + start.vel * t + acceleration * (0.5 * t * t),
            vel: start.vel + acceleration * t,
        }
    }

    /// Detect contact with the ground over one step.
    ///
    /// A path that starts above the plane and ends on or below it gets a
    /// continuous time of impact. A path that is already at or below the
    /// plane and still moving down is reported at the end of the step.
    pub fn detect_ground(
        &self,
        start: &PointState,
        end: &PointState,
        acceleration: Vec3,
        ground: &GroundPlane,
        dt: f64,
    ) -> Option<GroundContact> {
        if !ground.enabled {
            return None;
        }
        let penetration = (ground.height - end.pos.y).max(0.0);

        if Self::crosses(start.pos.y, end.pos.y, ground.height) {
            let time = self.time_of_impact(
                start.pos.y,
                start.vel.y,
                acceleration.y,
                ground.height,
                dt,
            );
            return Some(GroundContact {
                time,
                state: Self::state_at(start, acceleration, time),
                penetration,
                continuous: true,
            });
        }

        if end.pos.y <= ground.height && end.vel.y < 0.0 {
            return Some(GroundContact {
                time: dt,
                state: *end,
                penetration,
                continuous: false,
            });
        }

        None
    }

    /// Discrete overlap test: touching counts as contact.
    pub fn sphere_contact(a: Vec3, radius_a: f64, b: Vec3, radius_b: f64) -> Option<SphereContact> {
        let offset = a - b;
        let distance = offset.magnitude();
        let reach = radius_a + radius_b;
        if distance > reach {
            return None;
        }
        Some(SphereContact {
            normal: offset.normalized(),
            distance,
            penetration: reach - distance,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
