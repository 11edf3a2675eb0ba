//! Core types for the mass-spring simulation.
//!
//! Units are whatever the host chooses, as long as they are consistent.
//! The defaults (gravity of 9.81, unit masses) read naturally as SI:
//! - Position: meters (m)
//! - Velocity: meters per second (m/s)
//! - Mass: kilograms (kg)
//! - Force: Newtons (N)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::error::{PhysicsError, PhysicsResult};

// =============================================================================
// Vec3 - 3D Vector
// =============================================================================

/// A 3D vector used for positions, velocities, forces and accelerations.
///
/// Coordinate system:
/// - X, Z: horizontal
/// - Y: vertical (positive upward, the ground plane sits at a fixed Y)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Unit vector pointing up (+Y)
    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Magnitude (length) of the vector
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Returns a unit vector in the same direction, or zero if magnitude is zero
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag < constants::EPSILON {
            Self::ZERO
        } else {
            *self / mag
        }
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Distance between two points
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).magnitude()
    }

    /// Angle between two vectors in radians, or zero if either is degenerate
    pub fn angle_between(&self, other: &Self) -> f64 {
        let denom = self.magnitude() * other.magnitude();
        if denom < constants::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// Operator overloads for Vec3
impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

// =============================================================================
// Point State
// =============================================================================

/// Kinematic state of a point mass: what the integrators advance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointState {
    pub pos: Vec3,
    pub vel: Vec3,
}

impl PointState {
    pub fn new(pos: Vec3, vel: Vec3) -> Self {
        Self { pos, vel }
    }

    /// Point at rest at a given position
    pub fn at_rest(pos: Vec3) -> Self {
        Self {
            pos,
            vel: Vec3::ZERO,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite()
    }
}

impl Default for PointState {
    fn default() -> Self {
        Self::at_rest(Vec3::ZERO)
    }
}

// =============================================================================
// Particle
// =============================================================================

/// Index of a particle inside a [`World`](crate::world::World) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub usize);

impl ParticleId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Velocity-dependent friction applied to a particle.
///
/// The two models are deliberately different: `Linear` is a force term
/// (`F = -c·v`) evaluated inside every integrator stage, while `Rolling`
/// scales the velocity after integration (`v *= 1 - c·dt`) and drives the
/// kinematic spin of a rolling body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Friction {
    #[default]
    None,
    Linear {
        coefficient: f64,
    },
    Rolling {
        coefficient: f64,
    },
}

/// What happens when a particle reaches the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroundResponse {
    /// Reflect the vertical velocity, scaled by restitution.
    #[default]
    Bounce,
    /// Stop dead on first contact and stay there.
    Settle,
}

/// Kinematic spin of a rolling body: `ω = v / r`, no inertia tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RollingState {
    pub angular_velocity: Vec3,
    pub rotation: Vec3,
}

/// A point mass (or sphere, when `radius > 0`).
///
/// Construct with [`Particle::new`] to get validated mass, radius and
/// restitution; the fields are public so hosts can read them every tick.
/// [`World::add_particle`](crate::World::add_particle) validates again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub state: PointState,
    pub mass: f64,
    pub radius: f64,
    pub restitution: f64,
    pub friction: Friction,
    /// Extra velocity scaling `v *= 1 - d·dt` applied after integration.
    pub air_damping: f64,
    pub ground_response: GroundResponse,
    pub rolling: RollingState,
    /// Set once a `Settle` particle has touched the ground.
    pub settled: bool,
    /// Forces applied for the next tick only.
    pub accumulated_force: Vec3,
}

impl Particle {
    /// Create a particle at rest.
    ///
    /// # Errors
    /// Rejects non-positive or non-finite mass, negative radius and
    /// restitution outside `[0, 1]`.
    pub fn new(pos: Vec3, mass: f64, radius: f64) -> PhysicsResult<Self> {
        let particle = Self {
            state: PointState::at_rest(pos),
            mass,
            radius,
            restitution: 1.0,
            friction: Friction::None,
            air_damping: 0.0,
            ground_response: GroundResponse::Bounce,
            rolling: RollingState::default(),
            settled: false,
            accumulated_force: Vec3::ZERO,
        };
        particle.validate()?;
        Ok(particle)
    }

    /// Check every parameter a tick divides or scales by.
    ///
    /// Fields are public and `Particle` deserializes directly, so the world
    /// re-runs this when a particle is added.
    ///
    /// # Errors
    /// The first invalid parameter: mass, radius, restitution, friction
    /// coefficient, then air damping.
    pub fn validate(&self) -> PhysicsResult<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(PhysicsError::InvalidMass(self.mass));
        }
        if !(self.radius.is_finite() && self.radius >= 0.0) {
            return Err(PhysicsError::InvalidRadius(self.radius));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(PhysicsError::InvalidRestitution(self.restitution));
        }
        match self.friction {
            Friction::Linear { coefficient } | Friction::Rolling { coefficient }
                if !(coefficient.is_finite() && coefficient >= 0.0) =>
            {
                return Err(PhysicsError::InvalidFriction(coefficient));
            }
            _ => {}
        }
        if !(self.air_damping.is_finite() && self.air_damping >= 0.0) {
            return Err(PhysicsError::InvalidDamping(self.air_damping));
        }
        Ok(())
    }

    /// Point mass (zero radius).
    pub fn point(pos: Vec3, mass: f64) -> PhysicsResult<Self> {
        Self::new(pos, mass, 0.0)
    }

    pub fn with_velocity(mut self, vel: Vec3) -> Self {
        self.state.vel = vel;
        self
    }

    /// Set the coefficient of restitution.
    ///
    /// # Errors
    /// Rejects values outside `[0, 1]`.
    pub fn with_restitution(mut self, restitution: f64) -> PhysicsResult<Self> {
        if !(0.0..=1.0).contains(&restitution) {
            return Err(PhysicsError::InvalidRestitution(restitution));
        }
        self.restitution = restitution;
        Ok(self)
    }

    pub fn with_friction(mut self, friction: Friction) -> Self {
        self.friction = friction;
        self
    }

    /// Set the post-integration velocity damping rate.
    ///
    /// # Errors
    /// Rejects negative or non-finite rates.
    pub fn with_air_damping(mut self, air_damping: f64) -> PhysicsResult<Self> {
        if !(air_damping.is_finite() && air_damping >= 0.0) {
            return Err(PhysicsError::InvalidDamping(air_damping));
        }
        self.air_damping = air_damping;
        Ok(self)
    }

    pub fn with_ground_response(mut self, response: GroundResponse) -> Self {
        self.ground_response = response;
        self
    }

    pub fn pos(&self) -> Vec3 {
        self.state.pos
    }

    pub fn vel(&self) -> Vec3 {
        self.state.vel
    }

    pub fn momentum(&self) -> Vec3 {
        self.state.vel * self.mass
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.state.vel.magnitude_squared()
    }

    /// Add a force that lasts for the next tick only.
    pub fn apply_force(&mut self, force: Vec3) {
        self.accumulated_force += force;
    }

    pub fn clear_forces(&mut self) {
        self.accumulated_force = Vec3::ZERO;
    }
}

// =============================================================================
// Collision Types
// =============================================================================

/// What a particle collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionTarget {
    Ground,
    Particle(ParticleId),
}

/// Collision reported back to the host after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub particle: ParticleId,
    pub target: CollisionTarget,
    /// Time of impact within the step, or the full step for discrete contacts.
    pub time: f64,
    /// Contact normal pointing toward `particle`.
    pub normal: Vec3,
    pub penetration: f64,
    /// Velocity of `particle` just before the response was applied.
    pub velocity_before: Vec3,
    /// Velocity of `particle` just after the response was applied.
    pub velocity_after: Vec3,
}

// =============================================================================
// Physical Constants
// =============================================================================

/// Physical constants used in the simulation.
pub mod constants {
    /// Gravitational acceleration (m/s²)
    pub const GRAVITY: f64 = 9.81;

    /// Default bracket width at which the time-of-impact bisection stops
    pub const TOI_TOLERANCE: f64 = 1e-5;

    /// Default fixed timestep (s)
    pub const TIMESTEP: f64 = 0.02;

    /// Scale applied to the soft rope pull
    pub const ROPE_TENSION_SCALE: f64 = 10.0;

    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;
}

// =============================================================================
// Tests
// =============================================================================
