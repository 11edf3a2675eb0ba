//! Forces acting on a particle.
//!
//! [`ParticleForces`] implements [`ForceModel`] for one particle of a world:
//!
//! - **Gravity**: constant acceleration, independent of mass
//! - **Linear drag**: `F = -c·v` for [`Friction::Linear`]
//! - **Ramp**: optional slope term `dir · sin(angle(dir, up)) · |g|`
//! - **Accumulator**: forces applied by the host for this tick
//! - **Springs**: Hookean spring-damper links to anchors or other particles
//! - **Rope tension**: soft pull toward the rope anchor
//!
//! Rolling friction and air damping are not forces; the world applies them
//! to the velocity after integration.
//!
//! The other end of a two-particle link is read from a snapshot taken at
//! the start of the tick, so every particle sees the same neighbours no
//! matter which order the world integrates them in.

use crate::constraint::{Anchor, Constraint, Rope, Spring};
use crate::integrator::ForceModel;
use crate::types::{constants, Friction, Particle, ParticleId, PointState, Vec3};

/// World-wide force parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSettings {
    pub gravity: Vec3,
    /// Downhill direction of a ramp every particle rolls along, if any.
    pub ramp: Option<Vec3>,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -constants::GRAVITY, 0.0),
            ramp: None,
        }
    }
}

impl ForceSettings {
    /// Acceleration along the ramp, if there is one.
    pub fn ramp_acceleration(&self) -> Vec3 {
        match self.ramp {
            Some(dir) => {
                let dir = dir.normalized();
                let angle = dir.angle_between(&Vec3::UP);
                dir * (angle.sin() * self.gravity.magnitude())
            }
            None => Vec3::ZERO,
        }
    }
}

/// Spring-damper force on `a` from a spring to `b`.
///
/// `Δ = a - b`; the force is `-k·(|Δ| - ℓ₀)·Δ̂ - c·(v_a - v_b)`. The force on
/// `b` is the negation. Coincident endpoints give no elastic term.
pub fn spring_force(spring: &Spring, a: &PointState, b: &PointState) -> Vec3 {
    let delta = a.pos - b.pos;
    let stretch = delta.magnitude() - spring.rest_length;
    let elastic = if delta.magnitude_squared() < constants::EPSILON {
        Vec3::ZERO
    } else {
        delta.normalized() * (-spring.stiffness * stretch)
    };
    elastic - (a.vel - b.vel) * spring.damping
}

/// Soft rope pull on a particle at `pos` toward `anchor`.
pub fn rope_tension(rope: &Rope, pos: Vec3, anchor: Vec3) -> Vec3 {
    (anchor - pos).normalized() * ((rope.measured_length - rope.length) * rope.tension_scale)
}

/// Force model for a single particle inside a world.
pub struct ParticleForces<'a> {
    pub id: ParticleId,
    pub particle: &'a Particle,
    pub settings: &'a ForceSettings,
    pub constraints: &'a [Constraint],
    /// States of every particle at the start of the tick, indexed by id.
    pub snapshot: &'a [PointState],
}

impl<'a> ParticleForces<'a> {
    pub fn new(
        id: ParticleId,
        particle: &'a Particle,
        settings: &'a ForceSettings,
        constraints: &'a [Constraint],
        snapshot: &'a [PointState],
    ) -> Self {
        Self {
            id,
            particle,
            settings,
            constraints,
            snapshot,
        }
    }

    fn anchor_state(&self, anchor: Anchor) -> PointState {
        match anchor {
            Anchor::Fixed(pos) => PointState::at_rest(pos),
            Anchor::Particle(other) => self.snapshot[other.index()],
        }
    }

    /// Sum of spring and rope forces on this particle.
    fn link_force(&self, state: &PointState) -> Vec3 {
        let mut force = Vec3::ZERO;
        for constraint in self.constraints {
            match constraint {
                Constraint::Spring(spring) => {
                    if spring.particle == self.id {
                        let other = self.anchor_state(spring.anchor);
                        force += spring_force(spring, state, &other);
                    } else if spring.anchor == Anchor::Particle(self.id) {
                        let other = self.snapshot[spring.particle.index()];
                        force -= spring_force(spring, &other, state);
                    }
                }
                Constraint::Rope(rope) if rope.particle == self.id => {
                    let anchor = self.anchor_state(rope.anchor).pos;
                    force += rope_tension(rope, state.pos, anchor);
                }
                Constraint::Rope(_) => {}
            }
        }
        force
    }
}

impl ForceModel for ParticleForces<'_> {
    fn linear_acceleration(&self, state: &PointState) -> Vec3 {
        let mut force = self.particle.accumulated_force + self.link_force(state);
        if let Friction::Linear { coefficient } = self.particle.friction {
            force -= state.vel * coefficient;
        }

        self.settings.gravity + self.settings.ramp_acceleration() + force / self.particle.mass
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn forces_for<'a>(
        particle: &'a Particle,
        settings: &'a ForceSettings,
        constraints: &'a [Constraint],
        snapshot: &'a [PointState],
    ) -> ParticleForces<'a> {
        ParticleForces::new(ParticleId(0), particle, settings, constraints, snapshot)
    }

    #[test]
    fn test_gravity_is_mass_independent() {
        let settings = ForceSettings::default();
        for mass in [0.1, 1.0, 50.0] {
            let p = Particle::point(Vec3::new(0.0, 5.0, 0.0), mass).unwrap();
            let snapshot = [p.state];
            let forces = forces_for(&p, &settings, &[], &snapshot);
            let acc = forces.linear_acceleration(&p.state);
            assert_relative_eq!(acc.y, -constants::GRAVITY, epsilon = 1e-12);
            assert_eq!(acc.x, 0.0);
        }
    }

    #[test]
    fn test_linear_drag_opposes_motion() {
        let settings = ForceSettings {
            gravity: Vec3::ZERO,
            ramp: None,
        };
        let p = Particle::point(Vec3::ZERO, 2.0)
            .unwrap()
            .with_friction(Friction::Linear { coefficient: 0.5 });
        let moving = PointState::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
        let snapshot = [moving];
        let forces = forces_for(&p, &settings, &[], &snapshot);

        let acc = forces.linear_acceleration(&moving);
        // -c·v / m = -0.5·4 / 2
        assert_relative_eq!(acc.x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_friction_is_not_a_force() {
        let settings = ForceSettings {
            gravity: Vec3::ZERO,
            ramp: None,
        };
        let p = Particle::point(Vec3::ZERO, 1.0)
            .unwrap()
            .with_friction(Friction::Rolling { coefficient: 0.5 });
        let moving = PointState::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
        let snapshot = [moving];
        let forces = forces_for(&p, &settings, &[], &snapshot);
        assert_eq!(forces.linear_acceleration(&moving), Vec3::ZERO);
    }

    #[test]
    fn test_accumulated_force_divided_by_mass() {
        let settings = ForceSettings {
            gravity: Vec3::ZERO,
            ramp: None,
        };
        let mut p = Particle::point(Vec3::ZERO, 4.0).unwrap();
        p.apply_force(Vec3::new(0.0, 0.0, 8.0));
        let snapshot = [p.state];
        let forces = forces_for(&p, &settings, &[], &snapshot);
        assert_eq!(forces.linear_acceleration(&p.state), Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_ramp_acceleration() {
        let settings = ForceSettings {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            ramp: Some(Vec3::new(1.0, 0.0, 0.0)),
        };
        // Horizontal ramp direction is 90° from up: full |g| along it.
        let acc = settings.ramp_acceleration();
        assert_relative_eq!(acc.x, 10.0, epsilon = 1e-12);
        assert_eq!(ForceSettings::default().ramp_acceleration(), Vec3::ZERO);
    }

    #[test]
    fn test_spring_force_is_antisymmetric() {
        let spring = Spring::between(ParticleId(0), ParticleId(1), 1.0, 20.0, 0.3).unwrap();
        let a = PointState::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let b = PointState::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));

        let on_a = spring_force(&spring, &a, &b);
        let on_b = spring_force(&spring, &b, &a);
        assert_relative_eq!((on_a + on_b).magnitude(), 0.0, epsilon = 1e-12);

        // Stretched by 2: elastic pull of 40 toward b, damping -0.3·(1, -2).
        assert_relative_eq!(on_a.x, 40.0 - 0.3, epsilon = 1e-12);
        assert_relative_eq!(on_a.y, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_spring_compressed_pushes_apart() {
        let spring = Spring::between(ParticleId(0), ParticleId(1), 2.0, 5.0, 0.0).unwrap();
        let a = PointState::at_rest(Vec3::new(0.0, 1.0, 0.0));
        let b = PointState::at_rest(Vec3::ZERO);
        let on_a = spring_force(&spring, &a, &b);
        assert_relative_eq!(on_a.y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spring_zero_length_gives_no_elastic_force() {
        let spring = Spring::between(ParticleId(0), ParticleId(1), 1.0, 5.0, 0.0).unwrap();
        let a = PointState::at_rest(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(spring_force(&spring, &a, &a), Vec3::ZERO);
    }

    #[test]
    fn test_spring_reaction_on_anchor_particle() {
        let settings = ForceSettings {
            gravity: Vec3::ZERO,
            ramp: None,
        };
        let a = Particle::point(Vec3::ZERO, 1.0).unwrap();
        let b = Particle::point(Vec3::new(2.0, 0.0, 0.0), 1.0).unwrap();
        let constraints: Vec<Constraint> =
            vec![Spring::between(ParticleId(0), ParticleId(1), 1.0, 10.0, 0.0)
                .unwrap()
                .into()];
        let snapshot = [a.state, b.state];

        let on_a = ParticleForces::new(ParticleId(0), &a, &settings, &constraints, &snapshot)
            .linear_acceleration(&a.state);
        let on_b = ParticleForces::new(ParticleId(1), &b, &settings, &constraints, &snapshot)
            .linear_acceleration(&b.state);

        assert_relative_eq!(on_a.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(on_b.x, -10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rope_tension_pulls_toward_anchor() {
        let anchor = Vec3::new(0.0, 10.0, 0.0);
        let mut rope = Rope::new(ParticleId(0), Anchor::Fixed(anchor), 2.0).unwrap();
        rope.measured_length = 3.0;

        let pull = rope_tension(&rope, Vec3::new(0.0, 7.0, 0.0), anchor);
        assert_relative_eq!(pull.y, 10.0, epsilon = 1e-12);
        assert_relative_eq!(pull.x, 0.0);

        // Fresh rope measures exactly its length: no pull.
        let fresh = Rope::new(ParticleId(0), Anchor::Fixed(anchor), 2.0).unwrap();
        assert_eq!(rope_tension(&fresh, Vec3::new(0.0, 7.0, 0.0), anchor), Vec3::ZERO);
    }
}
