//! Fixed-timestep simulation world.
//!
//! A [`World`] owns every particle, constraint and per-body integrator, and
//! advances them together one tick at a time. Each tick runs, in order:
//!
//! 1. Integrate every awake particle against a start-of-tick snapshot
//! 2. Clear per-tick forces, apply rolling friction and air damping
//! 3. Clamp ropes back to their maximum length
//! 4. Ground contact (time of impact, bounce or settle)
//! 5. Broad phase on the configured axis, then sphere-sphere impulses
//! 6. Project roped particles moved by a contact back inside their rope
//!
//! Pair impulses are applied one after the other in the order the broad
//! phase reports them, so a body hit by two others sees the result of the
//! first impulse when the second is resolved.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::broadphase::{Axis, Interval, SweepAndPrune};
use crate::collision::{CollisionDetector, CollisionResolver};
use crate::constraint::{Anchor, Constraint, GroundPlane, Rope, Spring};
use crate::error::{PhysicsError, PhysicsResult};
use crate::forces::{ForceSettings, ParticleForces};
use crate::integrator::{IntegrationMethod, IntegrationResult, Integrator};
use crate::types::{
    constants, CollisionEvent, CollisionTarget, Friction, GroundResponse, Particle, ParticleId,
    PointState, Vec3,
};

// =============================================================================
// Configuration
// =============================================================================

/// World-wide simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed tick length used by [`World::tick`].
    pub timestep: f64,
    pub gravity: Vec3,
    /// Downhill ramp direction applied to every particle.
    pub ramp: Option<Vec3>,
    /// Bracket width at which ground time-of-impact bisection stops.
    pub toi_tolerance: f64,
    pub broad_phase_axis: Axis,
    pub ground: GroundPlane,
    /// Scheme given to particles added without an explicit one.
    pub integrator: IntegrationMethod,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep: constants::TIMESTEP,
            gravity: Vec3::new(0.0, -constants::GRAVITY, 0.0),
            ramp: None,
            toi_tolerance: constants::TOI_TOLERANCE,
            broad_phase_axis: Axis::X,
            ground: GroundPlane::default(),
            integrator: IntegrationMethod::RungeKutta4,
        }
    }
}

impl SimulationConfig {
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_ramp(mut self, direction: Vec3) -> Self {
        self.ramp = Some(direction.normalized());
        self
    }

    pub fn with_toi_tolerance(mut self, tolerance: f64) -> Self {
        self.toi_tolerance = tolerance;
        self
    }

    pub fn with_broad_phase_axis(mut self, axis: Axis) -> Self {
        self.broad_phase_axis = axis;
        self
    }

    pub fn with_ground(mut self, ground: GroundPlane) -> Self {
        self.ground = ground;
        self
    }

    pub fn without_ground(mut self) -> Self {
        self.ground.enabled = false;
        self
    }

    pub fn with_integrator(mut self, method: IntegrationMethod) -> Self {
        self.integrator = method;
        self
    }

    /// # Errors
    /// Rejects a non-positive timestep or tolerance and a ground restitution
    /// outside `[0, 1]`.
    pub fn validate(&self) -> PhysicsResult<()> {
        validate_timestep(self.timestep)?;
        if !(self.toi_tolerance.is_finite() && self.toi_tolerance > 0.0) {
            return Err(PhysicsError::InvalidTolerance(self.toi_tolerance));
        }
        if !(0.0..=1.0).contains(&self.ground.restitution) {
            return Err(PhysicsError::InvalidRestitution(self.ground.restitution));
        }
        Ok(())
    }

    fn force_settings(&self) -> ForceSettings {
        ForceSettings {
            gravity: self.gravity,
            ramp: self.ramp,
        }
    }
}

fn validate_timestep(dt: f64) -> PhysicsResult<()> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(PhysicsError::InvalidTimestep(dt));
    }
    Ok(())
}

// =============================================================================
// Step Report
// =============================================================================

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Simulation time at the end of the tick.
    pub time: f64,
    pub dt: f64,
    /// Pairs the broad phase passed on to the narrow phase.
    pub candidate_pairs: usize,
    pub events: Vec<CollisionEvent>,
}

impl StepReport {
    pub fn ground_contacts(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events
            .iter()
            .filter(|e| e.target == CollisionTarget::Ground)
    }

    pub fn particle_contacts(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.target, CollisionTarget::Particle(_)))
    }
}

// =============================================================================
// World
// =============================================================================

/// Arena of particles and constraints advanced in lockstep.
#[derive(Debug)]
pub struct World {
    config: SimulationConfig,
    detector: CollisionDetector,
    particles: Vec<Particle>,
    integrators: Vec<Integrator>,
    constraints: Vec<Constraint>,
    sweep: SweepAndPrune,
    time: f64,
    ticks: u64,
}

impl Default for World {
    fn default() -> Self {
        let config = SimulationConfig::default();
        Self {
            detector: CollisionDetector {
                tolerance: config.toi_tolerance,
            },
            config,
            particles: Vec::new(),
            integrators: Vec::new(),
            constraints: Vec::new(),
            sweep: SweepAndPrune::new(),
            time: 0.0,
            ticks: 0,
        }
    }
}

impl World {
    /// # Errors
    /// Fails when the configuration does not validate.
    pub fn new(config: SimulationConfig) -> PhysicsResult<Self> {
        config.validate()?;
        Ok(Self {
            detector: CollisionDetector::new(config.toi_tolerance)?,
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Elapsed simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    // -------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------

    /// Add a particle integrated with the configured default scheme.
    ///
    /// # Errors
    /// Fails when the particle does not pass [`Particle::validate`].
    pub fn add_particle(&mut self, particle: Particle) -> PhysicsResult<ParticleId> {
        let method = self.config.integrator;
        self.add_particle_with(particle, method)
    }

    /// Add a particle with its own integration scheme.
    ///
    /// # Errors
    /// Fails when the particle does not pass [`Particle::validate`].
    pub fn add_particle_with(
        &mut self,
        particle: Particle,
        method: IntegrationMethod,
    ) -> PhysicsResult<ParticleId> {
        particle.validate()?;
        let id = ParticleId(self.particles.len());
        self.particles.push(particle);
        self.integrators.push(method.integrator());
        Ok(id)
    }

    /// # Errors
    /// Fails when either end refers to a particle not in this world.
    pub fn add_spring(&mut self, spring: Spring) -> PhysicsResult<usize> {
        self.add_constraint(spring.into())
    }

    /// # Errors
    /// Fails when either end refers to a particle not in this world.
    pub fn add_rope(&mut self, rope: Rope) -> PhysicsResult<usize> {
        self.add_constraint(rope.into())
    }

    /// # Errors
    /// Fails when either end refers to a particle not in this world.
    pub fn add_constraint(&mut self, constraint: Constraint) -> PhysicsResult<usize> {
        let (particle, other) = constraint.particles();
        self.check_id(particle)?;
        if let Some(other) = other {
            self.check_id(other)?;
        }
        self.constraints.push(constraint);
        Ok(self.constraints.len() - 1)
    }

    fn check_id(&self, id: ParticleId) -> PhysicsResult<()> {
        if id.index() < self.particles.len() {
            Ok(())
        } else {
            Err(PhysicsError::UnknownParticle {
                id,
                count: self.particles.len(),
            })
        }
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.index())
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn integrator(&self, id: ParticleId) -> Option<&Integrator> {
        self.integrators.get(id.index())
    }

    /// Add a force acting on `id` during the next tick only.
    ///
    /// # Errors
    /// Fails for an unknown particle.
    pub fn apply_force(&mut self, id: ParticleId, force: Vec3) -> PhysicsResult<()> {
        self.check_id(id)?;
        self.particles[id.index()].apply_force(force);
        Ok(())
    }

    /// Teleport a particle. Drops integrator history and any settled flag.
    ///
    /// # Errors
    /// Fails for an unknown particle.
    pub fn set_state(&mut self, id: ParticleId, state: PointState) -> PhysicsResult<()> {
        self.check_id(id)?;
        let particle = &mut self.particles[id.index()];
        particle.state = state;
        particle.settled = false;
        self.integrators[id.index()].reset();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Observables
    // -------------------------------------------------------------------------

    pub fn total_momentum(&self) -> Vec3 {
        self.particles
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + p.momentum())
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Advance by the configured timestep.
    pub fn tick(&mut self) -> StepReport {
        self.advance(self.config.timestep)
    }

    /// Advance by an explicit timestep.
    ///
    /// # Errors
    /// Rejects non-positive or non-finite `dt`.
    pub fn step(&mut self, dt: f64) -> PhysicsResult<StepReport> {
        validate_timestep(dt)?;
        Ok(self.advance(dt))
    }

    /// Run `ticks` ticks and collect every collision event.
    pub fn run(&mut self, ticks: usize) -> Vec<CollisionEvent> {
        (0..ticks).flat_map(|_| self.tick().events).collect()
    }

    fn advance(&mut self, dt: f64) -> StepReport {
        let snapshot: Vec<PointState> = self.particles.iter().map(|p| p.state).collect();
        let mut events = Vec::new();

        let results = self.integrate(&snapshot, dt);
        self.apply_velocity_losses(dt);
        self.clamp_ropes(true);
        self.resolve_ground(&snapshot, &results, dt, &mut events);
        let candidate_pairs = self.resolve_pairs(dt, &mut events);
        // Ground and pair responses move bodies after the first clamp.
        self.clamp_ropes(false);

        self.time += dt;
        self.ticks += 1;

        for (i, particle) in self.particles.iter().enumerate() {
            if !particle.state.is_finite() {
                warn!(particle = i, time = self.time, "non-finite particle state");
            }
        }
        debug!(
            time = self.time,
            candidate_pairs,
            events = events.len(),
            "tick"
        );

        StepReport {
            time: self.time,
            dt,
            candidate_pairs,
            events,
        }
    }

    /// Integrate awake particles; settled ones are pinned to the ground.
    fn integrate(&mut self, snapshot: &[PointState], dt: f64) -> Vec<Option<IntegrationResult>> {
        let settings = self.config.force_settings();
        let height = self.config.ground.height;

        let mut results = Vec::with_capacity(self.particles.len());
        for (i, integrator) in self.integrators.iter_mut().enumerate() {
            let particle = &self.particles[i];
            if particle.settled {
                results.push(None);
                continue;
            }
            let forces = ParticleForces::new(
                ParticleId(i),
                particle,
                &settings,
                &self.constraints,
                snapshot,
            );
            results.push(Some(integrator.step(&snapshot[i], &forces, dt)));
        }

        for (particle, result) in self.particles.iter_mut().zip(&results) {
            match result {
                Some(result) => particle.state = result.state,
                None => particle.state = CollisionResolver::settle(&particle.state, height),
            }
            particle.clear_forces();
        }
        results
    }

    /// Rolling friction, rolling spin and air damping.
    fn apply_velocity_losses(&mut self, dt: f64) {
        for particle in self.particles.iter_mut().filter(|p| !p.settled) {
            if let Friction::Rolling { coefficient } = particle.friction {
                let loss = (1.0 - coefficient * dt).max(0.0);
                particle.state.vel = particle.state.vel * loss;

                let spin = if particle.radius > constants::EPSILON {
                    particle.state.vel / particle.radius
                } else {
                    Vec3::ZERO
                };
                particle.rolling.angular_velocity = spin * loss;
                particle.rolling.rotation += particle.rolling.angular_velocity * dt;
            }
            if particle.air_damping != 0.0 {
                let loss = (1.0 - particle.air_damping * dt).max(0.0);
                particle.state.vel = particle.state.vel * loss;
            }
        }
    }

    /// Project roped particles back inside their rope length.
    ///
    /// With `measure` set the pre-clamp distance is recorded for next tick's
    /// soft pull; the post-contact pass only projects.
    fn clamp_ropes(&mut self, measure: bool) {
        for constraint in &mut self.constraints {
            let Constraint::Rope(rope) = constraint else {
                continue;
            };
            let index = rope.particle.index();
            if self.particles[index].settled {
                continue;
            }
            let anchor = match rope.anchor {
                Anchor::Fixed(pos) => pos,
                Anchor::Particle(other) => self.particles[other.index()].state.pos,
            };
            let pos = self.particles[index].state.pos;
            let clamped = if measure {
                rope.clamp(pos, anchor)
            } else {
                rope.project(pos, anchor)
            };
            if let Some(pos) = clamped {
                trace!(
                    particle = index,
                    length = rope.measured_length,
                    measure,
                    "rope clamped"
                );
                self.particles[index].state.pos = pos;
                self.integrators[index].reset();
            }
        }
    }

    fn resolve_ground(
        &mut self,
        snapshot: &[PointState],
        results: &[Option<IntegrationResult>],
        dt: f64,
        events: &mut Vec<CollisionEvent>,
    ) {
        let ground = self.config.ground;
        for (i, particle) in self.particles.iter_mut().enumerate() {
            let Some(result) = results[i] else {
                continue;
            };
            let Some(contact) = self.detector.detect_ground(
                &snapshot[i],
                &particle.state,
                result.acceleration,
                &ground,
                dt,
            ) else {
                continue;
            };

            let resolved = match particle.ground_response {
                GroundResponse::Settle => {
                    particle.settled = true;
                    debug!(particle = i, time = self.time + contact.time, "settled");
                    CollisionResolver::settle(&contact.state, ground.height)
                }
                GroundResponse::Bounce => {
                    let restitution = particle.restitution.min(ground.restitution);
                    CollisionResolver::bounce(&contact.state, restitution, ground.height)
                }
            };
            trace!(
                particle = i,
                toi = contact.time,
                continuous = contact.continuous,
                "ground contact"
            );

            particle.state = resolved;
            self.integrators[i].reset();
            events.push(CollisionEvent {
                particle: ParticleId(i),
                target: CollisionTarget::Ground,
                time: contact.time,
                normal: ground.normal(),
                penetration: contact.penetration,
                velocity_before: contact.state.vel,
                velocity_after: resolved.vel,
            });
        }
    }

    /// Broad phase then sequential impulses. Returns the candidate count.
    fn resolve_pairs(&mut self, dt: f64, events: &mut Vec<CollisionEvent>) -> usize {
        let axis = self.config.broad_phase_axis;
        let mut intervals = Vec::with_capacity(self.particles.len());
        for (i, p) in self.particles.iter().enumerate() {
            match Interval::around(axis.component(p.state.pos), p.radius, i) {
                Ok(interval) => intervals.push(interval),
                Err(err) => {
                    warn!(particle = i, time = self.time, %err, "left out of broad phase");
                }
            }
        }
        let pairs = self.sweep.find_overlaps(&intervals);

        for pair in &pairs {
            let (ia, ib) = (pair.first, pair.second);
            let (a, b) = (&self.particles[ia], &self.particles[ib]);
            if a.settled || b.settled {
                continue;
            }
            let Some(contact) =
                CollisionDetector::sphere_contact(a.state.pos, a.radius, b.state.pos, b.radius)
            else {
                continue;
            };
            let Some(response) =
                CollisionResolver::resolve_pair(&a.state, a.mass, &b.state, b.mass, &contact)
            else {
                continue;
            };
            trace!(a = ia, b = ib, impulse = response.impulse, "pair contact");

            events.push(CollisionEvent {
                particle: ParticleId(ia),
                target: CollisionTarget::Particle(ParticleId(ib)),
                time: dt,
                normal: contact.normal,
                penetration: contact.penetration,
                velocity_before: a.state.vel,
                velocity_after: response.a.vel,
            });
            events.push(CollisionEvent {
                particle: ParticleId(ib),
                target: CollisionTarget::Particle(ParticleId(ia)),
                time: dt,
                normal: -contact.normal,
                penetration: contact.penetration,
                velocity_before: b.state.vel,
                velocity_after: response.b.vel,
            });

            self.particles[ia].state = response.a;
            self.particles[ib].state = response.b;
            self.integrators[ia].reset();
            self.integrators[ib].reset();
        }
        pairs.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
