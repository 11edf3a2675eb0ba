//! Numerical integrators for advancing a point mass in time.
//!
//! Three schemes are provided, all driven by a [`ForceModel`]:
//!
//! - **Euler** (semi-implicit): one acceleration sample per step, first order.
//! - **RK4**: classical fourth-order Runge-Kutta, four samples per step.
//! - **Verlet**: position Verlet with a one-off Euler bootstrap. It keeps
//!   the previous position, so every body needs its own instance.
//!
//! ## RK4 tableau
//!
//! Given position x, velocity v, and acceleration function a(x, v):
//!
//! ```text
//! k1v = a(x, v)·dt                     k1x = v·dt
//! k2v = a(x + k1x/2, v + k1v/2)·dt     k2x = (v + k1v/2)·dt
//! k3v = a(x + k2x/2, v + k2v/2)·dt     k3x = (v + k2v/2)·dt
//! k4v = a(x + k3x, v + k3v)·dt         k4x = (v + k3v)·dt
//!
//! v' = v + (k1v + 2·k2v + 2·k3v + k4v) / 6
//! x' = x + (k1x + 2·k2x + 2·k3x + k4x) / 6
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{PointState, Vec3};

/// Result of an integration step, containing the new state and metadata.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationResult {
    pub state: PointState,
    /// Acceleration sampled at the start of the step.
    ///
    /// Ground time-of-impact uses this single sample, not the blended
    /// RK4 trajectory.
    pub acceleration: Vec3,
}

/// Trait for computing the acceleration of a point mass.
///
/// Implementations must be pure: RK4 calls them four times per step with
/// trial states that are never committed.
pub trait ForceModel {
    /// Compute linear acceleration given a (possibly trial) state.
    fn linear_acceleration(&self, state: &PointState) -> Vec3;
}

impl<F> ForceModel for F
where
    F: Fn(&PointState) -> Vec3,
{
    fn linear_acceleration(&self, state: &PointState) -> Vec3 {
        self(state)
    }
}

/// Semi-implicit Euler integrator.
///
/// The position update uses the *new* velocity: `v' = v + a·dt`, `x' = x + v'·dt`.
pub struct Euler;

impl Euler {
    /// Advance the state by one time step with a single force evaluation.
    pub fn step<F: ForceModel + ?Sized>(
        state: &PointState,
        forces: &F,
        dt: f64,
    ) -> IntegrationResult {
        let acceleration = forces.linear_acceleration(state);

        let new_vel = state.vel + acceleration * dt;
        let new_pos = state.pos + new_vel * dt;

        IntegrationResult {
            state: PointState {
                pos: new_pos,
                vel: new_vel,
            },
            acceleration,
        }
    }

    /// Advance by `substeps` steps of `dt` each.
    pub fn step_n<F: ForceModel + ?Sized>(
        state: &PointState,
        forces: &F,
        dt: f64,
        substeps: usize,
    ) -> PointState {
        (0..substeps).fold(*state, |s, _| Self::step(&s, forces, dt).state)
    }
}

/// Classical fourth-order Runge-Kutta integrator.
pub struct RungeKutta4;

impl RungeKutta4 {
    /// Advance the state by one time step using four staged evaluations.
    pub fn step<F: ForceModel + ?Sized>(
        state: &PointState,
        forces: &F,
        dt: f64,
    ) -> IntegrationResult {
        let x = state.pos;
        let v = state.vel;

        let a1 = forces.linear_acceleration(state);
        let k1v = a1 * dt;
        let k1x = v * dt;

        let s2 = PointState::new(x + k1x * 0.5, v + k1v * 0.5);
        let k2v = forces.linear_acceleration(&s2) * dt;
        let k2x = s2.vel * dt;

        let s3 = PointState::new(x + k2x * 0.5, v + k2v * 0.5);
        let k3v = forces.linear_acceleration(&s3) * dt;
        let k3x = s3.vel * dt;

        let s4 = PointState::new(x + k3x, v + k3v);
        let k4v = forces.linear_acceleration(&s4) * dt;
        let k4x = s4.vel * dt;

        let new_vel = v + (k1v + k2v * 2.0 + k3v * 2.0 + k4v) / 6.0;
        let new_pos = x + (k1x + k2x * 2.0 + k3x * 2.0 + k4x) / 6.0;

        IntegrationResult {
            state: PointState {
                pos: new_pos,
                vel: new_vel,
            },
            acceleration: a1,
        }
    }

    /// Advance by `substeps` steps of `dt` each.
    pub fn step_n<F: ForceModel + ?Sized>(
        state: &PointState,
        forces: &F,
        dt: f64,
        substeps: usize,
    ) -> PointState {
        (0..substeps).fold(*state, |s, _| Self::step(&s, forces, dt).state)
    }
}

/// Stateful position Verlet integrator.
///
/// `x(n+1) = 2·x(n) - x(n-1) + a·dt²`, with velocity reconstructed as the
/// central difference `(x(n+1) - x(n-1)) / 2dt`. The first call has no
/// previous position yet and takes one Euler step instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verlet {
    previous: Option<Vec3>,
}

impl Verlet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first step has recorded a previous position.
    pub fn is_bootstrapping(&self) -> bool {
        self.previous.is_none()
    }

    /// Forget the previous position, e.g. after teleporting the body.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn step<F: ForceModel + ?Sized>(
        &mut self,
        state: &PointState,
        forces: &F,
        dt: f64,
    ) -> IntegrationResult {
        let Some(previous) = self.previous else {
            self.previous = Some(state.pos);
            return Euler::step(state, forces, dt);
        };

        let acceleration = forces.linear_acceleration(state);
        let new_pos = state.pos * 2.0 - previous + acceleration * (dt * dt);
        let new_vel = (new_pos - previous) / (2.0 * dt);
        self.previous = Some(state.pos);

        IntegrationResult {
            state: PointState {
                pos: new_pos,
                vel: new_vel,
            },
            acceleration,
        }
    }
}

/// Integration scheme selector, as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    Euler,
    #[default]
    #[serde(alias = "rk4")]
    RungeKutta4,
    Verlet,
}

impl IntegrationMethod {
    /// Fresh integrator instance for one body.
    pub fn integrator(self) -> Integrator {
        match self {
            IntegrationMethod::Euler => Integrator::Euler,
            IntegrationMethod::RungeKutta4 => Integrator::RungeKutta4,
            IntegrationMethod::Verlet => Integrator::Verlet(Verlet::new()),
        }
    }
}

/// Per-body integrator. Owns whatever history the scheme needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Integrator {
    Euler,
    RungeKutta4,
    Verlet(Verlet),
}

impl Integrator {
    pub fn method(&self) -> IntegrationMethod {
        match self {
            Integrator::Euler => IntegrationMethod::Euler,
            Integrator::RungeKutta4 => IntegrationMethod::RungeKutta4,
            Integrator::Verlet(_) => IntegrationMethod::Verlet,
        }
    }

    pub fn step<F: ForceModel + ?Sized>(
        &mut self,
        state: &PointState,
        forces: &F,
        dt: f64,
    ) -> IntegrationResult {
        match self {
            Integrator::Euler => Euler::step(state, forces, dt),
            Integrator::RungeKutta4 => RungeKutta4::step(state, forces, dt),
            Integrator::Verlet(verlet) => verlet.step(state, forces, dt),
        }
    }

    /// Drop any history after the body was moved externally.
    pub fn reset(&mut self) {
        if let Integrator::Verlet(verlet) = self {
            verlet.reset();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// Simple gravity-only force model for testing
    struct GravityOnly;

    impl ForceModel for GravityOnly {
        fn linear_acceleration(&self, _state: &PointState) -> Vec3 {
            Vec3::new(0.0, -9.81, 0.0)
        }
    }

    /// a = -x along X: x(t) = cos t, v(t) = -sin t for x0 = 1, v0 = 0
    fn harmonic(state: &PointState) -> Vec3 {
        Vec3::new(-state.pos.x, 0.0, 0.0)
    }

    fn one_step_error_euler(dt: f64) -> f64 {
        let s = PointState::at_rest(Vec3::new(1.0, 0.0, 0.0));
        let r = Euler::step(&s, &harmonic, dt).state;
        (r.pos.x - dt.cos()).abs()
    }

    fn one_step_error_rk4(dt: f64) -> f64 {
        // Velocity component: the position error of this particular system
        // cancels at fifth order and would hide the leading term.
        let s = PointState::at_rest(Vec3::new(1.0, 0.0, 0.0));
        let r = RungeKutta4::step(&s, &harmonic, dt).state;
        (r.vel.x + dt.sin()).abs()
    }

    #[test]
    fn test_euler_single_evaluation_uses_new_velocity() {
        let calls = Cell::new(0);
        let counting = |_: &PointState| {
            calls.set(calls.get() + 1);
            Vec3::new(0.0, -10.0, 0.0)
        };
        let s = PointState::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let r = Euler::step(&s, &counting, 0.1);

        assert_eq!(calls.get(), 1);
        assert_relative_eq!(r.state.vel.y, -1.0, epsilon = 1e-12);
        // x' = x + v'·dt
        assert_relative_eq!(r.state.pos.y, 5.0 - 0.1, epsilon = 1e-12);
        assert_relative_eq!(r.state.pos.x, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_rk4_evaluates_four_times() {
        let calls = Cell::new(0);
        let counting = |_: &PointState| {
            calls.set(calls.get() + 1);
            Vec3::ZERO
        };
        RungeKutta4::step(&PointState::default(), &counting, 0.01);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_rk4_exact_for_constant_acceleration() {
        let s = PointState::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(2.0, 3.0, 0.0));
        let dt = 0.25;
        let r = RungeKutta4::step(&s, &GravityOnly, dt);

        assert_relative_eq!(r.state.pos.y, 10.0 + 3.0 * dt - 0.5 * 9.81 * dt * dt, epsilon = 1e-12);
        assert_relative_eq!(r.state.vel.y, 3.0 - 9.81 * dt, epsilon = 1e-12);
        assert_relative_eq!(r.state.pos.x, 2.0 * dt, epsilon = 1e-12);
        assert_eq!(r.acceleration, Vec3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_rk4_local_error_is_fifth_order() {
        // Local truncation error is O(dt⁵): halving dt divides it by ~32.
        let e1 = one_step_error_rk4(0.2);
        let e2 = one_step_error_rk4(0.1);
        let ratio = e1 / e2;
        assert!(ratio > 24.0 && ratio < 40.0, "RK4 ratio {}", ratio);
    }

    #[test]
    fn test_euler_local_error_is_second_order() {
        let e1 = one_step_error_euler(0.2);
        let e2 = one_step_error_euler(0.1);
        let ratio = e1 / e2;
        assert!(ratio > 3.0 && ratio < 5.0, "Euler ratio {}", ratio);
    }

    #[test]
    fn test_global_error_orders_exponential_decay() {
        // a = -v: v(t) = v0·e^-t, x(t) = x0 + v0·(1 - e^-t)
        let decay = |s: &PointState| -s.vel;
        let s0 = PointState::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let exact = 1.0 - (-1.0f64).exp();

        let err_rk4 = |n: usize| {
            let s = RungeKutta4::step_n(&s0, &decay, 1.0 / n as f64, n);
            (s.pos.x - exact).abs()
        };
        let err_euler = |n: usize| {
            let s = Euler::step_n(&s0, &decay, 1.0 / n as f64, n);
            (s.pos.x - exact).abs()
        };

        let rk4_ratio = err_rk4(10) / err_rk4(20);
        let euler_ratio = err_euler(10) / err_euler(20);

        // Global error: O(dt⁴) for RK4, O(dt) for Euler.
        assert!(rk4_ratio > 12.0 && rk4_ratio < 20.0, "RK4 ratio {}", rk4_ratio);
        assert!(euler_ratio > 1.6 && euler_ratio < 2.4, "Euler ratio {}", euler_ratio);
        assert!(err_rk4(10) < err_euler(10) * 1e-3);
    }

    #[test]
    fn test_verlet_bootstraps_with_euler() {
        let mut verlet = Verlet::new();
        let s = PointState::at_rest(Vec3::new(0.0, 1.0, 0.0));
        assert!(verlet.is_bootstrapping());

        let first = verlet.step(&s, &GravityOnly, 0.01);
        let euler = Euler::step(&s, &GravityOnly, 0.01);
        assert_eq!(first.state, euler.state);
        assert!(!verlet.is_bootstrapping());

        let second = verlet.step(&first.state, &GravityOnly, 0.01);
        let expected = first.state.pos * 2.0 - s.pos + Vec3::new(0.0, -9.81, 0.0) * 1e-4;
        assert_relative_eq!(second.state.pos.y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(
            second.state.vel.y,
            (second.state.pos.y - s.pos.y) / 0.02,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_verlet_instances_are_independent() {
        let mut a = Verlet::new();
        let mut b = Verlet::new();
        let sa = PointState::at_rest(Vec3::new(0.0, 1.0, 0.0));
        let sb = PointState::at_rest(Vec3::new(5.0, 1.0, 0.0));

        let ra = a.step(&sa, &GravityOnly, 0.01);
        // `b` has never stepped: it must bootstrap, not reuse `a`'s history.
        let rb = b.step(&sb, &GravityOnly, 0.01);
        assert_relative_eq!(rb.state.pos.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(ra.state.pos.y, rb.state.pos.y, epsilon = 1e-12);
    }

    #[test]
    fn test_verlet_free_fall_tracks_analytic() {
        let mut integrator = IntegrationMethod::Verlet.integrator();
        let mut state = PointState::at_rest(Vec3::new(0.0, 100.0, 0.0));
        let dt = 1.0 / 60.0;
        for _ in 0..60 {
            state = integrator.step(&state, &GravityOnly, dt).state;
        }
        let expected_y = 100.0 - 0.5 * 9.81;
        assert!((state.pos.y - expected_y).abs() < 0.2, "y = {}", state.pos.y);
    }

    #[test]
    fn test_integrator_reset_restarts_bootstrap() {
        let mut integrator = IntegrationMethod::Verlet.integrator();
        let s = PointState::default();
        integrator.step(&s, &GravityOnly, 0.01);
        integrator.reset();
        assert_eq!(integrator, Integrator::Verlet(Verlet::new()));
        assert_eq!(integrator.method(), IntegrationMethod::Verlet);
    }

    #[test]
    fn test_horizontal_motion() {
        let no_forces = |_: &PointState| Vec3::ZERO;
        let initial = PointState::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));

        for method in [
            IntegrationMethod::Euler,
            IntegrationMethod::RungeKutta4,
            IntegrationMethod::Verlet,
        ] {
            let mut integrator = method.integrator();
            let mut s = initial;
            for _ in 0..10 {
                s = integrator.step(&s, &no_forces, 0.1).state;
            }
            assert_relative_eq!(s.pos.x, 10.0, epsilon = 1e-9);
            assert_relative_eq!(s.vel.x, 10.0, epsilon = 1e-9);
        }
    }
}
