//! Property-based tests for the broad phase and collision response.
//!
//! Run with: cargo test -p ms-core --test proptest_physics

use ms_core::collision::{CollisionDetector, CollisionResolver};
use ms_core::constraint::{Anchor, Rope};
use ms_core::{
    find_overlaps_brute_force, Interval, OverlapPair, Particle, ParticleId, PointState,
    SimulationConfig, SweepAndPrune, Vec3, World,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Interval endpoints on a coarse grid so that shared endpoints are common.
fn arb_interval() -> impl Strategy<Value = (f64, f64)> {
    (-20i32..20, 0i32..8).prop_map(|(start, len)| (f64::from(start) * 0.5, f64::from(start + len) * 0.5))
}

fn arb_intervals() -> impl Strategy<Value = Vec<Interval>> {
    prop::collection::vec(arb_interval(), 0..40).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(owner, (start, end))| Interval::new(start, end, owner).unwrap())
            .collect()
    })
}

fn arb_vec3(range: f64) -> impl Strategy<Value = Vec3> {
    prop::array::uniform3(-range..range).prop_map(Vec3::from)
}

fn normalized_pairs(pairs: Vec<OverlapPair>) -> Vec<OverlapPair> {
    let mut out: Vec<_> = pairs.into_iter().map(OverlapPair::normalized).collect();
    out.sort_unstable();
    out
}

// =============================================================================
// Broad phase
// =============================================================================

proptest! {
    #[test]
    fn sweep_matches_brute_force(intervals in arb_intervals()) {
        let mut sap = SweepAndPrune::new();
        let sweep = normalized_pairs(sap.find_overlaps(&intervals));
        let brute = normalized_pairs(find_overlaps_brute_force(&intervals));
        prop_assert_eq!(sweep, brute);
    }

    #[test]
    fn sweep_reports_each_pair_once(intervals in arb_intervals()) {
        let mut sap = SweepAndPrune::new();
        let pairs = normalized_pairs(sap.find_overlaps(&intervals));
        let mut deduped = pairs.clone();
        deduped.dedup();
        prop_assert_eq!(pairs.len(), deduped.len());
        for pair in &pairs {
            prop_assert!(pair.first != pair.second);
        }
    }
}

// =============================================================================
// Collision response
// =============================================================================

proptest! {
    #[test]
    fn pair_impulse_conserves_momentum(
        mass_a in 0.1..10.0f64,
        mass_b in 0.1..10.0f64,
        offset in arb_vec3(0.5),
        vel_a in arb_vec3(5.0),
        vel_b in arb_vec3(5.0),
    ) {
        prop_assume!(offset.magnitude() > 1e-3);
        let a = PointState::new(offset, vel_a);
        let b = PointState::new(Vec3::ZERO, vel_b);
        let contact = CollisionDetector::sphere_contact(a.pos, 0.5, b.pos, 0.5).unwrap();

        if let Some(r) = CollisionResolver::resolve_pair(&a, mass_a, &b, mass_b, &contact) {
            let before = a.vel * mass_a + b.vel * mass_b;
            let after = r.a.vel * mass_a + r.b.vel * mass_b;
            prop_assert!((before - after).magnitude() < 1e-9);

            let ke = |s: &PointState, m: f64| 0.5 * m * s.vel.magnitude_squared();
            let ke_before = ke(&a, mass_a) + ke(&b, mass_b);
            let ke_after = ke(&r.a, mass_a) + ke(&r.b, mass_b);
            prop_assert!((ke_before - ke_after).abs() < 1e-9 * (1.0 + ke_before));

            // No longer approaching along the normal.
            prop_assert!((r.a.vel - r.b.vel).dot(&contact.normal) >= -1e-9);
        }
    }

    #[test]
    fn bounce_never_gains_speed(
        restitution in 0.0..=1.0f64,
        vel in arb_vec3(20.0),
        x in -5.0..5.0f64,
    ) {
        let state = PointState::new(Vec3::new(x, -0.01, 0.0), vel);
        let out = CollisionResolver::bounce(&state, restitution, 0.0);
        prop_assert!(out.vel.y.abs() <= vel.y.abs());
        prop_assert_eq!(out.vel.x, vel.x);
        prop_assert_eq!(out.vel.z, vel.z);
        prop_assert_eq!(out.pos.y, 0.0);
        if restitution == 1.0 {
            prop_assert_eq!(out.vel.y.abs(), vel.y.abs());
        }
    }

    #[test]
    fn time_of_impact_stays_in_step(
        y0 in 1e-4..1.0f64,
        v0 in -30.0..0.0f64,
        dt in 1e-3..0.1f64,
    ) {
        let detector = CollisionDetector::default();
        let t = detector.time_of_impact(y0, v0, -9.81, 0.0, dt);
        prop_assert!((0.0..=dt).contains(&t));
    }
}

// =============================================================================
// Whole world
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn free_pairs_conserve_world_momentum(
        positions in prop::collection::vec(arb_vec3(3.0), 2..6),
        velocities in prop::collection::vec(arb_vec3(3.0), 6),
        masses in prop::collection::vec(0.5..4.0f64, 6),
    ) {
        let config = SimulationConfig::default()
            .with_gravity(Vec3::ZERO)
            .without_ground();
        let mut world = World::new(config).unwrap();
        for (i, pos) in positions.iter().enumerate() {
            let particle = Particle::new(*pos, masses[i], 0.6)
                .unwrap()
                .with_velocity(velocities[i]);
            world.add_particle(particle).unwrap();
        }

        let before = world.total_momentum();
        for _ in 0..20 {
            world.tick();
        }
        let after = world.total_momentum();
        prop_assert!((before - after).magnitude() < 1e-9 * (1.0 + before.magnitude()));
    }

    #[test]
    fn rope_clamp_holds_after_every_tick(
        start in arb_vec3(4.0),
        vel in arb_vec3(10.0),
        length in 0.5..6.0f64,
    ) {
        let anchor = Vec3::new(0.0, 10.0, 0.0);
        let mut world = World::new(SimulationConfig::default().without_ground()).unwrap();
        let particle = Particle::point(anchor + start, 1.0).unwrap().with_velocity(vel);
        let id = world.add_particle(particle).unwrap();
        world.add_rope(Rope::new(id, Anchor::Fixed(anchor), length).unwrap()).unwrap();

        for _ in 0..50 {
            world.tick();
            let p = world.particle(ParticleId(0)).unwrap();
            prop_assert!(p.pos().distance(&anchor) <= length + 1e-9);
        }
    }

    #[test]
    fn rope_clamp_holds_through_ground_contact(
        start in arb_vec3(3.0),
        vel in arb_vec3(40.0),
        anchor_height in 0.0..1.0f64,
        length in 0.5..3.0f64,
    ) {
        let anchor = Vec3::new(0.0, anchor_height, 0.0);
        let mut world = World::default();
        let mut pos = anchor + start;
        pos.y = pos.y.abs();
        let particle = Particle::point(pos, 1.0).unwrap().with_velocity(vel);
        let id = world.add_particle(particle).unwrap();
        world.add_rope(Rope::new(id, Anchor::Fixed(anchor), length).unwrap()).unwrap();

        for _ in 0..50 {
            world.tick();
            let p = world.particle(id).unwrap();
            prop_assert!(p.pos().distance(&anchor) <= length + 1e-9);
        }
    }
}
