//! Integration tests for the LVMC core.
//!
//! These tests exercise end-to-end behavior across lattice, rate engine and
//! flow field: boundary policies, identity tracking under mutation, rate
//! consistency after updates, flow coupling and snapshots.

use lvmc_core::flow::FlowField;
use lvmc_core::grid::{Grid, Position, Region};
use lvmc_core::lattice::{Lattice, MoveOutcome, Population};
use lvmc_core::orientation::Orientation;
use lvmc_core::rates::{EventType, PropensityPolicy, RateEngine, RateParams};
use lvmc_core::rng::SimRng;
use lvmc_core::test_utils::*;

// ===========================================================================
// Test 1: Hop, reflect, absorb
// ===========================================================================
//
// 10x10 lattice, particle at (5,5) facing up. Without an obstacle it hops to
// (5,4); with one it turns around in place; with a sink it disappears.

#[test]
fn hop_moves_particle_up() {
    let mut lattice = lattice_with(10, 10, &[(5, 5, Orientation::Up)]);
    lattice.move_particle(5, 5).unwrap();

    assert_eq!(lattice.get_particle_orientation(5, 4).unwrap(), Orientation::Up);
    assert!(lattice.is_empty(5, 5).unwrap());
}

#[test]
fn hop_into_obstacle_reflects() {
    let mut lattice = Lattice::new(10, 10).unwrap();
    lattice.set_obstacle(5, 4).unwrap();
    lattice.add_particle(5, 5, Some(Orientation::Up)).unwrap();

    let outcome = lattice.move_particle(5, 5).unwrap();
    assert!(matches!(outcome, MoveOutcome::Reflected { .. }));
    assert_eq!(lattice.get_particle_orientation(5, 5).unwrap(), Orientation::Down);
    assert!(lattice.is_obstacle(5, 4).unwrap());
    assert!(lattice.is_empty(5, 4).unwrap());
}

#[test]
fn particle_walks_around_the_torus() {
    let mut lattice = lattice_with(6, 4, &[(0, 2, Orientation::Left)]);
    let id = lattice.particle_at(0, 2).unwrap().unwrap();
    for _ in 0..6 {
        let (x, y) = {
            let p = lattice.position_of(id).unwrap();
            (p.x, p.y)
        };
        lattice.move_particle(x, y).unwrap();
    }
    assert_eq!(lattice.position_of(id), Some(Position::new(0, 2)));
}

#[test]
fn sink_drains_a_column() {
    let mut lattice = Lattice::new(5, 5).unwrap();
    lattice.set_sink(2, 0).unwrap();
    for y in 1..5 {
        lattice.add_particle(2, y, Some(Orientation::Up)).unwrap();
    }
    // March the column upwards, front first.
    for _ in 0..4 {
        for y in 1..5 {
            if !lattice.is_empty(2, y).unwrap() {
                let target = lattice.target_position(2, y, Orientation::Up).unwrap();
                if target.y == 0 || lattice.is_empty(target.x, target.y).unwrap() {
                    lattice.move_particle(2, y).unwrap();
                }
            }
        }
    }
    assert!(lattice.is_vacant());
    assert!(lattice.identity_is_consistent());
}

// ===========================================================================
// Test 2: Energy of a fully aligned lattice
// ===========================================================================

#[test]
fn aligned_lattice_energy_is_minus_four_per_site() {
    for o in Orientation::ALL {
        let lattice = aligned_lattice(7, 5, o);
        let engine = RateEngine::new(&lattice, RateParams::default());
        assert!(engine.energies().iter().all(|&e| e == -4.0));
        assert_eq!(engine.propensity(EventType::Hop), 0.0);

        let flip = engine.rates(EventType::Flip).unwrap();
        assert!(flip.iter().all(|&r| (r - (-16.0f64).exp()).abs() < 1e-18));
    }
}

// ===========================================================================
// Test 3: Rates stay consistent with the lattice across mutations
// ===========================================================================

#[test]
fn update_after_mutations_matches_fresh_engine() {
    let mut lattice = random_lattice(12, 12, 0.35, 21);
    let mut engine = RateEngine::new(&lattice, RateParams::default());

    lattice.rotate_particles(true, None).unwrap();
    let (x, y) = lattice
        .particles()
        .map(|(_, p)| (p.position.x, p.position.y))
        .next()
        .unwrap();
    lattice.flip(x, y).unwrap();
    engine.update_rates(&lattice).unwrap();

    let fresh = RateEngine::new(&lattice, RateParams::default());
    for event in EventType::ALL {
        assert_eq!(engine.rates(event), fresh.rates(event));
        assert_eq!(engine.propensity(event), fresh.propensity(event));
    }
}

#[test]
fn policies_differ_only_in_totals() {
    let lattice = random_lattice(10, 10, 0.5, 3);
    let all = RateEngine::new(&lattice, RateParams::default());
    let legacy = RateEngine::new(
        &lattice,
        RateParams {
            propensity_policy: PropensityPolicy::RotateAndHopOnly,
            ..RateParams::default()
        },
    );
    for event in EventType::ALL {
        assert_eq!(all.rates(event), legacy.rates(event));
    }
    assert!(all.total_propensity() > legacy.total_propensity());
    assert_eq!(
        legacy.total_propensity(),
        legacy.propensity(EventType::Rotate) + legacy.propensity(EventType::Hop)
    );
}

// ===========================================================================
// Test 4: Reference scheduler loop
// ===========================================================================

#[test]
fn kmc_run_is_deterministic_per_seed() {
    let run = |seed: u64| {
        let mut lattice = random_lattice(10, 10, 0.3, seed);
        let mut engine = RateEngine::new(&lattice, RateParams::default());
        let mut rng = SimRng::new(seed);
        let mut time = 0.0;
        for _ in 0..100 {
            if let Some(step) = kmc_step(&mut lattice, &mut engine, &mut rng).unwrap() {
                time += step.dt;
            }
        }
        (lattice.orientations().clone(), time)
    };
    assert_eq!(run(5), run(5));
    assert_ne!(run(5).0, run(6).0);
}

#[test]
fn kmc_with_obstacles_keeps_sites_clear() {
    let mut lattice = Lattice::with_seed(10, 10, 8).unwrap();
    let wall = Grid::from_fn(10, 10, |x, _| x == 0);
    lattice.set_obstacles(wall).unwrap();
    lattice.populate(0.4).unwrap();
    let mut engine = RateEngine::new(&lattice, RateParams::default());
    let mut rng = SimRng::new(1);

    for _ in 0..300 {
        kmc_step(&mut lattice, &mut engine, &mut rng).unwrap();
    }
    assert!((0..10).all(|y| lattice.is_empty(0, y).unwrap()));
    assert!(lattice.identity_is_consistent());
    assert_eq!(lattice.n_particles(), 36);
}

// ===========================================================================
// Test 5: Flow coupling
// ===========================================================================

#[test]
fn poiseuille_advects_and_reorients() {
    let mut lattice = Lattice::with_seed(20, 10, 4).unwrap();
    lattice.populate(0.2).unwrap();
    let flow = FlowField::poiseuille(20, 10, 1.0).unwrap();

    let tm = flow.compute_tm(&lattice.occupancy()).unwrap();
    assert!(tm.right.sum() > 0.0);
    assert_eq!(tm.up.sum(), 0.0);
    assert_eq!(tm.down.sum(), 0.0);

    let tr = flow.compute_tr(&lattice).unwrap();
    let mut engine = RateEngine::new(&lattice, RateParams::default());
    let before = engine.total_propensity();
    engine.table_mut().add_reorientation(&tr).unwrap();
    assert!((engine.total_propensity() - (before + tr.total())).abs() < 1e-9);

    // Apply one advection move chosen from the transport rates.
    let (site, _) = tm.right.indexed().find(|(_, r)| **r > 0.0).unwrap();
    let id = lattice.particle_at(site.x, site.y).unwrap().unwrap();
    let outcome = lattice
        .transport_particle(site.x, site.y, Orientation::Right)
        .unwrap();
    assert_eq!(outcome.destination(), lattice.position_of(id));
}

// ===========================================================================
// Test 6: Population modes and snapshots
// ===========================================================================

#[test]
fn flux_then_snapshot_round_trip() {
    let mut lattice = Lattice::with_seed(16, 8, 12).unwrap();
    lattice
        .add_particles(Population::ByRegionFlux {
            region: Region::new(0, 3, 0, 7),
            orientation: Some(Orientation::Right),
            n: 10,
        })
        .unwrap();
    let data = lattice.serialize().unwrap();
    let restored = Lattice::deserialize(&data).unwrap();
    assert_eq!(restored.n_particles(), 10);
    assert_eq!(restored.to_string(), lattice.to_string());
}

#[test]
fn crop_then_compute_rates() {
    let lattice = aligned_lattice(8, 8, Orientation::Right);
    let sub = lattice.crop(Region::new(0, 3, 0, 3)).unwrap();
    let engine = RateEngine::new(&sub, RateParams::default());
    assert!(engine.energies().iter().all(|&e| e == -4.0));
}
