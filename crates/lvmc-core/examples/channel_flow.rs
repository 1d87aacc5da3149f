//! Channel flow example: active particles in a Poiseuille channel.
//!
//! Builds a 24x10 lattice with walls on the top and bottom rows, fills it
//! to 30% density and runs a simple kinetic Monte Carlo loop in which each
//! step is either an interaction event (flip, hop, rotate) or a flow
//! advection move, picked in proportion to their total rates.
//!
//! Run with: `cargo run -p lvmc-core --example channel_flow`

use lvmc_core::flow::FlowField;
use lvmc_core::grid::Grid;
use lvmc_core::lattice::Lattice;
use lvmc_core::orientation::Orientation;
use lvmc_core::rates::{RateEngine, RateParams};
use lvmc_core::rng::SimRng;
use lvmc_core::test_utils::kmc_step;

const WIDTH: usize = 24;
const HEIGHT: usize = 10;

fn main() {
    // --- Step 1: Lattice with channel walls ---

    let mut lattice = Lattice::with_seed(WIDTH, HEIGHT, 2024).unwrap();
    let walls = Grid::from_fn(WIDTH, HEIGHT, |_, y| y == 0 || y == HEIGHT - 1);
    lattice.set_obstacles(walls.clone()).unwrap();
    lattice.populate(0.3).unwrap();
    println!("Initial state ({} particles):\n{lattice}\n", lattice.n_particles());

    // --- Step 2: Rates and flow ---

    let params = RateParams {
        beta: 0.5,
        ..RateParams::default()
    };
    let mut engine = RateEngine::new(&lattice, params);
    let mut flow = FlowField::poiseuille(WIDTH, HEIGHT, 2.0).unwrap();
    flow.set_obstacles(walls).unwrap();

    // --- Step 3: Run ---

    let mut rng = SimRng::new(7);
    let mut time = 0.0;
    let mut advected = 0;
    for _ in 0..2000 {
        let transport = flow.compute_tm(&lattice.occupancy()).unwrap();
        let interaction_total = engine.total_propensity();
        let transport_total = transport.total();
        let total = interaction_total + transport_total;
        if total <= 0.0 {
            break;
        }

        if rng.next_f64() * total < transport_total {
            // Advect one particle, weighted by the per-direction rates.
            let mut target = rng.next_f64() * transport_total;
            'pick: for direction in Orientation::ALL {
                let Some(grid) = transport.for_direction(direction) else {
                    continue;
                };
                for (pos, &rate) in grid.indexed() {
                    if rate <= 0.0 {
                        continue;
                    }
                    if target < rate {
                        lattice.transport_particle(pos.x, pos.y, direction).unwrap();
                        advected += 1;
                        break 'pick;
                    }
                    target -= rate;
                }
            }
            engine.update_rates(&lattice).unwrap();
            time += -(1.0 - rng.next_f64()).ln() / total;
        } else if let Some(step) = kmc_step(&mut lattice, &mut engine, &mut rng).unwrap() {
            time += step.dt;
        }
    }

    // --- Step 4: Report ---

    println!("Final state after t = {time:.3} ({advected} advection moves):\n{lattice}");
    println!("Total energy: {}", engine.total_energy());
}
