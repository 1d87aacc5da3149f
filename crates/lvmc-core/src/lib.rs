//! LVMC Core -- the lattice state engine for active-matter kinetic Monte Carlo.
//!
//! This crate turns a physical model (a nearest-neighbour alignment
//! interaction plus an optional background flow) into per-site, per-event
//! transition rates ready for stochastic sampling, and provides the lattice
//! mutations a sampler applies once it has picked an event.
//!
//! # Update Cycle
//!
//! A driver alternates between two sides:
//!
//! 1. **Rates** -- [`rates::RateEngine::update_rates`] recomputes forces,
//!    energies, event deltas, Boltzmann rates and propensity totals.
//!    [`flow::FlowField`] contributes advection and reorientation rates.
//! 2. **Mutation** -- the driver picks an event and a site and applies the
//!    matching [`lattice::Lattice`] operation (`move_particle`, `rotate`,
//!    `flip`, `transport_particle`).
//!
//! The scheduler itself is not part of this crate; `test_utils::kmc_step`
//! is a minimal reference used by the tests.
//!
//! ```rust,ignore
//! let mut lattice = Lattice::with_seed(64, 64, 7)?;
//! lattice.populate(0.3)?;
//! let mut engine = RateEngine::new(&lattice, RateParams::default());
//! lattice.move_particle(3, 4)?;
//! engine.update_rates(&lattice)?;
//! ```
//!
//! # Key Types
//!
//! - [`lattice::Lattice`] -- Periodic grid of oriented particles with
//!   obstacles, sinks and stable particle ids.
//! - [`orientation::Orientation`] -- Site state: empty or one of four unit
//!   vectors.
//! - [`rates::RateEngine`] -- Interaction model and rate computation.
//! - [`rates::RateTable`] -- Per-event rate grids and propensity totals.
//! - [`flow::FlowField`] -- Prescribed velocity and vorticity fields.
//! - [`grid::Grid`] -- Dense row-major per-site storage.
//! - [`serialize`] -- Versioned binary snapshots via bitcode.

pub mod error;
pub mod flow;
pub mod grid;
pub mod id;
pub mod lattice;
pub mod orientation;
pub mod profiling;
pub mod rates;
pub mod rng;
pub mod serialize;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
