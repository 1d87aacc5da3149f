//! File-driven simulation setup for the LVMC core.
//!
//! A [`schema::SimulationSetup`] document (RON, TOML or JSON, chosen by file
//! extension) describes a lattice, its obstacles and sinks, how to populate
//! it, the rate parameters and an optional background flow.
//! [`setup::build`] turns it into a ready [`setup::Simulation`].

pub mod loader;
pub mod schema;
pub mod setup;

pub use loader::{DataLoadError, load_setup, load_simulation, load_simulation_from_dir};
pub use schema::SimulationSetup;
pub use setup::{Simulation, SetupError, build};
