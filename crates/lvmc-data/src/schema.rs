//! Serde structs for simulation setup files.
//!
//! These structs define the on-disk format. They are deserialized from RON,
//! JSON or TOML and then turned into engine types by [`crate::setup::build`].
//! Enums are externally tagged with snake_case variant names, e.g. in TOML:
//!
//! ```toml
//! [lattice]
//! width = 32
//! height = 16
//! seed = 7
//!
//! [population.density]
//! density = 0.3
//!
//! [flow.poiseuille]
//! v1 = 0.5
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ===========================================================================
// Top level
// ===========================================================================

/// A complete simulation setup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSetup {
    pub lattice: LatticeData,
    /// `[x, y]` cells marked as obstacles.
    #[serde(default)]
    pub obstacles: Vec<[usize; 2]>,
    /// `[x, y]` cells marked as sinks.
    #[serde(default)]
    pub sinks: Vec<[usize; 2]>,
    #[serde(default)]
    pub population: PopulationData,
    #[serde(default)]
    pub rates: RatesData,
    #[serde(default)]
    pub flow: FlowData,
}

// ===========================================================================
// Lattice
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeData {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub seed: u64,
}

// ===========================================================================
// Population
// ===========================================================================

/// How to fill the lattice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationData {
    /// No particles.
    #[default]
    Empty,
    /// Random fill of the non-obstacle sites.
    Density { density: f64 },
    /// One string per row, top row first, one glyph per cell
    /// (`↑ ↓ ← → ·` or ASCII `^ v < > .`).
    Spins { rows: Vec<String> },
    /// `n` particles at random free cells of an inclusive region.
    Region {
        x_min: usize,
        x_max: usize,
        y_min: usize,
        y_max: usize,
        #[serde(default)]
        orientation: Option<OrientationData>,
        n: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationData {
    Up,
    Down,
    Left,
    Right,
}

// ===========================================================================
// Rates
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesData {
    #[serde(default = "default_one")]
    pub beta: f64,
    #[serde(default = "default_one")]
    pub v0: f64,
    #[serde(default)]
    pub policy: PolicyData,
    /// Named overrides applied after `beta` / `v0`.
    #[serde(default)]
    pub overrides: BTreeMap<String, f64>,
}

impl Default for RatesData {
    fn default() -> Self {
        Self {
            beta: 1.0,
            v0: 1.0,
            policy: PolicyData::default(),
            overrides: BTreeMap::new(),
        }
    }
}

fn default_one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyData {
    #[default]
    AllEvents,
    RotateAndHopOnly,
}

// ===========================================================================
// Flow
// ===========================================================================

/// Background flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowData {
    #[default]
    None,
    Uniform { vx: f64, vy: f64 },
    Poiseuille { v1: f64 },
}
