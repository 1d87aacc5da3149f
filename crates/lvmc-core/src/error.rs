//! Error types for lattice mutation and configuration.
//!
//! Lattice errors fall into two families: *bounds* errors (a coordinate or
//! region outside the grid) and *state* errors (an invalid transition for
//! the current contents of a site). Every check runs before any write, so a
//! returned error always means the lattice is unchanged.

use crate::grid::Region;

/// Errors from [`Lattice`](crate::lattice::Lattice) operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LatticeError {
    #[error("coordinates ({x}, {y}) are out of lattice bounds {width}x{height}")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("region {region:?} is out of lattice bounds {width}x{height}")]
    RegionOutOfBounds {
        region: Region,
        width: usize,
        height: usize,
    },
    #[error("lattice dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("site ({x}, {y}) is an obstacle")]
    Obstacle { x: usize, y: usize },
    #[error("site ({x}, {y}) is a sink")]
    Sink { x: usize, y: usize },
    #[error("site ({x}, {y}) is not empty")]
    Occupied { x: usize, y: usize },
    #[error("site ({x}, {y}) is empty")]
    Empty { x: usize, y: usize },
    #[error("malformed orientation vector ({dx}, {dy})")]
    InvalidOrientation { dx: i32, dy: i32 },
    #[error("grid shape {got:?} does not match lattice shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("density {0} is outside [0, 1]")]
    InvalidDensity(f64),
    #[error("requested {requested} particles but only {available} free sites")]
    InsufficientSpace { requested: usize, available: usize },
}

impl LatticeError {
    /// Whether this is a coordinate/region bounds error.
    pub fn is_bounds(&self) -> bool {
        matches!(
            self,
            LatticeError::OutOfBounds { .. } | LatticeError::RegionOutOfBounds { .. }
        )
    }

    /// Whether this is an invalid-transition (state) error.
    pub fn is_state(&self) -> bool {
        !self.is_bounds()
    }
}
