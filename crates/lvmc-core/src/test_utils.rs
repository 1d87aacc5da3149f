//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::error::LatticeError;
use crate::grid::{Grid, Position};
use crate::lattice::{Lattice, MoveOutcome};
use crate::orientation::Orientation;
use crate::rates::{EventType, RateEngine, RateError};
use crate::rng::SimRng;

// ===========================================================================
// Lattice builders
// ===========================================================================

/// A fully occupied lattice with every particle pointing along `orientation`.
pub fn aligned_lattice(width: usize, height: usize, orientation: Orientation) -> Lattice {
    let mut lattice = Lattice::new(width, height).unwrap();
    let spins = Grid::filled(width, height, orientation);
    lattice
        .add_particles(crate::lattice::Population::BySpins { spins })
        .unwrap();
    lattice
}

/// An empty lattice with particles at the listed sites.
pub fn lattice_with(width: usize, height: usize, particles: &[(usize, usize, Orientation)]) -> Lattice {
    let mut lattice = Lattice::new(width, height).unwrap();
    for &(x, y, o) in particles {
        lattice.add_particle(x, y, Some(o)).unwrap();
    }
    lattice
}

/// A seeded lattice filled to `density`.
pub fn random_lattice(width: usize, height: usize, density: f64, seed: u64) -> Lattice {
    let mut lattice = Lattice::with_seed(width, height, seed).unwrap();
    lattice.populate(density).unwrap();
    lattice
}

// ===========================================================================
// Reference kinetic Monte Carlo step
// ===========================================================================

/// Failure inside [`kmc_step`].
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    #[error(transparent)]
    Rates(#[from] RateError),
}

/// One executed event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KmcEvent {
    pub event: EventType,
    pub site: Position,
    /// Exponential waiting time drawn from the grand total propensity.
    pub dt: f64,
    /// Set for hops.
    pub outcome: Option<MoveOutcome>,
}

/// Pick an index with probability proportional to `weights`.
fn weighted_choice<I: IntoIterator<Item = f64>>(weights: I, total: f64, rng: &mut SimRng) -> Option<usize> {
    let target = rng.next_f64() * total;
    let mut acc = 0.0;
    let mut last = None;
    for (i, w) in weights.into_iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        acc += w;
        last = Some(i);
        if target < acc {
            return Some(i);
        }
    }
    // Rounding can leave `target` just past the final sum.
    last
}

/// Run one event the way an external scheduler would:
///
/// 1. pick an event type with probability proportional to its propensity,
/// 2. pick a site weighted by that event's sampling weights,
/// 3. apply the matching lattice mutation,
/// 4. draw `dt ~ Exp(total propensity)`,
/// 5. refresh the rates.
///
/// Returns `Ok(None)` when nothing can happen (zero total propensity).
pub fn kmc_step(
    lattice: &mut Lattice,
    engine: &mut RateEngine,
    rng: &mut SimRng,
) -> Result<Option<KmcEvent>, StepError> {
    let total = engine.total_propensity();
    if total <= 0.0 {
        return Ok(None);
    }

    let weights = EventType::ALL.map(|e| engine.propensity(e));
    let Some(e) = weighted_choice(weights, total, rng) else {
        return Ok(None);
    };
    let event = EventType::ALL[e];

    let Some(grid) = engine.weights(event) else {
        return Ok(None);
    };
    let Some(i) = weighted_choice(grid.iter().copied(), grid.sum(), rng) else {
        return Ok(None);
    };
    let site = Position::new(i % grid.width(), i / grid.width());

    let outcome = match event {
        EventType::Flip => {
            lattice.flip(site.x, site.y)?;
            None
        }
        EventType::Rotate => {
            lattice.rotate(site.x, site.y, true)?;
            None
        }
        EventType::RotateNeg => {
            lattice.rotate(site.x, site.y, false)?;
            None
        }
        EventType::Hop => Some(lattice.move_particle(site.x, site.y)?),
    };

    let u = 1.0 - rng.next_f64();
    let dt = -u.ln() / total;
    engine.update_rates(lattice)?;

    Ok(Some(KmcEvent {
        event,
        site,
        dt,
        outcome,
    }))
}
