//! Timing instrumentation for rate updates.
//!
//! [`RateProfile`] captures per-phase timing from the most recent
//! [`RateEngine::update_rates`](crate::rates::RateEngine::update_rates) call.
//! Only recorded when the `profiling` feature is enabled.

use std::time::Duration;

/// Per-phase timing from the most recent rate update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateProfile {
    pub forces: Duration,
    pub energies: Duration,
    /// Event deltas and their Boltzmann weights.
    pub rates: Duration,
    pub propensities: Duration,
    pub total: Duration,
}

impl RateProfile {
    /// Returns the name and duration of the slowest phase.
    pub fn bottleneck_phase(&self) -> (&'static str, Duration) {
        let phases = [
            ("energies", self.energies),
            ("rates", self.rates),
            ("propensities", self.propensities),
        ];
        phases
            .into_iter()
            .fold(("forces", self.forces), |slowest, phase| {
                if phase.1 > slowest.1 { phase } else { slowest }
            })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
