//! Interaction-driven transition rates.
//!
//! A full update runs five whole-grid passes over the lattice:
//!
//! 1. **Forces**: each site sums the orientation vectors of its four
//!    periodic neighbours, per component.
//! 2. **Energies**: `E = -(F . sigma)`.
//! 3. **Deltas**: the energy change of each elementary event (see
//!    [`EventType`]).
//! 4. **Rates**: `exp(-beta * dE)`, zero wherever the event does not apply.
//! 5. **Propensities**: per-event sums, weighted by [`PropensityPolicy`].
//!
//! Events only apply to occupied sites. Deltas at empty sites are reported
//! as `+inf` (an infinite barrier) and their rates are exactly zero. A hop
//! into an occupied site hits the volume-exclusion singularity and is also
//! zero; no non-finite value ever reaches a rate grid or a total.

use std::collections::BTreeMap;

#[cfg(feature = "profiling")]
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::flow::ReorientationRates;
use crate::grid::Grid;
use crate::lattice::Lattice;
use crate::orientation::Orientation;
#[cfg(feature = "profiling")]
use crate::profiling::RateProfile;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Elementary lattice events.
///
/// | event        | mutation                         | delta                          |
/// |--------------|----------------------------------|--------------------------------|
/// | `Flip`       | `flip(x, y)`                     | `-4E`                          |
/// | `Hop`        | `move_particle(x, y)`            | `2(H_new - E) + occ + excl`    |
/// | `Rotate`     | `rotate(x, y, true)`             | `2(H_ortho - E) + occ`         |
/// | `RotateNeg`  | `rotate(x, y, false)`            | `-dE_rotate - 4E`              |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    Flip,
    Hop,
    Rotate,
    RotateNeg,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Flip,
        EventType::Hop,
        EventType::Rotate,
        EventType::RotateNeg,
    ];

    /// Whether this event is a rotation (and so scaled by `v0`).
    pub fn is_rotation(self) -> bool {
        matches!(self, EventType::Rotate | EventType::RotateNeg)
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Which events contribute to the propensity totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropensityPolicy {
    /// Every event has a total. Rotations are scaled by `v0`.
    #[default]
    AllEvents,
    /// Only `Rotate` (scaled by `v0`) and `Hop` are summed; `Flip` and
    /// `RotateNeg` report a zero total and are never sampled.
    RotateAndHopOnly,
}

/// Model constants of the rate engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateParams {
    /// Inverse temperature.
    pub beta: f64,
    /// Intrinsic rotation rate.
    pub v0: f64,
    #[serde(default)]
    pub propensity_policy: PropensityPolicy,
}

impl Default for RateParams {
    fn default() -> Self {
        Self {
            beta: 1.0,
            v0: 1.0,
            propensity_policy: PropensityPolicy::default(),
        }
    }
}

impl RateParams {
    /// Apply named numeric overrides (`"beta"`, `"v0"`). Unknown names and
    /// non-finite values are rejected.
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Result<Self, RateError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        for (name, value) in overrides {
            let name = name.as_ref();
            if !value.is_finite() {
                return Err(RateError::InvalidParameter {
                    name: name.to_string(),
                    value,
                });
            }
            match name {
                "beta" => self.beta = value,
                "v0" => self.v0 = value,
                other => return Err(RateError::UnknownParameter(other.to_string())),
            }
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from configuring or updating a [`RateEngine`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateError {
    #[error("unknown rate parameter '{0}'")]
    UnknownParameter(String),
    #[error("rate parameter '{name}' must be finite, got {value}")]
    InvalidParameter { name: String, value: f64 },
    #[error("lattice shape {got:?} does not match engine shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}

// ---------------------------------------------------------------------------
// RateTable
// ---------------------------------------------------------------------------

/// Per-site rates and per-event totals, the boundary handed to a sampler.
///
/// Three layers are kept per event:
///
/// - `rates`: the interaction (Boltzmann) rates, exactly as computed;
/// - `flow`: external contributions folded in with
///   [`add_reorientation`](Self::add_reorientation);
/// - `weights`: what a sampler draws sites from, `scale * rate + flow`,
///   where `scale` is `v0` for rotations, `1` for flips and hops, and `0`
///   for events the [`PropensityPolicy`] leaves out.
///
/// [`propensity`](Self::propensity) is the sum of an event's weights, so
/// flow terms count under every policy and are never scaled by `v0`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<EventType, Grid<f64>>,
    flow: BTreeMap<EventType, Grid<f64>>,
    weights: BTreeMap<EventType, Grid<f64>>,
    propensities: BTreeMap<EventType, f64>,
    v0: f64,
    policy: PropensityPolicy,
}

impl RateTable {
    fn new(rates: BTreeMap<EventType, Grid<f64>>, v0: f64, policy: PropensityPolicy) -> Self {
        let mut table = Self {
            rates,
            flow: BTreeMap::new(),
            weights: BTreeMap::new(),
            propensities: BTreeMap::new(),
            v0,
            policy,
        };
        table.refresh_weights();
        table
    }

    /// Interaction-rate multiplier of `event` under the table's policy.
    fn scale(&self, event: EventType) -> f64 {
        match (self.policy, event) {
            (_, EventType::Rotate) => self.v0,
            (_, EventType::Hop) => 1.0,
            (PropensityPolicy::AllEvents, EventType::RotateNeg) => self.v0,
            (PropensityPolicy::AllEvents, EventType::Flip) => 1.0,
            (PropensityPolicy::RotateAndHopOnly, _) => 0.0,
        }
    }

    fn refresh_weights(&mut self) {
        let mut weights = BTreeMap::new();
        for (&event, rates) in &self.rates {
            let scale = self.scale(event);
            let scaled = rates.map(|r| sanitize(scale * r));
            let weight = match self.flow.get(&event) {
                Some(extra) => scaled.zip_map(extra, |a, b| sanitize(a + b)),
                None => scaled,
            };
            weights.insert(event, weight);
        }
        self.propensities = EventType::ALL
            .into_iter()
            .map(|event| (event, weights.get(&event).map_or(0.0, |g| g.sum())))
            .collect();
        self.weights = weights;
    }

    /// Interaction rates of `event`, before policy scaling and flow terms.
    pub fn rates(&self, event: EventType) -> Option<&Grid<f64>> {
        self.rates.get(&event)
    }

    /// Flow contribution folded into `event`, if any.
    pub fn flow(&self, event: EventType) -> Option<&Grid<f64>> {
        self.flow.get(&event)
    }

    /// Per-site sampling weights of `event`; they sum to its propensity.
    pub fn weights(&self, event: EventType) -> Option<&Grid<f64>> {
        self.weights.get(&event)
    }

    /// Total propensity of `event` under the table's policy.
    pub fn propensity(&self, event: EventType) -> f64 {
        self.propensities.get(&event).copied().unwrap_or(0.0)
    }

    pub fn propensities(&self) -> &BTreeMap<EventType, f64> {
        &self.propensities
    }

    /// Grand total over all events; the rate of the exponential waiting time.
    pub fn total_propensity(&self) -> f64 {
        self.propensities.values().sum()
    }

    pub fn policy(&self) -> PropensityPolicy {
        self.policy
    }

    /// Fold flow-driven reorientation rates into the `Rotate` and
    /// `RotateNeg` weights and recompute the totals. Repeated calls
    /// accumulate; the next rate update starts from a clean table.
    pub fn add_reorientation(&mut self, extra: &ReorientationRates) -> Result<(), RateError> {
        let channels = [
            (EventType::Rotate, &extra.rotate),
            (EventType::RotateNeg, &extra.rotate_neg),
        ];
        for (event, grid) in channels {
            let Some(current) = self.rates.get(&event) else {
                continue;
            };
            if !current.same_shape(grid) {
                return Err(RateError::ShapeMismatch {
                    expected: current.shape(),
                    got: grid.shape(),
                });
            }
        }
        for (event, grid) in channels {
            if !self.rates.contains_key(&event) {
                continue;
            }
            let merged = match self.flow.get(&event) {
                Some(current) => current.zip_map(grid, |a, b| sanitize(a + b)),
                None => grid.map(|r| sanitize(*r)),
            };
            self.flow.insert(event, merged);
        }
        self.refresh_weights();
        Ok(())
    }
}

/// Map anything that is not a finite non-negative rate to zero.
#[inline]
fn sanitize(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 { rate } else { 0.0 }
}

// ---------------------------------------------------------------------------
// RateEngine
// ---------------------------------------------------------------------------

/// Computes forces, energies, event deltas and rates for one lattice shape.
///
/// The engine keeps no reference to the lattice; every update reads the
/// lattice passed in, which must have the shape the engine was built for.
#[derive(Debug, Clone)]
pub struct RateEngine {
    params: RateParams,
    width: usize,
    height: usize,
    forces: Grid<[f64; 2]>,
    energies: Grid<f64>,
    deltas: BTreeMap<EventType, Grid<f64>>,
    table: RateTable,
    #[cfg(feature = "profiling")]
    last_profile: Option<RateProfile>,
}

impl RateEngine {
    /// Bind an engine to `lattice`'s shape and compute its rates once.
    pub fn new(lattice: &Lattice, params: RateParams) -> Self {
        let (width, height) = (lattice.width(), lattice.height());
        let mut engine = Self {
            params,
            width,
            height,
            forces: Grid::filled(width, height, [0.0; 2]),
            energies: Grid::filled(width, height, 0.0),
            deltas: BTreeMap::new(),
            table: RateTable::new(BTreeMap::new(), params.v0, params.propensity_policy),
            #[cfg(feature = "profiling")]
            last_profile: None,
        };
        engine.recompute(lattice);
        engine
    }

    pub fn params(&self) -> &RateParams {
        &self.params
    }

    pub fn beta(&self) -> f64 {
        self.params.beta
    }

    pub fn v0(&self) -> f64 {
        self.params.v0
    }

    /// Recompute everything from the current state of `lattice`.
    pub fn update_rates(&mut self, lattice: &Lattice) -> Result<(), RateError> {
        if lattice.width() != self.width || lattice.height() != self.height {
            return Err(RateError::ShapeMismatch {
                expected: (self.height, self.width),
                got: lattice.shape(),
            });
        }
        self.recompute(lattice);
        Ok(())
    }

    fn recompute(&mut self, lattice: &Lattice) {
        #[cfg(feature = "profiling")]
        let mut profile = RateProfile::default();
        #[cfg(feature = "profiling")]
        let start = Instant::now();

        let spins = lattice.orientations();

        #[cfg(feature = "profiling")]
        let t = Instant::now();
        self.forces = interaction_forces(spins);
        #[cfg(feature = "profiling")]
        {
            profile.forces = t.elapsed();
        }

        #[cfg(feature = "profiling")]
        let t = Instant::now();
        self.energies = site_energies(&self.forces, spins);
        #[cfg(feature = "profiling")]
        {
            profile.energies = t.elapsed();
        }

        #[cfg(feature = "profiling")]
        let t = Instant::now();
        self.deltas = event_deltas(spins, &self.forces, &self.energies);
        let mut defused = 0usize;
        let rates: BTreeMap<EventType, Grid<f64>> = self
            .deltas
            .iter()
            .map(|(&event, delta)| {
                let (grid, bad) = boltzmann(delta, self.params.beta);
                defused += bad;
                (event, grid)
            })
            .collect();
        if defused > 0 {
            log::warn!("defused {defused} non-finite rates to zero (beta={})", self.params.beta);
        }
        #[cfg(feature = "profiling")]
        {
            profile.rates = t.elapsed();
        }

        #[cfg(feature = "profiling")]
        let t = Instant::now();
        self.table = RateTable::new(rates, self.params.v0, self.params.propensity_policy);
        #[cfg(feature = "profiling")]
        {
            profile.propensities = t.elapsed();
            profile.total = start.elapsed();
            self.last_profile = Some(profile);
        }

        log::debug!(
            "rates updated: {} particles, total propensity {}",
            lattice.n_particles(),
            self.table.total_propensity()
        );
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Per-site interaction force `[Fx, Fy]`.
    pub fn forces(&self) -> &Grid<[f64; 2]> {
        &self.forces
    }

    /// Per-site energy; zero at empty sites.
    pub fn energies(&self) -> &Grid<f64> {
        &self.energies
    }

    /// Sum of the site energies (each bond counted from both ends).
    pub fn total_energy(&self) -> f64 {
        self.energies.sum()
    }

    /// Energy change of `event` at every site; `+inf` where it cannot occur.
    pub fn compute_delta(&self, event: EventType) -> Option<&Grid<f64>> {
        self.deltas.get(&event)
    }

    pub fn rates(&self, event: EventType) -> Option<&Grid<f64>> {
        self.table.rates(event)
    }

    /// Per-site sampling weights of `event`, see [`RateTable::weights`].
    pub fn weights(&self, event: EventType) -> Option<&Grid<f64>> {
        self.table.weights(event)
    }

    pub fn propensity(&self, event: EventType) -> f64 {
        self.table.propensity(event)
    }

    pub fn total_propensity(&self) -> f64 {
        self.table.total_propensity()
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// Mutable access, e.g. to fold in flow-driven rates before sampling.
    pub fn table_mut(&mut self) -> &mut RateTable {
        &mut self.table
    }

    /// Timing of the most recent update.
    #[cfg(feature = "profiling")]
    pub fn last_profile(&self) -> Option<&RateProfile> {
        self.last_profile.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Whole-grid passes
// ---------------------------------------------------------------------------

/// Four-neighbour stencil sum of the orientation vectors, periodic padding.
fn interaction_forces(spins: &Grid<Orientation>) -> Grid<[f64; 2]> {
    Grid::from_fn(spins.width(), spins.height(), |x, y| {
        let mut force = [0.0; 2];
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let v = spins[spins.wrap(x, y, dx, dy)].vector();
            force[0] += v[0];
            force[1] += v[1];
        }
        force
    })
}

#[inline]
fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn site_energies(forces: &Grid<[f64; 2]>, spins: &Grid<Orientation>) -> Grid<f64> {
    forces.zip_map(spins, |&f, o| -dot(f, o.vector()))
}

fn event_deltas(
    spins: &Grid<Orientation>,
    forces: &Grid<[f64; 2]>,
    energies: &Grid<f64>,
) -> BTreeMap<EventType, Grid<f64>> {
    let (w, h) = (spins.width(), spins.height());

    // 1/|sigma|: 1 where a particle sits, singular elsewhere.
    let occupancy_delta = |x: usize, y: usize| 1.0 / spins[(x, y)].norm();

    let rotate = Grid::from_fn(w, h, |x, y| {
        let o = spins[(x, y)];
        if o.is_empty() {
            return f64::INFINITY;
        }
        let e = energies[(x, y)];
        let h_ortho = -dot(forces[(x, y)], o.rotated(true).vector());
        2.0 * (h_ortho - e) + occupancy_delta(x, y)
    });

    let rotate_neg = Grid::from_fn(w, h, |x, y| {
        if spins[(x, y)].is_empty() {
            return f64::INFINITY;
        }
        -rotate[(x, y)] - 4.0 * energies[(x, y)]
    });

    let flip = Grid::from_fn(w, h, |x, y| {
        if spins[(x, y)].is_empty() {
            return f64::INFINITY;
        }
        -4.0 * energies[(x, y)]
    });

    let hop = Grid::from_fn(w, h, |x, y| {
        let o = spins[(x, y)];
        if o.is_empty() {
            return f64::INFINITY;
        }
        let (dx, dy) = o.delta();
        let dest = spins.wrap(x, y, dx, dy);
        // |s|/(|s|-1): 0 for an empty destination, divergent when occupied.
        let dest_norm = spins[dest].norm();
        if dest_norm == 1.0 {
            return f64::INFINITY;
        }
        let exclusion = dest_norm / (dest_norm - 1.0);
        let h_new = -dot(forces[dest], o.vector());
        2.0 * (h_new - energies[(x, y)]) + occupancy_delta(x, y) + exclusion
    });

    BTreeMap::from([
        (EventType::Flip, flip),
        (EventType::Hop, hop),
        (EventType::Rotate, rotate),
        (EventType::RotateNeg, rotate_neg),
    ])
}

/// `exp(-beta * dE)` per site. Infinite barriers map to exactly zero; any
/// other non-finite result is zeroed and counted.
fn boltzmann(delta: &Grid<f64>, beta: f64) -> (Grid<f64>, usize) {
    let rates = delta.map(|&d| {
        if d == f64::INFINITY {
            return Some(0.0);
        }
        let r = (-beta * d).exp();
        if r.is_finite() { Some(r) } else { None }
    });
    let defused = rates.iter().filter(|r| r.is_none()).count();
    (rates.map(|r| r.unwrap_or(0.0)), defused)
}
