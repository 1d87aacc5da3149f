//! The particle lattice: per-site orientations, obstacle and sink masks, and
//! particle identity.
//!
//! # Identity
//!
//! Every particle lives in a slotmap arena keyed by [`ParticleId`] and is
//! mirrored by a dense position table (`site_index`). Only the private
//! `place` / `relocate` / `vacate` helpers write to either structure, so the
//! two can never drift apart: the set of positions with an id is exactly
//! the set of occupied sites.
//!
//! # Boundaries
//!
//! Moves wrap periodically in both axes, except that an obstacle in the
//! destination reflects the particle (180 degree turn, no displacement) and
//! a sink in the destination absorbs it.
//!
//! Mutations are not reentrant. A driver that executes events from several
//! threads must serialize calls into the lattice.

use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::error::LatticeError;
use crate::grid::{Grid, Position, Region};
use crate::id::{ParticleId, Serial};
use crate::orientation::Orientation;
use crate::rng::SimRng;

// ---------------------------------------------------------------------------
// Particle records
// ---------------------------------------------------------------------------

/// Arena record for one particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Particle {
    /// Creation order, strictly increasing.
    pub serial: Serial,
    /// Current site.
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Population directives
// ---------------------------------------------------------------------------

/// One way of filling the lattice with particles. Exactly one mode per call
/// to [`Lattice::add_particles`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Population {
    /// Fill a random `density` fraction of the non-obstacle sites.
    ByDensity { density: f64 },
    /// Replace the particle layer with an explicit orientation grid.
    BySpins { spins: Grid<Orientation> },
    /// Drop `n` particles at random free sites inside `region`.
    ByRegionFlux {
        region: Region,
        orientation: Option<Orientation>,
        n: usize,
    },
}

// ---------------------------------------------------------------------------
// Move outcomes
// ---------------------------------------------------------------------------

/// What happened to a particle asked to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The particle now sits at `to`.
    Moved { from: Position, to: Position },
    /// An obstacle was ahead; the particle stayed and turned around.
    Reflected { at: Position, orientation: Orientation },
    /// The destination was a sink; the particle was removed.
    Absorbed { from: Position, sink: Position },
    /// Transport was blocked by an obstacle; nothing changed.
    Blocked { at: Position },
}

impl MoveOutcome {
    /// The new site of the particle, if it was displaced.
    pub fn destination(&self) -> Option<Position> {
        match self {
            MoveOutcome::Moved { to, .. } => Some(*to),
            _ => None,
        }
    }

    pub fn is_displaced(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}

// ---------------------------------------------------------------------------
// Lattice
// ---------------------------------------------------------------------------

/// A periodic `width x height` lattice of oriented particles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    width: usize,
    height: usize,
    orientations: Grid<Orientation>,
    obstacles: Grid<bool>,
    sinks: Grid<bool>,
    particles: SlotMap<ParticleId, Particle>,
    site_index: Grid<Option<ParticleId>>,
    next_serial: u64,
    rng: SimRng,
}

impl Lattice {
    /// Create an empty lattice with seed 0.
    pub fn new(width: usize, height: usize) -> Result<Self, LatticeError> {
        Self::with_seed(width, height, 0)
    }

    /// Create an empty lattice whose random draws (placements, orientations)
    /// are determined by `seed`.
    pub fn with_seed(width: usize, height: usize, seed: u64) -> Result<Self, LatticeError> {
        if width == 0 || height == 0 {
            return Err(LatticeError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            orientations: Grid::filled(width, height, Orientation::Empty),
            obstacles: Grid::filled(width, height, false),
            sinks: Grid::filled(width, height, false),
            particles: SlotMap::with_key(),
            site_index: Grid::filled(width, height, None),
            next_serial: 0,
            rng: SimRng::new(seed),
        })
    }

    // -----------------------------------------------------------------------
    // Shape and validation
    // -----------------------------------------------------------------------

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn validate_coordinates(&self, x: usize, y: usize) -> Result<(), LatticeError> {
        if x >= self.width || y >= self.height {
            return Err(LatticeError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn validate_region(&self, region: Region) -> Result<(), LatticeError> {
        if !region.is_ordered() || region.x_max >= self.width || region.y_max >= self.height {
            return Err(LatticeError::RegionOutOfBounds {
                region,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn validate_shape<T>(&self, grid: &Grid<T>) -> Result<(), LatticeError> {
        if grid.width() != self.width || grid.height() != self.height {
            return Err(LatticeError::ShapeMismatch {
                expected: self.shape(),
                got: grid.shape(),
            });
        }
        Ok(())
    }

    /// In bounds, not an obstacle, no particle.
    fn validate_availability(&self, x: usize, y: usize) -> Result<(), LatticeError> {
        self.validate_coordinates(x, y)?;
        if self.obstacles[(x, y)] {
            return Err(LatticeError::Obstacle { x, y });
        }
        if !self.orientations[(x, y)].is_empty() {
            return Err(LatticeError::Occupied { x, y });
        }
        Ok(())
    }

    /// In bounds and holding a particle.
    fn validate_occupancy(&self, x: usize, y: usize) -> Result<Orientation, LatticeError> {
        self.validate_coordinates(x, y)?;
        let o = self.orientations[(x, y)];
        if o.is_empty() {
            return Err(LatticeError::Empty { x, y });
        }
        Ok(o)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether no particle sits at `(x, y)`.
    pub fn is_empty(&self, x: usize, y: usize) -> Result<bool, LatticeError> {
        self.validate_coordinates(x, y)?;
        Ok(self.orientations[(x, y)].is_empty())
    }

    pub fn is_obstacle(&self, x: usize, y: usize) -> Result<bool, LatticeError> {
        self.validate_coordinates(x, y)?;
        Ok(self.obstacles[(x, y)])
    }

    pub fn is_sink(&self, x: usize, y: usize) -> Result<bool, LatticeError> {
        self.validate_coordinates(x, y)?;
        Ok(self.sinks[(x, y)])
    }

    /// Whether the lattice holds no particle at all.
    pub fn is_vacant(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of particles on the lattice.
    pub fn n_particles(&self) -> usize {
        self.particles.len()
    }

    /// Occupied sites over non-obstacle sites (0 if every site is an obstacle).
    pub fn density(&self) -> f64 {
        let free = self.width * self.height - self.obstacles.count();
        if free == 0 {
            return 0.0;
        }
        self.n_particles() as f64 / free as f64
    }

    /// Raw site state; [`Orientation::Empty`] for unoccupied sites.
    pub fn orientation_at(&self, x: usize, y: usize) -> Result<Orientation, LatticeError> {
        self.validate_coordinates(x, y)?;
        Ok(self.orientations[(x, y)])
    }

    /// Orientation of the particle at `(x, y)`; an empty site is an error.
    pub fn get_particle_orientation(&self, x: usize, y: usize) -> Result<Orientation, LatticeError> {
        self.validate_occupancy(x, y)
    }

    /// Periodic neighbour of `(x, y)` one step along `direction`.
    pub fn target_position(
        &self,
        x: usize,
        y: usize,
        direction: Orientation,
    ) -> Result<Position, LatticeError> {
        self.validate_coordinates(x, y)?;
        let (dx, dy) = direction.delta();
        Ok(self.orientations.wrap(x, y, dx, dy).into())
    }

    pub fn orientations(&self) -> &Grid<Orientation> {
        &self.orientations
    }

    pub fn obstacles(&self) -> &Grid<bool> {
        &self.obstacles
    }

    pub fn sinks(&self) -> &Grid<bool> {
        &self.sinks
    }

    /// Occupancy mask derived from the orientations.
    pub fn occupancy(&self) -> Grid<bool> {
        self.orientations.map(|o| !o.is_empty())
    }

    /// Id of the particle at `(x, y)`, if any.
    pub fn particle_at(&self, x: usize, y: usize) -> Result<Option<ParticleId>, LatticeError> {
        self.validate_coordinates(x, y)?;
        Ok(self.site_index[(x, y)])
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id)
    }

    pub fn position_of(&self, id: ParticleId) -> Option<Position> {
        self.particles.get(id).map(|p| p.position)
    }

    /// All live particles, in arena order.
    pub fn particles(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.particles.iter()
    }

    // -----------------------------------------------------------------------
    // Identity bookkeeping (the only writers of `particles` / `site_index`)
    // -----------------------------------------------------------------------

    fn place(&mut self, pos: Position, orientation: Orientation) -> ParticleId {
        let serial = Serial(self.next_serial);
        self.next_serial += 1;
        let id = self.particles.insert(Particle {
            serial,
            position: pos,
        });
        self.orientations[pos] = orientation;
        self.site_index[pos] = Some(id);
        id
    }

    fn relocate(&mut self, from: Position, to: Position) {
        let orientation = self.orientations[from];
        let id = self.site_index[from].take();
        self.orientations[from] = Orientation::Empty;
        self.orientations[to] = orientation;
        self.site_index[to] = id;
        if let Some(particle) = id.and_then(|id| self.particles.get_mut(id)) {
            particle.position = to;
        }
    }

    fn vacate(&mut self, pos: Position) -> Option<ParticleId> {
        self.orientations[pos] = Orientation::Empty;
        let id = self.site_index[pos].take();
        if let Some(id) = id {
            self.particles.remove(id);
        }
        id
    }

    fn clear_particles(&mut self) {
        self.particles.clear();
        self.site_index.fill(None);
        self.orientations.fill(Orientation::Empty);
    }

    fn random_orientation(&mut self) -> Orientation {
        Orientation::ALL[self.rng.below(Orientation::ALL.len())]
    }

    // -----------------------------------------------------------------------
    // Single-particle mutations
    // -----------------------------------------------------------------------

    /// Add a particle at `(x, y)`. A missing orientation is drawn uniformly
    /// from the four directions. Sinks accept particles; obstacles and
    /// occupied sites do not.
    pub fn add_particle(
        &mut self,
        x: usize,
        y: usize,
        orientation: Option<Orientation>,
    ) -> Result<ParticleId, LatticeError> {
        if orientation == Some(Orientation::Empty) {
            return Err(LatticeError::InvalidOrientation { dx: 0, dy: 0 });
        }
        self.validate_availability(x, y)?;
        let orientation = match orientation {
            Some(o) => o,
            None => self.random_orientation(),
        };
        Ok(self.place(Position::new(x, y), orientation))
    }

    /// Clear `(x, y)`. Removing from an empty site is a no-op. Returns the
    /// id of the removed particle, if there was one.
    pub fn remove_particle(&mut self, x: usize, y: usize) -> Result<Option<ParticleId>, LatticeError> {
        self.validate_coordinates(x, y)?;
        Ok(self.vacate(Position::new(x, y)))
    }

    /// Hop the particle at `(x, y)` one site along its own orientation.
    pub fn move_particle(&mut self, x: usize, y: usize) -> Result<MoveOutcome, LatticeError> {
        let orientation = self.validate_occupancy(x, y)?;
        let from = Position::new(x, y);
        let to = self.target_position(x, y, orientation)?;

        if self.obstacles[to] {
            let reversed = orientation.flipped();
            self.orientations[from] = reversed;
            log::trace!("particle at ({x}, {y}) reflected off obstacle at ({}, {})", to.x, to.y);
            return Ok(MoveOutcome::Reflected {
                at: from,
                orientation: reversed,
            });
        }
        self.displace(from, to)
    }

    /// Move the particle at `(x, y)` one site along an external `direction`
    /// (flow advection). The particle keeps its orientation. An obstacle
    /// ahead blocks the move without reflecting.
    pub fn transport_particle(
        &mut self,
        x: usize,
        y: usize,
        direction: Orientation,
    ) -> Result<MoveOutcome, LatticeError> {
        if direction.is_empty() {
            return Err(LatticeError::InvalidOrientation { dx: 0, dy: 0 });
        }
        self.validate_occupancy(x, y)?;
        let from = Position::new(x, y);
        let to = self.target_position(x, y, direction)?;

        if self.obstacles[to] {
            log::trace!("transport of ({x}, {y}) blocked by obstacle at ({}, {})", to.x, to.y);
            return Ok(MoveOutcome::Blocked { at: from });
        }
        self.displace(from, to)
    }

    /// Shared tail of hop and transport once obstacles are ruled out.
    fn displace(&mut self, from: Position, to: Position) -> Result<MoveOutcome, LatticeError> {
        if self.sinks[to] {
            self.vacate(from);
            log::trace!("particle from ({}, {}) absorbed by sink at ({}, {})", from.x, from.y, to.x, to.y);
            return Ok(MoveOutcome::Absorbed { from, sink: to });
        }
        if !self.orientations[to].is_empty() {
            return Err(LatticeError::Occupied { x: to.x, y: to.y });
        }
        self.relocate(from, to);
        Ok(MoveOutcome::Moved { from, to })
    }

    /// Set the orientation of the particle at `(x, y)`.
    ///
    /// Returns `Ok(false)` without writing if the particle already has that
    /// orientation.
    pub fn reorient_particle(
        &mut self,
        x: usize,
        y: usize,
        orientation: Orientation,
    ) -> Result<bool, LatticeError> {
        if orientation.is_empty() {
            return Err(LatticeError::InvalidOrientation { dx: 0, dy: 0 });
        }
        let current = self.validate_occupancy(x, y)?;
        if current == orientation {
            return Ok(false);
        }
        self.orientations[(x, y)] = orientation;
        Ok(true)
    }

    /// Rotate the site at `(x, y)` by 90 degrees. Empty sites stay empty.
    pub fn rotate(&mut self, x: usize, y: usize, clockwise: bool) -> Result<(), LatticeError> {
        self.validate_coordinates(x, y)?;
        let o = &mut self.orientations[(x, y)];
        *o = o.rotated(clockwise);
        Ok(())
    }

    /// Turn the site at `(x, y)` by 180 degrees in place.
    pub fn flip(&mut self, x: usize, y: usize) -> Result<(), LatticeError> {
        self.validate_coordinates(x, y)?;
        let o = &mut self.orientations[(x, y)];
        *o = o.flipped();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Whole-lattice rotation
    // -----------------------------------------------------------------------

    /// Orientations after a 90 degree rotation of the sites selected by
    /// `mask` (all sites if `None`), without touching the lattice.
    pub fn rotated_orientations(
        &self,
        clockwise: bool,
        mask: Option<&Grid<bool>>,
    ) -> Result<Grid<Orientation>, LatticeError> {
        match mask {
            None => Ok(self.orientations.map(|o| o.rotated(clockwise))),
            Some(mask) => {
                self.validate_shape(mask)?;
                Ok(self
                    .orientations
                    .zip_map(mask, |&o, &m| if m { o.rotated(clockwise) } else { o }))
            }
        }
    }

    /// Rotate every site selected by `mask` (all sites if `None`).
    pub fn rotate_particles(
        &mut self,
        clockwise: bool,
        mask: Option<&Grid<bool>>,
    ) -> Result<(), LatticeError> {
        self.orientations = self.rotated_orientations(clockwise, mask)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Obstacles and sinks
    // -----------------------------------------------------------------------

    fn validate_unmarked(&self, x: usize, y: usize) -> Result<(), LatticeError> {
        self.validate_availability(x, y)?;
        if self.sinks[(x, y)] {
            return Err(LatticeError::Sink { x, y });
        }
        Ok(())
    }

    /// Mark `(x, y)` as an obstacle. The site must be empty, and neither an
    /// obstacle nor a sink already.
    pub fn set_obstacle(&mut self, x: usize, y: usize) -> Result<(), LatticeError> {
        self.validate_unmarked(x, y)?;
        self.obstacles[(x, y)] = true;
        Ok(())
    }

    /// Mark `(x, y)` as a sink. Same preconditions as [`set_obstacle`](Self::set_obstacle).
    pub fn set_sink(&mut self, x: usize, y: usize) -> Result<(), LatticeError> {
        self.validate_unmarked(x, y)?;
        self.sinks[(x, y)] = true;
        Ok(())
    }

    /// Replace the obstacle mask. Newly marked sites must hold no particle
    /// and no sink.
    pub fn set_obstacles(&mut self, mask: Grid<bool>) -> Result<(), LatticeError> {
        self.validate_shape(&mask)?;
        for (pos, _) in mask.indexed().filter(|(_, m)| **m) {
            if !self.orientations[pos].is_empty() {
                return Err(LatticeError::Occupied { x: pos.x, y: pos.y });
            }
            if self.sinks[pos] {
                return Err(LatticeError::Sink { x: pos.x, y: pos.y });
            }
        }
        self.obstacles = mask;
        Ok(())
    }

    /// Replace the sink mask. Newly marked sites must hold no particle and
    /// no obstacle.
    pub fn set_sinks(&mut self, mask: Grid<bool>) -> Result<(), LatticeError> {
        self.validate_shape(&mask)?;
        for (pos, _) in mask.indexed().filter(|(_, m)| **m) {
            if !self.orientations[pos].is_empty() {
                return Err(LatticeError::Occupied { x: pos.x, y: pos.y });
            }
            if self.obstacles[pos] {
                return Err(LatticeError::Obstacle { x: pos.x, y: pos.y });
            }
        }
        self.sinks = mask;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk population
    // -----------------------------------------------------------------------

    /// Single entry point for the population modes. Returns the number of
    /// particles placed.
    pub fn add_particles(&mut self, population: Population) -> Result<usize, LatticeError> {
        match population {
            Population::ByDensity { density } => self.populate(density),
            Population::BySpins { spins } => self.set_spins(spins),
            Population::ByRegionFlux {
                region,
                orientation,
                n,
            } => self.add_particle_flux(region, orientation, n),
        }
    }

    fn free_sites(&self, sites: impl Iterator<Item = Position>) -> Vec<Position> {
        sites
            .filter(|&p| !self.obstacles[p] && self.orientations[p].is_empty())
            .collect()
    }

    /// Fill `floor(density * non_obstacle_sites)` random free sites with
    /// randomly oriented particles.
    pub fn populate(&mut self, density: f64) -> Result<usize, LatticeError> {
        if !(0.0..=1.0).contains(&density) {
            return Err(LatticeError::InvalidDensity(density));
        }
        let non_obstacle = self.width * self.height - self.obstacles.count();
        let requested = (density * non_obstacle as f64).floor() as usize;

        let all_sites = Region::new(0, self.width - 1, 0, self.height - 1).positions();
        let free = self.free_sites(all_sites);
        if requested > free.len() {
            return Err(LatticeError::InsufficientSpace {
                requested,
                available: free.len(),
            });
        }

        for i in self.rng.sample_indices(free.len(), requested) {
            let orientation = self.random_orientation();
            self.place(free[i], orientation);
        }
        log::debug!("populated {requested} particles at density {density}");
        Ok(requested)
    }

    /// Place `n` particles at random free sites of `region`. A missing
    /// orientation is drawn independently per particle.
    pub fn add_particle_flux(
        &mut self,
        region: Region,
        orientation: Option<Orientation>,
        n: usize,
    ) -> Result<usize, LatticeError> {
        self.validate_region(region)?;
        if orientation == Some(Orientation::Empty) {
            return Err(LatticeError::InvalidOrientation { dx: 0, dy: 0 });
        }
        let free = self.free_sites(region.positions());
        if n > free.len() {
            return Err(LatticeError::InsufficientSpace {
                requested: n,
                available: free.len(),
            });
        }

        for i in self.rng.sample_indices(free.len(), n) {
            let o = match orientation {
                Some(o) => o,
                None => self.random_orientation(),
            };
            self.place(free[i], o);
        }
        log::debug!("added flux of {n} particles in {region:?}");
        Ok(n)
    }

    /// Replace the whole particle layer with `spins`. Existing particles are
    /// removed; new ids are assigned in row-major order.
    fn set_spins(&mut self, spins: Grid<Orientation>) -> Result<usize, LatticeError> {
        self.validate_shape(&spins)?;
        if let Some((pos, _)) = spins
            .indexed()
            .find(|(p, o)| !o.is_empty() && self.obstacles[*p])
        {
            return Err(LatticeError::Obstacle { x: pos.x, y: pos.y });
        }

        self.clear_particles();
        let mut placed = 0;
        for (pos, &o) in spins.indexed() {
            if !o.is_empty() {
                self.place(pos, o);
                placed += 1;
            }
        }
        log::debug!("replaced particle layer with {placed} spins");
        Ok(placed)
    }

    // -----------------------------------------------------------------------
    // Sub-lattices
    // -----------------------------------------------------------------------

    /// Copy `region` into a new lattice with fresh particle identities. The
    /// copy inherits the random stream state.
    pub fn crop(&self, region: Region) -> Result<Lattice, LatticeError> {
        self.validate_region(region)?;
        let mut out = Lattice::with_seed(region.width(), region.height(), 0)?;
        out.rng = self.rng.clone();
        for src in region.positions() {
            let dst = Position::new(src.x - region.x_min, src.y - region.y_min);
            out.obstacles[dst] = self.obstacles[src];
            out.sinks[dst] = self.sinks[src];
            let o = self.orientations[src];
            if !o.is_empty() {
                out.place(dst, o);
            }
        }
        Ok(out)
    }

    /// Whether every per-site layer is a well-formed grid of the lattice's
    /// non-zero shape.
    fn layers_match_shape(&self) -> bool {
        let fits = |width: usize, height: usize, well_formed: bool| {
            well_formed && width == self.width && height == self.height
        };
        self.width > 0
            && self.height > 0
            && fits(
                self.orientations.width(),
                self.orientations.height(),
                self.orientations.is_well_formed(),
            )
            && fits(
                self.obstacles.width(),
                self.obstacles.height(),
                self.obstacles.is_well_formed(),
            )
            && fits(self.sinks.width(), self.sinks.height(), self.sinks.is_well_formed())
            && fits(
                self.site_index.width(),
                self.site_index.height(),
                self.site_index.is_well_formed(),
            )
    }

    /// Check the identity invariant: every occupied site has exactly one id,
    /// every id points back at its site, and masks hold no particle where
    /// they should not. Used by tests and debug assertions.
    pub fn identity_is_consistent(&self) -> bool {
        if !self.layers_match_shape() {
            return false;
        }
        let occupied = self.orientations.iter().filter(|o| !o.is_empty()).count();
        if occupied != self.particles.len() {
            return false;
        }
        let sites_ok = self.orientations.indexed().all(|(pos, o)| {
            match self.site_index[pos] {
                Some(id) => !o.is_empty() && self.position_of(id) == Some(pos),
                None => o.is_empty(),
            }
        });
        let obstacles_clear = self
            .obstacles
            .indexed()
            .all(|(pos, &b)| !b || self.orientations[pos].is_empty());
        sites_ok && obstacles_clear
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

impl Lattice {
    /// Display glyph of one site. Obstacles and sinks take precedence over
    /// the particle glyph; a particle sitting on a sink shows as `✱`.
    pub fn glyph_at(&self, x: usize, y: usize) -> Result<char, LatticeError> {
        self.validate_coordinates(x, y)?;
        let o = self.orientations[(x, y)];
        Ok(if self.obstacles[(x, y)] {
            '■'
        } else if self.sinks[(x, y)] {
            if o.is_empty() { '▼' } else { '✱' }
        } else {
            o.glyph()
        })
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            if y > 0 {
                writeln!(f)?;
            }
            for x in 0..self.width {
                let glyph = self.glyph_at(x, y).map_err(|_| fmt::Error)?;
                write!(f, "{glyph} ")?;
            }
        }
        Ok(())
    }
}
