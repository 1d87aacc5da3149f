//! Background flow coupling.
//!
//! A [`FlowField`] holds a prescribed velocity field and vorticity field and
//! turns them into extra per-site rates, in the same grid shape as the
//! interaction rates:
//!
//! - [`FlowField::compute_tm`] gives upwind advection rates per direction,
//!   with hard-core exclusion against occupied neighbours.
//! - [`FlowField::compute_tr`] gives vorticity-driven reorientation rates;
//!   the vorticity sign picks the rotation handedness.
//!
//! Velocities use the lattice convention: `y` grows downward, so a positive
//! `vy` pushes particles towards [`Orientation::Down`].
//!
//! The field never mutates a lattice.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::lattice::Lattice;
use crate::orientation::Orientation;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from configuring or evaluating a [`FlowField`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("flow dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("{field} grid shape {got:?} does not match flow shape {expected:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("Poiseuille channel needs at least 3 rows, got {0}")]
    ChannelTooShort(usize),
}

// ---------------------------------------------------------------------------
// Rate outputs
// ---------------------------------------------------------------------------

/// Advection rates, one grid per displacement direction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRates {
    pub up: Grid<f64>,
    pub down: Grid<f64>,
    pub left: Grid<f64>,
    pub right: Grid<f64>,
}

impl TransportRates {
    /// The rate grid for moves along `direction`; `None` for
    /// [`Orientation::Empty`].
    pub fn for_direction(&self, direction: Orientation) -> Option<&Grid<f64>> {
        match direction {
            Orientation::Up => Some(&self.up),
            Orientation::Down => Some(&self.down),
            Orientation::Left => Some(&self.left),
            Orientation::Right => Some(&self.right),
            Orientation::Empty => None,
        }
    }

    /// Sum over all directions and sites.
    pub fn total(&self) -> f64 {
        self.up.sum() + self.down.sum() + self.left.sum() + self.right.sum()
    }
}

/// Vorticity-driven reorientation rates.
///
/// At each occupied site exactly one of `rotate` (clockwise on screen, same
/// turn as the `Rotate` event) and `rotate_neg` carries `0.5 * |omega|`;
/// the other is zero. `target` is the orientation the site would turn to.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorientationRates {
    pub rotate: Grid<f64>,
    pub rotate_neg: Grid<f64>,
    pub target: Grid<Orientation>,
}

impl ReorientationRates {
    pub fn total(&self) -> f64 {
        self.rotate.sum() + self.rotate_neg.sum()
    }
}

// ---------------------------------------------------------------------------
// FlowField
// ---------------------------------------------------------------------------

/// Prescribed velocity and vorticity on a `width x height` grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowField {
    width: usize,
    height: usize,
    vx: Grid<f64>,
    vy: Grid<f64>,
    /// `|omega|`.
    vorticity: Grid<f64>,
    /// `omega > 0`.
    positive_vorticity: Grid<bool>,
    obstacles: Grid<bool>,
}

impl FlowField {
    /// A quiescent field: zero velocity, zero vorticity, no obstacles.
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            vx: Grid::filled(width, height, 0.0),
            vy: Grid::filled(width, height, 0.0),
            vorticity: Grid::filled(width, height, 0.0),
            positive_vorticity: Grid::filled(width, height, false),
            obstacles: Grid::filled(width, height, false),
        })
    }

    /// Constant velocity everywhere, no vorticity.
    pub fn uniform(width: usize, height: usize, vx: f64, vy: f64) -> Result<Self, FlowError> {
        let mut field = Self::new(width, height)?;
        field.vx.fill(vx);
        field.vy.fill(vy);
        log::debug!("uniform flow ({vx}, {vy}) on {width}x{height}");
        Ok(field)
    }

    /// Plane Poiseuille channel flow along `x` with peak speed `v1`.
    ///
    /// Row `i` gets the normalized coordinate `yy[i]`, the negated linspace
    /// from `-1 - 1/(h-2)` to `1 + 1/(h-2)`, so the no-slip walls sit just
    /// outside the first and last rows. Then `vx = v1 * (1 - yy^2)`,
    /// `vy = 0` and `omega = 2 * v1 * yy`.
    pub fn poiseuille(width: usize, height: usize, v1: f64) -> Result<Self, FlowError> {
        if height < 3 {
            return Err(FlowError::ChannelTooShort(height));
        }
        let mut field = Self::new(width, height)?;

        let edge = 1.0 + 1.0 / (height - 2) as f64;
        let step = 2.0 * edge / (height - 1) as f64;
        let yy: Vec<f64> = (0..height).map(|i| -(-edge + step * i as f64)).collect();

        field.vx = Grid::from_fn(width, height, |_, y| v1 * (1.0 - yy[y] * yy[y]));
        let omega = Grid::from_fn(width, height, |_, y| 2.0 * v1 * yy[y]);
        field.store_vorticity(omega);

        log::debug!("Poiseuille flow v1={v1} on {width}x{height}");
        Ok(field)
    }

    fn check_shape<T>(&self, field: &'static str, grid: &Grid<T>) -> Result<(), FlowError> {
        if grid.width() != self.width || grid.height() != self.height {
            return Err(FlowError::ShapeMismatch {
                field,
                expected: (self.height, self.width),
                got: grid.shape(),
            });
        }
        Ok(())
    }

    fn store_vorticity(&mut self, omega: Grid<f64>) {
        self.positive_vorticity = omega.map(|&w| w > 0.0);
        self.vorticity = omega.map(|w| w.abs());
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn set_velocity_field(&mut self, vx: Grid<f64>, vy: Grid<f64>) -> Result<(), FlowError> {
        self.check_shape("vx", &vx)?;
        self.check_shape("vy", &vy)?;
        self.vx = vx;
        self.vy = vy;
        Ok(())
    }

    /// Store a signed vorticity field as magnitude plus sign mask.
    pub fn set_vorticity_field(&mut self, omega: Grid<f64>) -> Result<(), FlowError> {
        self.check_shape("vorticity", &omega)?;
        self.store_vorticity(omega);
        Ok(())
    }

    /// Sites the flow cannot advect particles into.
    pub fn set_obstacles(&mut self, obstacles: Grid<bool>) -> Result<(), FlowError> {
        self.check_shape("obstacles", &obstacles)?;
        self.obstacles = obstacles;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn vx(&self) -> &Grid<f64> {
        &self.vx
    }

    pub fn vy(&self) -> &Grid<f64> {
        &self.vy
    }

    /// Vorticity magnitude.
    pub fn vorticity(&self) -> &Grid<f64> {
        &self.vorticity
    }

    pub fn positive_vorticity(&self) -> &Grid<bool> {
        &self.positive_vorticity
    }

    pub fn obstacles(&self) -> &Grid<bool> {
        &self.obstacles
    }

    // -----------------------------------------------------------------------
    // Rates
    // -----------------------------------------------------------------------

    /// Upwind advection rates for the given occupancy.
    ///
    /// The rate of a move along `d` is `max(0, v . d)`, and is zero unless
    /// the site is occupied and the neighbour along `d` is neither occupied
    /// nor a flow obstacle.
    pub fn compute_tm(&self, occupied: &Grid<bool>) -> Result<TransportRates, FlowError> {
        self.check_shape("occupancy", occupied)?;

        let rate_along = |direction: Orientation| {
            let (dx, dy) = direction.delta();
            Grid::from_fn(self.width, self.height, |x, y| {
                if !occupied[(x, y)] {
                    return 0.0;
                }
                let ahead = occupied.wrap(x, y, dx, dy);
                if occupied[ahead] || self.obstacles[ahead] {
                    return 0.0;
                }
                let speed = self.vx[(x, y)] * dx as f64 + self.vy[(x, y)] * dy as f64;
                speed.max(0.0)
            })
        };

        Ok(TransportRates {
            up: rate_along(Orientation::Up),
            down: rate_along(Orientation::Down),
            left: rate_along(Orientation::Left),
            right: rate_along(Orientation::Right),
        })
    }

    /// Vorticity-driven reorientation rates for the particles of `lattice`.
    ///
    /// Positive vorticity feeds `rotate` (clockwise on screen); zero or
    /// negative vorticity feeds `rotate_neg`.
    pub fn compute_tr(&self, lattice: &Lattice) -> Result<ReorientationRates, FlowError> {
        let spins = lattice.orientations();
        self.check_shape("lattice", spins)?;

        let magnitude = |x: usize, y: usize| {
            if spins[(x, y)].is_empty() {
                0.0
            } else {
                0.5 * self.vorticity[(x, y)]
            }
        };
        let rotate = Grid::from_fn(self.width, self.height, |x, y| {
            if self.positive_vorticity[(x, y)] { magnitude(x, y) } else { 0.0 }
        });
        let rotate_neg = Grid::from_fn(self.width, self.height, |x, y| {
            if self.positive_vorticity[(x, y)] { 0.0 } else { magnitude(x, y) }
        });
        let target = spins.zip_map(&self.positive_vorticity, |o, &positive| o.rotated(positive));

        Ok(ReorientationRates {
            rotate,
            rotate_neg,
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Position;

    fn occupancy(width: usize, height: usize, sites: &[(usize, usize)]) -> Grid<bool> {
        Grid::from_fn(width, height, |x, y| sites.contains(&(x, y)))
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(
            FlowField::new(0, 4),
            Err(FlowError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn uniform_flow_moves_along_velocity_only() {
        let flow = FlowField::uniform(5, 5, 2.0, 0.0).unwrap();
        let tm = flow.compute_tm(&occupancy(5, 5, &[(2, 2)])).unwrap();

        assert_eq!(tm.right[(2, 2)], 2.0);
        assert_eq!(tm.left[(2, 2)], 0.0);
        assert_eq!(tm.up[(2, 2)], 0.0);
        assert_eq!(tm.down[(2, 2)], 0.0);
        assert_eq!(tm.total(), 2.0);
    }

    #[test]
    fn positive_vy_points_down() {
        let flow = FlowField::uniform(4, 4, 0.0, 1.5).unwrap();
        let tm = flow.compute_tm(&occupancy(4, 4, &[(1, 1)])).unwrap();
        assert_eq!(tm.down[(1, 1)], 1.5);
        assert_eq!(tm.up[(1, 1)], 0.0);

        let flow = FlowField::uniform(4, 4, -0.5, -1.0).unwrap();
        let tm = flow.compute_tm(&occupancy(4, 4, &[(1, 1)])).unwrap();
        assert_eq!(tm.up[(1, 1)], 1.0);
        assert_eq!(tm.left[(1, 1)], 0.5);
        assert_eq!(tm.for_direction(Orientation::Right).unwrap()[(1, 1)], 0.0);
        assert!(tm.for_direction(Orientation::Empty).is_none());
    }

    #[test]
    fn transport_excludes_occupied_neighbours_and_empty_sites() {
        let flow = FlowField::uniform(5, 5, 1.0, 0.0).unwrap();
        let tm = flow
            .compute_tm(&occupancy(5, 5, &[(1, 1), (2, 1), (4, 3)]))
            .unwrap();

        // Blocked by the particle ahead.
        assert_eq!(tm.right[(1, 1)], 0.0);
        assert_eq!(tm.right[(2, 1)], 1.0);
        // Wraps to (0, 3), which is empty.
        assert_eq!(tm.right[(4, 3)], 1.0);
        // Empty site carries nothing.
        assert_eq!(tm.right[(0, 0)], 0.0);
    }

    #[test]
    fn transport_blocked_by_flow_obstacles() {
        let mut flow = FlowField::uniform(5, 5, 1.0, 0.0).unwrap();
        flow.set_obstacles(occupancy(5, 5, &[(3, 2)])).unwrap();
        let tm = flow.compute_tm(&occupancy(5, 5, &[(2, 2)])).unwrap();
        assert_eq!(tm.right[(2, 2)], 0.0);
    }

    #[test]
    fn shape_mismatches_rejected() {
        let mut flow = FlowField::new(4, 4).unwrap();
        assert!(matches!(
            flow.compute_tm(&Grid::filled(3, 4, false)),
            Err(FlowError::ShapeMismatch { field: "occupancy", .. })
        ));
        assert!(flow
            .set_velocity_field(Grid::filled(4, 4, 0.0), Grid::filled(4, 5, 0.0))
            .is_err());
        assert!(flow.set_vorticity_field(Grid::filled(5, 4, 0.0)).is_err());
        assert!(flow.set_obstacles(Grid::filled(1, 1, true)).is_err());

        let lattice = Lattice::new(3, 3).unwrap();
        assert!(flow.compute_tr(&lattice).is_err());
    }

    #[test]
    fn vorticity_stored_as_magnitude_and_sign() {
        let mut flow = FlowField::new(2, 1).unwrap();
        flow.set_vorticity_field(Grid::from_vec(2, 1, vec![-3.0, 2.0]).unwrap())
            .unwrap();
        assert_eq!(flow.vorticity().cells(), &[3.0, 2.0]);
        assert_eq!(flow.positive_vorticity().cells(), &[false, true]);
    }

    #[test]
    fn reorientation_follows_vorticity_sign() {
        let mut lattice = Lattice::new(3, 1).unwrap();
        lattice.add_particle(0, 0, Some(Orientation::Up)).unwrap();
        lattice.add_particle(1, 0, Some(Orientation::Up)).unwrap();

        let mut flow = FlowField::new(3, 1).unwrap();
        flow.set_vorticity_field(Grid::from_vec(3, 1, vec![4.0, -2.0, 6.0]).unwrap())
            .unwrap();
        let tr = flow.compute_tr(&lattice).unwrap();

        assert_eq!(tr.rotate[(0, 0)], 2.0);
        assert_eq!(tr.rotate_neg[(0, 0)], 0.0);
        assert_eq!(tr.target[(0, 0)], Orientation::Right);

        assert_eq!(tr.rotate[(1, 0)], 0.0);
        assert_eq!(tr.rotate_neg[(1, 0)], 1.0);
        assert_eq!(tr.target[(1, 0)], Orientation::Left);

        // No particle, no rate.
        assert_eq!(tr.rotate[(2, 0)], 0.0);
        assert_eq!(tr.target[(2, 0)], Orientation::Empty);
        assert_eq!(tr.total(), 3.0);
    }

    #[test]
    fn poiseuille_profile() {
        let flow = FlowField::poiseuille(4, 12, 1.0).unwrap();
        let edge = 1.0 + 1.0 / 10.0;

        // Top row sits at yy = +edge, bottom at -edge.
        let top = 1.0 - edge * edge;
        assert!((flow.vx()[(0, 0)] - top).abs() < 1e-12);
        assert!((flow.vx()[(3, 11)] - top).abs() < 1e-12);
        assert_eq!(flow.vy().sum(), 0.0);

        // Symmetric about the centreline, fastest in the middle rows.
        for y in 0..6 {
            assert!((flow.vx()[(1, y)] - flow.vx()[(1, 11 - y)]).abs() < 1e-12);
        }
        assert!(flow.vx()[(0, 5)] > flow.vx()[(0, 1)]);

        // omega = 2 * v1 * yy: positive in the top half.
        assert!(flow.positive_vorticity()[(0, 0)]);
        assert!(!flow.positive_vorticity()[(0, 11)]);
        assert!((flow.vorticity()[(2, 0)] - 2.0 * edge).abs() < 1e-12);
        assert!((flow.vorticity()[(2, 11)] - 2.0 * edge).abs() < 1e-12);
    }

    #[test]
    fn poiseuille_needs_three_rows() {
        assert_eq!(
            FlowField::poiseuille(5, 2, 1.0),
            Err(FlowError::ChannelTooShort(2))
        );
        assert!(FlowField::poiseuille(5, 3, 1.0).is_ok());
    }

    #[test]
    fn advected_particle_follows_rates() {
        let mut lattice = Lattice::new(6, 6).unwrap();
        lattice.add_particle(2, 3, Some(Orientation::Down)).unwrap();
        let flow = FlowField::uniform(6, 6, 1.0, 0.0).unwrap();
        let tm = flow.compute_tm(&lattice.occupancy()).unwrap();

        let (site, _) = tm.right.indexed().find(|(_, r)| **r > 0.0).unwrap();
        assert_eq!(site, Position::new(2, 3));
        lattice
            .transport_particle(site.x, site.y, Orientation::Right)
            .unwrap();
        assert_eq!(lattice.get_particle_orientation(3, 3).unwrap(), Orientation::Down);
    }
}
