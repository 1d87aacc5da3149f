//! Dense periodic 2D grids.
//!
//! Every per-site quantity in the engine (orientations, masks, forces,
//! energies, rates, flow fields) lives in a [`Grid`]: a row-major buffer of
//! `width * height` cells addressed by `(x, y)` with `y` growing downward.
//! Whole-grid constructors go through [`Grid::from_fn`], which runs across
//! the rayon thread pool when the `parallel` feature is enabled.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Positions and regions
// ---------------------------------------------------------------------------

/// A site on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl From<(usize, usize)> for Position {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned block of sites, bounds inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

impl Region {
    pub fn new(x_min: usize, x_max: usize, y_min: usize, y_max: usize) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn width(&self) -> usize {
        self.x_max.saturating_sub(self.x_min) + 1
    }

    pub fn height(&self) -> usize {
        self.y_max.saturating_sub(self.y_min) + 1
    }

    /// Number of sites in the region.
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// A region is well-formed when its bounds are ordered.
    pub fn is_ordered(&self) -> bool {
        self.x_min <= self.x_max && self.y_min <= self.y_max
    }

    /// Iterate over all sites, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let (x_min, x_max) = (self.x_min, self.x_max);
        (self.y_min..=self.y_max).flat_map(move |y| (x_min..=x_max).map(move |x| Position::new(x, y)))
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A dense `width x height` array stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid from a row-major buffer. Returns `None` if the buffer
    /// length does not equal `width * height`.
    pub fn from_vec(width: usize, height: usize, cells: Vec<T>) -> Option<Self> {
        (cells.len() == width * height).then_some(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a grid from a list of equally long rows (top row first).
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        let cells = rows.into_iter().flatten().collect();
        Self::from_vec(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(height, width)`, row count first.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the buffer holds exactly `width * height` cells. Always true
    /// for grids built here; decoded grids must be checked.
    pub fn is_well_formed(&self) -> bool {
        self.width.checked_mul(self.height) == Some(self.cells.len())
    }

    /// Whether two grids cover the same topology.
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if self.contains(x, y) {
            Some(&self.cells[self.offset(x, y)])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if self.contains(x, y) {
            let i = self.offset(x, y);
            Some(&mut self.cells[i])
        } else {
            None
        }
    }

    /// Periodic neighbour of `(x, y)` displaced by `(dx, dy)`.
    #[inline]
    pub fn wrap(&self, x: usize, y: usize, dx: i32, dy: i32) -> (usize, usize) {
        let w = self.width as i64;
        let h = self.height as i64;
        let nx = (x as i64 + dx as i64).rem_euclid(w);
        let ny = (y as i64 + dy as i64).rem_euclid(h);
        (nx as usize, ny as usize)
    }

    /// Row-major view of the cells.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.cells.iter()
    }

    /// Iterate `(position, cell)` pairs in row-major order.
    pub fn indexed(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (Position::new(i % width, i / width), c))
    }

    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        self.cells.chunks(self.width.max(1))
    }
}

impl<T: Clone> Grid<T> {
    /// A grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T: Send> Grid<T> {
    /// Build a grid by evaluating `f(x, y)` at every site.
    ///
    /// With the `parallel` feature the sites are evaluated on the rayon
    /// pool; the result is identical either way.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> T + Sync + Send,
    {
        let n = width * height;

        #[cfg(feature = "parallel")]
        let cells: Vec<T> = {
            use rayon::prelude::*;
            (0..n)
                .into_par_iter()
                .map(|i| f(i % width, i / width))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let cells: Vec<T> = (0..n).map(|i| f(i % width, i / width)).collect();

        Self {
            width,
            height,
            cells,
        }
    }
}

impl<T: Sync> Grid<T> {
    /// Elementwise map into a new grid.
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        Grid::from_fn(self.width, self.height, |x, y| f(&self[(x, y)]))
    }

    /// Elementwise combination of two same-shaped grids.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ; callers validate shapes first.
    pub fn zip_map<U, V, F>(&self, other: &Grid<U>, f: F) -> Grid<V>
    where
        U: Sync,
        V: Send,
        F: Fn(&T, &U) -> V + Sync + Send,
    {
        assert!(self.same_shape(other), "zip_map on mismatched grids");
        Grid::from_fn(self.width, self.height, |x, y| {
            f(&self[(x, y)], &other[(x, y)])
        })
    }
}

impl Grid<f64> {
    /// Sum of all cells.
    pub fn sum(&self) -> f64 {
        self.cells.iter().sum()
    }
}

impl Grid<bool> {
    /// Number of `true` cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (x, y): (usize, usize)) -> &T {
        assert!(self.contains(x, y), "({x}, {y}) outside {}x{} grid", self.width, self.height);
        &self.cells[self.offset(x, y)]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        assert!(self.contains(x, y), "({x}, {y}) outside {}x{} grid", self.width, self.height);
        let i = self.offset(x, y);
        &mut self.cells[i]
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    fn index(&self, p: Position) -> &T {
        &self[(p.x, p.y)]
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    fn index_mut(&mut self, p: Position) -> &mut T {
        &mut self[(p.x, p.y)]
    }
}
