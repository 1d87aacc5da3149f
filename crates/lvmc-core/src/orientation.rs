//! Discrete particle orientations and their vector algebra.
//!
//! Orientations are unit vectors on the square lattice using screen-style
//! deltas: `y` grows downward, so [`Orientation::Up`] is `(0, -1)`.
//! Clockwise rotation (as seen on screen) maps `(dx, dy)` to `(-dy, dx)`.

use serde::{Deserialize, Serialize};

/// The state vector of a single site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    /// No particle.
    #[default]
    Empty,
    Up,
    Down,
    Left,
    Right,
}

impl Orientation {
    /// The four particle-carrying orientations.
    pub const ALL: [Orientation; 4] = [
        Orientation::Up,
        Orientation::Left,
        Orientation::Down,
        Orientation::Right,
    ];

    /// `(dx, dy)` unit vector; `(0, 0)` for [`Orientation::Empty`].
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Orientation::Empty => (0, 0),
            Orientation::Up => (0, -1),
            Orientation::Down => (0, 1),
            Orientation::Left => (-1, 0),
            Orientation::Right => (1, 0),
        }
    }

    /// The vector as floats, for energy arithmetic.
    #[inline]
    pub fn vector(self) -> [f64; 2] {
        let (dx, dy) = self.delta();
        [dx as f64, dy as f64]
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Orientation::Empty
    }

    /// Euclidean norm: 1 for particles, 0 for empty sites.
    #[inline]
    pub fn norm(self) -> f64 {
        if self.is_empty() { 0.0 } else { 1.0 }
    }

    /// Rotate by 90 degrees. Empty stays empty.
    pub fn rotated(self, clockwise: bool) -> Self {
        let (dx, dy) = self.delta();
        let (rx, ry) = if clockwise { (-dy, dx) } else { (dy, -dx) };
        match (rx, ry) {
            (0, -1) => Orientation::Up,
            (0, 1) => Orientation::Down,
            (-1, 0) => Orientation::Left,
            (1, 0) => Orientation::Right,
            _ => Orientation::Empty,
        }
    }

    /// Turn by 180 degrees (negate the vector).
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Empty => Orientation::Empty,
            Orientation::Up => Orientation::Down,
            Orientation::Down => Orientation::Up,
            Orientation::Left => Orientation::Right,
            Orientation::Right => Orientation::Left,
        }
    }

    /// Display glyph.
    pub fn glyph(self) -> char {
        match self {
            Orientation::Empty => '·',
            Orientation::Up => '↑',
            Orientation::Down => '↓',
            Orientation::Left => '←',
            Orientation::Right => '→',
        }
    }

    /// Inverse of [`glyph`](Self::glyph). Also accepts ASCII stand-ins
    /// (`^ v < > .`) so spin layouts can be typed in config files.
    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '·' | '.' => Some(Orientation::Empty),
            '↑' | '^' => Some(Orientation::Up),
            '↓' | 'v' => Some(Orientation::Down),
            '←' | '<' => Some(Orientation::Left),
            '→' | '>' => Some(Orientation::Right),
            _ => None,
        }
    }
}
