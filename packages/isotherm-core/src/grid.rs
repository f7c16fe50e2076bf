//! Bounding boxes, regular lattices and the sampled fields built on them.
//!
//! Lattice convention: both ends are inclusive. Node `(r, c)` of a `rows x cols` grid lies at
//!
//! ```text
//! x = min_x + c * (max_x - min_x) / (cols - 1)
//! y = min_y + r * (max_y - min_y) / (rows - 1)
//! ```
//!
//! so row 0 runs along `min_y` and the last row along `max_y`. A dimension with a single node
//! places it at the minimum.

use ndarray::Array2;

use crate::error::GridError;
use crate::tps::PointSet;

/// An axis-aligned rectangle in the coordinate frame of the samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Creates an explicit rectangle. Inverted or non-finite limits are rejected;
    /// zero width or height is allowed.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Self, GridError> {
        let finite = [min_x, max_x, min_y, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x > max_x || min_y > max_y {
            return Err(GridError::InvalidBounds {
                min_x,
                max_x,
                min_y,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// The tightest rectangle containing every sample position.
    pub fn from_points(points: &PointSet) -> Result<Self, GridError> {
        if points.is_empty() {
            return Err(GridError::EmptyPointSet);
        }
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        Self::new(min_x, max_x, min_y, max_y)
    }

    /// Grows the rectangle by `margin_x` on the left and right and `margin_y` on the top and
    /// bottom. Negative margins shrink it, as long as it does not invert.
    pub fn padded(&self, margin_x: f64, margin_y: f64) -> Result<Self, GridError> {
        Self::new(
            self.min_x - margin_x,
            self.max_x + margin_x,
            self.min_y - margin_y,
            self.max_y + margin_y,
        )
    }

    /// Pads each axis by `fraction` of its own extent.
    pub fn padded_by_fraction(&self, fraction: f64) -> Result<Self, GridError> {
        self.padded(fraction * self.width(), fraction * self.height())
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn encloses(&self, other: &Bounds) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }
}

/// Linearly spaced coordinate, inclusive of both ends.
#[inline]
fn lattice_coord(min: f64, max: f64, index: usize, count: usize) -> f64 {
    if count <= 1 || index == 0 {
        min
    } else if index >= count - 1 {
        max
    } else {
        min + (max - min) * index as f64 / (count - 1) as f64
    }
}

/// A uniform `rows x cols` lattice spanning a [`Bounds`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    bounds: Bounds,
    rows: usize,
    cols: usize,
}

impl Grid {
    pub fn new(bounds: Bounds, rows: usize, cols: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyResolution { rows, cols });
        }
        Ok(Self { bounds, rows, cols })
    }

    /// A `resolution x resolution` lattice.
    pub fn square(bounds: Bounds, resolution: usize) -> Result<Self, GridError> {
        Self::new(bounds, resolution, resolution)
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_at(&self, col: usize) -> f64 {
        lattice_coord(self.bounds.min_x, self.bounds.max_x, col, self.cols)
    }

    pub fn y_at(&self, row: usize) -> f64 {
        lattice_coord(self.bounds.min_y, self.bounds.max_y, row, self.rows)
    }

    /// Spacing between neighboring columns and rows, zero for single-node dimensions.
    pub fn spacing(&self) -> (f64, f64) {
        let dx = if self.cols > 1 {
            self.bounds.width() / (self.cols - 1) as f64
        } else {
            0.0
        };
        let dy = if self.rows > 1 {
            self.bounds.height() / (self.rows - 1) as f64
        } else {
            0.0
        };
        (dx, dy)
    }

    /// All node positions in row-major order.
    pub fn points(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::with_capacity(self.len());
        for r in 0..self.rows {
            let y = self.y_at(r);
            for c in 0..self.cols {
                out.push((self.x_at(c), y));
            }
        }
        out
    }
}

/// Scalar values sampled on a [`Grid`], indexed `[[row, col]]` like the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    values: Array2<f64>,
    bounds: Bounds,
}

impl Field {
    pub fn new(values: Array2<f64>, bounds: Bounds) -> Self {
        Self { values, bounds }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// `(rows, cols)`
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get([row, col]).copied()
    }

    /// `(min, max)` over the finite values, `None` if there are none.
    pub fn range(&self) -> Option<(f64, f64)> {
        let (lo, hi) = self
            .values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if lo.is_finite() {
            Some((lo, hi))
        } else {
            None
        }
    }
}
