//! Thin-Plate Spline (TPS) interpolation of scattered samples.
//!
//! The interpolant has the form
//!
//! ```text
//! f(x, y) = a0 + a1*x + a2*y + sum_i w_i * U(|(x, y) - p_i|),    U(r) = r^2 * ln(r^2)
//! ```
//!
//! and is found by solving the block system
//!
//! ```text
//! | K + lambda*I  P | | w |   | v |
//! | P.T           0 | | a | = | 0 |
//! ```
//!
//! The system is assembled in a normalized frame: coordinates are centered on the middle of
//! the bounding box and divided by its larger half-extent. Geographic coordinates (a spread of
//! a tenth of a degree around -123 / 49) would otherwise mix kernel entries of order 1e-2 with
//! affine entries of order 1e2. The TPS surface is invariant under translation and uniform
//! scaling, so the coefficients in the caller's frame are recovered exactly, see
//! [`Interpolant::coefficients`].

use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::error::TpsError;
use crate::grid::{Field, Grid};

/// Smallest accepted ratio between the smallest and the largest LU pivot.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// The TPS basis function evaluated from a squared distance: U = r^2 * ln(r^2).
/// U(0) = 0, which is also the limit for r -> 0.
#[inline]
fn tps_basis(r_squared: f64) -> f64 {
    if r_squared == 0.0 {
        0.0
    } else {
        r_squared * r_squared.ln()
    }
}

/// A measured scalar at a planar position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }
}

/// An ordered collection of sample points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<SamplePoint>,
}

impl PointSet {
    pub fn new(points: Vec<SamplePoint>) -> Self {
        Self { points }
    }

    /// Builds a point set from `(x, y, value)` triples.
    pub fn from_triples(triples: &[(f64, f64, f64)]) -> Self {
        triples
            .iter()
            .map(|&(x, y, value)| SamplePoint::new(x, y, value))
            .collect()
    }

    pub fn push(&mut self, point: SamplePoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SamplePoint> {
        self.points.iter()
    }

    /// Returns `(min, max)` of the sample values, or `None` for an empty set.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), p| (lo.min(p.value), hi.max(p.value)),
        ))
    }
}

impl FromIterator<SamplePoint> for PointSet {
    fn from_iter<I: IntoIterator<Item = SamplePoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a SamplePoint;
    type IntoIter = std::slice::Iter<'a, SamplePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Translation and uniform scale mapping caller coordinates into the fitting frame.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    cx: f64,
    cy: f64,
    scale: f64,
}

impl Frame {
    fn of(points: &PointSet) -> Self {
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        let half_extent = (0.5 * (max_x - min_x)).max(0.5 * (max_y - min_y));
        // All points coincide: any scale works, the fit is rejected later anyway.
        let scale = if half_extent > 0.0 && half_extent.is_finite() {
            half_extent
        } else {
            1.0
        };
        Self {
            cx: 0.5 * (min_x + max_x),
            cy: 0.5 * (min_y + max_y),
            scale,
        }
    }

    #[inline]
    fn to_local(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.cx) / self.scale, (y - self.cy) / self.scale)
    }
}

/// A fitted thin-plate spline.
///
/// Holds the control positions and the `N + 3` solution coefficients, both expressed in the
/// internal normalized frame. Immutable after [`fit`]; it is `Send + Sync` and can be shared
/// freely between evaluating threads.
#[derive(Debug, Clone)]
pub struct Interpolant {
    controls: Vec<(f64, f64)>,
    solution: DVector<f64>,
    frame: Frame,
    regularization: f64,
}

impl Interpolant {
    /// Number of control points.
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// The regularization used for the fit, in caller units.
    pub fn regularization(&self) -> f64 {
        self.regularization
    }

    /// Control point positions in the caller's frame.
    pub fn control_points(&self) -> Vec<(f64, f64)> {
        self.controls
            .iter()
            .map(|&(u, v)| {
                (
                    self.frame.cx + u * self.frame.scale,
                    self.frame.cy + v * self.frame.scale,
                )
            })
            .collect()
    }

    /// Radial weights `w_i` in the caller's frame.
    pub fn weights(&self) -> Vec<f64> {
        let s2 = self.frame.scale * self.frame.scale;
        (0..self.len()).map(|i| self.solution[i] / s2).collect()
    }

    /// Affine coefficients `[a0, a1, a2]` in the caller's frame.
    ///
    /// Scaling the kernel argument by `1/s` turns `U` into `U/s^2` plus a multiple of `r^2`.
    /// Under the side conditions `P.T w = 0` that multiple collapses to a constant, which is
    /// folded into `a0` here.
    pub fn affine(&self) -> [f64; 3] {
        let n = self.len();
        let Frame { cx, cy, scale } = self.frame;
        let a1 = self.solution[n + 1] / scale;
        let a2 = self.solution[n + 2] / scale;
        let spread: f64 = self
            .controls
            .iter()
            .enumerate()
            .map(|(i, &(u, v))| self.solution[i] * (u * u + v * v))
            .sum();
        let a0 = self.solution[n] - a1 * cx - a2 * cy - (scale * scale).ln() * spread;
        [a0, a1, a2]
    }

    /// All coefficients `[w_1, ..., w_N, a0, a1, a2]` in the caller's frame.
    pub fn coefficients(&self) -> DVector<f64> {
        let mut all = self.weights();
        all.extend_from_slice(&self.affine());
        DVector::from_vec(all)
    }

    /// Evaluates the spline at a single position.
    pub fn value_at(&self, x: f64, y: f64) -> f64 {
        let n = self.controls.len();
        let (u, v) = self.frame.to_local(x, y);
        // Start with the affine part of the model.
        let mut val = self.solution[n] + self.solution[n + 1] * u + self.solution[n + 2] * v;
        for (i, &(cu, cv)) in self.controls.iter().enumerate() {
            let r_squared = (u - cu).powi(2) + (v - cv).powi(2);
            val += self.solution[i] * tps_basis(r_squared);
        }
        val
    }
}

/// Fits an exactly interpolating thin-plate spline (`lambda = 0`).
pub fn fit_exact(points: &PointSet) -> Result<Interpolant, TpsError> {
    fit(points, 0.0)
}

/// Fits a Thin-Plate Spline to a set of sample points.
///
/// # Arguments
/// * `points` - At least three samples, not all on one line, without coincident positions.
/// * `regularization` - `lambda >= 0` added to the diagonal of K, in the caller's units.
///   `0.0` makes the surface pass through every sample.
///
/// # Errors
/// [`TpsError::SingularSystem`] when the system has no unique solution,
/// [`TpsError::InvalidRegularization`] for a negative or non-finite `lambda` and
/// [`TpsError::NonFinitePoint`] for NaN or infinite input.
pub fn fit(points: &PointSet, regularization: f64) -> Result<Interpolant, TpsError> {
    if !regularization.is_finite() || regularization < 0.0 {
        return Err(TpsError::InvalidRegularization(regularization));
    }
    if let Some(index) = points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.value.is_finite()))
    {
        return Err(TpsError::NonFinitePoint { index });
    }

    let n = points.len();
    if n < 3 {
        return Err(TpsError::SingularSystem(format!(
            "{} point(s) given, at least 3 non-collinear points are required",
            n
        )));
    }
    let m_size = n + 3; // n weights + 3 affine coefficients

    let frame = Frame::of(points);
    let controls: Vec<(f64, f64)> = points.iter().map(|p| frame.to_local(p.x, p.y)).collect();
    // K shrinks by scale^2 in the normalized frame, so lambda has to follow.
    let local_lambda = regularization / (frame.scale * frame.scale);

    // The first n entries are the sample values, the last 3 stay zero.
    let mut y_vector = DVector::<f64>::zeros(m_size);
    for (i, p) in points.iter().enumerate() {
        y_vector[i] = p.value;
    }

    let mut l_matrix = DMatrix::<f64>::zeros(m_size, m_size);

    // K (top-left, n x n) with lambda on the diagonal
    for r in 0..n {
        for c in 0..n {
            let (ur, vr) = controls[r];
            let (uc, vc) = controls[c];
            l_matrix[(r, c)] = tps_basis((ur - uc).powi(2) + (vr - vc).powi(2));
        }
        l_matrix[(r, r)] += local_lambda;
    }

    // P (top-right, n x 3) and P.T (bottom-left, 3 x n)
    for (i, &(u, v)) in controls.iter().enumerate() {
        l_matrix[(i, n)] = 1.0;
        l_matrix[(i, n + 1)] = u;
        l_matrix[(i, n + 2)] = v;
        l_matrix[(n, i)] = 1.0;
        l_matrix[(n + 1, i)] = u;
        l_matrix[(n + 2, i)] = v;
    }

    let lu = l_matrix.lu();

    // nalgebra only refuses exactly zero pivots; duplicates and collinear sets usually leave
    // round-off sized ones instead.
    let pivots = lu.u().diagonal().map(f64::abs);
    let max_pivot = pivots.max();
    let min_pivot = pivots.min();
    if max_pivot == 0.0 || min_pivot <= PIVOT_TOLERANCE * max_pivot {
        return Err(TpsError::SingularSystem(format!(
            "pivot ratio {:.3e} is below {:.0e}; check for duplicate or collinear points",
            if max_pivot > 0.0 { min_pivot / max_pivot } else { 0.0 },
            PIVOT_TOLERANCE
        )));
    }

    let solution = lu.solve(&y_vector).ok_or_else(|| {
        TpsError::SingularSystem("LU solve failed, the matrix is not invertible".to_string())
    })?;
    if solution.iter().any(|w| !w.is_finite()) {
        return Err(TpsError::SingularSystem(
            "solution contains non-finite coefficients".to_string(),
        ));
    }

    Ok(Interpolant {
        controls,
        solution,
        frame,
        regularization,
    })
}

/// Evaluates a fitted spline at many positions.
///
/// Points are independent, so the work is spread over the rayon pool. The output keeps the
/// order of `query_points`.
pub fn evaluate(query_points: &[(f64, f64)], interpolant: &Interpolant) -> Vec<f64> {
    query_points
        .par_iter()
        .map(|&(x, y)| interpolant.value_at(x, y))
        .collect()
}

/// Evaluates a fitted spline at every node of `grid`, one rayon task per row.
pub fn evaluate_grid(grid: &Grid, interpolant: &Interpolant) -> Field {
    let mut values = Array2::<f64>::zeros((grid.rows(), grid.cols()));
    values
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(r, mut row)| {
            let y = grid.y_at(r);
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = interpolant.value_at(grid.x_at(c), y);
            }
        });
    Field::new(values, *grid.bounds())
}
