//! Marching squares over a sampled field.

use isotherm_core::Field;
use rayon::prelude::*;

/// A straight piece of an isotherm, in the coordinate frame of the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: (f64, f64),
    pub b: (f64, f64),
}

impl Segment {
    pub fn midpoint(&self) -> (f64, f64) {
        (0.5 * (self.a.0 + self.b.0), 0.5 * (self.a.1 + self.b.1))
    }
}

/// All segments of one level.
#[derive(Debug, Clone)]
pub struct Isoline {
    pub level: f64,
    pub segments: Vec<Segment>,
}

impl Isoline {
    /// A point on the line suitable for a text label, if the line exists.
    pub fn label_anchor(&self) -> Option<(f64, f64)> {
        self.segments
            .get(self.segments.len() / 2)
            .map(Segment::midpoint)
    }
}

/// Edge indices of a cell: 0 bottom, 1 right, 2 top, 3 left.
/// Corners: `v00` at (r, c), `v01` at (r, c+1), `v11` at (r+1, c+1), `v10` at (r+1, c).
fn cell_segments(
    corners: [f64; 4],
    origin: (f64, f64),
    step: (f64, f64),
    level: f64,
    out: &mut Vec<Segment>,
) {
    let [v00, v01, v11, v10] = corners;
    if corners.iter().any(|v| !v.is_finite()) {
        return;
    }
    let above = |v: f64| v >= level;
    let (x0, y0) = origin;
    let (dx, dy) = step;

    let t = |a: f64, b: f64| {
        let d = b - a;
        if d == 0.0 {
            0.5
        } else {
            ((level - a) / d).clamp(0.0, 1.0)
        }
    };
    let edge_point = |edge: usize| match edge {
        0 => (x0 + t(v00, v01) * dx, y0),
        1 => (x0 + dx, y0 + t(v01, v11) * dy),
        2 => (x0 + t(v10, v11) * dx, y0 + dy),
        _ => (x0, y0 + t(v00, v10) * dy),
    };

    let crossings: Vec<usize> = [(v00, v01), (v01, v11), (v10, v11), (v00, v10)]
        .iter()
        .enumerate()
        .filter(|(_, &(a, b))| above(a) != above(b))
        .map(|(edge, _)| edge)
        .collect();

    match crossings.len() {
        2 => out.push(Segment {
            a: edge_point(crossings[0]),
            b: edge_point(crossings[1]),
        }),
        4 => {
            // Saddle: the center value decides which diagonal stays connected.
            let center = 0.25 * (v00 + v01 + v11 + v10);
            let pairs = if above(center) == above(v00) {
                [(0, 1), (2, 3)]
            } else {
                [(3, 0), (1, 2)]
            };
            for (e1, e2) in pairs {
                out.push(Segment {
                    a: edge_point(e1),
                    b: edge_point(e2),
                });
            }
        }
        _ => {}
    }
}

/// Extracts the segments of one level. Cells touching a non-finite value are skipped.
pub fn march_squares(field: &Field, level: f64) -> Vec<Segment> {
    let values = field.values();
    let (rows, cols) = values.dim();
    let mut segments = Vec::new();
    if rows < 2 || cols < 2 || !level.is_finite() {
        return segments;
    }
    let bounds = field.bounds();
    let dx = bounds.width() / (cols - 1) as f64;
    let dy = bounds.height() / (rows - 1) as f64;

    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            let corners = [
                values[[r, c]],
                values[[r, c + 1]],
                values[[r + 1, c + 1]],
                values[[r + 1, c]],
            ];
            let origin = (bounds.min_x + c as f64 * dx, bounds.min_y + r as f64 * dy);
            cell_segments(corners, origin, (dx, dy), level, &mut segments);
        }
    }
    segments
}

/// Extracts every level in parallel, keeping the order of `levels`.
pub fn isolines(field: &Field, levels: &[f64]) -> Vec<Isoline> {
    levels
        .par_iter()
        .map(|&level| Isoline {
            level,
            segments: march_squares(field, level),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isotherm_core::Bounds;
    use ndarray::array;

    fn field(values: ndarray::Array2<f64>) -> Field {
        let (rows, cols) = values.dim();
        let bounds = Bounds::new(0.0, (cols - 1) as f64, 0.0, (rows - 1) as f64).unwrap();
        Field::new(values, bounds)
    }

    #[test]
    fn crossing_cell_yields_one_segment() {
        let f = field(array![[0.0, 0.0], [10.0, 10.0]]);
        let segments = march_squares(&f, 5.0);
        assert_eq!(segments.len(), 1);
        let s = segments[0];
        assert_relative_eq!(s.a.1, 0.5);
        assert_relative_eq!(s.b.1, 0.5);
        assert_relative_eq!((s.a.0 - s.b.0).abs(), 1.0);
    }

    #[test]
    fn flat_cell_yields_nothing() {
        let f = field(array![[3.0, 3.0], [3.0, 3.0]]);
        assert!(march_squares(&f, 5.0).is_empty());
        assert!(march_squares(&f, 1.0).is_empty());
    }

    #[test]
    fn saddle_yields_two_segments() {
        let f = field(array![[10.0, 0.0], [0.0, 10.0]]);
        assert_eq!(march_squares(&f, 5.0).len(), 2);
    }

    #[test]
    fn nan_cells_are_skipped() {
        let f = field(array![[0.0, f64::NAN], [10.0, 10.0]]);
        assert!(march_squares(&f, 5.0).is_empty());
    }

    #[test]
    fn levels_keep_their_order() {
        let f = field(array![[0.0, 1.0, 2.0], [1.0, 2.0, 3.0], [2.0, 3.0, 4.0]]);
        let lines = isolines(&f, &[2.5, 0.5, 1.5]);
        let levels: Vec<f64> = lines.iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![2.5, 0.5, 1.5]);
        assert!(lines.iter().all(|l| l.label_anchor().is_some()));
    }
}
