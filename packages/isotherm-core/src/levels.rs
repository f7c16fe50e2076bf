//! Contour level selection.

/// Isotherm levels `min + k * step` for `k` in `0..floor((trunc(max) - trunc(min)) / step)`.
///
/// The range is measured between the truncated extremes and the upper end is exclusive, so
/// readings from 11.3 to 14.8 with a step of 0.5 give six levels starting at 11.3.
/// A non-positive or non-finite step yields no levels.
pub fn isotherm_levels(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step.is_finite() && step > 0.0 && min.is_finite() && max.is_finite()) {
        return Vec::new();
    }
    let span = max.trunc() - min.trunc();
    if span <= 0.0 {
        return Vec::new();
    }
    let count = (span / step).floor() as usize;
    (0..count).map(|k| min + k as f64 * step).collect()
}

/// `count` evenly spaced levels from `min` to `max`, both included.
pub fn linspace_levels(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => (0..count)
            .map(|k| {
                if k == count - 1 {
                    max
                } else {
                    min + (max - min) * k as f64 / (count - 1) as f64
                }
            })
            .collect(),
    }
}

/// Whole-degree levels get a text label on the map.
pub fn is_labeled_level(level: f64) -> bool {
    level.is_finite() && level.fract() == 0.0
}
