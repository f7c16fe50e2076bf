//! Linear two-stop color scale used for readings, isotherms and surfaces.

use image::Rgba;

/// Blue for the coldest reading.
pub const COLD: [u8; 3] = [0x00, 0x00, 0xee];
/// Red for the warmest reading.
pub const WARM: [u8; 3] = [0xee, 0x00, 0x00];

/// Maps values in `[min, max]` onto the blue-red ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
}

impl ColorScale {
    /// A constant range is widened so that it still maps to the middle of the ramp.
    pub fn new(min: f64, max: f64) -> Self {
        if (max - min).abs() < f64::EPSILON {
            Self {
                min: min - 0.5,
                max: max + 0.5,
            }
        } else {
            Self { min, max }
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Position of `value` on the ramp, clamped to `[0, 1]`. NaN maps to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let t = (value - self.min) / (self.max - self.min);
        if t.is_nan() {
            0.0
        } else {
            t.clamp(0.0, 1.0)
        }
    }

    pub fn rgb(&self, value: f64) -> [u8; 3] {
        let t = self.normalize(value);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        [
            mix(COLD[0], WARM[0]),
            mix(COLD[1], WARM[1]),
            mix(COLD[2], WARM[2]),
        ]
    }

    pub fn color(&self, value: f64) -> Rgba<u8> {
        let [r, g, b] = self.rgb(value);
        Rgba([r, g, b, 255])
    }
}

/// Scales the RGB channels of `color` by `factor`, keeping alpha.
pub fn shade(color: Rgba<u8>, factor: f64) -> Rgba<u8> {
    let f = factor.clamp(0.0, 1.5);
    let ch = |c: u8| (c as f64 * f).round().clamp(0.0, 255.0) as u8;
    Rgba([ch(color[0]), ch(color[1]), ch(color[2]), color[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_of_the_ramp() {
        let scale = ColorScale::new(10.0, 20.0);
        assert_eq!(scale.rgb(10.0), COLD);
        assert_eq!(scale.rgb(20.0), WARM);
        assert_eq!(scale.rgb(-5.0), COLD);
        assert_eq!(scale.rgb(99.0), WARM);
        assert_eq!(scale.rgb(15.0), [0x77, 0x00, 0x77]);
    }

    #[test]
    fn flat_range_maps_to_middle() {
        let scale = ColorScale::new(12.0, 12.0);
        assert_eq!(scale.normalize(12.0), 0.5);
    }
}
