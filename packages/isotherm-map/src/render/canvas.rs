//! Drawing surface shared by the plan and 3-D views.

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
    draw_text_mut, text_size,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use std::path::Path;

use super::colormap::ColorScale;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const GRAY: Rgba<u8> = Rgba([150, 150, 150, 255]);
pub const LIGHT_GRAY: Rgba<u8> = Rgba([225, 225, 225, 255]);
/// The reference marker color.
pub const MARKER_GREEN: Rgba<u8> = Rgba([0x00, 0xee, 0x00, 255]);

/// Where a text position sits relative to the rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    Center,
    /// Horizontally centered, text sits above the position.
    Bottom,
    /// Vertically centered, text starts at the position.
    Left,
    /// Vertically centered, text ends at the position.
    Right,
}

/// DejaVu Sans, used when no font file is configured.
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Loads a TrueType/OpenType font file.
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?;
    FontVec::try_from_vec(bytes)
        .map_err(|_| anyhow::anyhow!("{} is not a usable font file", path.display()))
}

/// The font compiled into the binary.
pub fn bundled_font() -> Result<FontVec> {
    FontVec::try_from_vec(BUNDLED_FONT.to_vec())
        .map_err(|_| anyhow::anyhow!("The bundled font could not be parsed"))
}

/// An RGBA raster with the font used for its text.
pub struct Canvas {
    image: RgbaImage,
    font: FontVec,
}

impl Canvas {
    pub fn new(width: u32, height: u32, font: FontVec) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, WHITE),
            font,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgba<u8>) {
        if w == 0 || h == 0 {
            return;
        }
        draw_filled_rect_mut(&mut self.image, Rect::at(x, y).of_size(w, h), color);
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba<u8>) {
        draw_line_segment_mut(&mut self.image, from, to, color);
    }

    /// A line of roughly `width` pixels, drawn as parallel one-pixel strokes.
    pub fn thick_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba<u8>) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 || width <= 1.0 {
            self.line(from, to, color);
            return;
        }
        let (nx, ny) = (-dy / len, dx / len);
        let strokes = width.ceil() as i32;
        for k in 0..strokes {
            let off = k as f32 - (strokes - 1) as f32 / 2.0;
            self.line(
                (from.0 + nx * off, from.1 + ny * off),
                (to.0 + nx * off, to.1 + ny * off),
                color,
            );
        }
    }

    pub fn rect_outline(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba<u8>) {
        self.line((x, y), (x + w, y), color);
        self.line((x + w, y), (x + w, y + h), color);
        self.line((x + w, y + h), (x, y + h), color);
        self.line((x, y + h), (x, y), color);
    }

    /// A filled dot with a ring, like the sample markers.
    pub fn dot(&mut self, center: (f32, f32), radius: i32, fill: Rgba<u8>, ring: Rgba<u8>) {
        let c = (center.0.round() as i32, center.1.round() as i32);
        draw_filled_circle_mut(&mut self.image, c, radius + 2, ring);
        draw_filled_circle_mut(&mut self.image, c, radius, fill);
    }

    /// Fills a polygon; degenerate outlines are ignored.
    pub fn polygon(&mut self, outline: &[(f32, f32)], color: Rgba<u8>) {
        let mut points: Vec<Point<i32>> = Vec::with_capacity(outline.len());
        for &(x, y) in outline {
            if !(x.is_finite() && y.is_finite()) {
                return;
            }
            let p = Point::new(x.round() as i32, y.round() as i32);
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return;
        }
        draw_polygon_mut(&mut self.image, &points, color);
    }

    /// Stretches `picture` over the rectangle and blends it onto the canvas.
    pub fn picture(&mut self, picture: &RgbaImage, x: i32, y: i32, w: u32, h: u32) {
        if w == 0 || h == 0 {
            return;
        }
        let scaled = imageops::resize(picture, w, h, imageops::FilterType::Triangle);
        imageops::overlay(&mut self.image, &scaled, x as i64, y as i64);
    }

    /// Pixel size of `text`.
    pub fn text_extent(&self, text: &str, size: f32) -> (u32, u32) {
        text_size(PxScale::from(size), &self.font, text)
    }

    /// Draws `text` anchored at `pos`, with an optional outline in `halo`.
    pub fn text(
        &mut self,
        pos: (f32, f32),
        text: &str,
        size: f32,
        color: Rgba<u8>,
        anchor: Anchor,
        halo: Option<Rgba<u8>>,
    ) {
        let font = &self.font;
        let scale = PxScale::from(size);
        let (w, h) = text_size(scale, font, text);
        let (w, h) = (w as f32, h as f32);
        let (x, y) = match anchor {
            Anchor::TopLeft => pos,
            Anchor::Center => (pos.0 - w / 2.0, pos.1 - h / 2.0),
            Anchor::Bottom => (pos.0 - w / 2.0, pos.1 - h),
            Anchor::Left => (pos.0, pos.1 - h / 2.0),
            Anchor::Right => (pos.0 - w, pos.1 - h / 2.0),
        };
        let (x, y) = (x.round() as i32, y.round() as i32);
        if let Some(halo) = halo {
            let r = ((size / 12.0).round() as i32).max(1);
            for ox in -r..=r {
                for oy in -r..=r {
                    if ox != 0 || oy != 0 {
                        draw_text_mut(&mut self.image, halo, x + ox, y + oy, scale, font, text);
                    }
                }
            }
        }
        draw_text_mut(&mut self.image, color, x, y, scale, font, text);
    }

    /// Vertical color bar with `ticks` labeled in °C on its right.
    pub fn color_bar(
        &mut self,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        scale: &ColorScale,
        ticks: &[f64],
        label_size: f32,
    ) {
        if h < 2 {
            return;
        }
        for row in 0..h {
            // Top of the bar is the warm end.
            let t = 1.0 - row as f64 / (h - 1) as f64;
            let value = scale.min() + t * (scale.max() - scale.min());
            self.fill_rect(x, y + row as i32, w, 1, scale.color(value));
        }
        self.rect_outline(x as f32, y as f32, w as f32, h as f32, BLACK);
        for &tick in ticks {
            let t = scale.normalize(tick) as f32;
            let ty = y as f32 + (1.0 - t) * (h - 1) as f32;
            let right = (x + w as i32) as f32;
            self.line((right, ty), (right + 6.0, ty), BLACK);
            self.text(
                (right + 10.0, ty),
                &isotherm_core::text::celsius(tick),
                label_size,
                BLACK,
                Anchor::Left,
                None,
            );
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.image()
            .save(path)
            .with_context(|| format!("Failed to write image {}", path.display()))
    }
}
