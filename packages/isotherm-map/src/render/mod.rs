//! Raster rendering of an interpolated temperature field.
//!
//! The renderer only consumes numbers produced by `isotherm_core`; nothing here feeds back
//! into the interpolation.

pub mod canvas;
pub mod colormap;
pub mod contour;
pub mod perspective;
pub mod plan;

use ab_glyph::FontVec;
use image::RgbaImage;
use isotherm_core::{linspace_levels, Field, Site};

use crate::cli::View;
use crate::config::Marker;
use canvas::{Anchor, Canvas, BLACK};
use colormap::ColorScale;

/// Everything a view needs to draw itself.
pub struct Scene<'a> {
    pub view: View,
    pub title: String,
    pub sites: &'a [Site],
    pub field: &'a Field,
    pub levels: &'a [f64],
    pub scale: ColorScale,
    pub marker: &'a Marker,
    pub background: Option<&'a RgbaImage>,
}

/// Pixel rectangles of the figure parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Area available to the plot itself: `(x, y, w, h)`.
    pub plot: (f32, f32, f32, f32),
    /// Color bar rectangle: `(x, y, w, h)`.
    pub legend: (i32, i32, u32, u32),
    pub title_size: f32,
    pub label_size: f32,
}

impl Layout {
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let title_size = (h * 0.032).max(12.0);
        let label_size = (h * 0.022).max(10.0);
        let left = w * 0.08;
        let right = w * 0.15;
        let top = h * 0.09;
        let bottom = h * 0.10;
        let legend_w = (w * 0.018).max(8.0) as u32;
        let legend_h = (h - top - bottom) * 0.8;
        Self {
            plot: (left, top, w - left - right, h - top - bottom),
            legend: (
                (w - right + w * 0.035) as i32,
                (top + (h - top - bottom - legend_h) / 2.0) as i32,
                legend_w,
                legend_h as u32,
            ),
            title_size,
            label_size,
        }
    }
}

/// Draws the title and, when requested, the color bar.
fn draw_frame(canvas: &mut Canvas, layout: &Layout, scene: &Scene, with_legend: bool) {
    let cx = canvas.width() as f32 / 2.0;
    canvas.text(
        (cx, layout.plot.1 * 0.45),
        &scene.title,
        layout.title_size,
        BLACK,
        Anchor::Center,
        None,
    );
    if with_legend {
        let (x, y, w, h) = layout.legend;
        let ticks = linspace_levels(scene.scale.min(), scene.scale.max(), 6);
        canvas.color_bar(x, y, w, h, &scene.scale, &ticks, layout.label_size);
    }
}

/// Renders `scene` onto a new `width x height` canvas.
pub fn render(scene: &Scene, width: u32, height: u32, font: FontVec) -> Canvas {
    let mut canvas = Canvas::new(width, height, font);
    let layout = Layout::for_canvas(width, height);
    if scene.view.is_3d() {
        perspective::draw(&mut canvas, &layout, scene);
        draw_frame(&mut canvas, &layout, scene, true);
    } else {
        plan::draw(&mut canvas, &layout, scene);
        draw_frame(&mut canvas, &layout, scene, scene.view == View::Contours);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use isotherm_core::{evaluate_grid, fit, isotherm_levels, sites_to_points, Bounds, Grid};

    fn site(name: &str, lat: f64, lon: f64, temperature: f64) -> Site {
        Site {
            name: name.to_string(),
            lat,
            lon,
            temperature,
        }
    }

    #[test]
    fn layout_stays_inside_canvas() {
        let layout = Layout::for_canvas(1600, 1000);
        let (x, y, w, h) = layout.plot;
        assert!(x > 0.0 && y > 0.0);
        assert!(x + w < 1600.0 && y + h < 1000.0);
        let (lx, ly, lw, lh) = layout.legend;
        assert!(lx as f32 > x + w);
        assert!(lx + lw as i32 <= 1600);
        assert!(ly + lh as i32 <= 1000);
    }

    struct Fixture {
        sites: Vec<Site>,
        field: Field,
        levels: Vec<f64>,
        marker: Marker,
    }

    fn fixture() -> Fixture {
        let sites = vec![
            site("Kitsilano", 49.26, -123.18, 11.5),
            site("Fairview", 49.29, -123.15, 13.0),
            site("Gastown", 49.27, -123.11, 14.5),
            site("West End", 49.28, -123.12, 12.0),
            site("Stanley Park", 49.30, -123.10, 15.0),
        ];
        let points = sites_to_points(&sites);
        let interpolant = fit(&points, 0.0).unwrap();
        let bounds = Bounds::from_points(&points).unwrap();
        let field = evaluate_grid(&Grid::square(bounds, 30).unwrap(), &interpolant);
        Fixture {
            sites,
            field,
            levels: isotherm_levels(11.5, 15.0, 0.5),
            marker: Marker::default(),
        }
    }

    fn render_view(data: &Fixture, view: View) -> Canvas {
        let scene = Scene {
            view,
            title: view.title("Vancouver"),
            sites: &data.sites,
            field: &data.field,
            levels: &data.levels,
            scale: ColorScale::new(11.5, 15.0),
            marker: &data.marker,
            background: None,
        };
        render(&scene, 400, 300, canvas::bundled_font().unwrap())
    }

    #[test]
    fn every_view_renders() {
        let data = fixture();
        for view in [
            View::Contours,
            View::Tags,
            View::Temperatures,
            View::Surface,
            View::Isotherms3d,
        ] {
            let canvas = render_view(&data, view);
            assert_eq!(canvas.image().dimensions(), (400, 300));
            assert!(canvas.image().pixels().any(|p| *p != canvas::WHITE));
        }
    }

    #[test]
    fn tags_and_readings_draw_different_labels() {
        let data = fixture();
        let tags = render_view(&data, View::Tags);
        let readings = render_view(&data, View::Temperatures);
        assert_ne!(tags.image().as_raw(), readings.image().as_raw());
    }
}
