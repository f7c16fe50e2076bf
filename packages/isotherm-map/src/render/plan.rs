//! Plan (map) views: isotherms, site tags and site readings over the background.

use image::Rgba;
use isotherm_core::{is_labeled_level, linspace_levels, Bounds};

use super::canvas::{Anchor, Canvas, BLACK, MARKER_GREEN, WHITE};
use super::contour::isolines;
use super::{Layout, Scene};
use crate::cli::View;

const PLOT_FILL: Rgba<u8> = Rgba([245, 245, 245, 255]);

/// Display ratio of one unit of latitude to one unit of longitude at the center of `bounds`.
fn geographic_aspect(bounds: &Bounds) -> f64 {
    let (_, lat) = bounds.center();
    if lat.abs() < 85.0 {
        1.0 / lat.to_radians().cos()
    } else {
        1.0
    }
}

/// Maps coordinates onto the pixel rectangle of the plot, north up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanFrame {
    bounds: Bounds,
    pub x0: f32,
    pub y0: f32,
    pub w: f32,
    pub h: f32,
}

impl PlanFrame {
    /// Largest rectangle inside `area` that keeps the geographic aspect, centered.
    pub fn fit(bounds: &Bounds, area: (f32, f32, f32, f32)) -> Self {
        let (ax, ay, aw, ah) = area;
        let data_w = bounds.width().max(f64::MIN_POSITIVE);
        let data_h = (bounds.height() * geographic_aspect(bounds)).max(f64::MIN_POSITIVE);
        let scale = (aw as f64 / data_w).min(ah as f64 / data_h);
        let w = (data_w * scale) as f32;
        let h = (data_h * scale) as f32;
        Self {
            bounds: *bounds,
            x0: ax + (aw - w) / 2.0,
            y0: ay + (ah - h) / 2.0,
            w,
            h,
        }
    }

    pub fn to_px(&self, x: f64, y: f64) -> (f32, f32) {
        let b = &self.bounds;
        let tx = if b.width() > 0.0 { (x - b.min_x) / b.width() } else { 0.5 };
        let ty = if b.height() > 0.0 { (y - b.min_y) / b.height() } else { 0.5 };
        (
            self.x0 + tx as f32 * self.w,
            self.y0 + (1.0 - ty as f32) * self.h,
        )
    }
}

fn draw_axes(canvas: &mut Canvas, frame: &PlanFrame, bounds: &Bounds, layout: &Layout) {
    let size = layout.label_size;
    canvas.rect_outline(frame.x0, frame.y0, frame.w, frame.h, BLACK);

    let bottom = frame.y0 + frame.h;
    for lon in linspace_levels(bounds.min_x, bounds.max_x, 5) {
        let (px, _) = frame.to_px(lon, bounds.min_y);
        canvas.line((px, bottom), (px, bottom + 6.0), BLACK);
        canvas.text((px, bottom + 8.0), &format!("{:.3}", lon), size, BLACK, Anchor::Bottom, None);
    }
    for lat in linspace_levels(bounds.min_y, bounds.max_y, 5) {
        let (_, py) = frame.to_px(bounds.min_x, lat);
        canvas.line((frame.x0 - 6.0, py), (frame.x0, py), BLACK);
        canvas.text((frame.x0 - 9.0, py), &format!("{:.3}", lat), size, BLACK, Anchor::Right, None);
    }

    // Tick labels hang below their anchor, so shift by one text height.
    let (_, tick_h) = canvas.text_extent("0", size);
    canvas.text(
        (frame.x0 + frame.w / 2.0, bottom + 16.0 + 2.0 * tick_h as f32 + size),
        "Longitude (°E)",
        size * 1.2,
        BLACK,
        Anchor::Bottom,
        None,
    );
    canvas.text(
        (frame.x0, frame.y0 - 8.0),
        "Latitude (°N)",
        size * 1.2,
        BLACK,
        Anchor::Bottom,
        None,
    );
}

fn draw_north_arrow(canvas: &mut Canvas, frame: &PlanFrame, size: f32) {
    let x = frame.x0 + frame.w * 0.05;
    let y = frame.y0 + frame.h * 0.08;
    let s = size * 1.5;
    let outline = [(x, y - s), (x + s * 0.6, y + s), (x, y + s * 0.55), (x - s * 0.6, y + s)];
    let halo: Vec<(f32, f32)> = outline
        .iter()
        .map(|&(px, py)| (x + (px - x) * 1.25, y + (py - y) * 1.25))
        .collect();
    canvas.polygon(&halo, BLACK);
    canvas.polygon(&outline, WHITE);
    canvas.text((x, y + s * 1.3), "N", size, WHITE, Anchor::TopLeft, Some(BLACK));
}

/// Draws one of the plan views into `layout.plot`.
pub fn draw(canvas: &mut Canvas, layout: &Layout, scene: &Scene) {
    let bounds = *scene.field.bounds();
    let frame = PlanFrame::fit(&bounds, layout.plot);
    let size = layout.label_size;

    match scene.background {
        Some(picture) => canvas.picture(
            picture,
            frame.x0.round() as i32,
            frame.y0.round() as i32,
            frame.w.round() as u32,
            frame.h.round() as u32,
        ),
        None => canvas.fill_rect(
            frame.x0.round() as i32,
            frame.y0.round() as i32,
            frame.w.round() as u32,
            frame.h.round() as u32,
            PLOT_FILL,
        ),
    }

    let lines = if scene.view == View::Contours {
        isolines(scene.field, scene.levels)
    } else {
        Vec::new()
    };
    for line in &lines {
        let color = scene.scale.color(line.level);
        for seg in &line.segments {
            let a = frame.to_px(seg.a.0, seg.a.1);
            let b = frame.to_px(seg.b.0, seg.b.1);
            canvas.thick_line(a, b, 2.0, color);
        }
    }

    for site in scene.sites {
        let p = frame.to_px(site.lon, site.lat);
        canvas.dot(p, 8, scene.scale.color(site.temperature), BLACK);
    }

    let marker = scene.marker;
    if bounds.contains(marker.lon, marker.lat) {
        let p = frame.to_px(marker.lon, marker.lat);
        canvas.dot(p, 5, MARKER_GREEN, BLACK);
        canvas.text(
            (p.0, p.1 - 10.0),
            &marker.label,
            size * 1.2,
            MARKER_GREEN,
            Anchor::Bottom,
            Some(BLACK),
        );
    }

    for line in lines.iter().filter(|l| is_labeled_level(l.level)) {
        if let Some((x, y)) = line.label_anchor() {
            canvas.text(
                frame.to_px(x, y),
                &format!("{:.0}", line.level),
                size * 1.2,
                WHITE,
                Anchor::Center,
                Some(BLACK),
            );
        }
    }

    match scene.view {
        View::Tags => {
            for site in scene.sites {
                let p = frame.to_px(site.lon, site.lat);
                canvas.text(p, &site.name, size * 1.2, WHITE, Anchor::Center, Some(BLACK));
            }
        }
        View::Temperatures => {
            for site in scene.sites {
                let p = frame.to_px(site.lon, site.lat);
                let reading = format!("{:.1}", site.temperature);
                canvas.text(p, &reading, size * 1.2, WHITE, Anchor::Center, Some(BLACK));
            }
        }
        _ => {}
    }

    draw_north_arrow(canvas, &frame, size);
    draw_axes(canvas, &frame, &bounds, layout);
}
