//! 3-D views: the shaded temperature surface and isotherms lifted to their level.
//!
//! The box spanned by the field bounds and the temperature range is projected
//! orthographically from a fixed viewpoint and drawn back to front.

use image::{Rgba, RgbaImage};
use isotherm_core::{linspace_levels, Bounds, Field};

use super::canvas::{Anchor, Canvas, BLACK, GRAY, LIGHT_GRAY, MARKER_GREEN};
use super::colormap::shade;
use super::contour::march_squares;
use super::{Layout, Scene};
use crate::cli::View;

const AZIMUTH_DEG: f64 = -60.0;
const ELEVATION_DEG: f64 = 30.0;
/// Half height of the box relative to its unit footprint.
const Z_HALF: f64 = 0.375;
/// Share of the plot area the box may use; the rest is left for tick labels.
const FILL: f64 = 0.8;
const SURFACE_CELLS: usize = 80;
const FLOOR_CELLS: usize = 48;
const LIGHT: [f64; 3] = [-0.45, -0.35, 0.82];

/// Orthographic projection of the data box onto the plot rectangle.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    bounds: Bounds,
    z_min: f64,
    z_span: f64,
    sin_a: f64,
    cos_a: f64,
    sin_e: f64,
    cos_e: f64,
    scale: f64,
    origin: (f64, f64),
}

impl Projection {
    /// Fits the box `bounds x [z_min, z_max]` into `area`.
    pub fn new(bounds: &Bounds, z_range: (f64, f64), area: (f32, f32, f32, f32)) -> Self {
        let (z_min, z_max) = z_range;
        let z_span = if z_max > z_min { z_max - z_min } else { 1.0 };
        let (sin_a, cos_a) = AZIMUTH_DEG.to_radians().sin_cos();
        let (sin_e, cos_e) = ELEVATION_DEG.to_radians().sin_cos();
        let mut projection = Self {
            bounds: *bounds,
            z_min,
            z_span,
            sin_a,
            cos_a,
            sin_e,
            cos_e,
            scale: 1.0,
            origin: (0.0, 0.0),
        };

        let (mut lo_x, mut hi_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut lo_y, mut hi_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for (x, y, z) in projection.corners() {
            let (sx, up, _) = projection.rotate(projection.normalized(x, y, z));
            lo_x = lo_x.min(sx);
            hi_x = hi_x.max(sx);
            lo_y = lo_y.min(up);
            hi_y = hi_y.max(up);
        }

        let (ax, ay, aw, ah) = (area.0 as f64, area.1 as f64, area.2 as f64, area.3 as f64);
        projection.scale = FILL * (aw / (hi_x - lo_x)).min(ah / (hi_y - lo_y));
        projection.origin = (
            ax + aw / 2.0 - projection.scale * (lo_x + hi_x) / 2.0,
            ay + ah / 2.0 + projection.scale * (lo_y + hi_y) / 2.0,
        );
        projection
    }

    pub fn z_max(&self) -> f64 {
        self.z_min + self.z_span
    }

    /// The eight corners of the data box.
    pub fn corners(&self) -> Vec<(f64, f64, f64)> {
        let b = &self.bounds;
        let mut out = Vec::with_capacity(8);
        for z in [self.z_min, self.z_max()] {
            for y in [b.min_y, b.max_y] {
                for x in [b.min_x, b.max_x] {
                    out.push((x, y, z));
                }
            }
        }
        out
    }

    fn normalized(&self, x: f64, y: f64, z: f64) -> [f64; 3] {
        let b = &self.bounds;
        let (cx, cy) = b.center();
        [
            (x - cx) / b.width().max(f64::MIN_POSITIVE),
            (y - cy) / b.height().max(f64::MIN_POSITIVE),
            ((z - self.z_min) / self.z_span - 0.5) * 2.0 * Z_HALF,
        ]
    }

    /// `(screen x, screen up, depth)` of a normalized point; larger depth is nearer.
    fn rotate(&self, p: [f64; 3]) -> (f64, f64, f64) {
        let [x, y, z] = p;
        let xr = x * self.cos_a - y * self.sin_a;
        let yr = x * self.sin_a + y * self.cos_a;
        (xr, yr * self.sin_e + z * self.cos_e, -yr * self.cos_e + z * self.sin_e)
    }

    pub fn to_px(&self, x: f64, y: f64, z: f64) -> (f32, f32) {
        let (sx, up, _) = self.rotate(self.normalized(x, y, z));
        (
            (self.origin.0 + self.scale * sx) as f32,
            (self.origin.1 - self.scale * up) as f32,
        )
    }

    pub fn depth(&self, x: f64, y: f64, z: f64) -> f64 {
        self.rotate(self.normalized(x, y, z)).2
    }
}

/// Indices `0..n` thinned to at most `cells` intervals, always keeping the last one.
fn sample_indices(n: usize, cells: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let step = ((n - 1) as f64 / cells.max(1) as f64).ceil().max(1.0) as usize;
    let mut out: Vec<usize> = (0..n).step_by(step).collect();
    if out.last() != Some(&(n - 1)) {
        out.push(n - 1);
    }
    out
}

fn node_position(field: &Field, row: usize, col: usize) -> (f64, f64) {
    let (rows, cols) = field.dim();
    let b = field.bounds();
    let fx = if cols > 1 { col as f64 / (cols - 1) as f64 } else { 0.0 };
    let fy = if rows > 1 { row as f64 / (rows - 1) as f64 } else { 0.0 };
    (b.min_x + fx * b.width(), b.min_y + fy * b.height())
}

fn unit(v: [f64; 3]) -> Option<[f64; 3]> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 0.0 && len.is_finite() {
        Some([v[0] / len, v[1] / len, v[2] / len])
    } else {
        None
    }
}

/// Brightness of a quad lit from `LIGHT`, from its corners in box space.
fn lighting(corners: &[[f64; 3]; 4]) -> f64 {
    let d1 = [
        corners[2][0] - corners[0][0],
        corners[2][1] - corners[0][1],
        corners[2][2] - corners[0][2],
    ];
    let d2 = [
        corners[3][0] - corners[1][0],
        corners[3][1] - corners[1][1],
        corners[3][2] - corners[1][2],
    ];
    let normal = [
        d1[1] * d2[2] - d1[2] * d2[1],
        d1[2] * d2[0] - d1[0] * d2[2],
        d1[0] * d2[1] - d1[1] * d2[0],
    ];
    match (unit(normal), unit(LIGHT)) {
        (Some(n), Some(l)) => {
            let dot = (n[0] * l[0] + n[1] * l[1] + n[2] * l[2]).abs();
            0.55 + 0.45 * dot
        }
        _ => 1.0,
    }
}

fn draw_floor(canvas: &mut Canvas, proj: &Projection, background: Option<&RgbaImage>) {
    let b = proj.bounds;
    let z = proj.z_min;
    let cell = |i: usize, j: usize| {
        let x0 = b.min_x + b.width() * j as f64 / FLOOR_CELLS as f64;
        let x1 = b.min_x + b.width() * (j + 1) as f64 / FLOOR_CELLS as f64;
        let y0 = b.min_y + b.height() * i as f64 / FLOOR_CELLS as f64;
        let y1 = b.min_y + b.height() * (i + 1) as f64 / FLOOR_CELLS as f64;
        [
            proj.to_px(x0, y0, z),
            proj.to_px(x1, y0, z),
            proj.to_px(x1, y1, z),
            proj.to_px(x0, y1, z),
        ]
    };

    match background {
        Some(picture) if picture.width() > 0 && picture.height() > 0 => {
            for i in 0..FLOOR_CELLS {
                for j in 0..FLOOR_CELLS {
                    let u = (j as f64 + 0.5) / FLOOR_CELLS as f64;
                    let v = (i as f64 + 0.5) / FLOOR_CELLS as f64;
                    // Image rows run north to south.
                    let px = ((u * picture.width() as f64) as u32).min(picture.width() - 1);
                    let py = (((1.0 - v) * picture.height() as f64) as u32)
                        .min(picture.height() - 1);
                    let color = *picture.get_pixel(px, py);
                    let color = if color[3] == 0 {
                        LIGHT_GRAY
                    } else {
                        Rgba([color[0], color[1], color[2], 255])
                    };
                    canvas.polygon(&cell(i, j), color);
                }
            }
        }
        _ => {
            let outline = [
                proj.to_px(b.min_x, b.min_y, z),
                proj.to_px(b.max_x, b.min_y, z),
                proj.to_px(b.max_x, b.max_y, z),
                proj.to_px(b.min_x, b.max_y, z),
            ];
            canvas.polygon(&outline, LIGHT_GRAY);
            for x in linspace_levels(b.min_x, b.max_x, 5) {
                canvas.line(proj.to_px(x, b.min_y, z), proj.to_px(x, b.max_y, z), GRAY);
            }
            for y in linspace_levels(b.min_y, b.max_y, 5) {
                canvas.line(proj.to_px(b.min_x, y, z), proj.to_px(b.max_x, y, z), GRAY);
            }
        }
    }
}

fn draw_box_edges(canvas: &mut Canvas, proj: &Projection) {
    let b = proj.bounds;
    let (z0, z1) = (proj.z_min, proj.z_max());
    let footprint = [
        (b.min_x, b.min_y),
        (b.max_x, b.min_y),
        (b.max_x, b.max_y),
        (b.min_x, b.max_y),
    ];
    for k in 0..4 {
        let (x0, y0) = footprint[k];
        let (x1, y1) = footprint[(k + 1) % 4];
        canvas.line(proj.to_px(x0, y0, z0), proj.to_px(x1, y1, z0), GRAY);
        canvas.line(proj.to_px(x0, y0, z0), proj.to_px(x0, y0, z1), GRAY);
    }
}

fn draw_surface(canvas: &mut Canvas, proj: &Projection, scene: &Scene) {
    let field = scene.field;
    let (rows, cols) = field.dim();
    let rs = sample_indices(rows, SURFACE_CELLS);
    let cs = sample_indices(cols, SURFACE_CELLS);

    let mut quads: Vec<(f64, [(f32, f32); 4], Rgba<u8>)> = Vec::new();
    for r in rs.windows(2) {
        for c in cs.windows(2) {
            let nodes = [(r[0], c[0]), (r[0], c[1]), (r[1], c[1]), (r[1], c[0])];
            let mut world = [[0.0; 3]; 4];
            let mut finite = true;
            for (k, &(row, col)) in nodes.iter().enumerate() {
                let value = field.get(row, col).unwrap_or(f64::NAN);
                finite &= value.is_finite();
                let (x, y) = node_position(field, row, col);
                world[k] = [x, y, value];
            }
            if !finite {
                continue;
            }
            let mean = world.iter().map(|p| p[2]).sum::<f64>() / 4.0;
            let (mx, my) = (
                world.iter().map(|p| p[0]).sum::<f64>() / 4.0,
                world.iter().map(|p| p[1]).sum::<f64>() / 4.0,
            );
            let boxed = world.map(|p| proj.normalized(p[0], p[1], p[2]));
            let color = shade(scene.scale.color(mean), lighting(&boxed));
            let outline = world.map(|p| proj.to_px(p[0], p[1], p[2]));
            quads.push((proj.depth(mx, my, mean), outline, color));
        }
    }

    quads.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (_, outline, color) in &quads {
        canvas.polygon(outline, *color);
    }
}

fn draw_lifted_isotherms(canvas: &mut Canvas, proj: &Projection, scene: &Scene) {
    for &level in scene.levels {
        let color = scene.scale.color(level);
        for seg in march_squares(scene.field, level) {
            let a = proj.to_px(seg.a.0, seg.a.1, level);
            let b = proj.to_px(seg.b.0, seg.b.1, level);
            canvas.thick_line(a, b, 2.0, color);
        }
    }
}

fn draw_samples(canvas: &mut Canvas, proj: &Projection, scene: &Scene) {
    let mut order: Vec<usize> = (0..scene.sites.len()).collect();
    let depth = |i: usize| {
        let s = &scene.sites[i];
        proj.depth(s.lon, s.lat, s.temperature)
    };
    order.sort_by(|&a, &b| depth(a).total_cmp(&depth(b)));
    for i in order {
        let s = &scene.sites[i];
        let p = proj.to_px(s.lon, s.lat, s.temperature);
        canvas.dot(p, 6, scene.scale.color(s.temperature), BLACK);
    }
}

fn draw_marker(canvas: &mut Canvas, proj: &Projection, scene: &Scene, size: f32) {
    let m = scene.marker;
    if !proj.bounds.contains(m.lon, m.lat) {
        return;
    }
    let bottom = proj.to_px(m.lon, m.lat, proj.z_min);
    let top = proj.to_px(m.lon, m.lat, proj.z_max());
    canvas.thick_line(bottom, top, 3.0, MARKER_GREEN);
    canvas.text(
        (top.0, top.1 - 6.0),
        &m.label,
        size * 1.2,
        MARKER_GREEN,
        Anchor::Bottom,
        Some(BLACK),
    );
}

/// Pushes `p` away from `center` by `distance` pixels.
fn outward(p: (f32, f32), center: (f32, f32), distance: f32) -> (f32, f32) {
    let (dx, dy) = (p.0 - center.0, p.1 - center.1);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return (p.0, p.1 + distance);
    }
    (p.0 + dx / len * distance, p.1 + dy / len * distance)
}

fn draw_axes(canvas: &mut Canvas, proj: &Projection, size: f32) {
    let b = proj.bounds;
    let (z0, z1) = (proj.z_min, proj.z_max());
    let (cx, cy) = b.center();
    let center = proj.to_px(cx, cy, z0);

    // Label the floor edges facing the viewer.
    let y_edge = if proj.depth(cx, b.min_y, z0) >= proj.depth(cx, b.max_y, z0) {
        b.min_y
    } else {
        b.max_y
    };
    let x_edge = if proj.depth(b.min_x, cy, z0) >= proj.depth(b.max_x, cy, z0) {
        b.min_x
    } else {
        b.max_x
    };

    for lon in linspace_levels(b.min_x, b.max_x, 5) {
        let p = outward(proj.to_px(lon, y_edge, z0), center, 22.0);
        canvas.text(p, &format!("{:.3}", lon), size, BLACK, Anchor::Center, None);
    }
    for lat in linspace_levels(b.min_y, b.max_y, 5) {
        let p = outward(proj.to_px(x_edge, lat, z0), center, 22.0);
        canvas.text(p, &format!("{:.3}", lat), size, BLACK, Anchor::Center, None);
    }
    let lon_caption = outward(proj.to_px(cx, y_edge, z0), center, 60.0);
    canvas.text(lon_caption, "Longitude (°E)", size * 1.2, BLACK, Anchor::Center, None);
    let lat_caption = outward(proj.to_px(x_edge, cy, z0), center, 60.0);
    canvas.text(lat_caption, "Latitude (°N)", size * 1.2, BLACK, Anchor::Center, None);

    // Temperature axis on the leftmost vertical edge.
    let (zx, zy) = [
        (b.min_x, b.min_y),
        (b.max_x, b.min_y),
        (b.max_x, b.max_y),
        (b.min_x, b.max_y),
    ]
    .into_iter()
    .min_by(|a, c| proj.to_px(a.0, a.1, z0).0.total_cmp(&proj.to_px(c.0, c.1, z0).0))
    .unwrap_or((b.min_x, b.min_y));
    for t in linspace_levels(z0, z1, 5) {
        let (px, py) = proj.to_px(zx, zy, t);
        canvas.line((px - 6.0, py), (px, py), BLACK);
        canvas.text((px - 10.0, py), &format!("{:.1}", t), size, BLACK, Anchor::Right, None);
    }
    let (mx, my) = proj.to_px(zx, zy, (z0 + z1) / 2.0);
    let (tick_w, _) = canvas.text_extent("00.0", size);
    canvas.text(
        (mx - 18.0 - tick_w as f32, my),
        "Temperature (°C)",
        size * 1.2,
        BLACK,
        Anchor::Right,
        None,
    );
}

/// Draws one of the 3-D views into `layout.plot`.
pub fn draw(canvas: &mut Canvas, layout: &Layout, scene: &Scene) {
    let bounds = *scene.field.bounds();
    let (lo, hi) = scene
        .sites
        .iter()
        .map(|s| s.temperature)
        .chain(scene.field.range().into_iter().flat_map(|(a, b)| [a, b]))
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let z_range = if lo.is_finite() {
        (lo, hi)
    } else {
        (scene.scale.min(), scene.scale.max())
    };
    let proj = Projection::new(&bounds, z_range, layout.plot);

    draw_floor(canvas, &proj, scene.background);
    draw_box_edges(canvas, &proj);
    match scene.view {
        View::Surface => draw_surface(canvas, &proj, scene),
        _ => draw_lifted_isotherms(canvas, &proj, scene),
    }
    draw_samples(canvas, &proj, scene);
    draw_marker(canvas, &proj, scene, layout.label_size);
    draw_axes(canvas, &proj, layout.label_size);
}
