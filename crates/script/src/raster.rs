//! Scanline rasterizer.
//!
//! Polygons are filled with the nonzero winding rule. Each pixel row is
//! sampled on `SUBSAMPLES` horizontal lines; along a line, span ends are
//! accumulated with exact fractional coverage, so edges are anti-aliased in
//! both directions without a full supersampled buffer.

use image::RgbaImage;

use crate::color::Color;
use crate::transform::Point;

/// Sub-scanlines per pixel row
pub const SUBSAMPLES: usize = 4;

/// How coverage is combined with the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    /// Paint over the existing pixels
    SourceOver,
    /// Erase to transparent (clearRect)
    Clear,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    /// +1 downward, -1 upward
    winding: i32,
}

impl Edge {
    fn new(a: Point, b: Point) -> Option<Self> {
        if a.y == b.y || !a.x.is_finite() || !a.y.is_finite() || !b.x.is_finite() || !b.y.is_finite() {
            return None;
        }
        Some(if a.y < b.y {
            Edge { x0: a.x, y0: a.y, x1: b.x, y1: b.y, winding: 1 }
        } else {
            Edge { x0: b.x, y0: b.y, x1: a.x, y1: a.y, winding: -1 }
        })
    }

    fn x_at(&self, y: f64) -> f64 {
        self.x0 + (y - self.y0) * (self.x1 - self.x0) / (self.y1 - self.y0)
    }
}

/// Coverage for the pixel rectangle `[x, x + width) x [y, y + height)`
#[derive(Debug, Clone)]
pub struct Mask {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    coverage: Vec<f32>,
}

impl Mask {
    pub fn get(&self, px: u32, py: u32) -> f32 {
        if px < self.x || py < self.y || px >= self.x + self.width || py >= self.y + self.height {
            return 0.0;
        }
        self.coverage[((py - self.y) * self.width + (px - self.x)) as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rasterize closed polygons into a coverage mask clipped to the surface.
pub fn coverage(polygons: &[Vec<Point>], surface_width: u32, surface_height: u32) -> Mask {
    let mut edges: Vec<Edge> = Vec::new();
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

    for poly in polygons {
        if poly.len() < 3 {
            continue;
        }
        for i in 0..poly.len() {
            let a = poly[i];
            let b = poly[(i + 1) % poly.len()];
            if let Some(edge) = Edge::new(a, b) {
                min_x = min_x.min(edge.x0.min(edge.x1));
                max_x = max_x.max(edge.x0.max(edge.x1));
                min_y = min_y.min(edge.y0);
                max_y = max_y.max(edge.y1);
                edges.push(edge);
            }
        }
    }

    let empty = Mask { x: 0, y: 0, width: 0, height: 0, coverage: Vec::new() };
    if edges.is_empty() {
        return empty;
    }

    let x_start = min_x.floor().max(0.0) as u32;
    let y_start = min_y.floor().max(0.0) as u32;
    let x_end = (max_x.ceil().min(surface_width as f64)).max(0.0) as u32;
    let y_end = (max_y.ceil().min(surface_height as f64)).max(0.0) as u32;
    if x_start >= x_end || y_start >= y_end {
        return empty;
    }

    let width = x_end - x_start;
    let height = y_end - y_start;
    let mut cov = vec![0.0f32; (width * height) as usize];

    edges.sort_by(|a, b| a.y0.total_cmp(&b.y0));

    let sample_weight = 1.0 / SUBSAMPLES as f64;
    let mut crossings: Vec<(f64, i32)> = Vec::new();

    for row in 0..height {
        let py = (y_start + row) as f64;
        let row_cov = &mut cov[(row * width) as usize..((row + 1) * width) as usize];

        for s in 0..SUBSAMPLES {
            let sy = py + (s as f64 + 0.5) * sample_weight;
            crossings.clear();
            let candidates = edges.partition_point(|e| e.y0 <= sy);
            for edge in &edges[..candidates] {
                if sy < edge.y1 {
                    crossings.push((edge.x_at(sy), edge.winding));
                }
            }
            if crossings.len() < 2 {
                continue;
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding != 0 {
                    accumulate_span(row_cov, x_start as f64, pair[0].0, pair[1].0, sample_weight);
                }
            }
        }
    }

    Mask { x: x_start, y: y_start, width, height, coverage: cov }
}

/// Add one sub-scanline span `[from, to)` to a row, with fractional ends
fn accumulate_span(row: &mut [f32], origin: f64, from: f64, to: f64, weight: f64) {
    let from = (from - origin).max(0.0);
    let to = (to - origin).min(row.len() as f64);
    if to <= from {
        return;
    }
    let first = from.floor() as usize;
    let last = (to.ceil() as usize).min(row.len());
    for (i, cell) in row.iter_mut().enumerate().take(last).skip(first) {
        let left = from.max(i as f64);
        let right = to.min(i as f64 + 1.0);
        if right > left {
            *cell += ((right - left) * weight) as f32;
        }
    }
}

/// Composite `shader` through `mask` onto `image`.
/// The shader is sampled at pixel centers in device space.
pub fn composite<S>(image: &mut RgbaImage, mask: &Mask, global_alpha: f32, op: Composite, shader: S)
where
    S: Fn(f64, f64) -> Color,
{
    for row in 0..mask.height {
        let py = mask.y + row;
        for col in 0..mask.width {
            let px = mask.x + col;
            let cov = mask.coverage[(row * mask.width + col) as usize].min(1.0);
            if cov <= 0.0 {
                continue;
            }
            let dst = image.get_pixel_mut(px, py);
            match op {
                Composite::SourceOver => {
                    let src = shader(px as f64 + 0.5, py as f64 + 0.5);
                    blend_source_over(&mut dst.0, src, src.a * global_alpha * cov);
                }
                Composite::Clear => {
                    let a = dst.0[3] as f32 * (1.0 - cov);
                    dst.0[3] = a.round().clamp(0.0, 255.0) as u8;
                    if dst.0[3] == 0 {
                        dst.0 = [0, 0, 0, 0];
                    }
                }
            }
        }
    }
}

fn blend_source_over(dst: &mut [u8; 4], src: Color, src_alpha: f32) {
    let sa = src_alpha.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = [0, 0, 0, 0];
        return;
    }
    let mix = |s: f32, d: u8| -> u8 {
        let d = d as f32 / 255.0;
        let c = (s * sa + d * da * (1.0 - sa)) / out_a;
        (c.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    dst[0] = mix(src.r, dst[0]);
    dst[1] = mix(src.g, dst[1]);
    dst[2] = mix(src.b, dst[2]);
    dst[3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
}
