//! Path construction and flattening.
//!
//! Points are transformed to device space as they are added, matching canvas
//! semantics where the transform in effect at `lineTo` time applies, not the
//! one in effect at `fill` time. Curves and arcs are flattened immediately
//! into line segments.

use std::f64::consts::TAU;

use crate::transform::{Point, Transform};

/// Upper bound on segments produced for one curve or arc
const MAX_CURVE_SEGMENTS: usize = 512;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubPath {
    pub points: Vec<Point>,
    pub closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Path {
    subpaths: Vec<SubPath>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.subpaths.clear();
    }

    pub fn subpaths(&self) -> &[SubPath] {
        &self.subpaths
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|s| s.points.is_empty())
    }

    fn last_point(&self) -> Option<Point> {
        self.subpaths.last().and_then(|s| s.points.last().copied())
    }

    pub fn move_to(&mut self, p: Point) {
        self.subpaths.push(SubPath { points: vec![p], closed: false });
    }

    /// With no current point this behaves like `move_to`
    pub fn line_to(&mut self, p: Point) {
        match self.subpaths.last_mut() {
            Some(sub) if !sub.points.is_empty() => sub.points.push(p),
            _ => self.move_to(p),
        }
    }

    /// Close the current subpath and start a new one at its first point
    pub fn close(&mut self) {
        let Some(sub) = self.subpaths.last_mut() else {
            return;
        };
        if sub.closed || sub.points.is_empty() {
            return;
        }
        sub.closed = true;
        let first = sub.points[0];
        self.move_to(first);
    }

    /// Closed rectangle subpath; the current point ends at the rect origin.
    pub fn rect(&mut self, transform: &Transform, x: f64, y: f64, w: f64, h: f64) {
        let corners = [
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ];
        self.subpaths.push(SubPath {
            points: corners.iter().map(|&c| transform.apply(c)).collect(),
            closed: true,
        });
        self.move_to(transform.apply(Point::new(x, y)));
    }

    pub fn quadratic_to(&mut self, transform: &Transform, cp: Point, end: Point) {
        let cp = transform.apply(cp);
        let end = transform.apply(end);
        let Some(start) = self.last_point() else {
            // Canvas: no current point means the control point becomes one
            self.move_to(cp);
            self.line_to(end);
            return;
        };
        let n = segment_count(start.distance(cp) + cp.distance(end));
        for i in 1..=n {
            let t = i as f64 / n as f64;
            let mt = 1.0 - t;
            self.line_to(Point::new(
                mt * mt * start.x + 2.0 * mt * t * cp.x + t * t * end.x,
                mt * mt * start.y + 2.0 * mt * t * cp.y + t * t * end.y,
            ));
        }
    }

    pub fn bezier_to(&mut self, transform: &Transform, cp1: Point, cp2: Point, end: Point) {
        let cp1 = transform.apply(cp1);
        let cp2 = transform.apply(cp2);
        let end = transform.apply(end);
        let Some(start) = self.last_point() else {
            self.move_to(cp1);
            self.line_to(end);
            return;
        };
        let n = segment_count(start.distance(cp1) + cp1.distance(cp2) + cp2.distance(end));
        for i in 1..=n {
            let t = i as f64 / n as f64;
            let mt = 1.0 - t;
            let (w0, w1, w2, w3) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
            self.line_to(Point::new(
                w0 * start.x + w1 * cp1.x + w2 * cp2.x + w3 * end.x,
                w0 * start.y + w1 * cp1.y + w2 * cp2.y + w3 * end.y,
            ));
        }
    }

    /// Canvas `arc`. Connects from the current point with a straight line.
    pub fn arc(
        &mut self,
        transform: &Transform,
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        let sweep = arc_sweep(start_angle, end_angle, counterclockwise);
        let device_radius = radius * transform.mean_scale();
        let n = segment_count(sweep.abs() * device_radius).max(4);

        for i in 0..=n {
            let angle = start_angle + sweep * (i as f64 / n as f64);
            let p = transform.apply(Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            ));
            if i == 0 && self.last_point().is_none() {
                self.move_to(p);
            } else {
                self.line_to(p);
            }
        }
    }
}

/// Signed sweep of a canvas arc. A full turn or more in the drawing
/// direction draws the whole circle.
pub fn arc_sweep(start: f64, end: f64, counterclockwise: bool) -> f64 {
    if !counterclockwise {
        let delta = end - start;
        if delta >= TAU {
            TAU
        } else {
            delta.rem_euclid(TAU)
        }
    } else {
        let delta = start - end;
        if delta >= TAU {
            -TAU
        } else {
            -delta.rem_euclid(TAU)
        }
    }
}

/// Roughly one segment per 3 device pixels of curve length
fn segment_count(length: f64) -> usize {
    if !length.is_finite() {
        return 1;
    }
    ((length / 3.0).ceil() as usize).clamp(1, MAX_CURVE_SEGMENTS)
}

// ============================================================================
// Stroking
// ============================================================================

/// Polygons whose nonzero-winding union is the stroke of `path`.
///
/// Each segment becomes a quad and each joint a round cap; every polygon is
/// normalized to the same orientation so overlaps never cancel out. Open ends
/// are butt-capped.
pub fn stroke_polygons(path: &Path, line_width: f64) -> Vec<Vec<Point>> {
    let half = line_width / 2.0;
    let mut polys = Vec::new();
    if !half.is_finite() || half <= 0.0 {
        return polys;
    }

    for sub in path.subpaths() {
        let mut pts: Vec<Point> = Vec::with_capacity(sub.points.len());
        for &p in &sub.points {
            if pts.last().map_or(true, |&last: &Point| last.distance(p) > 1e-9) {
                pts.push(p);
            }
        }
        if sub.closed && pts.len() > 2 && pts[0].distance(pts[pts.len() - 1]) <= 1e-9 {
            pts.pop();
        }
        if pts.len() < 2 {
            continue;
        }

        let segment_count = if sub.closed { pts.len() } else { pts.len() - 1 };
        for i in 0..segment_count {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            push_oriented(&mut polys, segment_quad(a, b, half));
        }

        let joints: Box<dyn Iterator<Item = usize>> = if sub.closed {
            Box::new(0..pts.len())
        } else {
            Box::new(1..pts.len() - 1)
        };
        for j in joints {
            push_oriented(&mut polys, circle(pts[j], half));
        }
    }
    polys
}

fn segment_quad(a: Point, b: Point, half: f64) -> Vec<Point> {
    let len = a.distance(b);
    let nx = -(b.y - a.y) / len * half;
    let ny = (b.x - a.x) / len * half;
    vec![
        Point::new(a.x + nx, a.y + ny),
        Point::new(b.x + nx, b.y + ny),
        Point::new(b.x - nx, b.y - ny),
        Point::new(a.x - nx, a.y - ny),
    ]
}

fn circle(center: Point, radius: f64) -> Vec<Point> {
    let n = segment_count(TAU * radius).max(8);
    (0..n)
        .map(|i| {
            let angle = TAU * i as f64 / n as f64;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

fn signed_area(poly: &[Point]) -> f64 {
    let mut sum = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

fn push_oriented(polys: &mut Vec<Vec<Point>>, mut poly: Vec<Point>) {
    let area = signed_area(&poly);
    if area.abs() < 1e-12 {
        return;
    }
    if area < 0.0 {
        poly.reverse();
    }
    polys.push(poly);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_line_to_without_move_starts_subpath() {
        let mut path = Path::new();
        path.line_to(Point::new(1.0, 1.0));
        path.line_to(Point::new(2.0, 1.0));
        assert_eq!(path.subpaths().len(), 1);
        assert_eq!(path.subpaths()[0].points.len(), 2);
    }

    #[test]
    fn test_close_starts_new_subpath_at_origin() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(5.0, 0.0));
        path.line_to(Point::new(5.0, 5.0));
        path.close();
        assert!(path.subpaths()[0].closed);
        assert_eq!(path.subpaths()[1].points, vec![Point::new(0.0, 0.0)]);
    }

    #[test]
    fn test_arc_sweep() {
        assert!((arc_sweep(0.0, PI * 2.0, false) - TAU).abs() < 1e-12);
        assert!((arc_sweep(0.0, PI * 4.0, false) - TAU).abs() < 1e-12);
        assert!((arc_sweep(0.0, PI, false) - PI).abs() < 1e-12);
        assert!((arc_sweep(0.0, PI / 2.0, true) + 1.5 * PI).abs() < 1e-12);
        assert_eq!(arc_sweep(1.0, 1.0, false), 0.0);
    }

    #[test]
    fn test_full_arc_returns_to_start() {
        let mut path = Path::new();
        path.arc(&Transform::IDENTITY, Point::new(50.0, 50.0), 10.0, 0.0, TAU, false);
        let pts = &path.subpaths()[0].points;
        let first = pts[0];
        let last = pts[pts.len() - 1];
        assert!(first.distance(last) < 1e-9);
        assert!(pts.iter().all(|p| (p.distance(Point::new(50.0, 50.0)) - 10.0).abs() < 1e-9));
    }

    #[test]
    fn test_stroke_polygons_share_orientation() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(10.0, 0.0));
        path.line_to(Point::new(10.0, 10.0));
        path.line_to(Point::new(0.0, 10.0));
        let polys = stroke_polygons(&path, 2.0);
        // three quads plus two interior joints
        assert_eq!(polys.len(), 5);
        assert!(polys.iter().all(|p| signed_area(p) > 0.0));
    }

    #[test]
    fn test_stroke_ignores_bad_width() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(10.0, 0.0));
        assert!(stroke_polygons(&path, 0.0).is_empty());
        assert!(stroke_polygons(&path, f64::NAN).is_empty());
    }
}
