//! Canvas-2D-shaped drawing context over a `Surface`.
//!
//! Mirrors the state machine of a browser 2D context: styles and the current
//! transform live in a save/restore stack, the current path is built in device
//! space, and calls with non-finite arguments are silently ignored. Invalid
//! style values (unparseable colors, negative line widths) keep the previous
//! value.

use std::cell::RefCell;
use std::rc::Rc;

use crate::color::Color;
use crate::gradient::LinearGradient;
use crate::path::{stroke_polygons, Path};
use crate::raster::{self, Composite};
use crate::surface::{Surface, TextRun};
use crate::transform::{Point, Transform};

pub const DEFAULT_FONT: &str = "10px sans-serif";

const TEXT_ALIGNS: [&str; 5] = ["start", "end", "left", "right", "center"];
const TEXT_BASELINES: [&str; 6] = ["top", "hanging", "middle", "alphabetic", "ideographic", "bottom"];

pub type SharedGradient = Rc<RefCell<LinearGradient>>;

/// What a fill or stroke paints with
#[derive(Debug, Clone)]
pub enum Paint {
    Color(Color),
    /// Shared with the script, so stops added after assignment still apply
    Gradient(SharedGradient),
}

impl Paint {
    /// The form a script reads back from `fillStyle`/`strokeStyle`
    pub fn css(&self) -> String {
        match self {
            Paint::Color(c) => c.to_string(),
            Paint::Gradient(_) => "gradient".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct DrawState {
    transform: Transform,
    fill: Paint,
    stroke: Paint,
    line_width: f64,
    global_alpha: f64,
    font: String,
    text_align: String,
    text_baseline: String,
    // Tracked for read-back only; shadows are not rendered
    shadow_color: Color,
    shadow_blur: f64,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            fill: Paint::Color(Color::BLACK),
            stroke: Paint::Color(Color::BLACK),
            line_width: 1.0,
            global_alpha: 1.0,
            font: DEFAULT_FONT.to_string(),
            text_align: "start".to_string(),
            text_baseline: "alphabetic".to_string(),
            shadow_color: Color::TRANSPARENT,
            shadow_blur: 0.0,
        }
    }
}

fn finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[derive(Debug)]
pub struct DrawContext {
    surface: Surface,
    state: DrawState,
    stack: Vec<DrawState>,
    path: Path,
}

impl DrawContext {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            state: DrawState::default(),
            stack: Vec::new(),
            path: Path::new(),
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Resize the surface. Clears pixels, text and every bit of context state.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        self.reset_state();
    }

    /// Back to a freshly created context, keeping the pixels
    pub fn reset_state(&mut self) {
        self.state = DrawState::default();
        self.stack.clear();
        self.path.clear();
    }

    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    // ========================================================================
    // Styles
    // ========================================================================

    pub fn fill_style(&self) -> &Paint {
        &self.state.fill
    }

    pub fn stroke_style(&self) -> &Paint {
        &self.state.stroke
    }

    pub fn set_fill_style(&mut self, paint: Paint) {
        self.state.fill = paint;
    }

    pub fn set_stroke_style(&mut self, paint: Paint) {
        self.state.stroke = paint;
    }

    /// Returns false (style unchanged) for an unparseable color
    pub fn set_fill_color(&mut self, css: &str) -> bool {
        match Color::parse(css) {
            Some(c) => {
                self.state.fill = Paint::Color(c);
                true
            }
            None => false,
        }
    }

    pub fn set_stroke_color(&mut self, css: &str) -> bool {
        match Color::parse(css) {
            Some(c) => {
                self.state.stroke = Paint::Color(c);
                true
            }
            None => false,
        }
    }

    pub fn line_width(&self) -> f64 {
        self.state.line_width
    }

    pub fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    pub fn global_alpha(&self) -> f64 {
        self.state.global_alpha
    }

    pub fn set_global_alpha(&mut self, alpha: f64) {
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    pub fn font(&self) -> &str {
        &self.state.font
    }

    pub fn set_font(&mut self, font: &str) {
        let font = font.trim();
        if !font.is_empty() {
            self.state.font = font.to_string();
        }
    }

    pub fn text_align(&self) -> &str {
        &self.state.text_align
    }

    pub fn set_text_align(&mut self, align: &str) {
        if TEXT_ALIGNS.contains(&align) {
            self.state.text_align = align.to_string();
        }
    }

    pub fn text_baseline(&self) -> &str {
        &self.state.text_baseline
    }

    pub fn set_text_baseline(&mut self, baseline: &str) {
        if TEXT_BASELINES.contains(&baseline) {
            self.state.text_baseline = baseline.to_string();
        }
    }

    pub fn shadow_color(&self) -> Color {
        self.state.shadow_color
    }

    pub fn set_shadow_color(&mut self, css: &str) {
        if let Some(c) = Color::parse(css) {
            self.state.shadow_color = c;
        }
    }

    pub fn shadow_blur(&self) -> f64 {
        self.state.shadow_blur
    }

    pub fn set_shadow_blur(&mut self, blur: f64) {
        if blur.is_finite() && blur >= 0.0 {
            self.state.shadow_blur = blur;
        }
    }

    // ========================================================================
    // State stack and transforms
    // ========================================================================

    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// Unbalanced restores are ignored
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        if finite(&[x, y]) {
            self.state.transform = self.state.transform.translate(x, y);
        }
    }

    pub fn scale(&mut self, x: f64, y: f64) {
        if finite(&[x, y]) {
            self.state.transform = self.state.transform.scale(x, y);
        }
    }

    pub fn rotate(&mut self, angle: f64) {
        if angle.is_finite() {
            self.state.transform = self.state.transform.rotate(angle);
        }
    }

    pub fn set_transform(&mut self, t: Transform) {
        if t.is_finite() {
            self.state.transform = t;
        }
    }

    pub fn reset_transform(&mut self) {
        self.state.transform = Transform::IDENTITY;
    }

    // ========================================================================
    // Path building
    // ========================================================================

    pub fn begin_path(&mut self) {
        self.path.clear();
    }

    pub fn close_path(&mut self) {
        self.path.close();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        if finite(&[x, y]) {
            self.path.move_to(self.state.transform.apply(Point::new(x, y)));
        }
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        if finite(&[x, y]) {
            self.path.line_to(self.state.transform.apply(Point::new(x, y)));
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if finite(&[x, y, w, h]) {
            self.path.rect(&self.state.transform, x, y, w, h);
        }
    }

    /// Negative radius is an error, as in the browser API
    pub fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) -> Result<(), String> {
        if !finite(&[x, y, radius, start_angle, end_angle]) {
            return Ok(());
        }
        if radius < 0.0 {
            return Err(format!("arc radius {} is negative", radius));
        }
        self.path.arc(
            &self.state.transform,
            Point::new(x, y),
            radius,
            start_angle,
            end_angle,
            counterclockwise,
        );
        Ok(())
    }

    pub fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        if finite(&[cpx, cpy, x, y]) {
            self.path.quadratic_to(&self.state.transform, Point::new(cpx, cpy), Point::new(x, y));
        }
    }

    pub fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        if finite(&[cp1x, cp1y, cp2x, cp2y, x, y]) {
            self.path.bezier_to(
                &self.state.transform,
                Point::new(cp1x, cp1y),
                Point::new(cp2x, cp2y),
                Point::new(x, y),
            );
        }
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Fill the current path (nonzero winding)
    pub fn fill(&mut self) {
        let polys: Vec<Vec<Point>> = self.path.subpaths().iter().map(|s| s.points.clone()).collect();
        let paint = self.state.fill.clone();
        self.paint_polygons(&polys, &paint, Composite::SourceOver);
    }

    pub fn stroke(&mut self) {
        let width = self.state.line_width * self.state.transform.mean_scale();
        let polys = stroke_polygons(&self.path, width);
        let paint = self.state.stroke.clone();
        self.paint_polygons(&polys, &paint, Composite::SourceOver);
    }

    /// Fill a rectangle without touching the current path
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if !finite(&[x, y, w, h]) || w == 0.0 || h == 0.0 {
            return;
        }
        let poly = self.device_rect(x, y, w, h);
        let paint = self.state.fill.clone();
        self.paint_polygons(&[poly], &paint, Composite::SourceOver);
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if !finite(&[x, y, w, h]) {
            return;
        }
        let mut path = Path::new();
        path.rect(&self.state.transform, x, y, w, h);
        let width = self.state.line_width * self.state.transform.mean_scale();
        let polys = stroke_polygons(&path, width);
        let paint = self.state.stroke.clone();
        self.paint_polygons(&polys, &paint, Composite::SourceOver);
    }

    /// Erase to transparent black. Text runs anchored inside the cleared
    /// area are dropped as well.
    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if !finite(&[x, y, w, h]) || w == 0.0 || h == 0.0 {
            return;
        }
        let poly = self.device_rect(x, y, w, h);
        let mask = raster::coverage(std::slice::from_ref(&poly), self.surface.width(), self.surface.height());
        raster::composite(self.surface.image_mut(), &mask, 1.0, Composite::Clear, |_, _| Color::TRANSPARENT);

        let (min_x, max_x) = min_max(poly.iter().map(|p| p.x));
        let (min_y, max_y) = min_max(poly.iter().map(|p| p.y));
        self.surface
            .retain_text_runs(|r| !(r.x >= min_x && r.x <= max_x && r.y >= min_y && r.y <= max_y));
    }

    pub fn fill_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>) {
        self.record_text(text, x, y, max_width, false);
    }

    pub fn stroke_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>) {
        self.record_text(text, x, y, max_width, true);
    }

    /// A gradient in the current user space
    pub fn create_linear_gradient(x0: f64, y0: f64, x1: f64, y1: f64) -> Option<LinearGradient> {
        finite(&[x0, y0, x1, y1]).then(|| LinearGradient::new(Point::new(x0, y0), Point::new(x1, y1)))
    }

    fn record_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>, stroke: bool) {
        if !finite(&[x, y]) {
            return;
        }
        if let Some(mw) = max_width {
            if !mw.is_finite() || mw <= 0.0 {
                return;
            }
        }
        let anchor = self.state.transform.apply(Point::new(x, y));
        let paint = if stroke { &self.state.stroke } else { &self.state.fill };
        let run = TextRun {
            text: text.to_string(),
            x: anchor.x,
            y: anchor.y,
            font: self.state.font.clone(),
            align: self.state.text_align.clone(),
            baseline: self.state.text_baseline.clone(),
            style: paint.css(),
            stroke,
            max_width,
        };
        self.surface.push_text_run(run);
    }

    fn device_rect(&self, x: f64, y: f64, w: f64, h: f64) -> Vec<Point> {
        let t = &self.state.transform;
        vec![
            t.apply(Point::new(x, y)),
            t.apply(Point::new(x + w, y)),
            t.apply(Point::new(x + w, y + h)),
            t.apply(Point::new(x, y + h)),
        ]
    }

    fn paint_polygons(&mut self, polys: &[Vec<Point>], paint: &Paint, op: Composite) {
        let mask = raster::coverage(polys, self.surface.width(), self.surface.height());
        if mask.is_empty() {
            return;
        }
        let alpha = self.state.global_alpha as f32;
        match paint {
            Paint::Color(color) => {
                let color = *color;
                raster::composite(self.surface.image_mut(), &mask, alpha, op, |_, _| color);
            }
            Paint::Gradient(gradient) => {
                // Gradient coordinates are in the user space of this fill
                let Some(inverse) = self.state.transform.invert() else {
                    return;
                };
                let gradient = gradient.borrow().clone();
                raster::composite(self.surface.image_mut(), &mask, alpha, op, |x, y| {
                    gradient.color_at(inverse.apply(Point::new(x, y)))
                });
            }
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}
