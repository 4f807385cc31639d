//! Render geometry.
//!
//! Derives the pixel buffer size, the display scale and the buffer's alignment
//! inside the viewport from the extracted config. The scale only ever shrinks
//! the buffer to fit the padded viewport; it never magnifies past 1.
//!
//! `RenderStateCalculator` keeps the last result so repeated updates with the
//! same inputs report "unchanged" and callers skip redundant writes (a buffer
//! resize would clear the drawing).

use serde::Serialize;
use std::fmt;

use crate::config::{Config, Position};

/// Reference padding around the buffer, in CSS-like pixels
pub const DEFAULT_PADDING_PX: f64 = 20.0;

/// Content-box size of the display container
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportBounds {
    pub width: f64,
    pub height: f64,
}

impl ViewportBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width: width.max(0.0), height: height.max(0.0) }
    }
}

/// Alignment along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Start,
    Center,
    End,
}

/// (vertical, horizontal) anchors for a position
pub fn anchors(position: Position) -> (Anchor, Anchor) {
    use Anchor::*;
    match position {
        Position::Center => (Center, Center),
        Position::Top => (Start, Center),
        Position::TopLeft => (Start, Start),
        Position::TopRight => (Start, End),
        Position::Right => (Center, End),
        Position::BottomRight => (End, End),
        Position::Bottom => (End, Center),
        Position::BottomLeft => (End, Start),
        Position::Left => (Center, Start),
    }
}

/// Anchors for a raw position name; unknown names center.
pub fn anchors_for_name(name: &str) -> (Anchor, Anchor) {
    Position::parse(name).map(anchors).unwrap_or((Anchor::Center, Anchor::Center))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub buffer_width: u32,
    pub buffer_height: u32,
    pub display_scale: f64,
    pub vertical_anchor: Anchor,
    pub horizontal_anchor: Anchor,
    pub padding_px: f64,
}

/// Where the scaled buffer lands inside the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Pointer location in buffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CursorPosition {
    pub x: i64,
    pub y: i64,
}

impl fmt::Display for CursorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x: {}, y: {}", self.x, self.y)
    }
}

impl RenderState {
    /// Pure geometry: same inputs, same output.
    pub fn compute(config: &Config, viewport: ViewportBounds, padding_px: f64) -> Self {
        let buffer_width = config.canvas_width.max(1);
        let buffer_height = config.canvas_height.max(1);
        let padding_px = padding_px.max(0.0);

        let fit_w = (viewport.width - 2.0 * padding_px) / buffer_width as f64;
        let fit_h = (viewport.height - 2.0 * padding_px) / buffer_height as f64;
        let display_scale = 1.0_f64.min(fit_w).min(fit_h).max(0.0);

        let (vertical_anchor, horizontal_anchor) = anchors(config.position);

        Self {
            buffer_width,
            buffer_height,
            display_scale,
            vertical_anchor,
            horizontal_anchor,
            padding_px,
        }
    }

    pub fn display_width(&self) -> f64 {
        self.buffer_width as f64 * self.display_scale
    }

    pub fn display_height(&self) -> f64 {
        self.buffer_height as f64 * self.display_scale
    }

    pub fn display_rect(&self, viewport: ViewportBounds) -> DisplayRect {
        let width = self.display_width();
        let height = self.display_height();
        DisplayRect {
            x: align(self.horizontal_anchor, viewport.width, width, self.padding_px),
            y: align(self.vertical_anchor, viewport.height, height, self.padding_px),
            width,
            height,
        }
    }

    /// Map a viewport-relative pointer location to buffer pixels.
    /// `None` while the buffer has no visible area.
    pub fn buffer_point(&self, viewport: ViewportBounds, x: f64, y: f64) -> Option<CursorPosition> {
        let rect = self.display_rect(viewport);
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return None;
        }
        let scale_x = self.buffer_width as f64 / rect.width;
        let scale_y = self.buffer_height as f64 / rect.height;
        Some(CursorPosition {
            x: ((x - rect.x) * scale_x).round() as i64,
            y: ((y - rect.y) * scale_y).round() as i64,
        })
    }

    /// "800 x 600"
    pub fn dims_label(&self) -> String {
        format!("{} x {}", self.buffer_width, self.buffer_height)
    }

    pub fn same_buffer(&self, other: &RenderState) -> bool {
        self.buffer_width == other.buffer_width && self.buffer_height == other.buffer_height
    }
}

fn align(anchor: Anchor, available: f64, size: f64, padding: f64) -> f64 {
    match anchor {
        Anchor::Start => padding,
        Anchor::Center => (available - size) / 2.0,
        Anchor::End => available - padding - size,
    }
}

/// Result of a calculator update that changed something
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderChange {
    pub state: RenderState,
    /// Buffer dimensions differ from the previous state (or there was none)
    pub buffer_resized: bool,
}

/// Tracks the live viewport and the last computed state.
#[derive(Debug, Clone)]
pub struct RenderStateCalculator {
    padding_px: f64,
    viewport: ViewportBounds,
    current: Option<RenderState>,
}

impl RenderStateCalculator {
    pub fn new(viewport: ViewportBounds, padding_px: f64) -> Self {
        Self { padding_px, viewport, current: None }
    }

    pub fn viewport(&self) -> ViewportBounds {
        self.viewport
    }

    pub fn current(&self) -> Option<&RenderState> {
        self.current.as_ref()
    }

    /// Record a new viewport measurement. Returns false when it did not change.
    pub fn set_viewport(&mut self, viewport: ViewportBounds) -> bool {
        if self.viewport == viewport {
            return false;
        }
        self.viewport = viewport;
        true
    }

    /// Recompute for `config`. `None` means the inputs produced the same state
    /// as last time and nothing needs to be written.
    pub fn update(&mut self, config: &Config) -> Option<RenderChange> {
        let next = RenderState::compute(config, self.viewport, self.padding_px);
        match self.current {
            Some(prev) if prev == next => None,
            prev => {
                let buffer_resized = prev.map_or(true, |p| !p.same_buffer(&next));
                self.current = Some(next);
                Some(RenderChange { state: next, buffer_resized })
            }
        }
    }
}
