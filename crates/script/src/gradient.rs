// Linear gradients (createLinearGradient / addColorStop)

use std::fmt;

use crate::color::Color;
use crate::transform::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum GradientError {
    /// Offset outside 0..=1 or not a number
    OffsetOutOfRange(f64),
    InvalidColor(String),
}

impl fmt::Display for GradientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradientError::OffsetOutOfRange(v) => write!(f, "color stop offset {} is outside the range [0, 1]", v),
            GradientError::InvalidColor(s) => write!(f, "invalid color stop color '{}'", s),
        }
    }
}

impl std::error::Error for GradientError {}

/// Gradient along the line `start -> end`, in the user space of the fill.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    /// Sorted by offset; equal offsets keep insertion order
    stops: Vec<(f64, Color)>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end, stops: Vec::new() }
    }

    pub fn add_color_stop(&mut self, offset: f64, color: &str) -> Result<(), GradientError> {
        if !(0.0..=1.0).contains(&offset) {
            return Err(GradientError::OffsetOutOfRange(offset));
        }
        let color = Color::parse(color).ok_or_else(|| GradientError::InvalidColor(color.to_string()))?;
        let at = self.stops.partition_point(|(o, _)| *o <= offset);
        self.stops.insert(at, (offset, color));
        Ok(())
    }

    pub fn stops(&self) -> &[(f64, Color)] {
        &self.stops
    }

    /// Color at a user-space point. No stops paints transparent black;
    /// a degenerate line paints the last stop.
    pub fn color_at(&self, p: Point) -> Color {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Color::TRANSPARENT;
        };
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return last.1;
        }
        let t = ((p.x - self.start.x) * dx + (p.y - self.start.y) * dy) / len_sq;

        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        for pair in self.stops.windows(2) {
            let (o0, c0) = pair[0];
            let (o1, c1) = pair[1];
            if t >= o0 && t <= o1 {
                if o1 == o0 {
                    return c1;
                }
                return c0.lerp(c1, ((t - o0) / (o1 - o0)) as f32);
            }
        }
        last.1
    }
}
