//! The drawing surface: an RGBA pixel buffer plus the text runs drawn on it.
//!
//! Glyph rasterization belongs to the font subsystem, so `fillText` and
//! `strokeText` are recorded here as `TextRun`s in device coordinates instead
//! of being turned into pixels.

use image::{ImageFormat, Rgba, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// One recorded text draw
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Anchor point in device pixels
    pub x: f64,
    pub y: f64,
    pub font: String,
    pub align: String,
    pub baseline: String,
    /// CSS serialization of the paint (gradients report as `gradient`)
    pub style: String,
    pub stroke: bool,
    pub max_width: Option<f64>,
}

#[derive(Debug)]
pub enum ExportError {
    Encode(image::ImageError),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Encode(e) => write!(f, "PNG encoding failed: {}", e),
            ExportError::Io(e) => write!(f, "could not write image: {}", e),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Encode(e) => Some(e),
            ExportError::Io(e) => Some(e),
        }
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        ExportError::Encode(e)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

pub struct Surface {
    image: RgbaImage,
    text_runs: Vec<TextRun>,
}

impl Surface {
    /// Zero dimensions are bumped to 1 so the buffer always exists
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
            text_runs: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.image.get_pixel(x, y).0)
    }

    /// Reallocate the buffer. The content is lost, as with a canvas resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width.max(1), height.max(1));
        self.text_runs.clear();
    }

    /// Transparent black everywhere, no text
    pub fn clear(&mut self) {
        for px in self.image.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        self.text_runs.clear();
    }

    pub fn text_runs(&self) -> &[TextRun] {
        &self.text_runs
    }

    pub fn push_text_run(&mut self, run: TextRun) {
        self.text_runs.push(run);
    }

    pub fn retain_text_runs(&mut self, keep: impl FnMut(&TextRun) -> bool) {
        self.text_runs.retain(keep);
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ExportError> {
        let mut bytes = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    pub fn save_png(&self, path: &Path) -> Result<(), ExportError> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("text_runs", &self.text_runs.len())
            .finish()
    }
}
