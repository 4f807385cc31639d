//! Canvas studio: the composition root.
//!
//! `Studio` owns the store, the debounce scheduler, the geometry calculator,
//! the Lua runtime and the drawing surface, plus the two collaborators that
//! talk to the outside world (key-value storage and font loading).

pub mod fonts;
pub mod studio;
pub mod template;

pub use fonts::{font_url, normalize_font_name, FontError, FontFace, FontLoader};
pub use studio::{export_file_name, Studio, StudioOptions};
pub use template::TEMPLATE;
