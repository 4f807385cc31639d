//! Script execution for canvas studio: a Lua sandbox calling into a
//! software-rendered, Canvas-2D-shaped drawing context.

pub mod color;
pub mod context;
pub mod gradient;
pub mod lua_api;
pub mod path;
pub mod raster;
pub mod sandbox;
pub mod surface;
pub mod transform;

pub use color::Color;
pub use context::{DrawContext, Paint};
pub use gradient::LinearGradient;
pub use lua_api::{handles, CanvasHandle, ContextHandle, GradientHandle, SharedContext};
pub use sandbox::{CompiledScript, ExecutionLimits, LuaScripting, ScriptError, Scripting};
pub use surface::{ExportError, Surface, TextRun};
pub use transform::{Point, Transform};
