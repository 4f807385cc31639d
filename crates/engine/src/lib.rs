pub mod config;
pub mod extract;
pub mod literal;
pub mod render_state;
pub mod sanitize;
pub mod scheduler;
pub mod status;
pub mod store;

pub use config::{Config, FontDisplay, FontFormat, FontSpec, Position};
pub use extract::extract_config;
pub use render_state::{Anchor, CursorPosition, DisplayRect, RenderState, RenderStateCalculator, ViewportBounds};
pub use sanitize::sanitize;
pub use scheduler::{DebounceScheduler, TimerHandle, DEFAULT_QUIET_PERIOD};
pub use status::ExecutionStatus;
pub use store::{Snapshot, Store};
