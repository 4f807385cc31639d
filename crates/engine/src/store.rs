//! Studio state store.
//!
//! One owner, one writer. `write_source` is the only way to change the script
//! and it recomputes the config and the sanitized text in the same call, so
//! the three are never observed out of sync.
//!
//! `snapshot()` hands out an immutable point-in-time view (shared `Arc`s plus a
//! revision number). Deferred work reads a fresh snapshot when it runs instead
//! of holding on to values from when it was scheduled.

use std::sync::Arc;

use crate::config::Config;
use crate::extract::extract_config_detailed;
use crate::render_state::{CursorPosition, RenderState};
use crate::sanitize::sanitize_extracted;
use crate::status::ExecutionStatus;

/// Dimensions label before the first geometry pass
pub const DIMS_INITIALIZING: &str = "initializing...";

#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Bumped on every source write
    pub revision: u64,
    pub source: Arc<str>,
    pub config: Arc<Config>,
    pub sanitized: Arc<str>,
    pub status: ExecutionStatus,
    pub render_state: Option<RenderState>,
    pub cursor: CursorPosition,
}

impl Snapshot {
    pub fn dims_label(&self) -> String {
        self.render_state
            .map(|s| s.dims_label())
            .unwrap_or_else(|| DIMS_INITIALIZING.to_string())
    }
}

#[derive(Debug)]
pub struct Store {
    revision: u64,
    source: Arc<str>,
    config: Arc<Config>,
    sanitized: Arc<str>,
    status: ExecutionStatus,
    render_state: Option<RenderState>,
    cursor: CursorPosition,
}

impl Store {
    pub fn new(source: impl Into<String>) -> Self {
        let source: String = source.into();
        let (config, sanitized) = derive(&source);
        Self {
            revision: 0,
            source: source.into(),
            config,
            sanitized,
            status: ExecutionStatus::Ready,
            render_state: None,
            cursor: CursorPosition::default(),
        }
    }

    /// Replace the script. Returns false (and changes nothing) when the text is identical.
    pub fn write_source(&mut self, text: impl Into<String>) -> bool {
        let text: String = text.into();
        if &*self.source == text.as_str() {
            return false;
        }
        let (config, sanitized) = derive(&text);
        self.source = text.into();
        self.config = config;
        self.sanitized = sanitized;
        self.revision += 1;
        true
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ExecutionStatus) {
        if self.status != status {
            log::debug!("status {} -> {}", self.status, status);
            self.status = status;
        }
    }

    pub fn render_state(&self) -> Option<&RenderState> {
        self.render_state.as_ref()
    }

    pub fn set_render_state(&mut self, state: RenderState) {
        self.render_state = Some(state);
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: CursorPosition) {
        self.cursor = cursor;
    }

    pub fn dims_label(&self) -> String {
        self.render_state
            .map(|s| s.dims_label())
            .unwrap_or_else(|| DIMS_INITIALIZING.to_string())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            source: Arc::clone(&self.source),
            config: Arc::clone(&self.config),
            sanitized: Arc::clone(&self.sanitized),
            status: self.status,
            render_state: self.render_state,
            cursor: self.cursor,
        }
    }
}

fn derive(source: &str) -> (Arc<Config>, Arc<str>) {
    let extraction = extract_config_detailed(source);
    let sanitized: Arc<str> = Arc::from(sanitize_extracted(source, &extraction).as_ref());
    (Arc::new(extraction.config), sanitized)
}
