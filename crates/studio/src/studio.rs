//! The live studio: edit → debounce → geometry → run → persist.
//!
//! Everything runs on the caller's thread. The host feeds edits, pointer
//! moves and viewport changes in, and calls `tick` with the current time; the
//! pipeline fires from `tick` once the quiet period has elapsed and reads a
//! fresh store snapshot at that moment.

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use canvas_studio_config::{KeyValueStore, Settings, STORAGE_KEY};
use canvas_studio_engine::{
    Config, CursorPosition, DebounceScheduler, DisplayRect, ExecutionStatus, RenderState, RenderStateCalculator,
    Snapshot, Store, ViewportBounds, DEFAULT_QUIET_PERIOD,
};
use canvas_studio_script::{
    handles, DrawContext, ExecutionLimits, ExportError, LuaScripting, ScriptError, Scripting, SharedContext, Surface,
};

use crate::fonts::FontLoader;
use crate::template::TEMPLATE;

/// `canvas-<millis>.png`
pub fn export_file_name(unix_millis: i64) -> String {
    format!("canvas-{}.png", unix_millis)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudioOptions {
    pub quiet_period: Duration,
    pub viewport: ViewportBounds,
    pub padding_px: f64,
    pub limits: ExecutionLimits,
}

impl Default for StudioOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            viewport: ViewportBounds::new(1024.0, 768.0),
            padding_px: 20.0,
            limits: ExecutionLimits::default(),
        }
    }
}

impl StudioOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            quiet_period: settings.debounce(),
            viewport: ViewportBounds::new(settings.viewport_width, settings.viewport_height),
            padding_px: settings.padding_px,
            limits: ExecutionLimits::from_settings(settings.timeout_ms, settings.instruction_limit),
        }
    }
}

pub struct Studio {
    store: Store,
    scheduler: DebounceScheduler,
    geometry: RenderStateCalculator,
    context: SharedContext,
    scripting: Box<dyn Scripting>,
    storage: Box<dyn KeyValueStore>,
    fonts: Option<FontLoader>,
    /// Config of the last pipeline run; viewport changes re-derive from it
    last_config: Option<Arc<Config>>,
    last_error: Option<ScriptError>,
    runs: u64,
}

impl Studio {
    /// Studio on the Lua runtime. The script comes from `storage`, or the
    /// built-in template when nothing was saved.
    pub fn new(options: StudioOptions, storage: Box<dyn KeyValueStore>) -> Result<Self, ScriptError> {
        let scripting = LuaScripting::new(options.limits)
            .map_err(|e| ScriptError::Runtime(format!("could not start Lua: {}", e)))?;
        Ok(Self::with_scripting(options, storage, Box::new(scripting)))
    }

    pub fn with_scripting(
        options: StudioOptions,
        storage: Box<dyn KeyValueStore>,
        scripting: Box<dyn Scripting>,
    ) -> Self {
        let source = match storage.get(STORAGE_KEY) {
            Some(saved) => {
                log::info!("restored script from storage ({} bytes)", saved.len());
                saved
            }
            None => TEMPLATE.to_string(),
        };
        let store = Store::new(source);
        let surface = Surface::new(store.config().canvas_width, store.config().canvas_height);

        Self {
            store,
            scheduler: DebounceScheduler::new(options.quiet_period),
            geometry: RenderStateCalculator::new(options.viewport, options.padding_px),
            context: Rc::new(RefCell::new(DrawContext::new(surface))),
            scripting,
            storage,
            fonts: None,
            last_config: None,
            last_error: None,
            runs: 0,
        }
    }

    pub fn with_fonts(mut self, loader: FontLoader) -> Self {
        self.fonts = Some(loader);
        self
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Schedule the first run of whatever the studio started with
    pub fn start(&mut self, now: Instant) {
        self.schedule(now);
    }

    /// One editor change. Returns false when nothing was scheduled (same
    /// text, or the studio is torn down).
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) -> bool {
        if self.scheduler.is_torn_down() {
            return false;
        }
        if !self.store.write_source(text) {
            return false;
        }
        self.schedule(now)
    }

    /// Replace the script with the built-in template
    pub fn reset(&mut self, now: Instant) -> bool {
        log::info!("resetting script to template");
        let scheduled = self.edit(TEMPLATE, now);
        if !scheduled && !self.scheduler.is_torn_down() {
            self.store.set_status(ExecutionStatus::Ready);
        }
        scheduled
    }

    /// Drive the debounce timer. Returns true when the pipeline ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.scheduler.poll(now) {
            Some(handle) => {
                log::debug!("debounce timer {:?} fired", handle);
                self.run_pipeline();
                true
            }
            None => false,
        }
    }

    /// Skip the quiet period: consume any pending timer and run now.
    pub fn run_now(&mut self) -> ExecutionStatus {
        if self.scheduler.is_torn_down() {
            log::debug!("run skipped after teardown");
            return self.store.status();
        }
        if let Some(handle) = self.scheduler.flush() {
            log::debug!("debounce timer {:?} flushed", handle);
        }
        self.run_pipeline()
    }

    /// New measurement of the display container. Geometry is re-derived from
    /// the config of the last run; the buffer itself only changes on a run.
    pub fn resize_viewport(&mut self, viewport: ViewportBounds) -> bool {
        if !self.geometry.set_viewport(viewport) {
            return false;
        }
        if let Some(config) = self.last_config.clone() {
            self.apply_geometry(&config);
        }
        true
    }

    /// Pointer at viewport coordinates; updates the cursor label
    pub fn pointer_moved(&mut self, x: f64, y: f64) -> Option<CursorPosition> {
        let state = *self.store.render_state()?;
        let position = state.buffer_point(self.geometry.viewport(), x, y)?;
        self.store.set_cursor(position);
        Some(position)
    }

    /// Stop for good: a pending run is dropped and later edits are ignored
    pub fn teardown(&mut self) {
        self.scheduler.teardown();
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn schedule(&mut self, now: Instant) -> bool {
        if self.scheduler.arm(now).is_none() {
            return false;
        }
        let status = self.store.status().on_mutation();
        self.store.set_status(status);
        true
    }

    /// One full pass over the current snapshot
    pub fn run_pipeline(&mut self) -> ExecutionStatus {
        let snapshot = self.store.snapshot();
        self.runs += 1;
        log::info!("running script (revision {}, run {})", snapshot.revision, self.runs);

        self.apply_geometry(&snapshot.config);
        self.last_config = Some(Arc::clone(&snapshot.config));

        if let Some(fonts) = self.fonts.as_mut() {
            if !snapshot.config.fonts.is_empty() {
                let queued = fonts.load(&snapshot.config.fonts);
                if queued > 0 {
                    log::debug!("queued {} font faces", queued);
                }
            }
        }

        self.prepare_surface(snapshot.config.background_color.as_deref());

        match self.execute(&snapshot.sanitized) {
            Ok(()) => {
                let status = self.store.status().on_success();
                self.store.set_status(status);
                self.last_error = None;
                self.persist(&snapshot);
            }
            Err(e) => {
                log::error!("{}", e);
                let status = self.store.status().on_failure();
                self.store.set_status(status);
                self.last_error = Some(e);
            }
        }

        self.store.status()
    }

    fn apply_geometry(&mut self, config: &Config) {
        let Some(change) = self.geometry.update(config) else {
            log::debug!("geometry unchanged");
            return;
        };
        if change.buffer_resized {
            log::info!("canvas buffer {}", change.state.dims_label());
            self.context
                .borrow_mut()
                .resize(change.state.buffer_width, change.state.buffer_height);
        }
        self.store.set_render_state(change.state);
    }

    /// Clear the buffer and paint the configured background
    fn prepare_surface(&self, background: Option<&str>) {
        let mut ctx = self.context.borrow_mut();
        let (width, height) = (ctx.width() as f64, ctx.height() as f64);

        ctx.save();
        ctx.reset_transform();
        ctx.set_global_alpha(1.0);
        ctx.clear_rect(0.0, 0.0, width, height);
        if let Some(color) = background {
            if ctx.set_fill_color(color) {
                ctx.fill_rect(0.0, 0.0, width, height);
            } else {
                log::debug!("ignoring backgroundColor {:?}: not a color", color);
            }
        }
        ctx.restore();
    }

    fn execute(&self, sanitized: &str) -> Result<(), ScriptError> {
        let script = self.scripting.compile(sanitized)?;
        let (canvas, ctx) = handles(&self.context);
        script.call(canvas, ctx)
    }

    fn persist(&mut self, snapshot: &Snapshot) {
        match self.storage.set(STORAGE_KEY, &snapshot.source) {
            Ok(()) => log::info!("saved script ({} bytes)", snapshot.source.len()),
            Err(e) => log::warn!("could not save script: {}", e),
        }
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Write the buffer to `dir/canvas-<millis>.png`
    pub fn export_png(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(export_file_name(chrono::Utc::now().timestamp_millis()));
        self.context.borrow().surface().save_png(&path)?;
        log::info!("exported {}", path.display());
        Ok(path)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ExportError> {
        self.context.borrow().surface().encode_png()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn source(&self) -> &str {
        self.store.source()
    }

    pub fn config(&self) -> &Config {
        self.store.config()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.store.status()
    }

    pub fn last_error(&self) -> Option<&ScriptError> {
        self.last_error.as_ref()
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn render_state(&self) -> Option<&RenderState> {
        self.store.render_state()
    }

    pub fn display_rect(&self) -> Option<DisplayRect> {
        self.store.render_state().map(|s| s.display_rect(self.geometry.viewport()))
    }

    pub fn viewport(&self) -> ViewportBounds {
        self.geometry.viewport()
    }

    /// "600 x 600", or "initializing..." before the first run
    pub fn dims_label(&self) -> String {
        self.store.dims_label()
    }

    /// "x: 12, y: 40"
    pub fn cursor_label(&self) -> String {
        self.store.cursor().to_string()
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_armed()
    }

    pub fn time_until_fire(&self, now: Instant) -> Option<Duration> {
        self.scheduler.time_until_fire(now)
    }

    pub fn surface(&self) -> Ref<'_, Surface> {
        Ref::map(self.context.borrow(), |ctx| ctx.surface())
    }

    pub fn fonts_mut(&mut self) -> Option<&mut FontLoader> {
        self.fonts.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_studio_config::{MemoryStore, StorageError};
    use canvas_studio_engine::Position;
    use std::collections::HashMap;

    const QUIET: Duration = Duration::from_millis(800);

    fn studio_with(storage: Box<dyn KeyValueStore>) -> Studio {
        let options = StudioOptions {
            viewport: ViewportBounds::new(400.0, 400.0),
            ..StudioOptions::default()
        };
        Studio::new(options, storage).unwrap()
    }

    fn studio() -> Studio {
        studio_with(Box::new(MemoryStore::new()))
    }

    /// Every write fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    /// Records writes, shared with the test
    #[derive(Clone, Default)]
    struct SpyStore(Rc<RefCell<HashMap<String, String>>>);

    impl KeyValueStore for SpyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.borrow().get(key).cloned()
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }
        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.0.borrow_mut().remove(key);
            Ok(())
        }
    }

    fn script(width: u32, body: &str) -> String {
        format!("export const config = {{ canvasWidth: {width}, canvasHeight: 100 }}\n{body}")
    }

    #[test]
    fn test_starts_from_template() {
        let studio = studio();
        assert_eq!(studio.source(), TEMPLATE);
        assert_eq!(studio.status(), ExecutionStatus::Ready);
        assert_eq!(studio.dims_label(), "initializing...");
        assert_eq!(studio.cursor_label(), "x: 0, y: 0");
    }

    #[test]
    fn test_starts_from_storage() {
        let mut storage = MemoryStore::new();
        storage.set(STORAGE_KEY, "ctx:fillRect(0, 0, 1, 1)").unwrap();
        let studio = studio_with(Box::new(storage));
        assert_eq!(studio.source(), "ctx:fillRect(0, 0, 1, 1)");
    }

    #[test]
    fn test_template_runs() {
        let mut studio = studio();
        let t0 = Instant::now();
        studio.start(t0);
        assert_eq!(studio.status(), ExecutionStatus::Pending);
        assert!(studio.tick(t0 + QUIET));
        assert_eq!(studio.status(), ExecutionStatus::Succeeded, "{:?}", studio.last_error());
        assert_eq!(studio.dims_label(), "600 x 600");
        assert_eq!(studio.surface().text_runs().len(), 2);
    }

    #[test]
    fn test_burst_of_edits_runs_once_with_last_text() {
        let mut studio = studio();
        let t0 = Instant::now();
        for i in 1..=10u32 {
            let at = t0 + Duration::from_millis(100) * i;
            studio.edit(script(10 * i, ""), at);
            assert!(!studio.tick(at));
        }
        let last_edit = t0 + Duration::from_millis(1000);
        assert!(!studio.tick(last_edit + QUIET - Duration::from_millis(1)));
        assert!(studio.tick(last_edit + QUIET));
        assert!(!studio.tick(last_edit + QUIET * 4));

        assert_eq!(studio.runs(), 1);
        assert_eq!(studio.surface().width(), 100);
        assert_eq!(studio.dims_label(), "100 x 100");
    }

    #[test]
    fn test_teardown_before_fire_never_runs() {
        let mut studio = studio();
        let t0 = Instant::now();
        studio.edit(script(50, ""), t0);
        studio.teardown();
        assert!(!studio.tick(t0 + QUIET * 2));
        assert!(!studio.edit(script(60, ""), t0 + QUIET * 3));
        assert_eq!(studio.runs(), 0);
    }

    #[test]
    fn test_run_now_after_teardown_does_nothing() {
        let mut studio = studio();
        studio.edit(script(50, "ctx:fillRect(0, 0, 4, 4)"), Instant::now());
        studio.teardown();
        assert_eq!(studio.run_now(), ExecutionStatus::Pending);
        assert_eq!(studio.runs(), 0);
        assert_eq!(studio.surface().pixel(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_object_style_config_literal_runs() {
        let mut studio = studio();
        let text = "export const config = {canvasWidth:320,canvasHeight:240,position:'top-left'}\nctx:fillRect(0, 0, 4, 4)";
        studio.edit(text.to_string(), Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Succeeded, "{:?}", studio.last_error());
        assert_eq!(studio.dims_label(), "320 x 240");
        assert_eq!(studio.surface().width(), 320);
        assert_eq!(studio.surface().pixel(1, 1), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_identical_edit_schedules_nothing() {
        let mut studio = studio();
        let text = studio.source().to_string();
        assert!(!studio.edit(text, Instant::now()));
        assert!(!studio.is_pending());
    }

    #[test]
    fn test_draw_then_error_keeps_shape_and_config() {
        let mut studio = studio();
        let text = script(
            120,
            "ctx.fillStyle = '#ff0000'\nctx:fillRect(0, 0, 20, 20)\nlocal missing = nil\nmissing.call()",
        );
        studio.edit(text, Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Failed);

        assert_eq!(studio.surface().pixel(10, 10), Some([255, 0, 0, 255]));
        assert_eq!(studio.config().canvas_width, 120);
        assert_eq!(studio.config().position, Position::Center);
        assert!(matches!(studio.last_error(), Some(ScriptError::Runtime(_))));
        assert_eq!(studio.status().label(), "Error");
    }

    #[test]
    fn test_compile_error_is_failed() {
        let mut studio = studio();
        studio.edit("ctx:fillRect(0, 0,", Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Failed);
        assert!(studio.last_error().unwrap().is_compile());
    }

    #[test]
    fn test_persists_only_after_success() {
        let spy = SpyStore::default();
        let mut studio = studio_with(Box::new(spy.clone()));

        studio.edit("error('boom')", Instant::now());
        studio.run_now();
        assert_eq!(spy.get(STORAGE_KEY), None);

        let good = script(40, "ctx:fillRect(0, 0, 1, 1)");
        studio.edit(good.clone(), Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Succeeded);
        assert_eq!(spy.get(STORAGE_KEY), Some(good.clone()));

        studio.edit("error('again')", Instant::now());
        studio.run_now();
        assert_eq!(spy.get(STORAGE_KEY), Some(good));
    }

    #[test]
    fn test_storage_failure_does_not_fail_run() {
        let mut studio = studio_with(Box::new(BrokenStore));
        studio.edit(script(30, ""), Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Succeeded);
    }

    #[test]
    fn test_background_fill() {
        let mut studio = studio();
        let text = "export const config = { canvasWidth: 8, canvasHeight: 8, backgroundColor: '#0000ff' }";
        studio.edit(text, Instant::now());
        studio.run_now();
        assert_eq!(studio.surface().pixel(4, 4), Some([0, 0, 255, 255]));

        // No background: cleared to transparent
        studio.edit("export const config = { canvasWidth: 8, canvasHeight: 8 }", Instant::now());
        studio.run_now();
        assert_eq!(studio.surface().pixel(4, 4), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_context_reset_only_on_dimension_change() {
        let mut studio = studio();
        studio.edit(script(50, "ctx.lineWidth = 7"), Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Succeeded);

        // Same buffer: state carries over
        studio.edit(script(50, "assert(ctx.lineWidth == 7)"), Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Succeeded, "{:?}", studio.last_error());

        // New buffer: fresh context
        studio.edit(script(60, "assert(ctx.lineWidth == 1)"), Instant::now());
        assert_eq!(studio.run_now(), ExecutionStatus::Succeeded, "{:?}", studio.last_error());
    }

    #[test]
    fn test_reset_to_template() {
        let mut studio = studio();
        let t0 = Instant::now();
        studio.edit(script(50, ""), t0);
        assert!(studio.reset(t0));
        assert_eq!(studio.source(), TEMPLATE);
        assert_eq!(studio.status(), ExecutionStatus::Pending);

        studio.tick(t0 + QUIET);
        assert!(!studio.reset(t0 + QUIET * 2));
        assert_eq!(studio.status(), ExecutionStatus::Ready);
    }

    #[test]
    fn test_viewport_and_cursor() {
        let mut studio = studio();
        studio.edit(
            "export const config = { canvasWidth: 800, canvasHeight: 600 }",
            Instant::now(),
        );
        studio.run_now();
        assert!((studio.render_state().unwrap().display_scale - 0.45).abs() < 1e-9);

        // Centered: 360 x 270 display rect at (20, 65)
        let pos = studio.pointer_moved(200.0, 200.0).unwrap();
        assert_eq!((pos.x, pos.y), (400, 300));
        assert_eq!(studio.cursor_label(), "x: 400, y: 300");

        assert!(studio.resize_viewport(ViewportBounds::new(2000.0, 2000.0)));
        assert_eq!(studio.render_state().unwrap().display_scale, 1.0);
        assert_eq!(studio.surface().width(), 800);
        assert!(!studio.resize_viewport(ViewportBounds::new(2000.0, 2000.0)));
    }

    #[test]
    fn test_export_png() {
        let mut studio = studio();
        studio.edit(script(16, "ctx:fillRect(0, 0, 4, 4)"), Instant::now());
        studio.run_now();

        let dir = tempfile::tempdir().unwrap();
        let path = studio.export_png(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("canvas-") && name.ends_with(".png"), "{}", name);
        assert!(path.is_file());
        assert_eq!(export_file_name(1700000000000), "canvas-1700000000000.png");
    }
}
