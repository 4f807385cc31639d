// Canvas Studio CLI - live Lua drawing scripts, headless

mod exit_codes;
mod util;
mod watch;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};

use canvas_studio::{FontLoader, Studio, StudioOptions, TEMPLATE};
use canvas_studio_config::{JsonFileStore, KeyValueStore, MemoryStore, Settings};
use canvas_studio_engine::extract::extract_config_detailed;
use canvas_studio_engine::sanitize::sanitize_extracted;
use canvas_studio_engine::{extract_config, ExecutionStatus, RenderState, ViewportBounds};

use exit_codes::{EXIT_IO, EXIT_SCRIPT_FAILED, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "canvas-studio")]
#[command(about = "Live canvas for Lua drawing scripts (headless)")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Settings file (default: <config dir>/canvas-studio/settings.json)
    #[arg(long, global = true, env = "CANVAS_STUDIO_SETTINGS")]
    settings: Option<PathBuf>,

    /// Storage file holding the last successful script
    #[arg(long, global = true, env = "CANVAS_STUDIO_STORAGE")]
    storage: Option<PathBuf>,

    /// Don't fetch web fonts declared in config.fonts
    #[arg(long, global = true)]
    no_fonts: bool,
}

#[derive(Args, Clone, Copy)]
struct ViewArgs {
    /// Display container size, WIDTHxHEIGHT
    #[arg(long, value_parser = util::parse_viewport)]
    viewport: Option<ViewportBounds>,

    /// Padding around the canvas inside the container
    #[arg(long)]
    padding: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script once and write the canvas as PNG
    #[command(after_help = "\
Examples:
  canvas-studio render sketch.lua
  canvas-studio render sketch.lua -o out.png --viewport 800x600")]
    Render {
        script: PathBuf,

        /// Output PNG (default: the script path with .png)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Print the extracted config as JSON
    Extract { script: PathBuf },

    /// Print the script as it is handed to Lua
    Sanitize { script: PathBuf },

    /// Print buffer size, display scale and placement as JSON
    Geometry {
        script: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Re-render on every change to the script file
    #[command(after_help = "\
The file is created from storage (or the template) when missing.
Deleting it stops the watcher.")]
    Watch {
        script: PathBuf,

        /// Rewrite this PNG after every run
        #[arg(long)]
        preview: Option<PathBuf>,

        /// Quiet period after the last change, in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// How often the file is checked, in milliseconds
        #[arg(long, default_value_t = 100)]
        poll_ms: u64,

        /// Stop after this many runs
        #[arg(long)]
        max_runs: Option<u64>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Restore the built-in template
    Reset {
        /// Also overwrite this script file
        script: Option<PathBuf>,
    },

    /// Run the saved script and write canvas-<millis>.png
    Export {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print the built-in template
    Template,

    /// Map a point in the display container to buffer pixels
    Cursor {
        script: PathBuf,

        /// Container point, X,Y
        #[arg(long, value_parser = util::parse_point)]
        at: (f64, f64),

        #[command(flatten)]
        view: ViewArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match cli.command {
        Commands::Render { script, output, view } => cmd_render(&cli.global, &script, output, view),
        Commands::Extract { script } => cmd_extract(&script),
        Commands::Sanitize { script } => cmd_sanitize(&script),
        Commands::Geometry { script, view } => cmd_geometry(&cli.global, &script, view),
        Commands::Watch { script, preview, debounce_ms, poll_ms, max_runs, view } => {
            cmd_watch(&cli.global, &script, preview, debounce_ms, poll_ms, max_runs, view)
        }
        Commands::Reset { script } => cmd_reset(&cli.global, script),
        Commands::Export { out_dir } => cmd_export(&cli.global, &out_dir),
        Commands::Template => {
            print!("{}", TEMPLATE);
            Ok(())
        }
        Commands::Cursor { script, at, view } => cmd_cursor(&cli.global, &script, at, view),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// fmt subscriber on stderr; also receives `log` records from the libraries
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self { code: EXIT_SCRIPT_FAILED, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Setup
// ============================================================================

fn load_settings(global: &GlobalArgs) -> Settings {
    match &global.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn storage_path(global: &GlobalArgs, settings: &Settings) -> PathBuf {
    global.storage.clone().unwrap_or_else(|| settings.storage_file())
}

fn options(settings: &Settings, view: Option<ViewArgs>) -> StudioOptions {
    let mut options = StudioOptions::from_settings(settings);
    if let Some(view) = view {
        if let Some(viewport) = view.viewport {
            options.viewport = viewport;
        }
        if let Some(padding) = view.padding {
            options.padding_px = padding;
        }
    }
    options
}

fn open_studio(
    global: &GlobalArgs,
    settings: &Settings,
    options: StudioOptions,
    storage: Box<dyn KeyValueStore>,
) -> Result<Studio, CliError> {
    let studio = Studio::new(options, storage).map_err(|e| CliError::script(e.to_string()))?;

    if global.no_fonts || !settings.fonts_enabled {
        return Ok(studio);
    }
    match FontLoader::new(settings.font_cdn_base.clone(), Settings::font_cache_dir()) {
        Ok(loader) => Ok(studio.with_fonts(loader)),
        Err(e) => {
            log::warn!("fonts disabled: {}", e);
            Ok(studio)
        }
    }
}

fn file_storage(global: &GlobalArgs, settings: &Settings) -> Box<dyn KeyValueStore> {
    Box::new(JsonFileStore::open_or_empty(storage_path(global, settings)))
}

fn write_png(studio: &Studio, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CliError::io(format!("{}: {}", parent.display(), e)))?;
        }
    }
    studio
        .surface()
        .save_png(path)
        .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

fn finish_fonts(studio: &mut Studio) {
    if let Some(fonts) = studio.fonts_mut() {
        fonts.wait();
    }
}

fn status_result(studio: &Studio) -> Result<(), CliError> {
    match studio.status() {
        ExecutionStatus::Failed => {
            let message = studio
                .last_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "script failed".to_string());
            Err(CliError::script(message))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_render(global: &GlobalArgs, script: &Path, output: Option<PathBuf>, view: ViewArgs) -> Result<(), CliError> {
    let text = util::read_script(script)?;
    let settings = load_settings(global);
    // One-off run: nothing is persisted
    let mut studio = open_studio(global, &settings, options(&settings, Some(view)), Box::new(MemoryStore::new()))?;

    studio.edit(text, Instant::now());
    studio.run_now();

    let output = output.unwrap_or_else(|| script.with_extension("png"));
    write_png(&studio, &output)?;
    finish_fonts(&mut studio);

    println!("dims: {}", studio.dims_label());
    println!("status: {}", studio.status());
    println!("wrote {}", output.display());

    status_result(&studio)
}

fn cmd_extract(script: &Path) -> Result<(), CliError> {
    let text = util::read_script(script)?;
    let config = extract_config(&text);
    let json = serde_json::to_string_pretty(&config).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn cmd_sanitize(script: &Path) -> Result<(), CliError> {
    let text = util::read_script(script)?;
    print!("{}", sanitize_extracted(&text, &extract_config_detailed(&text)));
    Ok(())
}

fn cmd_geometry(global: &GlobalArgs, script: &Path, view: ViewArgs) -> Result<(), CliError> {
    let text = util::read_script(script)?;
    let settings = load_settings(global);
    let options = options(&settings, Some(view));

    let config = extract_config(&text);
    let state = RenderState::compute(&config, options.viewport, options.padding_px);
    let json = serde_json::json!({
        "viewport": options.viewport,
        "renderState": state,
        "displayRect": state.display_rect(options.viewport),
        "dims": state.dims_label(),
    });
    let out = serde_json::to_string_pretty(&json).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", out);
    Ok(())
}

fn cmd_watch(
    global: &GlobalArgs,
    script: &Path,
    preview: Option<PathBuf>,
    debounce_ms: Option<u64>,
    poll_ms: u64,
    max_runs: Option<u64>,
    view: ViewArgs,
) -> Result<(), CliError> {
    let settings = load_settings(global);
    let mut options = options(&settings, Some(view));
    if let Some(ms) = debounce_ms {
        options.quiet_period = Duration::from_millis(ms);
    }
    let storage = file_storage(global, &settings);
    let mut studio = open_studio(global, &settings, options, storage)?;

    let watch = watch::Watch {
        script: script.to_path_buf(),
        preview,
        poll: Duration::from_millis(poll_ms.max(1)),
        max_runs,
    };
    watch.run(&mut studio)?;
    finish_fonts(&mut studio);
    Ok(())
}

fn cmd_reset(global: &GlobalArgs, script: Option<PathBuf>) -> Result<(), CliError> {
    let settings = load_settings(global);
    let storage = file_storage(global, &settings);
    let mut studio = open_studio(global, &settings, options(&settings, None), storage)?;

    studio.reset(Instant::now());
    // Running saves the template as the current script
    studio.run_now();
    finish_fonts(&mut studio);

    if let Some(path) = script {
        fs::write(&path, TEMPLATE).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
        println!("wrote {}", path.display());
    }
    println!("status: {}", studio.status());
    status_result(&studio)
}

fn cmd_export(global: &GlobalArgs, out_dir: &Path) -> Result<(), CliError> {
    let settings = load_settings(global);
    let storage = file_storage(global, &settings);
    let mut studio = open_studio(global, &settings, options(&settings, None), storage)?;

    studio.run_now();
    finish_fonts(&mut studio);

    fs::create_dir_all(out_dir).map_err(|e| CliError::io(format!("{}: {}", out_dir.display(), e)))?;
    let path = studio
        .export_png(out_dir)
        .map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", path.display());

    status_result(&studio).map_err(|e| e.with_hint("the PNG holds whatever was drawn before the error"))
}

fn cmd_cursor(global: &GlobalArgs, script: &Path, at: (f64, f64), view: ViewArgs) -> Result<(), CliError> {
    let text = util::read_script(script)?;
    let settings = load_settings(global);
    let options = options(&settings, Some(view));

    let state = RenderState::compute(&extract_config(&text), options.viewport, options.padding_px);
    let position = state
        .buffer_point(options.viewport, at.0, at.1)
        .ok_or_else(|| CliError::usage("canvas has no visible area in this viewport").with_hint("try a larger --viewport"))?;
    println!("{}", position);
    Ok(())
}
