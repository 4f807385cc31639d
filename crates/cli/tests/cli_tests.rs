// Integration tests for the canvas-studio binary.
// Run with: cargo test -p canvas-studio-cli --test cli_tests

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const SCRIPT: &str = "\
export const config = { canvasWidth: 40, canvasHeight: 30, position: 'top-left', backgroundColor: '#0000ff' }
ctx.fillStyle = '#ff0000'
ctx:fillRect(0, 0, 10, 10)
";

/// Binary with settings and storage pointed into `dir`
fn studio_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_canvas-studio"));
    cmd.arg("--settings")
        .arg(dir.join("settings.json"))
        .arg("--storage")
        .arg(dir.join("storage.json"))
        .arg("--no-fonts")
        .env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("run canvas-studio")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_script(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("sketch.lua");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn render_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCRIPT);
    let out = dir.path().join("out.png");

    let output = run(studio_cmd(dir.path()).arg("render").arg(&script).arg("-o").arg(&out));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("dims: 40 x 30"));
    assert!(stdout(&output).contains("status: Saved"));

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (40, 30));
    assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(30, 20).0, [0, 0, 255, 255]);

    // Render never persists
    assert!(!dir.path().join("storage.json").exists());
}

#[test]
fn render_failure_exits_1_and_keeps_partial_drawing() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), &format!("{}error('late failure')\n", SCRIPT));

    let output = run(studio_cmd(dir.path()).arg("render").arg(&script));
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("status: Error"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("late failure"));

    let img = image::open(script.with_extension("png")).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0, 255]);
}

#[test]
fn extract_prints_config_json() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCRIPT);

    let output = run(studio_cmd(dir.path()).arg("extract").arg(&script));
    assert!(output.status.success());
    let config: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(config["canvasWidth"], 40);
    assert_eq!(config["canvasHeight"], 30);
    assert_eq!(config["position"], "top-left");
    assert_eq!(config["backgroundColor"], "#0000ff");
    assert_eq!(config["fonts"], serde_json::json!([]));
}

#[test]
fn extract_survives_broken_literal() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "export const config = {canvasWidth:1");

    let output = run(studio_cmd(dir.path()).arg("extract").arg(&script));
    assert!(output.status.success());
    let config: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(config["canvasWidth"], 800);
    assert_eq!(config["canvasHeight"], 800);
}

#[test]
fn sanitize_rewrites_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCRIPT);

    let output = run(studio_cmd(dir.path()).arg("sanitize").arg(&script));
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("local config <const> = {"));
    assert!(text.contains("canvasWidth = 40"));
    assert!(!text.contains("export const config"));
}

#[test]
fn geometry_reports_scale() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "export const config = { canvasWidth: 800, canvasHeight: 600 }");

    let output = run(studio_cmd(dir.path())
        .args(["geometry", script.to_str().unwrap(), "--viewport", "400x400", "--padding", "20"]));
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let scale = json["renderState"]["displayScale"].as_f64().unwrap();
    assert!((scale - 0.45).abs() < 1e-9);
    assert_eq!(json["dims"], "800 x 600");
}

#[test]
fn cursor_maps_to_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "export const config = { canvasWidth: 800, canvasHeight: 600 }");

    let output = run(studio_cmd(dir.path())
        .args(["cursor", script.to_str().unwrap(), "--at", "200,200", "--viewport", "400x400"]));
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "x: 400, y: 300");
}

#[test]
fn bad_viewport_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCRIPT);

    let output = run(studio_cmd(dir.path()).args(["geometry", script.to_str().unwrap(), "--viewport", "wide"]));
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn template_prints_builtin_script() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(studio_cmd(dir.path()).arg("template"));
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("export const config = {"));
}

#[test]
fn reset_saves_template_and_export_uses_it() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("restored.lua");

    let output = run(studio_cmd(dir.path()).arg("reset").arg(&script));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(fs::read_to_string(&script).unwrap().starts_with("export const config"));

    let storage: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("storage.json")).unwrap()).unwrap();
    assert!(storage["canvas_editor_v1_content"].as_str().unwrap().contains("Canvas Editor"));

    let out_dir = dir.path().join("exports");
    let output = run(studio_cmd(dir.path()).arg("export").arg("--out-dir").arg(&out_dir));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let exported: Vec<_> = fs::read_dir(&out_dir).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(exported.len(), 1);
    let name = exported[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("canvas-") && name.ends_with(".png"), "{}", name);
    assert_eq!(image::open(&exported[0]).unwrap().to_rgba8().dimensions(), (600, 600));
}

#[test]
fn watch_seeds_missing_file_and_renders_preview() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("live.lua");
    let preview = dir.path().join("live.png");

    let output = run(studio_cmd(dir.path()).args([
        "watch",
        script.to_str().unwrap(),
        "--preview",
        preview.to_str().unwrap(),
        "--debounce-ms",
        "20",
        "--poll-ms",
        "10",
        "--max-runs",
        "1",
    ]));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Saved  600 x 600"));
    assert!(fs::read_to_string(&script).unwrap().contains("Canvas Editor"));
    assert_eq!(image::open(&preview).unwrap().to_rgba8().dimensions(), (600, 600));
}
