// File watcher: every content change is one edit, the studio debounces

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use canvas_studio::Studio;

use crate::CliError;

pub struct Watch {
    pub script: PathBuf,
    pub preview: Option<PathBuf>,
    pub poll: Duration,
    pub max_runs: Option<u64>,
}

impl Watch {
    pub fn run(&self, studio: &mut Studio) -> Result<(), CliError> {
        let mut last = self.seed(studio)?;
        studio.edit(last.clone(), Instant::now());
        if !studio.is_pending() {
            // File matches what the studio started with
            studio.start(Instant::now());
        }
        log::info!("watching {}", self.script.display());

        loop {
            let now = Instant::now();
            let sleep = studio.time_until_fire(now).map_or(self.poll, |d| d.min(self.poll));
            thread::sleep(sleep);

            match fs::read_to_string(&self.script) {
                Ok(text) => {
                    if text != last {
                        log::debug!("{} changed", self.script.display());
                        studio.edit(text.clone(), Instant::now());
                        last = text;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::info!("{} removed, stopping", self.script.display());
                    studio.teardown();
                    return Ok(());
                }
                Err(e) => log::warn!("{}: {}", self.script.display(), e),
            }

            if studio.tick(Instant::now()) {
                self.report(studio)?;
                if self.max_runs.is_some_and(|max| studio.runs() >= max) {
                    studio.teardown();
                    return Ok(());
                }
            }
        }
    }

    /// Current file contents; a missing file gets the studio's script
    fn seed(&self, studio: &Studio) -> Result<String, CliError> {
        match fs::read_to_string(&self.script) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                write_file(&self.script, studio.source())?;
                log::info!("created {}", self.script.display());
                Ok(studio.source().to_string())
            }
            Err(e) => Err(CliError::io(format!("{}: {}", self.script.display(), e))),
        }
    }

    fn report(&self, studio: &Studio) -> Result<(), CliError> {
        if let Some(preview) = &self.preview {
            write_preview(studio, preview)?;
        }
        let stamp = chrono::Local::now().format("%H:%M:%S");
        match studio.last_error() {
            Some(e) => println!("[{}] {}  {}  {}", stamp, studio.status(), studio.dims_label(), e),
            None => println!("[{}] {}  {}", stamp, studio.status(), studio.dims_label()),
        }
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CliError::io(format!("{}: {}", parent.display(), e)))?;
        }
    }
    fs::write(path, contents).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

/// Write next to the target and rename, so viewers never see half a PNG
fn write_preview(studio: &Studio, path: &Path) -> Result<(), CliError> {
    let bytes = studio.encode_png().map_err(|e| CliError::io(e.to_string()))?;
    let tmp = path.with_extension("png.tmp");
    fs::write(&tmp, bytes).map_err(|e| CliError::io(format!("{}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}
