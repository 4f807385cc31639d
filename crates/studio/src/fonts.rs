//! Web font loading.
//!
//! Each `config.fonts` entry expands to one face per weight. Faces are fetched
//! from a Fontsource-style CDN on a background thread (blocking reqwest, no
//! async runtime) into the font cache directory. A face that is already
//! cached or in flight is skipped. Failures are logged and dropped; drawing
//! never waits on a font.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use canvas_studio_engine::{FontDisplay, FontFormat, FontSpec};
use parking_lot::Mutex;

const USER_AGENT: &str = concat!("canvas-studio/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum FontError {
    /// Could not reach the CDN
    Network(String),
    /// CDN answered with a non-success status
    Http(u16, String),
    /// Cache directory write failed
    Io(io::Error),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::Network(msg) => write!(f, "Network error: {}", msg),
            FontError::Http(code, url) => write!(f, "HTTP {}: {}", code, url),
            FontError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FontError {}

impl From<io::Error> for FontError {
    fn from(e: io::Error) -> Self {
        FontError::Io(e)
    }
}

/// Lower-case, whitespace runs become `-`
pub fn normalize_font_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut in_space = false;
    for c in lower.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// `{base}/{name}@latest/{subset}-{weight}-normal.{ext}`
pub fn font_url(cdn_base: &str, font_name: &str, subset: &str, weight: u16, format: FontFormat) -> String {
    format!(
        "{}/{}@latest/{}-{}-normal.{}",
        cdn_base.trim_end_matches('/'),
        normalize_font_name(font_name),
        subset,
        weight,
        format.extension()
    )
}

/// One weight of one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub family: String,
    pub weight: u16,
    pub subset: String,
    pub display: FontDisplay,
    pub format: FontFormat,
    pub url: String,
}

impl FontFace {
    /// Expand a spec into its faces, in weight order, without duplicates
    pub fn expand(spec: &FontSpec, cdn_base: &str) -> Vec<FontFace> {
        let mut seen = HashSet::new();
        spec.weights
            .iter()
            .filter(|w| seen.insert(**w))
            .map(|&weight| FontFace {
                family: spec.font_name.clone(),
                weight,
                subset: spec.subset.clone(),
                display: spec.display,
                format: spec.format,
                url: font_url(cdn_base, &spec.font_name, &spec.subset, weight, spec.format),
            })
            .collect()
    }

    /// Registry key: `Inter-600-latin`
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.family, self.weight, self.subset)
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}.{}",
            normalize_font_name(&self.family),
            self.weight,
            self.subset,
            self.format.extension()
        )
    }

    /// The `@font-face` rule this face stands for
    pub fn css(&self) -> String {
        format!(
            "@font-face {{\n  font-family: \"{}\";\n  font-weight: {};\n  font-style: normal;\n  font-display: {};\n  src: url(\"{}\") format(\"{}\");\n}}",
            self.family,
            self.weight,
            self.display.as_str(),
            self.url,
            self.format.extension()
        )
    }
}

#[derive(Debug, Default)]
struct Registry {
    loaded: HashMap<String, PathBuf>,
    in_flight: HashSet<String>,
}

/// Fire-and-forget font fetcher with a registry of what is already available.
pub struct FontLoader {
    http: reqwest::blocking::Client,
    cdn_base: String,
    cache_dir: PathBuf,
    registry: Arc<Mutex<Registry>>,
    workers: Vec<JoinHandle<()>>,
}

impl FontLoader {
    pub fn new(cdn_base: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Result<Self, FontError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| FontError::Network(e.to_string()))?;

        Ok(Self {
            http,
            cdn_base: cdn_base.into(),
            cache_dir: cache_dir.into(),
            registry: Arc::new(Mutex::new(Registry::default())),
            workers: Vec::new(),
        })
    }

    pub fn cdn_base(&self) -> &str {
        &self.cdn_base
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Make every face of `fonts` available. Returns how many faces were
    /// queued for download; cached, loaded and in-flight faces don't count.
    pub fn load(&mut self, fonts: &[FontSpec]) -> usize {
        self.workers.retain(|w| !w.is_finished());

        let mut batch = Vec::new();
        {
            let mut registry = self.registry.lock();
            for face in fonts.iter().flat_map(|spec| FontFace::expand(spec, &self.cdn_base)) {
                let key = face.key();
                if registry.loaded.contains_key(&key) || registry.in_flight.contains(&key) {
                    continue;
                }
                let cached = self.cache_dir.join(face.file_name());
                if cached.is_file() {
                    log::debug!("font {} served from cache", key);
                    registry.loaded.insert(key, cached);
                    continue;
                }
                registry.in_flight.insert(key);
                batch.push(face);
            }
        }

        let queued = batch.len();
        if queued == 0 {
            return 0;
        }

        let http = self.http.clone();
        let registry = Arc::clone(&self.registry);
        let cache_dir = self.cache_dir.clone();
        let spawned = thread::Builder::new()
            .name("font-loader".to_string())
            .spawn(move || fetch_batch(&http, &registry, &cache_dir, batch));

        match spawned {
            Ok(handle) => self.workers.push(handle),
            Err(e) => {
                log::warn!("could not start font loader thread: {}", e);
                // Nothing is in flight after all; let the next run retry
                self.registry.lock().in_flight.clear();
                return 0;
            }
        }
        queued
    }

    /// Block until every queued download has finished
    pub fn wait(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("font loader thread panicked");
            }
        }
    }

    pub fn is_loaded(&self, face: &FontFace) -> bool {
        self.registry.lock().loaded.contains_key(&face.key())
    }

    /// Cached file for a loaded face
    pub fn face_path(&self, face: &FontFace) -> Option<PathBuf> {
        self.registry.lock().loaded.get(&face.key()).cloned()
    }

    pub fn loaded_count(&self) -> usize {
        self.registry.lock().loaded.len()
    }

    /// Forget loaded faces. Cached files stay on disk.
    pub fn clear(&mut self) {
        self.registry.lock().loaded.clear();
    }
}

impl fmt::Debug for FontLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontLoader")
            .field("cdn_base", &self.cdn_base)
            .field("cache_dir", &self.cache_dir)
            .field("workers", &self.workers.len())
            .finish()
    }
}

fn fetch_batch(http: &reqwest::blocking::Client, registry: &Mutex<Registry>, cache_dir: &Path, batch: Vec<FontFace>) {
    for face in batch {
        let key = face.key();
        let result = fetch_face(http, &face, cache_dir);
        let mut registry = registry.lock();
        registry.in_flight.remove(&key);
        match result {
            Ok(path) => {
                log::info!("loaded font {} ({})", key, face.url);
                registry.loaded.insert(key, path);
            }
            Err(e) => {
                log::warn!("could not load font {} (weight {}): {}", face.family, face.weight, e);
            }
        }
    }
}

fn fetch_face(http: &reqwest::blocking::Client, face: &FontFace, cache_dir: &Path) -> Result<PathBuf, FontError> {
    let resp = http
        .get(&face.url)
        .send()
        .map_err(|e| FontError::Network(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FontError::Http(status.as_u16(), face.url.clone()));
    }

    let bytes = resp.bytes().map_err(|e| FontError::Network(e.to_string()))?;

    fs::create_dir_all(cache_dir)?;
    let path = cache_dir.join(face.file_name());
    let tmp = path.with_extension("part");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn spec(name: &str, weights: &[u16]) -> FontSpec {
        FontSpec { weights: weights.to_vec(), ..FontSpec::new(name) }
    }

    #[test]
    fn test_normalize_font_name() {
        assert_eq!(normalize_font_name("Inter"), "inter");
        assert_eq!(normalize_font_name("Open Sans"), "open-sans");
        assert_eq!(normalize_font_name("Fira  \tCode"), "fira-code");
    }

    #[test]
    fn test_font_url() {
        assert_eq!(
            font_url("https://cdn.jsdelivr.net/fontsource/fonts", "Open Sans", "latin", 700, FontFormat::Woff2),
            "https://cdn.jsdelivr.net/fontsource/fonts/open-sans@latest/latin-700-normal.woff2"
        );
        assert_eq!(
            font_url("http://host/fonts/", "Inter", "latin-ext", 400, FontFormat::Woff),
            "http://host/fonts/inter@latest/latin-ext-400-normal.woff"
        );
    }

    #[test]
    fn test_expand_one_face_per_weight() {
        let faces = FontFace::expand(&spec("Inter", &[400, 600, 400]), "http://cdn");
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].key(), "Inter-400-latin");
        assert_eq!(faces[1].url, "http://cdn/inter@latest/latin-600-normal.woff2");
        assert!(faces[1].css().contains("font-weight: 600;"));
        assert!(faces[1].css().contains("font-display: swap;"));
    }

    #[test]
    fn test_load_fetches_each_face_once() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/inter@latest/latin-400-normal.woff2");
            then.status(200).header("content-type", "font/woff2").body("wOF2");
        });

        let dir = tempfile::tempdir().unwrap();
        let mut loader = FontLoader::new(server.base_url(), dir.path()).unwrap();
        let fonts = vec![spec("Inter", &[400])];

        assert_eq!(loader.load(&fonts), 1);
        loader.wait();
        mock.assert();

        let face = &FontFace::expand(&fonts[0], loader.cdn_base())[0];
        assert!(loader.is_loaded(face));
        let path = loader.face_path(face).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"wOF2");

        // Second run: already registered, no request
        assert_eq!(loader.load(&fonts), 0);
        loader.wait();
        mock.assert_hits(1);
    }

    #[test]
    fn test_failed_face_is_swallowed_and_retried() {
        let server = MockServer::start();
        let missing = server.mock(|when, then| {
            when.method(GET).path("/nope@latest/latin-400-normal.woff2");
            then.status(404);
        });
        let ok = server.mock(|when, then| {
            when.method(GET).path("/inter@latest/latin-700-normal.woff2");
            then.status(200).body("font");
        });

        let dir = tempfile::tempdir().unwrap();
        let mut loader = FontLoader::new(server.base_url(), dir.path()).unwrap();
        let fonts = vec![spec("Nope", &[400]), spec("Inter", &[700])];

        assert_eq!(loader.load(&fonts), 2);
        loader.wait();
        missing.assert_hits(1);
        ok.assert_hits(1);
        assert_eq!(loader.loaded_count(), 1);

        // The failed face is not registered, so the next run asks again
        assert_eq!(loader.load(&fonts), 1);
        loader.wait();
        missing.assert_hits(2);
    }

    #[test]
    fn test_cached_file_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("inter-400-latin.woff2"), b"cached").unwrap();

        // Unroutable base: any request would fail
        let mut loader = FontLoader::new("http://127.0.0.1:9", dir.path()).unwrap();
        assert_eq!(loader.load(&[spec("Inter", &[400])]), 0);
        assert_eq!(loader.loaded_count(), 1);

        loader.clear();
        assert_eq!(loader.loaded_count(), 0);
    }
}
