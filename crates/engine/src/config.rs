// Canvas configuration - the record declared by `export const config = { ... }`
// Always fully populated: missing or unusable fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 800;

/// Upper bound for either buffer dimension. Larger requests are clamped.
pub const MAX_DIMENSION: u32 = 8192;

pub const DEFAULT_FONT_WEIGHTS: [u16; 1] = [400];
pub const DEFAULT_FONT_SUBSET: &str = "latin";

/// Where the buffer sits inside the viewport (9-way)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    Center,
    Top,
    TopLeft,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Position::Center,
        Position::Top,
        Position::TopLeft,
        Position::TopRight,
        Position::Right,
        Position::BottomRight,
        Position::Bottom,
        Position::BottomLeft,
        Position::Left,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Center => "center",
            Position::Top => "top",
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::Right => "right",
            Position::BottomRight => "bottom-right",
            Position::Bottom => "bottom",
            Position::BottomLeft => "bottom-left",
            Position::Left => "left",
        }
    }
}

/// CSS `font-display` strategy requested for a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontDisplay {
    Auto,
    Block,
    #[default]
    Swap,
    Fallback,
    Optional,
}

impl FontDisplay {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "auto" => Some(FontDisplay::Auto),
            "block" => Some(FontDisplay::Block),
            "swap" => Some(FontDisplay::Swap),
            "fallback" => Some(FontDisplay::Fallback),
            "optional" => Some(FontDisplay::Optional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FontDisplay::Auto => "auto",
            FontDisplay::Block => "block",
            FontDisplay::Swap => "swap",
            FontDisplay::Fallback => "fallback",
            FontDisplay::Optional => "optional",
        }
    }
}

/// Web font container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    #[default]
    Woff2,
    Woff,
}

impl FontFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "woff2" => Some(FontFormat::Woff2),
            "woff" => Some(FontFormat::Woff),
            _ => None,
        }
    }

    /// File extension (also the CSS `format()` hint)
    pub fn extension(&self) -> &'static str {
        match self {
            FontFormat::Woff2 => "woff2",
            FontFormat::Woff => "woff",
        }
    }
}

/// One entry of `config.fonts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub font_name: String,
    pub weights: Vec<u16>,
    pub subset: String,
    pub display: FontDisplay,
    pub format: FontFormat,
}

impl FontSpec {
    pub fn new(font_name: impl Into<String>) -> Self {
        Self {
            font_name: font_name.into(),
            weights: DEFAULT_FONT_WEIGHTS.to_vec(),
            subset: DEFAULT_FONT_SUBSET.to_string(),
            display: FontDisplay::default(),
            format: FontFormat::default(),
        }
    }

    /// Build a spec from one evaluated `fonts[]` entry.
    /// Entries that are not records or lack a usable `fontName` are dropped.
    fn from_value(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        let name = record.get("fontName")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }

        let mut spec = FontSpec::new(name);

        if let Some(weights) = record.get("weights").and_then(font_weights) {
            spec.weights = weights;
        }
        if let Some(subset) = record.get("subset").and_then(Value::as_str) {
            if !subset.trim().is_empty() {
                spec.subset = subset.trim().to_string();
            }
        }
        if let Some(display) = record.get("display").and_then(Value::as_str).and_then(FontDisplay::parse) {
            spec.display = display;
        }
        if let Some(format) = record.get("format").and_then(Value::as_str).and_then(FontFormat::parse) {
            spec.format = format;
        }

        Some(spec)
    }
}

/// Weights may be a list (`[400, 700]`) or a single number. Bad entries are skipped;
/// an empty result means "use the default".
fn font_weights(value: &Value) -> Option<Vec<u16>> {
    let weights: Vec<u16> = match value {
        Value::Array(items) => items.iter().filter_map(font_weight).collect(),
        other => font_weight(other).into_iter().collect(),
    };
    if weights.is_empty() {
        None
    } else {
        Some(weights)
    }
}

fn font_weight(value: &Value) -> Option<u16> {
    let n = value.as_f64()?;
    if n.is_finite() && n >= 1.0 && n <= 1000.0 {
        Some(n as u16)
    } else {
        None
    }
}

/// Canvas dimensions: finite numbers >= 1, truncated, clamped to MAX_DIMENSION
fn dimension(value: &Value) -> Option<u32> {
    let n = value.as_f64()?;
    if !n.is_finite() || n < 1.0 {
        return None;
    }
    Some(n.trunc().min(MAX_DIMENSION as f64) as u32)
}

/// The fully-populated configuration record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub position: Position,
    pub background_color: Option<String>,
    pub fonts: Vec<FontSpec>,
    /// Keys the host does not recognize. Carried along, never interpreted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            position: Position::Center,
            background_color: None,
            fonts: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Merge an evaluated literal over the defaults.
    ///
    /// Recognized keys replace the default only when their value is usable;
    /// anything else keeps the default for that field.
    pub fn merged_over_defaults(record: &Map<String, Value>) -> Self {
        let mut config = Config::default();

        for (key, value) in record {
            match key.as_str() {
                "canvasWidth" => match dimension(value) {
                    Some(w) => config.canvas_width = w,
                    None => log::debug!("ignoring canvasWidth {value}: not a positive number"),
                },
                "canvasHeight" => match dimension(value) {
                    Some(h) => config.canvas_height = h,
                    None => log::debug!("ignoring canvasHeight {value}: not a positive number"),
                },
                "position" => match value.as_str().and_then(Position::parse) {
                    Some(position) => config.position = position,
                    None => log::debug!("unknown position {value}, using center"),
                },
                "backgroundColor" => {
                    config.background_color = value
                        .as_str()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string);
                }
                "fonts" => {
                    if let Some(entries) = value.as_array() {
                        config.fonts = entries.iter().filter_map(FontSpec::from_value).collect();
                    }
                }
                _ => {
                    config.extra.insert(key.clone(), value.clone());
                }
            }
        }

        config
    }

    /// "800 x 600"
    pub fn dims_label(&self) -> String {
        format!("{} x {}", self.canvas_width, self.canvas_height)
    }
}
