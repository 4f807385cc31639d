//! Config extraction.
//!
//! Finds `export const config = { ... }` in the script, slices out the literal
//! by brace matching, and evaluates only that slice. The drawing statements
//! around it are never parsed or run here, so a script that fails at draw time
//! (undefined names, runtime errors) still yields its configuration.
//!
//! Extraction is total: every failure path falls back to `Config::default()`.

use regex::Regex;
use serde_json::{Map, Value};
use std::ops::Range;
use std::sync::LazyLock;

use crate::config::Config;
use crate::literal::{self, long_bracket_end, long_bracket_level};

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+const\s+config\s*=\s*\{").expect("declaration pattern is valid")
});

/// Why the returned config looks the way it does
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    /// No declaration in the text
    Missing,
    /// Literal at `span` was evaluated and merged
    Extracted { span: Range<usize> },
    /// Opening brace at `open` never closes
    Unbalanced { open: usize },
    /// Literal at `span` failed to evaluate
    Invalid { span: Range<usize>, error: String },
    /// Literal at `span` evaluated to something other than a record
    NotARecord { span: Range<usize> },
}

impl ExtractOutcome {
    pub fn is_extracted(&self) -> bool {
        matches!(self, ExtractOutcome::Extracted { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub config: Config,
    pub outcome: ExtractOutcome,
    /// The evaluated literal, before merging over defaults
    pub record: Option<Map<String, Value>>,
}

/// Extract the configuration, falling back to defaults on any problem.
pub fn extract_config(source: &str) -> Config {
    extract_config_detailed(source).config
}

/// Same as `extract_config`, but also reports what happened.
pub fn extract_config_detailed(source: &str) -> Extraction {
    let fallback = |outcome: ExtractOutcome| {
        if !matches!(outcome, ExtractOutcome::Missing) {
            log::debug!("config extraction fell back to defaults: {:?}", outcome);
        }
        Extraction { config: Config::default(), outcome, record: None }
    };

    // First declaration wins
    let Some(m) = DECLARATION.find(source) else {
        return fallback(ExtractOutcome::Missing);
    };
    // The pattern ends with the opening brace
    let open = m.end() - 1;

    let Some(end) = find_literal_end(source, open) else {
        return fallback(ExtractOutcome::Unbalanced { open });
    };
    let span = open..end;

    match literal::evaluate(&source[span.clone()]) {
        Ok(Value::Object(record)) => Extraction {
            config: Config::merged_over_defaults(&record),
            outcome: ExtractOutcome::Extracted { span },
            record: Some(record),
        },
        Ok(_) => fallback(ExtractOutcome::NotARecord { span }),
        Err(e) => fallback(ExtractOutcome::Invalid { span, error: e.to_string() }),
    }
}

/// Scan from the `{` at `open` to its matching `}`; returns the exclusive end.
///
/// Depth counting skips string literals and comments, so a brace inside
/// `"}"`, `[[}]]` or `// }` does not end the literal early.
pub fn find_literal_end(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    // Innermost open `{` or `[`
    let mut delims: Vec<u8> = Vec::new();
    // Last significant byte outside strings and comments
    let mut prev = 0u8;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'{' => {
                depth += 1;
                delims.push(b'{');
            }
            b'}' => {
                depth -= 1;
                delims.pop();
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'[' => {
                // Lua long string, only where a table entry value can start
                let value_position = delims.last() == Some(&b'{') && matches!(prev, b'=' | b'{' | b',' | b';');
                if let Some(level) = long_bracket_level(bytes, i).filter(|_| value_position) {
                    i = long_bracket_end(bytes, i + level + 2, level)?;
                    prev = b'"';
                    continue;
                }
                delims.push(b'[');
            }
            b']' => {
                delims.pop();
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i = skip_string(bytes, i + 1, quote)?;
                prev = quote;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = skip_to_newline(bytes, i + 2);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find_from(bytes, i + 2, b"*/")? + 2;
                continue;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                match long_bracket_level(bytes, i + 2) {
                    Some(level) => i = long_bracket_end(bytes, i + level + 4, level)?,
                    None => i = skip_to_newline(bytes, i + 2),
                }
                continue;
            }
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            prev = b;
        }
        i += 1;
    }

    None
}

/// Returns the index just past the closing quote
fn skip_string(bytes: &[u8], mut i: usize, quote: u8) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return None,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_to_newline(bytes: &[u8], i: usize) -> usize {
    find_from(bytes, i, b"\n").map(|n| n + 1).unwrap_or(bytes.len())
}

fn find_from(bytes: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    if start > bytes.len() {
        return None;
    }
    bytes[start..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + start)
}
