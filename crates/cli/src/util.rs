// Argument parsing and file helpers shared by the commands

use std::fs;
use std::path::Path;

use canvas_studio_engine::ViewportBounds;

use crate::CliError;

/// Parse `WxH` (also `W,H` / `WXH`) into viewport bounds
pub fn parse_viewport(s: &str) -> Result<ViewportBounds, String> {
    let (w, h) = split_pair(s, &['x', 'X', ','])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("viewport must be positive, got '{}'", s));
    }
    Ok(ViewportBounds::new(w, h))
}

/// Parse `X,Y` into a point
pub fn parse_point(s: &str) -> Result<(f64, f64), String> {
    split_pair(s, &[',']).ok_or_else(|| format!("expected X,Y, got '{}'", s))
}

fn split_pair(s: &str, separators: &[char]) -> Option<(f64, f64)> {
    let (a, b) = s.trim().split_once(separators)?;
    let a: f64 = a.trim().parse().ok()?;
    let b: f64 = b.trim().parse().ok()?;
    (a.is_finite() && b.is_finite()).then_some((a, b))
}

pub fn read_script(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("400x300").unwrap(), ViewportBounds::new(400.0, 300.0));
        assert_eq!(parse_viewport(" 1024X768 ").unwrap(), ViewportBounds::new(1024.0, 768.0));
        assert_eq!(parse_viewport("640,480").unwrap(), ViewportBounds::new(640.0, 480.0));
        assert!(parse_viewport("400").is_err());
        assert!(parse_viewport("0x300").is_err());
        assert!(parse_viewport("axb").is_err());
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("12.5, 40").unwrap(), (12.5, 40.0));
        assert!(parse_point("12").is_err());
        assert!(parse_point("1,NaN").is_err());
    }
}
