// Code sanitizer - rewrites the config export into a plain local binding
// so the whole script is a valid chunk body for `function(canvas, ctx) ... end`.
// Only the one recognized prefix is touched; other `export` text is left alone.
// An extracted config literal is also re-rendered as a Lua table constructor,
// so `{ canvasWidth: 320 }` compiles.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::extract::{ExtractOutcome, Extraction};
use crate::literal::to_lua;

static EXPORT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+const\s+config").expect("export pattern is valid"));

/// The local declaration that replaces every `export const config`
pub const LOCAL_DECLARATION: &str = "local config <const>";

/// Rewrite every occurrence of the export prefix. Borrows when there is none.
pub fn sanitize(source: &str) -> Cow<'_, str> {
    EXPORT_PREFIX.replace_all(source, LOCAL_DECLARATION)
}

/// Sanitize, replacing the extracted literal with its Lua rendering.
///
/// The rendering is padded with the literal's newlines so line numbers in
/// errors still match the source. Without a successful extraction this is
/// plain `sanitize`.
pub fn sanitize_extracted<'a>(source: &'a str, extraction: &Extraction) -> Cow<'a, str> {
    let (ExtractOutcome::Extracted { span }, Some(record)) = (&extraction.outcome, &extraction.record) else {
        return sanitize(source);
    };
    let Some(original) = source.get(span.clone()) else {
        return sanitize(source);
    };

    let mut rewritten = String::with_capacity(source.len());
    rewritten.push_str(&source[..span.start]);
    rewritten.push_str(&to_lua(&serde_json::Value::Object(record.clone())));
    for _ in original.matches('\n') {
        rewritten.push('\n');
    }
    rewritten.push_str(&source[span.end..]);
    Cow::Owned(sanitize(&rewritten).into_owned())
}

/// True if `text` still contains the export prefix
pub fn has_export_prefix(text: &str) -> bool {
    EXPORT_PREFIX.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_config_detailed;

    #[test]
    fn test_rewrites_prefix() {
        let out = sanitize("export const config = { canvasWidth = 10 }\nctx:fill()");
        assert_eq!(out, "local config <const> = { canvasWidth = 10 }\nctx:fill()");
    }

    #[test]
    fn test_no_prefix_borrows() {
        let src = "ctx:fillRect(0, 0, 1, 1)";
        assert!(matches!(sanitize(src), Cow::Borrowed(_)));
    }

    #[test]
    fn test_every_occurrence_rewritten() {
        let src = "export const config = {}\n-- export  const\tconfig\nexport\nconst\nconfig = {}";
        let out = sanitize(src);
        assert!(!has_export_prefix(&out));
        assert_eq!(out.matches(LOCAL_DECLARATION).count(), 3);
    }

    #[test]
    fn test_object_style_literal_becomes_lua_table() {
        let src = "export const config = {canvasWidth:320,canvasHeight:240,position:'top-left'}\nctx:fillRect(0, 0, 4, 4)";
        let out = sanitize_extracted(src, &extract_config_detailed(src));
        assert_eq!(
            out,
            "local config <const> = { canvasHeight = 240, canvasWidth = 320, position = \"top-left\" }\nctx:fillRect(0, 0, 4, 4)"
        );
    }

    #[test]
    fn test_multiline_literal_keeps_line_count() {
        let src = "export const config = {\n  canvasWidth: 10,\n  // note\n}\nerror('line 5')";
        let out = sanitize_extracted(src, &extract_config_detailed(src));
        assert_eq!(out.lines().count(), src.lines().count());
        assert!(out.ends_with("}\n\n\n\nerror('line 5')"));
        assert!(!has_export_prefix(&out));
    }

    #[test]
    fn test_failed_extraction_only_rewrites_prefix() {
        let src = "export const config = { canvasWidth: WIDTH }\nctx:fill()";
        let out = sanitize_extracted(src, &extract_config_detailed(src));
        assert_eq!(out, sanitize(src));
        let plain = "ctx:fill()";
        assert_eq!(sanitize_extracted(plain, &extract_config_detailed(plain)), plain);
    }

    #[test]
    fn test_other_exports_untouched() {
        let src = "export const palette = {}\nexport let config = {}";
        assert_eq!(sanitize(src), src);
    }
}
