// Literal evaluator - turns a configuration literal into a JSON value
// Accepts JavaScript object syntax ({ key: value }) and Lua table syntax ({ key = value }).
// Only literals are allowed: no identifiers as values, no calls, no operators
// beyond unary +/- on numbers. Anything else is an error, never a panic.

use serde_json::{Map, Number, Value};
use std::fmt;

/// Nesting bound for objects/arrays
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralError {
    UnexpectedChar { ch: char, offset: usize },
    UnterminatedString { offset: usize },
    UnterminatedComment { offset: usize },
    BadNumber { text: String, offset: usize },
    UnexpectedToken { found: String, offset: usize },
    UnexpectedEnd,
    MixedTable { offset: usize },
    TooDeep,
    TrailingInput { offset: usize },
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar { ch, offset } => write!(f, "unexpected character {ch:?} at {offset}"),
            Self::UnterminatedString { offset } => write!(f, "unterminated string starting at {offset}"),
            Self::UnterminatedComment { offset } => write!(f, "unterminated comment starting at {offset}"),
            Self::BadNumber { text, offset } => write!(f, "invalid number {text:?} at {offset}"),
            Self::UnexpectedToken { found, offset } => write!(f, "unexpected {found} at {offset}"),
            Self::UnexpectedEnd => write!(f, "unexpected end of literal"),
            Self::MixedTable { offset } => {
                write!(f, "table at {offset} mixes keyed and positional entries")
            }
            Self::TooDeep => write!(f, "literal nested deeper than {MAX_DEPTH} levels"),
            Self::TrailingInput { offset } => write!(f, "unexpected input after literal at {offset}"),
        }
    }
}

impl std::error::Error for LiteralError {}

/// Evaluate a standalone literal expression.
pub fn evaluate(literal: &str) -> Result<Value, LiteralError> {
    let tokens = tokenize(literal)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
    let value = parser.parse_value()?;
    if let Some(tok) = parser.tokens.get(parser.pos) {
        return Err(LiteralError::TrailingInput { offset: tok.offset });
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Equals,
    Comma,
    Semi,
    Plus,
    Minus,
    Number(f64),
    Str(String),
    Ident(String),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Equals => "'='".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Semi => "';'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Str(s) => format!("string {s:?}"),
            TokenKind::Ident(s) => format!("identifier `{s}`"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, LiteralError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = input.char_indices().peekable();
    // true for `{`, false for `[`
    let mut open: Vec<bool> = Vec::new();

    while let Some(&(offset, c)) = chars.peek() {
        if c == '[' && lua_value_position(&tokens, &open) {
            if let Some(level) = long_bracket_level(input.as_bytes(), offset) {
                let (s, end) = read_long_string(input, offset, level)?;
                skip_until(&mut chars, end);
                tokens.push(Token { kind: TokenKind::Str(s), offset });
                continue;
            }
        }

        let simple = match c {
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ':' => Some(TokenKind::Colon),
            '=' => Some(TokenKind::Equals),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semi),
            '+' => Some(TokenKind::Plus),
            _ => None,
        };
        if let Some(kind) = simple {
            match kind {
                TokenKind::LBrace => open.push(true),
                TokenKind::LBracket => open.push(false),
                TokenKind::RBrace | TokenKind::RBracket => {
                    open.pop();
                }
                _ => {}
            }
            chars.next();
            tokens.push(Token { kind, offset });
            continue;
        }

        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('/') => skip_line(&mut chars),
                    Some('*') => {
                        chars.next();
                        skip_block_comment(&mut chars, "*/", offset)?;
                    }
                    _ => return Err(LiteralError::UnexpectedChar { ch: '/', offset }),
                }
            }
            '-' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('-') {
                    chars.next();
                    // Lua comment: `--[[ ... ]]`, `--[==[ ... ]==]` or `-- ...`
                    let at = chars.peek().map(|&(i, _)| i).unwrap_or(input.len());
                    if let Some(level) = long_bracket_level(input.as_bytes(), at) {
                        let end = long_bracket_end(input.as_bytes(), at + level + 2, level)
                            .ok_or(LiteralError::UnterminatedComment { offset })?;
                        skip_until(&mut chars, end);
                    } else {
                        skip_line(&mut chars);
                    }
                } else {
                    tokens.push(Token { kind: TokenKind::Minus, offset });
                }
            }
            '"' | '\'' | '`' => {
                chars.next();
                let s = read_string(&mut chars, c, offset)?;
                tokens.push(Token { kind: TokenKind::Str(s), offset });
            }
            c if c.is_ascii_digit() || c == '.' => {
                let n = read_number(&mut chars, input, offset)?;
                tokens.push(Token { kind: TokenKind::Number(n), offset });
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '$' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { kind: TokenKind::Ident(ident), offset });
            }
            other => return Err(LiteralError::UnexpectedChar { ch: other, offset }),
        }
    }

    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

/// A Lua long string can only start where a table entry value may appear.
/// Elsewhere `[[` is a nested array.
fn lua_value_position(tokens: &[Token], open: &[bool]) -> bool {
    open.last() == Some(&true)
        && matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Equals | TokenKind::LBrace | TokenKind::Comma | TokenKind::Semi)
        )
}

/// Level of the Lua long bracket (`[[`, `[=[`, `[==[` ...) opening at `at`
pub(crate) fn long_bracket_level(bytes: &[u8], at: usize) -> Option<usize> {
    if bytes.get(at) != Some(&b'[') {
        return None;
    }
    let level = bytes[at + 1..].iter().take_while(|&&b| b == b'=').count();
    (bytes.get(at + 1 + level) == Some(&b'[')).then_some(level)
}

/// Index just past the `]=*]` closing a long bracket of `level`, searching from `from`
pub(crate) fn long_bracket_end(bytes: &[u8], from: usize, level: usize) -> Option<usize> {
    let mut close = Vec::with_capacity(level + 2);
    close.push(b']');
    close.extend(std::iter::repeat(b'=').take(level));
    close.push(b']');
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(close.len())
        .position(|w| w == close.as_slice())
        .map(|p| from + p + close.len())
}

/// Body of the long string opening at `at`, and the index just past it.
/// A newline right after the opening bracket is not part of the string.
fn read_long_string(input: &str, at: usize, level: usize) -> Result<(String, usize), LiteralError> {
    let body_start = at + level + 2;
    let end = long_bracket_end(input.as_bytes(), body_start, level)
        .ok_or(LiteralError::UnterminatedString { offset: at })?;
    let body = &input[body_start..end - level - 2];
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    Ok((body.to_string(), end))
}

fn skip_until(chars: &mut Chars<'_>, end: usize) {
    while chars.peek().is_some_and(|&(i, _)| i < end) {
        chars.next();
    }
}

fn skip_line(chars: &mut Chars<'_>) {
    for (_, c) in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
}

fn skip_block_comment(chars: &mut Chars<'_>, close: &str, start: usize) -> Result<(), LiteralError> {
    let close: Vec<char> = close.chars().collect();
    let mut prev: Option<char> = None;
    for (_, c) in chars.by_ref() {
        if prev == Some(close[0]) && c == close[1] {
            return Ok(());
        }
        prev = Some(c);
    }
    Err(LiteralError::UnterminatedComment { offset: start })
}

fn read_string(chars: &mut Chars<'_>, quote: char, start: usize) -> Result<String, LiteralError> {
    let mut out = String::new();
    loop {
        let Some((_, c)) = chars.next() else {
            return Err(LiteralError::UnterminatedString { offset: start });
        };
        match c {
            c if c == quote => return Ok(out),
            '\n' if quote != '`' => return Err(LiteralError::UnterminatedString { offset: start }),
            '\\' => {
                let Some((_, esc)) = chars.next() else {
                    return Err(LiteralError::UnterminatedString { offset: start });
                };
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    'u' => out.push(read_hex_escape(chars, 4).unwrap_or('\u{fffd}')),
                    'x' => out.push(read_hex_escape(chars, 2).unwrap_or('\u{fffd}')),
                    // Line continuation
                    '\n' => {}
                    other => out.push(other),
                }
            }
            other => out.push(other),
        }
    }
}

fn read_hex_escape(chars: &mut Chars<'_>, len: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..len {
        let &(_, c) = chars.peek()?;
        let digit = c.to_digit(16)?;
        chars.next();
        code = code * 16 + digit;
    }
    char::from_u32(code)
}

fn read_number(chars: &mut Chars<'_>, input: &str, start: usize) -> Result<f64, LiteralError> {
    let mut end = start;
    let mut prev = '\0';
    while let Some(&(i, c)) = chars.peek() {
        let exponent_sign = (c == '+' || c == '-') && (prev == 'e' || prev == 'E') && !is_hex(&input[start..i]);
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
            prev = c;
            end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }

    let text = &input[start..end];
    let cleaned = text.replace('_', "");
    let parsed = if is_hex(&cleaned) {
        i64::from_str_radix(&cleaned[2..], 16).ok().map(|n| n as f64)
    } else {
        cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
    };

    parsed.ok_or_else(|| LiteralError::BadNumber { text: text.to_string(), offset: start })
}

fn is_hex(text: &str) -> bool {
    text.starts_with("0x") || text.starts_with("0X")
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek_kind(&self, ahead: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn next(&mut self) -> Result<&'a Token, LiteralError> {
        let tok = self.tokens.get(self.pos).ok_or(LiteralError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn enter(&mut self) -> Result<(), LiteralError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(LiteralError::TooDeep)
        } else {
            Ok(())
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        let tok = self.next()?;
        match &tok.kind {
            TokenKind::LBrace => self.parse_table(tok.offset),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::Str(s) => Ok(Value::String(s.clone())),
            TokenKind::Number(n) => number_value(*n, tok),
            TokenKind::Minus | TokenKind::Plus => {
                let negate = tok.kind == TokenKind::Minus;
                let operand = self.next()?;
                match operand.kind {
                    TokenKind::Number(n) => number_value(if negate { -n } else { n }, operand),
                    _ => Err(unexpected(operand)),
                }
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" | "nil" | "undefined" => Ok(Value::Null),
                _ => Err(unexpected(tok)),
            },
            _ => Err(unexpected(tok)),
        }
    }

    /// `{ ... }` - a record when entries are keyed, an array when they are positional
    fn parse_table(&mut self, open_offset: usize) -> Result<Value, LiteralError> {
        self.enter()?;
        let mut keyed = Map::new();
        let mut positional = Vec::new();

        loop {
            match self.peek_kind(0) {
                None => return Err(LiteralError::UnexpectedEnd),
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }

            match self.parse_key()? {
                Some(key) => {
                    let value = self.parse_value()?;
                    keyed.insert(key, value);
                }
                None => positional.push(self.parse_value()?),
            }

            if !keyed.is_empty() && !positional.is_empty() {
                return Err(LiteralError::MixedTable { offset: open_offset });
            }

            let tok = self.next()?;
            match tok.kind {
                TokenKind::Comma | TokenKind::Semi => continue,
                TokenKind::RBrace => break,
                _ => return Err(unexpected(tok)),
            }
        }

        self.depth -= 1;
        if positional.is_empty() {
            Ok(Value::Object(keyed))
        } else {
            Ok(Value::Array(positional))
        }
    }

    /// Consume `key:` / `key =` / `["key"] =` if present.
    fn parse_key(&mut self) -> Result<Option<String>, LiteralError> {
        let is_sep = |k: Option<&TokenKind>| matches!(k, Some(TokenKind::Colon) | Some(TokenKind::Equals));

        if let Some(TokenKind::LBracket) = self.peek_kind(0) {
            // Lua bracketed key
            if matches!(self.peek_kind(2), Some(TokenKind::RBracket)) && is_sep(self.peek_kind(3)) {
                let tokens = self.tokens;
                let key_tok = &tokens[self.pos + 1];
                let key = match &key_tok.kind {
                    TokenKind::Str(s) => s.clone(),
                    TokenKind::Number(n) => format_number_key(*n),
                    _ => return Err(unexpected(key_tok)),
                };
                self.pos += 4;
                return Ok(Some(key));
            }
            return Ok(None);
        }

        if !is_sep(self.peek_kind(1)) {
            return Ok(None);
        }

        let tok = self.next()?;
        let key = match &tok.kind {
            TokenKind::Ident(s) | TokenKind::Str(s) => s.clone(),
            TokenKind::Number(n) => format_number_key(*n),
            _ => return Err(unexpected(tok)),
        };
        self.pos += 1;
        Ok(Some(key))
    }

    fn parse_array(&mut self) -> Result<Value, LiteralError> {
        self.enter()?;
        let mut items = Vec::new();

        loop {
            match self.peek_kind(0) {
                None => return Err(LiteralError::UnexpectedEnd),
                Some(TokenKind::RBracket) => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }

            items.push(self.parse_value()?);

            let tok = self.next()?;
            match tok.kind {
                TokenKind::Comma => continue,
                TokenKind::RBracket => break,
                _ => return Err(unexpected(tok)),
            }
        }

        self.depth -= 1;
        Ok(Value::Array(items))
    }
}

fn unexpected(tok: &Token) -> LiteralError {
    LiteralError::UnexpectedToken { found: tok.kind.describe(), offset: tok.offset }
}

fn number_value(n: f64, tok: &Token) -> Result<Value, LiteralError> {
    // Integral values stay integers so they print as `320`, not `320.0`
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| LiteralError::BadNumber { text: n.to_string(), offset: tok.offset })
}

fn format_number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Render a value as a Lua table constructor expression.
///
/// Objects become keyed tables, arrays positional ones, `null` becomes `nil`.
/// Output is a single line.
pub fn to_lua(value: &Value) -> String {
    let mut out = String::new();
    write_lua(value, &mut out);
    out
}

fn write_lua(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => out.push_str(&i.to_string()),
            None => out.push_str(&n.as_f64().unwrap_or(0.0).to_string()),
        },
        Value::String(s) => write_lua_string(s, out),
        Value::Array(items) => {
            out.push('{');
            for (i, item) in items.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                write_lua(item, out);
            }
            out.push_str(if items.is_empty() { "}" } else { " }" });
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                if is_lua_name(key) {
                    out.push_str(key);
                } else {
                    out.push('[');
                    write_lua_string(key, out);
                    out.push(']');
                }
                out.push_str(" = ");
                write_lua(item, out);
            }
            out.push_str(if map.is_empty() { "}" } else { " }" });
        }
    }
}

fn write_lua_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

fn is_lua_name(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !LUA_KEYWORDS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_js_object() {
        let v = evaluate("{canvasWidth:320,canvasHeight:240,position:'top-left'}").unwrap();
        assert_eq!(v, json!({"canvasWidth": 320, "canvasHeight": 240, "position": "top-left"}));
    }

    #[test]
    fn test_lua_table() {
        let v = evaluate(r#"{ canvasWidth = 600, position = "center"; weights = {400, 700}, }"#).unwrap();
        assert_eq!(v, json!({"canvasWidth": 600, "position": "center", "weights": [400, 700]}));
    }

    #[test]
    fn test_nested_and_trailing_commas() {
        let src = r#"{
            fonts: [
                { fontName: 'Inter', weights: [400, 600,], },
            ],
            "quoted key": -1.5e2,
            hex: 0xFF,
        }"#;
        let v = evaluate(src).unwrap();
        assert_eq!(v["fonts"][0]["weights"], json!([400, 600]));
        assert_eq!(v["quoted key"], json!(-150));
        assert_eq!(v["hex"], json!(255));
    }

    #[test]
    fn test_comments_skipped() {
        let src = "{ // line\n a: 1, /* block } */ b: 2, -- lua\n c: 3, --[[ long\n ]] d: 4 }";
        let v = evaluate(src).unwrap();
        assert_eq!(v, json!({"a": 1, "b": 2, "c": 3, "d": 4}));
    }

    #[test]
    fn test_keywords() {
        let v = evaluate("{a: true, b: false, c: null, d: nil, e: undefined}").unwrap();
        assert_eq!(v, json!({"a": true, "b": false, "c": null, "d": null, "e": null}));
    }

    #[test]
    fn test_string_escapes() {
        let v = evaluate(r#"{ s: "a\"b\nA", t: 'it\'s', u: `multi
line` }"#).unwrap();
        assert_eq!(v["s"], json!("a\"b\nA"));
        assert_eq!(v["t"], json!("it's"));
        assert_eq!(v["u"], json!("multi\nline"));
    }

    #[test]
    fn test_lua_bracket_keys() {
        let v = evaluate(r#"{ ["canvas-width"] = 12, [3] = "x" }"#).unwrap();
        assert_eq!(v, json!({"canvas-width": 12, "3": "x"}));
    }

    #[test]
    fn test_rejects_expressions() {
        assert!(evaluate("{ w: WIDTH }").is_err());
        assert!(evaluate("{ w: 1 + 2 }").is_err());
        assert!(evaluate("{ w: f() }").is_err());
        assert!(evaluate("{ a: 1 b: 2 }").is_err());
    }

    #[test]
    fn test_rejects_unterminated() {
        assert_eq!(evaluate("{ a: 1"), Err(LiteralError::UnexpectedEnd));
        assert!(matches!(evaluate("{ a: 'open }"), Err(LiteralError::UnterminatedString { .. })));
        assert!(matches!(evaluate("{ /* open }"), Err(LiteralError::UnterminatedComment { .. })));
    }

    #[test]
    fn test_mixed_table_rejected() {
        assert!(matches!(evaluate("{ 1, a = 2 }"), Err(LiteralError::MixedTable { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert_eq!(evaluate(&deep), Err(LiteralError::TooDeep));
        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(evaluate(&ok).is_ok());
    }

    #[test]
    fn test_lua_long_strings() {
        let v = evaluate("{ label = [[}]], note = [==[a ]] b]==], body = [[\nline]] }").unwrap();
        assert_eq!(v, json!({"label": "}", "note": "a ]] b", "body": "line"}));
        let v = evaluate("{ [[x]], [=[y]=] }").unwrap();
        assert_eq!(v, json!(["x", "y"]));
        assert!(matches!(evaluate("{ a = [[open }"), Err(LiteralError::UnterminatedString { .. })));
    }

    #[test]
    fn test_nested_arrays_are_not_long_strings() {
        assert_eq!(evaluate("{ grid: [[1, 2], [3]] }").unwrap(), json!({"grid": [[1, 2], [3]]}));
        assert_eq!(evaluate("[[1], [[2]]]").unwrap(), json!([[1], [[2]]]));
    }

    #[test]
    fn test_leveled_lua_comment() {
        let v = evaluate("{ a = 1, --[==[ ]] } ]==] b = 2 }").unwrap();
        assert_eq!(v, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_to_lua() {
        let v = json!({"canvasWidth": 320, "position": "top-left", "ratio": 0.5, "on": true, "off": null});
        assert_eq!(
            to_lua(&v),
            r#"{ canvasWidth = 320, off = nil, on = true, position = "top-left", ratio = 0.5 }"#
        );
        assert_eq!(to_lua(&json!({"fonts": [{"weights": [400, 600]}]})), "{ fonts = { { weights = { 400, 600 } } } }");
        assert_eq!(to_lua(&json!({})), "{}");
        assert_eq!(to_lua(&json!([])), "{}");
    }

    #[test]
    fn test_to_lua_quotes_awkward_keys_and_strings() {
        let v = json!({"canvas-width": 1, "end": 2, "s": "a\"b\\c\nd\u{1}"});
        assert_eq!(to_lua(&v), r#"{ ["canvas-width"] = 1, ["end"] = 2, s = "a\"b\\c\nd\001" }"#);
    }

    #[test]
    fn test_to_lua_reads_back_the_same() {
        let src = "{canvasWidth:320,canvasHeight:240,position:'top-left',fonts:[{fontName:'Inter',weights:[400]}]}";
        let v = evaluate(src).unwrap();
        assert_eq!(evaluate(&to_lua(&v)).unwrap(), v);
    }

    #[test]
    fn test_positional_braces_are_arrays() {
        assert_eq!(evaluate("{400, 600}").unwrap(), json!([400, 600]));
        assert_eq!(evaluate("{}").unwrap(), json!({}));
    }
}
