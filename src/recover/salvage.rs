//! Last-resort salvage of `path`/`content` pairs from truncated payloads.

use once_cell::sync::Lazy;
use regex::Regex;

static PATH_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""path"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());

static CONTENT_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r#""content"\s*:\s*""#).unwrap());

/// One file recovered by scanning the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalvagedFile {
    pub path: String,
    pub content: String,
    /// False when the text ended before the closing quote.
    pub complete: bool,
}

/// Scan for every `"path": "..."` and pair it with the nearest following
/// `"content": "` that appears before the next path key.
///
/// Content values are read character by character, honouring backslash
/// escapes, until an unescaped quote or the end of the text.
pub fn salvage_files(text: &str) -> Vec<SalvagedFile> {
    let mut files = Vec::new();
    let mut cursor = 0usize;

    while let Some(path_caps) = PATH_KEY.captures_at(text, cursor) {
        let (Some(whole), Some(raw_path)) = (path_caps.get(0), path_caps.get(1)) else {
            break;
        };
        let path = unescape_json_fragment(raw_path.as_str());
        let region_end = PATH_KEY.find_at(text, whole.end()).map(|m| m.start()).unwrap_or(text.len());

        let Some(content_key) = CONTENT_KEY.find(&text[whole.end()..region_end]) else {
            tracing::debug!("No content value for salvaged path {}", path);
            cursor = whole.end();
            continue;
        };

        let value_start = whole.end() + content_key.end();
        let (raw_value, value_end, complete) = scan_string_value(text, value_start);
        if !path.trim().is_empty() {
            files.push(SalvagedFile {
                path,
                content: unescape_json_fragment(raw_value),
                complete,
            });
        }
        cursor = value_end;
    }

    files
}

/// Returns (raw value, index just past it, closed).
fn scan_string_value(text: &str, start: usize) -> (&str, usize, bool) {
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return (&text[start..start + offset], start + offset + 1, true),
            _ => {}
        }
    }
    (&text[start..], text.len(), false)
}

/// Decode JSON string escapes without requiring a well-formed string.
///
/// Unknown escapes keep the escaped character; a dangling backslash or an
/// incomplete `\u` sequence at the end is dropped.
pub fn unescape_json_fragment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let Some(high) = read_hex4(&mut chars) else {
                    break;
                };
                if (0xD800..0xDC00).contains(&high) {
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        if let Some(low) = read_hex4(&mut lookahead) {
                            if (0xDC00..0xE000).contains(&low) {
                                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                                chars = lookahead;
                                continue;
                            }
                        }
                    }
                    out.push('\u{FFFD}');
                } else {
                    out.push(char::from_u32(high).unwrap_or('\u{FFFD}'));
                }
            }
            Some(other) => out.push(other),
            None => break,
        }
    }

    out
}

fn read_hex4(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..4 {
        let digit = chars.next()?.to_digit(16)?;
        value = value * 16 + digit;
    }
    Some(value)
}
