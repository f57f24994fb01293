//! Text clean-up applied before the lenient parse stages.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fenced code block, with or without a language tag. Lazy body match.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[ \t]*[A-Za-z0-9_+.-]*[ \t]*\r?\n(.*?)```").unwrap());

/// Opening fence line, used for the widest-span fallback.
static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[ \t]*[A-Za-z0-9_+.-]*[ \t]*\r?\n").unwrap());

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[\]}])").unwrap());

/// Straighten typographic quotes, replace non-breaking spaces and drop
/// trailing commas before a closing bracket or brace.
pub fn normalize_json_text(text: &str) -> String {
    let straightened: String = text
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            '\u{00A0}' | '\u{202F}' | '\u{2007}' => ' ',
            other => other,
        })
        .collect();
    TRAILING_COMMA.replace_all(&straightened, "$1").into_owned()
}

/// Interiors of fenced blocks in document order, followed by the widest
/// span from the first opening fence to the last closing fence.
///
/// The widest span catches payloads whose string values themselves contain
/// fences, which cut the lazy match short.
pub fn fenced_block_candidates(text: &str) -> Vec<&str> {
    let mut blocks: Vec<&str> =
        FENCED_BLOCK.captures_iter(text).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect();

    if let (Some(open), Some(close)) = (FENCE_OPEN.find(text), text.rfind("```")) {
        if close > open.end() {
            let widest = &text[open.end()..close];
            if !blocks.contains(&widest) {
                blocks.push(widest);
            }
        }
    }
    blocks
}

/// Substring from the first `{` to the last `}`, if any.
pub fn bracket_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
