//! Unicode-safe truncation helpers.

/// Keep the first `max_chars` characters, marking the cut.
pub fn truncate_head(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{}\n… (truncated)", head)
}

/// Keep the last `max_chars` characters, marking the cut.
///
/// Build and test output puts the interesting errors at the end.
pub fn truncate_tail(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - max_chars).collect();
    format!("… (truncated)\n{}", tail)
}
