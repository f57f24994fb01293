//! Search/replace match strategies, tried in order until one applies.

use super::similarity::{length_ratio, similarity};
use crate::domain::{Config, SearchReplace};
use std::fmt;

/// Which strategy located the search text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    LineTrimmed,
    Similarity,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchTier::Exact => "exact",
            MatchTier::LineTrimmed => "line-trimmed",
            MatchTier::Similarity => "similarity",
        })
    }
}

/// Tunables for the fuzzy tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Minimum window similarity accepted.
    pub similarity_threshold: f64,
    /// Above this many characters, line overlap replaces edit distance.
    pub similarity_char_ceiling: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { similarity_threshold: 0.8, similarity_char_ceiling: 1_000 }
    }
}

impl From<&Config> for MatchConfig {
    fn from(config: &Config) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            similarity_char_ceiling: config.similarity_char_ceiling,
        }
    }
}

/// Result of one strategy against one edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Replaced(String),
    NoMatch,
    /// The closest region already looks like the replacement.
    AlreadyApplied,
}

pub trait MatchStrategy {
    fn tier(&self) -> MatchTier;
    fn attempt(&self, content: &str, edit: &SearchReplace, config: &MatchConfig) -> Attempt;
}

pub struct ExactMatch;
pub struct LineTrimmedMatch;
pub struct SimilarityWindow;

/// Strategies in evaluation order.
pub fn strategies() -> [&'static dyn MatchStrategy; 3] {
    [&ExactMatch, &LineTrimmedMatch, &SimilarityWindow]
}

/// Per-edit result reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied(MatchTier),
    NotFound,
    AlreadyApplied,
    /// The target file does not exist.
    MissingFile,
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied(_))
    }
}

/// Apply one edit to `content`, returning the new content when a tier matched.
pub fn apply_edit(content: &str, edit: &SearchReplace, config: &MatchConfig) -> (EditOutcome, Option<String>) {
    if edit.search.is_empty() {
        // An empty search only means "fill this empty file".
        return if content.is_empty() {
            (EditOutcome::Applied(MatchTier::Exact), Some(edit.replace.clone()))
        } else {
            (EditOutcome::NotFound, None)
        };
    }

    for strategy in strategies() {
        match strategy.attempt(content, edit, config) {
            Attempt::Replaced(updated) => return (EditOutcome::Applied(strategy.tier()), Some(updated)),
            Attempt::AlreadyApplied => return (EditOutcome::AlreadyApplied, None),
            Attempt::NoMatch => {}
        }
    }
    (EditOutcome::NotFound, None)
}

impl MatchStrategy for ExactMatch {
    fn tier(&self) -> MatchTier {
        MatchTier::Exact
    }

    fn attempt(&self, content: &str, edit: &SearchReplace, _config: &MatchConfig) -> Attempt {
        if content.contains(&edit.search) {
            Attempt::Replaced(content.replacen(&edit.search, &edit.replace, 1))
        } else {
            Attempt::NoMatch
        }
    }
}

impl MatchStrategy for LineTrimmedMatch {
    fn tier(&self) -> MatchTier {
        MatchTier::LineTrimmed
    }

    fn attempt(&self, content: &str, edit: &SearchReplace, _config: &MatchConfig) -> Attempt {
        let wanted: Vec<&str> = edit.search.lines().map(str::trim_end).collect();
        if wanted.is_empty() || wanted.iter().all(|line| line.is_empty()) {
            return Attempt::NoMatch;
        }
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        if lines.len() < wanted.len() {
            return Attempt::NoMatch;
        }

        for start in 0..=lines.len() - wanted.len() {
            let matches = wanted
                .iter()
                .enumerate()
                .all(|(offset, want)| lines[start + offset].trim_end() == *want);
            if matches {
                return Attempt::Replaced(splice_lines(&lines, start, wanted.len(), &edit.replace));
            }
        }
        Attempt::NoMatch
    }
}

impl MatchStrategy for SimilarityWindow {
    fn tier(&self) -> MatchTier {
        MatchTier::Similarity
    }

    fn attempt(&self, content: &str, edit: &SearchReplace, config: &MatchConfig) -> Attempt {
        let needle = edit.search.trim();
        let window_len = edit.search.trim_matches('\n').lines().count();
        if needle.is_empty() || window_len == 0 {
            return Attempt::NoMatch;
        }
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        if lines.len() < window_len {
            return Attempt::NoMatch;
        }

        let needle_chars = needle.chars().count();
        let mut best: Option<(usize, f64)> = None;
        for start in 0..=lines.len() - window_len {
            let window = lines[start..start + window_len].concat();
            let window = window.trim();
            // The length bound only holds for the edit-distance ratio, not line overlap.
            let uses_edit_distance = needle_chars.max(window.chars().count()) <= config.similarity_char_ceiling;
            if uses_edit_distance && length_ratio(needle, window) < config.similarity_threshold {
                continue;
            }
            let ratio = similarity(needle, window, config.similarity_char_ceiling);
            // Strictly greater keeps the first window on ties.
            if best.map_or(true, |(_, best_ratio)| ratio > best_ratio) {
                best = Some((start, ratio));
            }
        }

        let Some((start, ratio)) = best else {
            return Attempt::NoMatch;
        };
        if ratio < config.similarity_threshold {
            tracing::debug!("Best window ratio {:.3} below threshold {:.3}", ratio, config.similarity_threshold);
            return Attempt::NoMatch;
        }

        let window = lines[start..start + window_len].concat();
        let replacement = edit.replace.trim();
        if !replacement.is_empty()
            && similarity(replacement, window.trim(), config.similarity_char_ceiling) >= ratio
        {
            tracing::debug!("Window at line {} already resembles the replacement", start + 1);
            return Attempt::AlreadyApplied;
        }

        tracing::debug!("Similarity window at line {} accepted with ratio {:.3}", start + 1, ratio);
        Attempt::Replaced(splice_lines(&lines, start, window_len, &edit.replace))
    }
}

/// Replace `count` lines starting at `start` with `replacement` as one block,
/// keeping the file's line ending convention at the seam.
fn splice_lines(lines: &[&str], start: usize, count: usize, replacement: &str) -> String {
    let run = &lines[start..start + count];
    let last = run.last().copied().unwrap_or_default();
    let uses_crlf = run.first().is_some_and(|line| line.ends_with("\r\n"));

    let mut block = if uses_crlf && !replacement.contains('\r') {
        replacement.replace('\n', "\r\n")
    } else {
        replacement.to_string()
    };
    let eol = if uses_crlf { "\r\n" } else { "\n" };
    if last.ends_with('\n') {
        if !block.is_empty() && !block.ends_with('\n') {
            block.push_str(eol);
        }
    } else if let Some(stripped) = block.strip_suffix(eol).or_else(|| block.strip_suffix('\n')) {
        block = stripped.to_string();
    }

    let mut out = String::new();
    for line in &lines[..start] {
        out.push_str(line);
    }
    out.push_str(&block);
    for line in &lines[start + count..] {
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(search: &str, replace: &str) -> SearchReplace {
        SearchReplace { search: search.to_string(), replace: replace.to_string() }
    }

    fn run(content: &str, search: &str, replace: &str) -> (EditOutcome, Option<String>) {
        apply_edit(content, &edit(search, replace), &MatchConfig::default())
    }

    #[test]
    fn test_exact_match_changes_only_that_line() {
        let content = "function check(x) {\n  log(x);\n  if (x < 0) return false;\n  return true;\n}\n";
        let (outcome, updated) = run(content, "if (x < 0) return false;", "if (x <= 0) return false;");
        assert_eq!(outcome, EditOutcome::Applied(MatchTier::Exact));
        similar_asserts::assert_eq!(
            updated.unwrap(),
            "function check(x) {\n  log(x);\n  if (x <= 0) return false;\n  return true;\n}\n"
        );
    }

    #[test]
    fn test_exact_match_equals_first_substitution() {
        let content = "a = 1\nb = 2\na = 1\n";
        let (_, updated) = run(content, "a = 1", "a = 10");
        assert_eq!(updated.unwrap(), content.replacen("a = 1", "a = 10", 1));
    }

    #[test]
    fn test_line_trimmed_ignores_trailing_whitespace() {
        let content = "fn main() {   \n    start();  \n}\n";
        let (outcome, updated) = run(content, "fn main() {\n    start();", "fn main() {\n    boot();");
        assert_eq!(outcome, EditOutcome::Applied(MatchTier::LineTrimmed));
        assert_eq!(updated.unwrap(), "fn main() {\n    boot();\n}\n");
    }

    #[test]
    fn test_line_trimmed_keeps_crlf() {
        let content = "one \r\ntwo\r\nthree\r\n";
        let (outcome, updated) = run(content, "one\ntwo", "uno\ndos");
        assert_eq!(outcome, EditOutcome::Applied(MatchTier::LineTrimmed));
        assert_eq!(updated.unwrap(), "uno\r\ndos\r\nthree\r\n");
    }

    #[test]
    fn test_similarity_accepts_renamed_variable() {
        let content = "fn run(input: &str) -> Result<()> {\n    let val = input.parse()?;\n    let doubled = val * 2;\n    println!(\"{}\", doubled);\n    Ok(())\n}\n";
        let search = "    let value = input.parse()?;\n    let doubled = value * 2;\n    println!(\"{}\", doubled);";
        let replace = "    let value = input.parse()?;\n    let doubled = value * 3;\n    println!(\"{}\", doubled);";
        let (outcome, updated) = run(content, search, replace);
        assert_eq!(outcome, EditOutcome::Applied(MatchTier::Similarity));
        let updated = updated.unwrap();
        assert!(updated.contains("value * 3"));
        assert!(updated.starts_with("fn run(input: &str)"));
        assert!(updated.ends_with("    Ok(())\n}\n"));
    }

    #[test]
    fn test_similarity_rejects_different_body() {
        let content = "fn run() {\n    let name = read_name();\n    greet(&name);\n    log::info!(\"done\");\n}\n";
        let search = "    let value = input.parse()?;\n    let doubled = value * 2;\n    println!(\"{}\", doubled);";
        let (outcome, updated) = run(content, search, "    unreachable!();");
        assert_eq!(outcome, EditOutcome::NotFound);
        assert!(updated.is_none());
    }

    #[test]
    fn test_reapplying_an_applied_edit_fails() {
        let content = "fn check(x: i32) -> bool {\n    if x < 0 { return false; }\n    true\n}\n";
        let e = edit("    if x < 0 { return false; }", "    if x <= 0 { return false; }");
        let config = MatchConfig::default();
        let (first, updated) = apply_edit(content, &e, &config);
        assert!(first.is_applied());
        let updated = updated.unwrap();

        let (second, again) = apply_edit(&updated, &e, &config);
        assert!(!second.is_applied());
        assert!(again.is_none());
    }

    #[test]
    fn test_empty_search_only_fills_empty_file() {
        assert_eq!(run("", "", "new").1.as_deref(), Some("new"));
        assert_eq!(run("existing", "", "new").0, EditOutcome::NotFound);
    }

    #[test]
    fn test_similarity_ties_pick_first_window() {
        let content = "alpha one\nbeta\nalpha one\nbeta\n";
        let (outcome, updated) = run(content, "alpha onx\nbeta", "gamma\nbeta");
        assert_eq!(outcome, EditOutcome::Applied(MatchTier::Similarity));
        assert_eq!(updated.unwrap(), "gamma\nbeta\nalpha one\nbeta\n");
    }

    #[test]
    fn test_large_reindented_block_matches_by_line_overlap() {
        let search: String = (0..60).map(|i| format!("let value_{i} = compute({i});\n")).collect();
        let content: String = format!("fn main() {{\n{}}}\n", search.lines().map(|l| format!("{:16}{}\n", "", l)).collect::<String>());
        let replace: String = (0..60).map(|i| format!("let value_{i} = evaluate({i});\n")).collect();
        assert!(search.len() > MatchConfig::default().similarity_char_ceiling);

        let (outcome, updated) = run(&content, &search, &replace);
        assert_eq!(outcome, EditOutcome::Applied(MatchTier::Similarity));
        let updated = updated.unwrap();
        assert!(updated.starts_with("fn main() {\nlet value_0 = evaluate(0);\n"));
        assert!(!updated.contains("compute("));
        assert!(updated.ends_with("}\n"));
    }
}
