//! Unified diff reporting for overwritten files.

use similar::{ChangeTag, TextDiff};

/// Diff text plus line tallies for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSummary {
    pub unified: String,
    pub lines_added: usize,
    pub lines_removed: usize,
}

pub fn summarize(path: &str, old: &str, new: &str) -> DiffSummary {
    let diff = TextDiff::from_lines(old, new);
    let unified = diff
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string();

    let mut lines_added = 0;
    let mut lines_removed = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => lines_added += 1,
            ChangeTag::Delete => lines_removed += 1,
            ChangeTag::Equal => {}
        }
    }

    DiffSummary { unified, lines_added, lines_removed }
}
