//! Budget-bounded context bundle packing.

use crate::rank::RankedFile;

/// A packed bundle plus a record of what went into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBundle {
    pub text: String,
    /// Paths included with full content, in bundle order.
    pub full: Vec<String>,
    /// Paths included as a short preview.
    pub previews: Vec<String>,
    /// Paths that did not fit even as a preview.
    pub omitted: Vec<String>,
}

impl ContextBundle {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Inputs for [`pack_bundle`].
pub struct BundleSpec<'a> {
    pub tree: &'a str,
    /// Optional section placed right after the tree (e.g. captured build errors).
    pub failure: Option<&'a str>,
    pub ranked: &'a [RankedFile<'a>],
    pub budget_chars: usize,
    pub preview_lines: usize,
}

/// Pack a bundle: tree first, then full files in rank order while they fit,
/// falling back to a preview per file, skipping files whose preview does not fit.
pub fn pack_bundle(spec: &BundleSpec<'_>) -> ContextBundle {
    let mut bundle = ContextBundle::default();
    let mut text = format!("# Project tree\n\n```text\n{}\n```\n", spec.tree);

    if let Some(failure) = spec.failure {
        let fence = fence_for(failure);
        text.push_str(&format!("\n# Build failure\n\n{}text\n{}\n{}\n", fence, failure.trim_end(), fence));
    }

    if !spec.ranked.is_empty() {
        text.push_str("\n# Files\n");
    }
    let mut used = text.chars().count();

    for ranked in spec.ranked {
        let file = ranked.file;
        let full = render_full(&file.path, &file.content, file.line_count);
        let full_len = full.chars().count();
        if used + full_len <= spec.budget_chars {
            text.push_str(&full);
            used += full_len;
            bundle.full.push(file.path.clone());
            continue;
        }

        let preview = render_preview(&file.path, &file.content, file.line_count, spec.preview_lines);
        let preview_len = preview.chars().count();
        if used + preview_len <= spec.budget_chars {
            text.push_str(&preview);
            used += preview_len;
            bundle.previews.push(file.path.clone());
        } else {
            tracing::debug!("Omitting {} from bundle ({} chars used)", file.path, used);
            bundle.omitted.push(file.path.clone());
        }
    }

    bundle.text = text;
    bundle
}

fn render_full(path: &str, content: &str, line_count: usize) -> String {
    let fence = fence_for(content);
    format!(
        "\n## {} ({} lines)\n\n{}\n{}\n{}\n",
        path,
        line_count,
        fence,
        content.trim_end_matches('\n'),
        fence
    )
}

fn render_preview(path: &str, content: &str, line_count: usize, preview_lines: usize) -> String {
    let head: Vec<&str> = content.lines().take(preview_lines).collect();
    let head = head.join("\n");
    let fence = fence_for(&head);
    format!(
        "\n## {} (preview: first {} of {} lines)\n\n{}\n{}\n{}\n",
        path,
        preview_lines.min(line_count),
        line_count,
        fence,
        head,
        fence
    )
}

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0usize;
    let mut current = 0usize;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectFile;
    use chrono::Utc;
    use std::path::PathBuf;

    fn file(path: &str, content: &str) -> ProjectFile {
        ProjectFile {
            path: path.to_string(),
            absolute: PathBuf::from(path),
            content: content.to_string(),
            line_count: content.lines().count(),
            byte_size: content.len() as u64,
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_then_preview_then_omitted() {
        let small = file("a.txt", "alpha\n");
        let long_body: String = (0..200).map(|i| format!("line {}\n", i)).collect();
        let large = file("b.txt", &long_body);
        let huge = file("c.txt", &"x".repeat(5_000));
        let ranked = vec![
            RankedFile { score: 3, file: &small },
            RankedFile { score: 2, file: &large },
            RankedFile { score: 1, file: &huge },
        ];

        let bundle = pack_bundle(&BundleSpec {
            tree: ".\n└── a.txt",
            failure: None,
            ranked: &ranked,
            budget_chars: 400,
            preview_lines: 3,
        });

        assert_eq!(bundle.full, vec!["a.txt"]);
        assert_eq!(bundle.previews, vec!["b.txt"]);
        assert_eq!(bundle.omitted, vec!["c.txt"]);
        assert!(bundle.char_len() <= 400);
        assert!(bundle.text.starts_with("# Project tree"));
        assert!(bundle.text.contains("line 2"));
        assert!(!bundle.text.contains("line 3\n"));
    }

    #[test]
    fn test_tree_always_emitted() {
        let bundle = pack_bundle(&BundleSpec {
            tree: ".\n└── very_long_name.txt",
            failure: None,
            ranked: &[],
            budget_chars: 1,
            preview_lines: 3,
        });
        assert!(bundle.text.contains("very_long_name.txt"));
    }

    #[test]
    fn test_failure_section_follows_tree() {
        let bundle = pack_bundle(&BundleSpec {
            tree: ".",
            failure: Some("error[E0425]: cannot find value `x`"),
            ranked: &[],
            budget_chars: 1_000,
            preview_lines: 3,
        });
        let tree_at = bundle.text.find("# Project tree").unwrap();
        let failure_at = bundle.text.find("# Build failure").unwrap();
        assert!(tree_at < failure_at);
        assert!(bundle.text.contains("cannot find value `x`"));
    }

    #[test]
    fn test_fence_longer_than_inner_backticks() {
        assert_eq!(fence_for("no ticks"), "```");
        assert_eq!(fence_for("```rust\n```"), "````");
    }
}
