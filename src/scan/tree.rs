//! Directory tree listing rendered from scanned paths.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
struct Node {
    dirs: BTreeMap<String, Node>,
    files: BTreeSet<String>,
}

impl Node {
    fn insert(&mut self, path: &str) {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(file) = segments.pop() else {
            return;
        };
        let mut node = self;
        for segment in segments {
            node = node.dirs.entry(segment.to_string()).or_default();
        }
        node.files.insert(file.to_string());
    }

    fn entry_count(&self) -> usize {
        self.files.len() + self.dirs.values().map(|d| 1 + d.entry_count()).sum::<usize>()
    }
}

/// Render root-relative paths as a box-drawing tree, directories first.
///
/// At most `max_entries` entries are drawn; the rest are summarized on a
/// trailing line.
pub fn render_tree(paths: &[String], max_entries: usize) -> String {
    let mut root = Node::default();
    for path in paths {
        root.insert(path);
    }

    let mut lines = vec![".".to_string()];
    let mut omitted = 0usize;
    walk_tree(&root, "", max_entries, &mut lines, &mut omitted);
    if omitted > 0 {
        lines.push(format!("… ({} more entries)", omitted));
    }
    lines.join("\n")
}

fn walk_tree(
    node: &Node,
    prefix: &str,
    max_entries: usize,
    lines: &mut Vec<String>,
    omitted: &mut usize,
) {
    let total_entries = node.dirs.len() + node.files.len();
    let dirs = node.dirs.iter().map(|(name, child)| (name, Some(child)));
    let files = node.files.iter().map(|name| (name, None));

    for (idx, (name, child)) in dirs.chain(files).enumerate() {
        if lines.len() > max_entries {
            *omitted += 1 + child.map(Node::entry_count).unwrap_or(0);
            continue;
        }

        let is_last = idx == total_entries - 1;
        let connector = if is_last { "└── " } else { "├── " };

        match child {
            Some(child) => {
                lines.push(format!("{}{}{}/", prefix, connector, name));
                let extension = if is_last { "    " } else { "│   " };
                walk_tree(child, &format!("{}{}", prefix, extension), max_entries, lines, omitted);
            }
            None => lines.push(format!("{}{}{}", prefix, connector, name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_tree_dirs_first() {
        let tree = render_tree(&paths(&["README.md", "src/main.rs", "src/util/mod.rs"]), 100);
        insta::assert_snapshot!(tree, @r"
        .
        ├── src/
        │   ├── util/
        │   │   └── mod.rs
        │   └── main.rs
        └── README.md
        ");
    }

    #[test]
    fn test_render_tree_caps_entries() {
        let many: Vec<String> = (0..10).map(|i| format!("f{}.txt", i)).collect();
        let tree = render_tree(&many, 3);
        assert_eq!(tree.lines().count(), 5);
        assert!(tree.ends_with("… (7 more entries)"));
    }

    #[test]
    fn test_render_tree_empty() {
        assert_eq!(render_tree(&[], 10), ".");
    }
}
