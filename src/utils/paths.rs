//! Path normalization

/// Convert a path string to forward-slash form and drop `.` / empty segments.
///
/// `..` segments are kept; callers that resolve against a root decide what
/// to do with them.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::normalize_path;

    #[test]
    fn normalizes_separators_and_dots() {
        assert_eq!(normalize_path("src\\lib.rs"), "src/lib.rs");
        assert_eq!(normalize_path("./src//./main.rs"), "src/main.rs");
        assert_eq!(normalize_path("../a/b"), "../a/b");
    }
}
