//! Confinement of edit paths to the project root.

use crate::error::PatchError;
use crate::utils::normalize_path;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A path that has been checked to live under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Root-relative, forward-slash form used in reports.
    pub relative: String,
    pub absolute: PathBuf,
}

/// Resolve `raw` against `root`, refusing anything that lands outside it.
///
/// Leading `..` segments are dropped, remaining `..` segments are resolved
/// lexically, absolute paths are accepted only when they already point
/// under `root`, and every symlink between `root` and the target must
/// resolve inside the tree. Dangling links are refused. Nothing is written.
pub fn resolve_in_root(root: &Path, raw: &str) -> Result<ResolvedPath, PatchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PatchError::EmptyPath);
    }
    let escape = || PatchError::PathEscapeAttempt { path: trimmed.to_string() };

    let relative_input = if is_absolute_like(trimmed) {
        strip_root_prefix(root, Path::new(trimmed)).ok_or_else(escape)?
    } else {
        trimmed.to_string()
    };

    let normalized = normalize_path(&relative_input);
    let segments: Vec<&str> = normalized
        .split('/')
        .skip_while(|segment| *segment == "..")
        .collect();

    let mut stack: Vec<&str> = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop().ok_or_else(escape)?;
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        return Err(PatchError::EmptyPath);
    }

    let relative = stack.join("/");
    let absolute = stack.iter().fold(root.to_path_buf(), |acc, seg| acc.join(seg));
    ensure_no_symlink_escape(root, &absolute).map_err(|err| match err {
        PatchError::PathEscapeAttempt { .. } => escape(),
        other => other,
    })?;

    Ok(ResolvedPath { relative, absolute })
}

fn is_absolute_like(path: &str) -> bool {
    if Path::new(path).is_absolute() || path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    // Windows drive prefix such as `C:`.
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn strip_root_prefix(root: &Path, path: &Path) -> Option<String> {
    let stripped = path.strip_prefix(root).ok().map(Path::to_path_buf).or_else(|| {
        let canonical = root.canonicalize().ok()?;
        path.strip_prefix(canonical).ok().map(Path::to_path_buf)
    })?;
    let parts: Vec<String> = stripped
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

fn ensure_no_symlink_escape(root: &Path, target: &Path) -> Result<(), PatchError> {
    let canonical_root = root.canonicalize().map_err(|source| PatchError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let escape = |path: &Path| PatchError::PathEscapeAttempt { path: path.display().to_string() };

    // `symlink_metadata` does not follow links, so a dangling link is still seen.
    for path in target.ancestors().take_while(|path| *path != root) {
        let Ok(metadata) = fs::symlink_metadata(path) else {
            continue;
        };
        if !metadata.file_type().is_symlink() {
            continue;
        }
        match path.canonicalize() {
            Ok(destination) if destination.starts_with(&canonical_root) => {}
            Ok(destination) => {
                tracing::debug!("{} links to {}", path.display(), destination.display());
                return Err(escape(target));
            }
            Err(_) => {
                tracing::debug!("{} is a dangling link", path.display());
                return Err(escape(target));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_relative_path() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_in_root(dir.path(), "./src\\lib.rs").unwrap();
        assert_eq!(resolved.relative, "src/lib.rs");
        assert_eq!(resolved.absolute, dir.path().join("src").join("lib.rs"));
    }

    #[test]
    fn test_leading_parent_segments_are_stripped() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_in_root(dir.path(), "../../notes.txt").unwrap();
        assert_eq!(resolved.relative, "notes.txt");
    }

    #[test]
    fn test_inner_traversal_past_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = resolve_in_root(dir.path(), "src/../../outside.txt").unwrap_err();
        assert!(err.is_security_rejection());
        assert!(!dir.path().parent().unwrap().join("outside.txt").exists());
    }

    #[test]
    fn test_inner_traversal_within_root_is_fine() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_in_root(dir.path(), "src/../docs/a.md").unwrap();
        assert_eq!(resolved.relative, "docs/a.md");
    }

    #[test]
    fn test_absolute_paths() {
        let dir = TempDir::new().unwrap();
        let inside = dir.path().join("a.txt");
        let resolved = resolve_in_root(dir.path(), &inside.display().to_string()).unwrap();
        assert_eq!(resolved.relative, "a.txt");

        let err = resolve_in_root(dir.path(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, PatchError::PathEscapeAttempt { .. }));
    }

    #[test]
    fn test_empty_paths() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(resolve_in_root(dir.path(), "  "), Err(PatchError::EmptyPath)));
        assert!(matches!(resolve_in_root(dir.path(), "./."), Err(PatchError::EmptyPath)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_cannot_escape() {
        let outside = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        let err = resolve_in_root(dir.path(), "link/evil.txt").unwrap_err();
        assert!(err.is_security_rejection());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_is_refused() {
        let outside = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("pwned.txt"), dir.path().join("link.txt")).unwrap();
        let err = resolve_in_root(dir.path(), "link.txt").unwrap_err();
        assert!(err.is_security_rejection());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_inside_root_is_allowed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();
        let resolved = resolve_in_root(dir.path(), "alias/a.txt").unwrap();
        assert_eq!(resolved.relative, "alias/a.txt");
    }
}
