//! Project enumeration with gitignore support, infrastructure skips and binary detection

use crate::domain::{ProjectFile, MEMORY_FILE_NAME, UNPARSED_ARTIFACT_NAME};
use crate::utils::{is_binary_file, normalize_path, read_file_safe};
use anyhow::Result;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Bytes sampled from the head of each file for binary detection.
pub const BINARY_SAMPLE_SIZE: usize = 8192;

/// Control-character share above which a file is treated as binary.
pub const CONTROL_CHAR_THRESHOLD: f64 = 0.10;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    "dist",
    ".next",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".idea",
    ".cache",
];

/// Infrastructure files that are neither listed nor read.
const SKIPPED_FILES: &[&str] = &[
    MEMORY_FILE_NAME,
    UNPARSED_ARTIFACT_NAME,
    ".DS_Store",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "poetry.lock",
    "composer.lock",
    "go.sum",
];

/// Extensions whose content is never read. Files are still listed in the tree.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "psd", "pdf", "zip", "gz", "tgz",
    "tar", "bz2", "xz", "7z", "rar", "jar", "war", "class", "exe", "dll", "so", "dylib", "o", "a",
    "lib", "bin", "wasm", "pyc", "pyo", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "wav",
    "ogg", "flac", "avi", "mov", "mkv", "webm", "sqlite", "sqlite3", "db", "dat",
];

/// Counters gathered during one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_seen: usize,
    pub files_included: usize,
    pub skipped_binary_extension: usize,
    pub skipped_binary_content: usize,
    pub skipped_size: usize,
    pub skipped_glob: usize,
    pub unreadable_entries: usize,
}

/// Output of a scan: readable text files plus every listable path.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Text files whose content may be bundled, in path order.
    pub files: Vec<ProjectFile>,
    /// Every non-infrastructure path, including binary and oversize files.
    pub listed: Vec<String>,
    pub stats: ScanStats,
}

/// File scanner that snapshots a project tree.
pub struct ProjectScanner {
    root_path: PathBuf,
    exclude_globs: Vec<String>,
    max_file_bytes: u64,
    respect_gitignore: bool,
}

impl ProjectScanner {
    /// Create a new scanner with default settings.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            exclude_globs: Vec::new(),
            max_file_bytes: 512_000,
            respect_gitignore: true,
        }
    }

    /// Set glob patterns to exclude
    pub fn exclude_globs(mut self, globs: Vec<String>) -> Self {
        self.exclude_globs = globs;
        self
    }

    /// Set maximum file size in bytes
    pub fn max_file_bytes(mut self, max_bytes: u64) -> Self {
        self.max_file_bytes = max_bytes;
        self
    }

    /// Set whether to respect gitignore files
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    fn build_exclude_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_globs {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Ignoring invalid exclude glob '{}': {}", pattern, e),
            }
        }
        Ok(builder.build()?)
    }

    /// Walk the tree and snapshot every eligible file.
    ///
    /// Unreadable directories are logged and skipped; a partial scan is
    /// preferred over aborting.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut stats = ScanStats::default();
        let exclude_globset = self.build_exclude_globset()?;

        let dir_filter = |entry: &ignore::DirEntry| -> bool {
            let Some(name) = entry.file_name().to_str() else {
                return true;
            };
            match entry.file_type() {
                Some(file_type) if file_type.is_dir() => {
                    entry.depth() == 0 || !SKIPPED_DIRS.contains(&name)
                }
                _ => !SKIPPED_FILES.contains(&name),
            }
        };

        let mut builder = WalkBuilder::new(&self.root_path);
        builder
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .hidden(false)
            .parents(self.respect_gitignore)
            .follow_links(false)
            .filter_entry(dir_filter);

        let mut listed: Vec<String> = Vec::new();
        let mut candidates: Vec<(PathBuf, String, u64, DateTime<Utc>)> = Vec::new();

        for entry_result in builder.build() {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry while scanning: {}", e);
                    stats.unreadable_entries += 1;
                    continue;
                }
            };

            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            let rel_path = match path.strip_prefix(&self.root_path) {
                Ok(p) => normalize_path(&p.to_string_lossy()),
                Err(_) => continue,
            };
            stats.files_seen += 1;

            if exclude_globset.is_match(&rel_path) {
                stats.skipped_glob += 1;
                continue;
            }

            listed.push(rel_path.clone());

            if has_binary_extension(path) {
                stats.skipped_binary_extension += 1;
                continue;
            }

            let metadata = match path.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", rel_path, e);
                    stats.unreadable_entries += 1;
                    continue;
                }
            };

            if metadata.len() > self.max_file_bytes {
                stats.skipped_size += 1;
                continue;
            }

            if is_binary_file(path, BINARY_SAMPLE_SIZE, CONTROL_CHAR_THRESHOLD) {
                stats.skipped_binary_content += 1;
                continue;
            }

            let modified: DateTime<Utc> =
                metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH).into();
            candidates.push((path.to_path_buf(), rel_path, metadata.len(), modified));
        }

        listed.sort();
        candidates.sort_by(|a, b| a.1.cmp(&b.1));

        let files: Vec<ProjectFile> = candidates
            .into_par_iter()
            .filter_map(|(absolute, path, byte_size, modified_at)| {
                match read_file_safe(&absolute) {
                    Ok(content) => Some(ProjectFile {
                        line_count: content.lines().count(),
                        path,
                        absolute,
                        content,
                        byte_size,
                        modified_at,
                    }),
                    Err(e) => {
                        tracing::warn!("Skipping {}: {:#}", path, e);
                        None
                    }
                }
            })
            .collect();

        stats.files_included = files.len();
        tracing::debug!(
            "Scanned {} files: {} included, {} listed",
            stats.files_seen,
            stats.files_included,
            listed.len()
        );

        Ok(ScanResult { files, listed, stats })
    }
}

fn has_binary_extension(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    !ext.is_empty() && BINARY_EXTENSIONS.contains(&ext.as_str())
}
