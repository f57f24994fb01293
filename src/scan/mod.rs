//! Project scanning with gitignore support

use crate::domain::Config;
use anyhow::Result;
use std::path::Path;

pub mod scanner;
pub mod tree;

pub use scanner::{ProjectScanner, ScanResult, ScanStats};
pub use tree::render_tree;

/// Scan `root` with the limits from `config`.
pub fn scan_project(root: &Path, config: &Config) -> Result<ScanResult> {
    ProjectScanner::new(root.to_path_buf())
        .max_file_bytes(config.max_file_bytes)
        .respect_gitignore(config.respect_gitignore)
        .exclude_globs(config.exclude_globs.clone())
        .scan()
}
