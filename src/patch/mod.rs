//! Patch engine: applies recovered edit operations to the working tree.
//!
//! Every path is confined to the project root before any I/O. Surgical
//! edits are applied in order against the in-memory content and the file
//! is written once, flushed, after all edits were tried.

pub mod diff;
pub mod matcher;
pub mod path;
pub mod similarity;

use crate::domain::{EditOperation, SearchReplace};
use crate::error::PatchError;
use std::fs;
use std::io::Write;
use std::path::Path;

pub use diff::{summarize, DiffSummary};
pub use matcher::{apply_edit, EditOutcome, MatchConfig, MatchTier};
pub use path::{resolve_in_root, ResolvedPath};

/// Tallies and details for one applied operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Root-relative path of the target.
    pub path: String,
    pub applied: usize,
    pub failed: usize,
    /// Per-edit results for surgical edits, in plan order.
    pub edits: Vec<EditOutcome>,
    pub created: bool,
    /// The file already held the requested content.
    pub unchanged: bool,
    pub diff: Option<DiffSummary>,
}

impl ApplyReport {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            applied: 0,
            failed: 0,
            edits: Vec::new(),
            created: false,
            unchanged: false,
            diff: None,
        }
    }
}

/// Apply one operation under `root`.
///
/// Only a path refusal or an I/O failure is returned as an error; edits
/// that cannot be located are counted in the report instead.
pub fn apply(root: &Path, operation: &EditOperation, config: &MatchConfig) -> Result<ApplyReport, PatchError> {
    let target = resolve_in_root(root, operation.path())?;
    match operation {
        EditOperation::WholeFileWrite { content, .. } => write_whole_file(&target, content),
        EditOperation::SurgicalEdit { edits, .. } => apply_surgical(&target, edits, config),
    }
}

fn write_whole_file(target: &ResolvedPath, content: &str) -> Result<ApplyReport, PatchError> {
    let mut report = ApplyReport::new(&target.relative);
    report.applied = 1;

    if !target.absolute.exists() {
        if let Some(parent) = target.absolute.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        write_flushed(&target.absolute, content)?;
        tracing::info!("Created {}", target.relative);
        report.created = true;
        report.diff = Some(summarize(&target.relative, "", content));
        return Ok(report);
    }

    let existing = fs::read(&target.absolute).map_err(|source| io_error(&target.absolute, source))?;
    if existing == content.as_bytes() {
        tracing::info!("{} already up to date", target.relative);
        report.unchanged = true;
        return Ok(report);
    }

    let old_text = String::from_utf8_lossy(&existing);
    report.diff = Some(summarize(&target.relative, &old_text, content));
    write_flushed(&target.absolute, content)?;
    tracing::info!("Overwrote {}", target.relative);
    Ok(report)
}

fn apply_surgical(
    target: &ResolvedPath,
    edits: &[SearchReplace],
    config: &MatchConfig,
) -> Result<ApplyReport, PatchError> {
    let mut report = ApplyReport::new(&target.relative);

    if !target.absolute.is_file() {
        tracing::warn!("Cannot edit {}: file does not exist", target.relative);
        report.failed = edits.len();
        report.edits = vec![EditOutcome::MissingFile; edits.len()];
        return Ok(report);
    }

    let original =
        fs::read_to_string(&target.absolute).map_err(|source| io_error(&target.absolute, source))?;
    let mut content = original.clone();

    for (idx, edit) in edits.iter().enumerate() {
        let (outcome, updated) = apply_edit(&content, edit, config);
        match (outcome, updated) {
            (EditOutcome::Applied(tier), Some(updated)) => {
                tracing::info!("{}: edit #{} applied ({} match)", target.relative, idx + 1, tier);
                content = updated;
                report.applied += 1;
            }
            (outcome, _) => {
                tracing::warn!("{}: edit #{} not applied ({:?})", target.relative, idx + 1, outcome);
                report.failed += 1;
            }
        }
        report.edits.push(outcome);
    }

    if content != original {
        report.diff = Some(summarize(&target.relative, &original, &content));
        write_flushed(&target.absolute, &content)?;
    } else {
        report.unchanged = true;
    }
    Ok(report)
}

fn write_flushed(path: &Path, content: &str) -> Result<(), PatchError> {
    let mut file = fs::File::create(path).map_err(|source| io_error(path, source))?;
    file.write_all(content.as_bytes()).map_err(|source| io_error(path, source))?;
    file.sync_all().map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> PatchError {
    PatchError::Io { path: path.to_path_buf(), source }
}
