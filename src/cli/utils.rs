//! Shared CLI utilities.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::Config;
use crate::patch::{ApplyReport, EditOutcome};
use crate::pipeline::{CycleReport, Decision};
use crate::recover::Recovered;

/// Options every project-facing command accepts.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root
    #[arg(short = 'C', long = "path", value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Exclude paths matching these globs (comma-separated)
    #[arg(short = 'e', long, value_name = "GLOBS")]
    pub exclude_glob: Option<String>,

    /// Skip files larger than this (bytes)
    #[arg(long, value_name = "BYTES")]
    pub max_file_bytes: Option<u64>,

    /// Ignore .gitignore rules
    #[arg(long)]
    pub no_gitignore: bool,
}

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Canonical project root plus the merged configuration for it.
pub fn load_project(
    project: &ProjectArgs,
    config_path: Option<&Path>,
    mut overrides: CliOverrides,
) -> Result<(PathBuf, Config)> {
    let root = project
        .path
        .canonicalize()
        .with_context(|| format!("Project path does not exist: {}", project.path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let file_config = load_config(&root, config_path)?;
    overrides.exclude_globs = parse_csv(&project.exclude_glob);
    overrides.max_file_bytes = overrides.max_file_bytes.or(project.max_file_bytes);
    if project.no_gitignore {
        overrides.respect_gitignore = Some(false);
    }
    Ok((root, merge_cli_with_config(file_config, overrides)))
}

/// Read response text from a file, or stdin when `path` is `None` or `-`.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read input file: {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

pub fn print_recovered(recovered: &Recovered) {
    println!("Recovered plan ({} stage)", recovered.stage);
    for step in &recovered.plan.plan {
        println!("  - {}", step);
    }
    for warning in &recovered.warnings {
        tracing::warn!("{}", warning);
    }
}

pub fn print_cycle(cycle: &CycleReport, show_diff: bool) {
    for report in &cycle.reports {
        println!("  {}", describe(report));
        if show_diff {
            if let Some(diff) = &report.diff {
                print!("{}", diff.unified);
            }
        }
    }
    for rejected in &cycle.rejected {
        let label = if rejected.security { "refused" } else { "error" };
        println!("  {} {}: {}", label, rejected.path, rejected.reason);
    }

    let decision = match cycle.decision {
        Decision::Accepted => "changes kept",
        Decision::Reverted => "changes reverted",
        Decision::Unprotected => "changes kept (no git checkpoint; rollback unavailable)",
        Decision::NothingToApply => "no file operations in plan",
    };
    println!("Applied {}, failed {}: {}", cycle.applied(), cycle.failed(), decision);
}

fn describe(report: &ApplyReport) -> String {
    if report.created {
        return format!("created {}", report.path);
    }
    if report.edits.is_empty() {
        return if report.unchanged {
            format!("unchanged {}", report.path)
        } else {
            format!("wrote {}", report.path)
        };
    }
    let details: Vec<String> = report
        .edits
        .iter()
        .map(|outcome| match outcome {
            EditOutcome::Applied(tier) => tier.to_string(),
            EditOutcome::NotFound => "not found".to_string(),
            EditOutcome::AlreadyApplied => "already applied".to_string(),
            EditOutcome::MissingFile => "missing file".to_string(),
        })
        .collect();
    format!("edited {} ({}/{} edits: {})", report.path, report.applied, report.edits.len(), details.join(", "))
}
