//! Recovery of an edit plan from free-form generator output.
//!
//! Stages run in a fixed order and the first one that yields a plan wins:
//!
//! 1. the whole text parsed as JSON
//! 2. the contents of fenced code blocks
//! 3. the whole text after quote and trailing-comma normalization
//! 4. the slice between the first `{` and the last `}`
//! 5. regex salvage of `path`/`content` pairs from truncated output

pub mod normalize;
pub mod plan;
pub mod salvage;

use crate::domain::{EditOperation, EditPlan, UNPARSED_ARTIFACT_NAME};
use crate::error::ParseFailure;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

pub use normalize::{bracket_slice, fenced_block_candidates, normalize_json_text};
pub use plan::{plan_from_value, StagePlan};
pub use salvage::{salvage_files, unescape_json_fragment, SalvagedFile};

/// Which stage produced the recovered plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStage {
    Direct,
    FencedBlock,
    Normalized,
    BracketSlice,
    Salvage,
}

impl fmt::Display for RecoveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryStage::Direct => "direct",
            RecoveryStage::FencedBlock => "fenced-block",
            RecoveryStage::Normalized => "normalized",
            RecoveryStage::BracketSlice => "bracket-slice",
            RecoveryStage::Salvage => "salvage",
        };
        f.write_str(name)
    }
}

/// Result of a single stage.
#[derive(Debug)]
pub enum StageOutcome {
    Success(StagePlan),
    /// Nothing usable; try the next stage.
    Continue,
    /// Stop the cascade.
    Failure,
}

type StageFn = fn(&str) -> StageOutcome;

const STAGES: &[(RecoveryStage, StageFn)] = &[
    (RecoveryStage::Direct, parse_direct),
    (RecoveryStage::FencedBlock, parse_fenced_blocks),
    (RecoveryStage::Normalized, parse_normalized),
    (RecoveryStage::BracketSlice, parse_bracket_slice),
    (RecoveryStage::Salvage, parse_salvage),
];

/// A plan together with the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub plan: EditPlan,
    pub stage: RecoveryStage,
    pub warnings: Vec<String>,
}

/// Run the recovery cascade over `raw`.
///
/// On failure the untouched input is returned inside the error.
pub fn recover(raw: &str) -> Result<Recovered, ParseFailure> {
    if raw.trim().is_empty() {
        return Err(ParseFailure { raw: raw.to_string() });
    }

    for (stage, run) in STAGES {
        match run(raw) {
            StageOutcome::Success(StagePlan { plan, warnings }) => {
                tracing::debug!(
                    "Recovered plan via {} stage ({} file operations)",
                    stage,
                    plan.files.len()
                );
                for warning in &warnings {
                    tracing::warn!("{}", warning);
                }
                return Ok(Recovered { plan, stage: *stage, warnings });
            }
            StageOutcome::Continue => tracing::debug!("Stage {} found nothing", stage),
            StageOutcome::Failure => break,
        }
    }

    Err(ParseFailure { raw: raw.to_string() })
}

/// Write raw unparseable output next to the project for later inspection.
pub fn persist_unparsed(root: &Path, raw: &str) -> Result<PathBuf> {
    let path = root.join(UNPARSED_ARTIFACT_NAME);
    std::fs::write(&path, raw)
        .with_context(|| format!("Failed to write response artifact: {}", path.display()))?;
    Ok(path)
}

fn try_json(text: &str) -> Option<StagePlan> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    plan_from_value(&value)
}

fn parse_direct(raw: &str) -> StageOutcome {
    try_json(raw).map_or(StageOutcome::Continue, StageOutcome::Success)
}

fn parse_fenced_blocks(raw: &str) -> StageOutcome {
    for block in fenced_block_candidates(raw) {
        if let Some(found) = try_json(block).or_else(|| try_json(&normalize_json_text(block))) {
            return StageOutcome::Success(found);
        }
    }
    StageOutcome::Continue
}

fn parse_normalized(raw: &str) -> StageOutcome {
    try_json(&normalize_json_text(raw)).map_or(StageOutcome::Continue, StageOutcome::Success)
}

fn parse_bracket_slice(raw: &str) -> StageOutcome {
    let from_raw = bracket_slice(raw).and_then(try_json);
    let found = from_raw.or_else(|| {
        let normalized = normalize_json_text(raw);
        bracket_slice(&normalized).and_then(try_json)
    });
    found.map_or(StageOutcome::Continue, StageOutcome::Success)
}

fn parse_salvage(raw: &str) -> StageOutcome {
    let salvaged = salvage_files(raw);
    if salvaged.is_empty() {
        return StageOutcome::Failure;
    }

    let mut warnings = vec![format!(
        "Response was not valid JSON; salvaged {} file(s) from raw text",
        salvaged.len()
    )];
    let mut files = Vec::with_capacity(salvaged.len());
    for file in salvaged {
        if !file.complete {
            warnings.push(format!("{}: content was cut off and may be incomplete", file.path));
        }
        files.push(EditOperation::WholeFileWrite { path: file.path, content: file.content });
    }

    StageOutcome::Success(StagePlan {
        plan: EditPlan { files, ..EditPlan::default() },
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchReplace;
    use tempfile::TempDir;

    fn sample_plan() -> EditPlan {
        EditPlan {
            plan: vec!["Add greeting".to_string()],
            files: vec![
                EditOperation::WholeFileWrite {
                    path: "hello.txt".to_string(),
                    content: "hi \"there\"\n".to_string(),
                },
                EditOperation::SurgicalEdit {
                    path: "src/main.rs".to_string(),
                    edits: vec![SearchReplace {
                        search: "old()".to_string(),
                        replace: "new()".to_string(),
                    }],
                },
            ],
            instructions: vec!["Run cargo test".to_string()],
        }
    }

    #[test]
    fn test_well_formed_plan_recovers_directly() {
        let plan = sample_plan();
        let raw = serde_json::to_string_pretty(&plan).unwrap();
        let recovered = recover(&raw).unwrap();
        assert_eq!(recovered.stage, RecoveryStage::Direct);
        assert_eq!(recovered.plan, plan);
        assert!(recovered.warnings.is_empty());
    }

    #[test]
    fn test_fenced_block_with_prose() {
        let raw = "Sure! Here's the change:\n```json\n{\"files\": [{\"path\": \"a.txt\", \"content\": \"x\"}]}\n```\nLet me know.";
        let recovered = recover(raw).unwrap();
        assert_eq!(recovered.stage, RecoveryStage::FencedBlock);
        assert_eq!(recovered.plan.files.len(), 1);
    }

    #[test]
    fn test_trailing_commas_and_smart_quotes() {
        let raw = "{\u{201C}files\u{201D}: [{\"path\": \"a.txt\", \"content\": \"x\",},],}";
        let recovered = recover(raw).unwrap();
        assert_eq!(recovered.stage, RecoveryStage::Normalized);
        assert_eq!(recovered.plan.files[0].path(), "a.txt");
    }

    #[test]
    fn test_bracket_slice_from_surrounding_prose() {
        let raw = "The plan is {\"plan\": [\"one\"], \"files\": []} and that's all.";
        let recovered = recover(raw).unwrap();
        assert_eq!(recovered.stage, RecoveryStage::BracketSlice);
        assert_eq!(recovered.plan.plan, vec!["one"]);
    }

    #[test]
    fn test_truncated_output_salvaged_with_warning() {
        let raw = r#"{"plan": ["x"], "files": [{"path": "a.txt", "content": "done"}, {"path": "b.txt", "content": "half writ"#;
        let recovered = recover(raw).unwrap();
        assert_eq!(recovered.stage, RecoveryStage::Salvage);
        assert_eq!(recovered.plan.files.len(), 2);
        assert!(recovered.warnings.iter().any(|w| w.contains("b.txt") && w.contains("cut off")));
    }

    #[test]
    fn test_failure_keeps_raw_text() {
        let raw = "I could not produce any changes, sorry.";
        let err = recover(raw).unwrap_err();
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_blank_input_fails() {
        assert!(recover("").is_err());
        assert!(recover("  \n\t ").is_err());
    }

    #[test]
    fn test_persist_unparsed_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let path = persist_unparsed(dir.path(), "garbage").unwrap();
        assert_eq!(path, dir.path().join(UNPARSED_ARTIFACT_NAME));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "garbage");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RecoveryStage::FencedBlock.to_string(), "fenced-block");
        assert_eq!(RecoveryStage::Salvage.to_string(), "salvage");
    }
}
