//! One edit cycle: checkpoint, apply every operation, then keep or revert.

use crate::checkpoint::{Checkpoint, CheckpointKind};
use crate::domain::{Config, EditPlan, FailurePolicy};
use crate::patch::{self, ApplyReport, MatchConfig};
use crate::recover::{self, persist_unparsed, Recovered};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// An operation the patch engine refused or could not perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOperation {
    pub path: String,
    pub reason: String,
    /// Refused by the path-safety check.
    pub security: bool,
}

/// What happened to the working tree after the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Reverted,
    /// No repository; changes stay and cannot be rolled back.
    Unprotected,
    /// The plan had no file operations.
    NothingToApply,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub reports: Vec<ApplyReport>,
    pub rejected: Vec<RejectedOperation>,
    pub checkpoint: Option<CheckpointKind>,
    pub decision: Decision,
}

impl CycleReport {
    pub fn applied(&self) -> usize {
        self.reports.iter().map(|r| r.applied).sum()
    }

    /// Failed edits plus refused operations.
    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum::<usize>() + self.rejected.len()
    }
}

pub struct EditCycle<'a> {
    root: &'a Path,
    match_config: MatchConfig,
    policy: FailurePolicy,
}

impl<'a> EditCycle<'a> {
    pub fn new(root: &'a Path, config: &Config) -> Self {
        Self { root, match_config: MatchConfig::from(config), policy: config.on_failure }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply all file operations of `plan` under one checkpoint.
    ///
    /// A refused or failed operation never stops the batch. The checkpoint
    /// is resolved before this returns, so no write happens after the decision.
    pub fn run(&self, plan: &EditPlan) -> Result<CycleReport> {
        if plan.files.is_empty() {
            return Ok(CycleReport {
                reports: Vec::new(),
                rejected: Vec::new(),
                checkpoint: None,
                decision: Decision::NothingToApply,
            });
        }

        let mut checkpoint = Checkpoint::open(self.root).context("Failed to open checkpoint")?;
        let mut reports = Vec::with_capacity(plan.files.len());
        let mut rejected = Vec::new();

        for operation in &plan.files {
            match patch::apply(self.root, operation, &self.match_config) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    if err.is_security_rejection() {
                        tracing::error!("{}", err);
                    } else {
                        tracing::warn!("{}", err);
                    }
                    rejected.push(RejectedOperation {
                        path: operation.path().to_string(),
                        reason: err.to_string(),
                        security: err.is_security_rejection(),
                    });
                }
            }
        }

        let mut report = CycleReport {
            reports,
            rejected,
            checkpoint: Some(checkpoint.kind()),
            decision: Decision::Accepted,
        };

        let should_revert =
            self.policy == FailurePolicy::Revert && (report.failed() > 0 || report.applied() == 0);

        report.decision = if !checkpoint.is_protected() {
            tracing::warn!("Changes applied without a checkpoint; they cannot be rolled back");
            Decision::Unprotected
        } else if should_revert {
            checkpoint.revert().context("Failed to revert working tree")?;
            Decision::Reverted
        } else {
            checkpoint.accept().context("Failed to release checkpoint")?;
            Decision::Accepted
        };

        tracing::info!(
            "Edit cycle: {} applied, {} failed, {:?}",
            report.applied(),
            report.failed(),
            report.decision
        );
        Ok(report)
    }
}

/// Result of turning one generator response into file changes.
#[derive(Debug)]
pub enum ResponseOutcome {
    Applied { recovered: Recovered, cycle: CycleReport },
    /// No plan could be recovered; the raw text was saved here.
    Unparsed { artifact: PathBuf },
}

/// Recover a plan from `raw` and run it through an [`EditCycle`].
pub fn process_response(root: &Path, raw: &str, config: &Config) -> Result<ResponseOutcome> {
    match recover::recover(raw) {
        Ok(recovered) => {
            let cycle = EditCycle::new(root, config).run(&recovered.plan)?;
            Ok(ResponseOutcome::Applied { recovered, cycle })
        }
        Err(failure) => {
            let artifact = persist_unparsed(root, &failure.raw)?;
            tracing::warn!("{}; raw text saved to {}", failure, artifact.display());
            Ok(ResponseOutcome::Unparsed { artifact })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EditOperation, SearchReplace, UNPARSED_ARTIFACT_NAME};
    use git2::{Repository, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn repo_with_file(name: &str, content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[]).unwrap();
        dir
    }

    fn plan(files: Vec<EditOperation>) -> EditPlan {
        EditPlan { files, ..EditPlan::default() }
    }

    #[test]
    fn test_revert_policy_rolls_back_partial_batch() {
        let dir = repo_with_file("app.js", "let a = 1;\n");
        let plan = plan(vec![
            EditOperation::WholeFileWrite { path: "new.js".into(), content: "x".into() },
            EditOperation::SurgicalEdit {
                path: "app.js".into(),
                edits: vec![SearchReplace { search: "no such text anywhere".into(), replace: "y".into() }],
            },
        ]);

        let report = EditCycle::new(dir.path(), &Config::default())
            .with_policy(FailurePolicy::Revert)
            .run(&plan)
            .unwrap();
        assert_eq!(report.decision, Decision::Reverted);
        assert!(!dir.path().join("new.js").exists());
        assert_eq!(fs::read_to_string(dir.path().join("app.js")).unwrap(), "let a = 1;\n");
    }

    #[test]
    fn test_keep_policy_accepts_partial_batch() {
        let dir = repo_with_file("app.js", "let a = 1;\n");
        let plan = plan(vec![
            EditOperation::WholeFileWrite { path: "../../../notes.txt".into(), content: "x".into() },
            EditOperation::SurgicalEdit {
                path: "app.js".into(),
                edits: vec![SearchReplace { search: "a = 1".into(), replace: "a = 2".into() }],
            },
        ]);

        let report = EditCycle::new(dir.path(), &Config::default()).run(&plan).unwrap();
        assert_eq!(report.decision, Decision::Accepted);
        assert_eq!(report.applied(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("app.js")).unwrap(), "let a = 2;\n");
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_no_repo_is_unprotected() {
        let dir = TempDir::new().unwrap();
        let plan = plan(vec![EditOperation::WholeFileWrite { path: "a.txt".into(), content: "a".into() }]);
        let report = EditCycle::new(dir.path(), &Config::default()).run(&plan).unwrap();
        assert_eq!(report.decision, Decision::Unprotected);
        assert_eq!(report.checkpoint, Some(CheckpointKind::NoRepo));
    }

    #[test]
    fn test_unparseable_response_is_persisted() {
        let dir = TempDir::new().unwrap();
        let outcome = process_response(dir.path(), "no json here", &Config::default()).unwrap();
        match outcome {
            ResponseOutcome::Unparsed { artifact } => {
                assert_eq!(artifact, dir.path().join(UNPARSED_ARTIFACT_NAME));
                assert_eq!(fs::read_to_string(artifact).unwrap(), "no json here");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
