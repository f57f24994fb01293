//! Build-verify loop: run the verification command and, on failure, hand
//! the captured output to a repair step before trying again.

pub mod repair;
pub mod resolve;
pub mod runner;

use crate::domain::Config;
use crate::error::BuildFailure;
use anyhow::Result;
use std::path::Path;
use std::time::Duration;

pub use repair::GeneratorRepair;
pub use resolve::resolve_verify_command;
pub use runner::{run_command_with_timeout, run_verification, shell_command, CommandRunResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Passed { attempts: usize },
    Failed { attempts: usize, last_error: BuildFailure },
    /// No override and no recognizable manifest.
    NoCommand,
}

/// Something that tries to fix the tree after a failed verification.
pub trait RepairStep {
    /// Returns `Ok(true)` when changes were applied and another run is worthwhile.
    fn repair(&mut self, failure: &BuildFailure, attempt: usize) -> Result<bool>;
}

/// Never repairs; used for plain verification.
pub struct NoRepair;

impl RepairStep for NoRepair {
    fn repair(&mut self, _failure: &BuildFailure, _attempt: usize) -> Result<bool> {
        Ok(false)
    }
}

pub struct VerifyLoop<'a> {
    root: &'a Path,
    command: Option<String>,
    max_attempts: usize,
    timeout: Duration,
    output_limit: usize,
}

impl<'a> VerifyLoop<'a> {
    /// Resolve the command from `config.verify_command` or the project manifests.
    pub fn new(root: &'a Path, config: &Config) -> Self {
        Self {
            root,
            command: resolve_verify_command(root, config.verify_command.as_deref()),
            max_attempts: config.max_attempts.max(1),
            timeout: Duration::from_secs(config.verify_timeout_secs),
            output_limit: config.verify_output_limit,
        }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn run(&self, repair: &mut dyn RepairStep) -> VerifyOutcome {
        let Some(command) = self.command.as_deref() else {
            tracing::warn!("No verification command found; set verify_command or pass --command");
            return VerifyOutcome::NoCommand;
        };

        let mut attempt = 1;
        loop {
            let failure = match run_verification(self.root, command, self.timeout, self.output_limit) {
                Ok(()) => {
                    tracing::info!("Verification passed on attempt {}", attempt);
                    return VerifyOutcome::Passed { attempts: attempt };
                }
                Err(failure) => failure,
            };
            tracing::warn!("Attempt {}/{}: {}", attempt, self.max_attempts, failure);

            if attempt >= self.max_attempts {
                return VerifyOutcome::Failed { attempts: attempt, last_error: failure };
            }
            match repair.repair(&failure, attempt) {
                Ok(true) => attempt += 1,
                Ok(false) => {
                    tracing::warn!("No usable repair produced; stopping");
                    return VerifyOutcome::Failed { attempts: attempt, last_error: failure };
                }
                Err(err) => {
                    tracing::warn!("Repair failed: {:#}", err);
                    return VerifyOutcome::Failed { attempts: attempt, last_error: failure };
                }
            }
        }
    }
}
