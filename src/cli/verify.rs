//! Verify command implementation

use anyhow::Result;
use clap::Args;
use std::path::Path;

use super::utils::{load_project, ProjectArgs};
use crate::config::CliOverrides;
use crate::verify::{NoRepair, VerifyLoop, VerifyOutcome};

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Verification command (overrides manifest detection)
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Kill the command after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

pub fn run(args: VerifyArgs, config_path: Option<&Path>) -> Result<()> {
    let overrides = CliOverrides {
        verify_command: args.command.clone(),
        verify_timeout_secs: args.timeout,
        max_attempts: Some(1),
        ..CliOverrides::default()
    };
    let (root, config) = load_project(&args.project, config_path, overrides)?;

    let verify = VerifyLoop::new(&root, &config);
    if let Some(command) = verify.command() {
        println!("Running: {}", command);
    }
    report_outcome(verify.run(&mut NoRepair))
}

pub(crate) fn report_outcome(outcome: VerifyOutcome) -> Result<()> {
    match outcome {
        VerifyOutcome::Passed { attempts } => {
            println!("Verification passed (attempt {})", attempts);
            Ok(())
        }
        VerifyOutcome::NoCommand => {
            println!("No verification command available; pass --command or set verify_command");
            Ok(())
        }
        VerifyOutcome::Failed { attempts, last_error } => {
            println!("{}", last_error.output());
            anyhow::bail!("Verification failed after {} attempt(s): {}", attempts, last_error)
        }
    }
}
