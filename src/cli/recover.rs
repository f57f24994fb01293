//! Recover command implementation

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use super::utils::{print_recovered, read_input};
use crate::recover::{persist_unparsed, recover};

#[derive(Args)]
pub struct RecoverArgs {
    /// Response text to parse (`-` or omitted reads stdin)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Save unparseable input into this directory
    #[arg(long, value_name = "DIR")]
    pub save_to: Option<PathBuf>,
}

pub fn run(args: RecoverArgs) -> Result<()> {
    let raw = read_input(args.input.as_deref())?;
    match recover(&raw) {
        Ok(recovered) => {
            print_recovered(&recovered);
            println!("{}", serde_json::to_string_pretty(&recovered.plan)?);
            Ok(())
        }
        Err(failure) => {
            if let Some(dir) = args.save_to.as_deref() {
                let artifact = persist_unparsed(dir, &failure.raw)?;
                tracing::info!("Raw response saved to {}", artifact.display());
            }
            Err(failure.into())
        }
    }
}

/// Used by `apply` when the input is already in hand.
pub(crate) fn describe_failure(artifact: &Path) -> String {
    format!(
        "No edit plan could be recovered. The raw response was saved to {} for inspection.",
        artifact.display()
    )
}
