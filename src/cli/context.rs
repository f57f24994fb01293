//! Context command implementation

use anyhow::{Context as _, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use super::utils::{load_project, ProjectArgs};
use crate::config::CliOverrides;
use crate::context::ContextBuilder;

#[derive(Args)]
pub struct ContextArgs {
    /// What you want changed; keywords steer file ranking
    #[arg(value_name = "REQUEST")]
    pub request: String,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Character budget for the bundle
    #[arg(short, long, value_name = "CHARS")]
    pub budget: Option<usize>,

    /// Write the bundle to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: ContextArgs, config_path: Option<&Path>) -> Result<()> {
    let overrides = CliOverrides { budget_chars: args.budget, ..CliOverrides::default() };
    let (root, config) = load_project(&args.project, config_path, overrides)?;

    let bundle = ContextBuilder::new(&config).build(&root, &args.request, config.budget_chars)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bundle.text)
                .with_context(|| format!("Failed to write bundle: {}", path.display()))?;
            println!("Wrote {} chars to {}", bundle.char_len(), path.display());
        }
        None => println!("{}", bundle.text),
    }
    tracing::info!(
        "{} full, {} previews, {} omitted (budget {} chars)",
        bundle.full.len(),
        bundle.previews.len(),
        bundle.omitted.len(),
        config.budget_chars
    );
    Ok(())
}
