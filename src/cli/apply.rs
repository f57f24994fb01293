//! Apply command implementation

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use super::recover::describe_failure;
use super::utils::{load_project, print_cycle, print_recovered, read_input, ProjectArgs};
use crate::config::CliOverrides;
use crate::domain::FailurePolicy;
use crate::pipeline::{process_response, ResponseOutcome};

#[derive(Args)]
pub struct ApplyArgs {
    /// Response text containing an edit plan (`-` or omitted reads stdin)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// What to do when an operation fails
    #[arg(long, value_name = "POLICY", value_parser = ["keep", "revert"])]
    pub on_failure: Option<String>,

    /// Minimum similarity for fuzzy matches (0.0-1.0)
    #[arg(long, value_name = "RATIO")]
    pub similarity: Option<f64>,

    /// Print a unified diff for every changed file
    #[arg(long)]
    pub diff: bool,
}

pub fn run(args: ApplyArgs, config_path: Option<&Path>) -> Result<()> {
    let on_failure = args.on_failure.as_deref().map(str::parse::<FailurePolicy>).transpose().map_err(anyhow::Error::msg)?;
    let overrides = CliOverrides {
        on_failure,
        similarity_threshold: args.similarity,
        ..CliOverrides::default()
    };
    let (root, config) = load_project(&args.project, config_path, overrides)?;
    let raw = read_input(args.input.as_deref())?;

    match process_response(&root, &raw, &config)? {
        ResponseOutcome::Applied { recovered, cycle } => {
            print_recovered(&recovered);
            print_cycle(&cycle, args.diff);
            for instruction in &recovered.plan.instructions {
                println!("Note: {}", instruction);
            }
        }
        ResponseOutcome::Unparsed { artifact } => println!("{}", describe_failure(&artifact)),
    }
    Ok(())
}
