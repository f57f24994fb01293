//! Command-line interface for mend
//!
//! `context` and `recover` are read-only; `apply` and `run` change files
//! under a git checkpoint; `verify` runs the project's check command.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod apply;
mod context;
mod recover;
mod run;
mod utils;
mod verify;

/// Apply LLM edit plans to a project, safely
#[derive(Parser)]
#[command(name = "mend")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to mend.toml / .mend.toml / mend.yml in the project)
    #[arg(long, global = true, value_name = "FILE", env = "MEND_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the context bundle that would be sent for a request
    Context(context::ContextArgs),

    /// Recover an edit plan from raw response text and print it as JSON
    Recover(recover::RecoverArgs),

    /// Recover a plan from response text and apply it under a checkpoint
    Apply(Box<apply::ApplyArgs>),

    /// Run the project's verification command
    Verify(verify::VerifyArgs),

    /// Ask the generator for changes, apply them and optionally verify
    Run(Box<run::RunArgs>),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Context(args) => context::run(args, config_path),
        Commands::Recover(args) => recover::run(args),
        Commands::Apply(args) => apply::run(*args, config_path),
        Commands::Verify(args) => verify::run(args, config_path),
        Commands::Run(args) => run::run(*args, config_path),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "mend", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
