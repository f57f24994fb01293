//! Run command: context → generate → recover → apply → verify

use anyhow::Result;
use clap::Args;
use std::path::Path;
use std::time::Duration;

use super::recover::describe_failure;
use super::utils::{load_project, print_cycle, print_recovered, ProjectArgs};
use super::verify::report_outcome;
use crate::config::CliOverrides;
use crate::context::ContextBuilder;
use crate::domain::{ChatMessage, FailurePolicy, Role};
use crate::generate::{build_messages, GenerationRequest, Generator, OpenAiCompatGenerator, RetryingGenerator};
use crate::memory;
use crate::pipeline::{process_response, Decision, ResponseOutcome};
use crate::verify::{GeneratorRepair, VerifyLoop};

#[derive(Args)]
pub struct RunArgs {
    /// What you want changed
    #[arg(value_name = "REQUEST")]
    pub request: String,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Character budget for the context bundle
    #[arg(short, long, value_name = "CHARS")]
    pub budget: Option<usize>,

    /// Model name sent to the generator
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Chat completions endpoint
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Revert everything if any operation fails
    #[arg(long)]
    pub revert_on_failure: bool,

    /// Run the verification loop after applying
    #[arg(long)]
    pub verify: bool,

    /// Verification command (overrides manifest detection)
    #[arg(long, value_name = "CMD", requires = "verify")]
    pub verify_command: Option<String>,

    /// Maximum verification attempts, repairs included
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<usize>,

    /// Start a fresh conversation instead of continuing the saved one
    #[arg(long)]
    pub reset_memory: bool,

    /// Print a unified diff for every changed file
    #[arg(long)]
    pub diff: bool,
}

pub fn run(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let overrides = CliOverrides {
        budget_chars: args.budget,
        model: args.model.clone(),
        endpoint: args.endpoint.clone(),
        on_failure: args.revert_on_failure.then_some(FailurePolicy::Revert),
        verify_command: args.verify_command.clone(),
        max_attempts: args.max_attempts,
        ..CliOverrides::default()
    };
    let (root, config) = load_project(&args.project, config_path, overrides)?;

    let generator = RetryingGenerator::new(
        OpenAiCompatGenerator::from_env(&config.generator)?,
        config.generator.max_retries,
        Duration::from_millis(config.generator.backoff_ms),
    );

    let mut history = memory::load(&root, config.memory_cap);
    if args.reset_memory {
        history.clear();
    }

    let bundle = ContextBuilder::new(&config).build(&root, &args.request, config.budget_chars)?;
    let messages = build_messages(&history.messages(), &args.request, &bundle.text);
    if history.is_empty() {
        if let Some(system) = messages.first().filter(|m| m.role == Role::System) {
            history.push(system.clone());
        }
    }

    tracing::info!("Sending {} chars of context to {}", bundle.char_len(), config.generator.model);
    let raw = generator.generate(&GenerationRequest { messages })?;
    history.push(ChatMessage::new(Role::User, args.request.clone()));
    history.push(ChatMessage::new(Role::Assistant, raw.clone()));

    let applied = match process_response(&root, &raw, &config)? {
        ResponseOutcome::Applied { recovered, cycle } => {
            print_recovered(&recovered);
            print_cycle(&cycle, args.diff);
            for instruction in &recovered.plan.instructions {
                println!("Note: {}", instruction);
            }
            cycle.decision != Decision::Reverted
        }
        ResponseOutcome::Unparsed { artifact } => {
            println!("{}", describe_failure(&artifact));
            false
        }
    };

    let outcome = if args.verify && applied {
        let verify = VerifyLoop::new(&root, &config);
        let mut repair = GeneratorRepair::new(&root, &config, &generator, &mut history);
        Some(verify.run(&mut repair))
    } else {
        None
    };

    if let Err(err) = memory::save(&root, &history) {
        tracing::warn!("{:#}", err);
    }

    match outcome {
        Some(outcome) => report_outcome(outcome),
        None => Ok(()),
    }
}
