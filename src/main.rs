//! mend: apply LLM-generated edit plans to a local project
//!
//! Recovers a structured plan from free-form model output, patches files
//! with tiered matching under a git checkpoint, and can loop on the
//! project's build until it passes.

use anyhow::Result;

fn main() -> Result<()> {
    mend::cli::run()
}
