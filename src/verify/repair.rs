//! Automated repair: failure output → context → generator → edit cycle.

use super::RepairStep;
use crate::context::ContextBuilder;
use crate::domain::{ChatMessage, Config, Role};
use crate::error::BuildFailure;
use crate::generate::{build_messages, GenerationRequest, Generator};
use crate::memory::BoundedHistory;
use crate::pipeline::{process_response, Decision, ResponseOutcome};
use anyhow::Result;
use std::path::Path;

pub struct GeneratorRepair<'a, G> {
    root: &'a Path,
    config: &'a Config,
    generator: G,
    history: &'a mut BoundedHistory,
}

impl<'a, G: Generator> GeneratorRepair<'a, G> {
    pub fn new(root: &'a Path, config: &'a Config, generator: G, history: &'a mut BoundedHistory) -> Self {
        Self { root, config, generator, history }
    }
}

fn repair_request(failure: &BuildFailure, attempt: usize) -> String {
    format!(
        "Verification failed ({}) on attempt {}. Fix the cause using the build output \
         in the context below and change nothing unrelated.",
        failure, attempt
    )
}

impl<G: Generator> RepairStep for GeneratorRepair<'_, G> {
    fn repair(&mut self, failure: &BuildFailure, attempt: usize) -> Result<bool> {
        let bundle = ContextBuilder::new(self.config).build_for_failure(
            self.root,
            failure.output(),
            self.config.budget_chars,
        )?;
        let request = repair_request(failure, attempt);
        let messages = build_messages(&self.history.messages(), &request, &bundle.text);

        let raw = self.generator.generate(&GenerationRequest { messages })?;
        self.history.push(ChatMessage::new(Role::User, request));
        self.history.push(ChatMessage::new(Role::Assistant, raw.clone()));

        match process_response(self.root, &raw, self.config)? {
            ResponseOutcome::Applied { cycle, .. } => {
                Ok(cycle.applied() > 0 && cycle.decision != Decision::Reverted)
            }
            ResponseOutcome::Unparsed { .. } => Ok(false),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::UNPARSED_ARTIFACT_NAME;
    use crate::generate::testing::ScriptedGenerator;
    use crate::verify::{VerifyLoop, VerifyOutcome};
    use tempfile::TempDir;

    fn config() -> Config {
        Config {
            verify_command: Some("echo 'error: fixed.txt is missing'; test -f fixed.txt".to_string()),
            max_attempts: 3,
            ..Config::default()
        }
    }

    #[test]
    fn test_generated_fix_makes_verification_pass() {
        let dir = TempDir::new().unwrap();
        let config = config();
        let generator = ScriptedGenerator::new(vec![Ok(
            r#"{"plan": ["create the file"], "files": [{"path": "fixed.txt", "content": "ok\n"}]}"#.to_string(),
        )]);
        let mut history = BoundedHistory::new(10);

        let outcome = {
            let mut repair = GeneratorRepair::new(dir.path(), &config, &generator, &mut history);
            VerifyLoop::new(dir.path(), &config).run(&mut repair)
        };

        assert_eq!(outcome, VerifyOutcome::Passed { attempts: 2 });
        assert_eq!(generator.calls(), 1);
        let sent = &generator.requests.borrow()[0];
        let user = &sent.messages.last().unwrap().content;
        assert!(user.contains("# Build failure"));
        assert!(user.contains("fixed.txt is missing"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_unusable_response_stops_loop() {
        let dir = TempDir::new().unwrap();
        let config = config();
        let generator = ScriptedGenerator::new(vec![Ok("I am not sure what to do.".to_string())]);
        let mut history = BoundedHistory::new(10);

        let outcome = {
            let mut repair = GeneratorRepair::new(dir.path(), &config, &generator, &mut history);
            VerifyLoop::new(dir.path(), &config).run(&mut repair)
        };

        assert!(matches!(outcome, VerifyOutcome::Failed { attempts: 1, .. }));
        assert!(dir.path().join(UNPARSED_ARTIFACT_NAME).exists());
    }
}
