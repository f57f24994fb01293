//! Generator transport: the trait the pipeline talks to, a retry policy,
//! prompt assembly and an OpenAI-compatible streaming client.

pub mod openai;
pub mod prompt;
pub mod sse;

use crate::domain::ChatMessage;
use std::time::Duration;
use thiserror::Error;

pub use openai::OpenAiCompatGenerator;
pub use prompt::{build_messages, SYSTEM_PROMPT};
pub use sse::SseAccumulator;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Rate limited (HTTP {status}): {body}")]
    RateLimited { status: u16, body: String },

    #[error("Generator API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Missing credential: set the {0} environment variable")]
    MissingCredential(String),

    #[error("Generator returned no content")]
    EmptyResponse,
}

impl GenerateError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenerateError::RateLimited { .. })
    }

    /// Errors that no retry can fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, GenerateError::MissingCredential(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
}

/// Produces raw response text for a conversation.
pub trait Generator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError>;
}

impl<G: Generator + ?Sized> Generator for &G {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        (**self).generate(request)
    }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        (**self).generate(request)
    }
}

/// Bounded retries around another generator.
///
/// Rate-limit responses sleep `backoff` before the next attempt; other
/// failures are retried straight away. The last error is returned once
/// `max_attempts` calls have failed.
pub struct RetryingGenerator<G> {
    inner: G,
    max_attempts: u32,
    backoff: Duration,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, max_attempts: u32, backoff: Duration) -> Self {
        Self { inner, max_attempts: max_attempts.max(1), backoff }
    }
}

impl<G: Generator> Generator for RetryingGenerator<G> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        let mut attempt = 1;
        loop {
            match self.inner.generate(request) {
                Ok(text) => return Ok(text),
                Err(err) if err.is_permanent() || attempt >= self.max_attempts => return Err(err),
                Err(err) => {
                    tracing::warn!("Generation attempt {}/{} failed: {}", attempt, self.max_attempts, err);
                    if err.is_rate_limit() && !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
