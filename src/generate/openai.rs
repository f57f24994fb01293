//! Streaming client for OpenAI-compatible chat completion endpoints.

use super::{GenerateError, GenerationRequest, Generator, SseAccumulator};
use crate::domain::GeneratorConfig;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::io::Read;
use std::time::Duration;

const READ_CHUNK: usize = 8 * 1024;

pub struct OpenAiCompatGenerator {
    client: Client,
    config: GeneratorConfig,
    api_key: String,
}

impl OpenAiCompatGenerator {
    /// Build a client, reading the bearer key from `config.api_key_env`.
    pub fn from_env(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerateError::MissingCredential(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &GeneratorConfig, api_key: String) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerateError::Transport(e.to_string()))?;
        Ok(Self { client, config: config.clone(), api_key })
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.config.model,
            "messages": request.messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "stream": true,
            "chat_template_kwargs": { "thinking": self.config.thinking },
        })
    }
}

impl Generator for OpenAiCompatGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        tracing::debug!("POST {} ({} messages)", self.config.endpoint, request.messages.len());
        let mut response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "text/event-stream")
            .json(&self.request_body(request))
            .send()
            .map_err(|e| GenerateError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                GenerateError::RateLimited { status: status.as_u16(), body }
            } else {
                GenerateError::Api { status: status.as_u16(), body }
            });
        }

        let mut accumulator = SseAccumulator::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let read = response
                .read(&mut buf)
                .map_err(|e| GenerateError::Transport(format!("Stream interrupted: {}", e)))?;
            if read == 0 {
                break;
            }
            accumulator.feed(&buf[..read]);
            if accumulator.is_done() {
                break;
            }
        }

        let events = accumulator.events();
        let text = accumulator.finish();
        tracing::info!("Received {} chars in {} stream events", text.chars().count(), events);
        if text.trim().is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(text)
    }
}
