//! Core data model shared by the context builder, recovery pipeline and patch engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the persisted conversation memory, relative to the project root.
pub const MEMORY_FILE_NAME: &str = ".mend-memory.json";

/// File name the raw generator output is written to when no plan can be recovered.
pub const UNPARSED_ARTIFACT_NAME: &str = ".mend-last-response.txt";

/// Read-only snapshot of one project file taken by the context builder.
///
/// Edits never go through this value; the patch engine works against the
/// live file system.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    /// Root-relative, forward-slash path.
    pub path: String,
    pub absolute: PathBuf,
    pub content: String,
    pub line_count: usize,
    pub byte_size: u64,
    pub modified_at: DateTime<Utc>,
}

/// One `{search, replace}` pair of a surgical edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReplace {
    pub search: String,
    pub replace: String,
}

/// A single file operation recovered from the generator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EditOperation {
    /// Full file replacement or creation.
    WholeFileWrite { path: String, content: String },
    /// Ordered list of localized replacements against an existing file.
    SurgicalEdit { path: String, edits: Vec<SearchReplace> },
}

impl EditOperation {
    pub fn path(&self) -> &str {
        match self {
            EditOperation::WholeFileWrite { path, .. } => path,
            EditOperation::SurgicalEdit { path, .. } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EditOperation::WholeFileWrite { .. } => "write",
            EditOperation::SurgicalEdit { .. } => "edit",
        }
    }
}

/// Structured result of recovering an edit intent from generator output.
///
/// `plan` and `instructions` are advisory only and never executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditPlan {
    pub plan: Vec<String>,
    pub files: Vec<EditOperation>,
    pub instructions: Vec<String>,
}

impl EditPlan {
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty() && self.files.is_empty() && self.instructions.is_empty()
    }
}

/// Speaker of one conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message, as sent to the generator and kept in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// What the tool does with a patched tree when some operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep every successful change.
    #[default]
    Keep,
    /// Restore the pre-patch state if anything failed.
    Revert,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(FailurePolicy::Keep),
            "revert" => Ok(FailurePolicy::Revert),
            other => Err(format!("Invalid failure policy '{}': expected keep or revert", other)),
        }
    }
}

/// Settings for the HTTP generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub thinking: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://integrate.api.nvidia.com/v1/chat/completions".to_string(),
            model: "moonshotai/kimi-k2.5".to_string(),
            api_key_env: "NVIDIA_API_KEY_KIMI".to_string(),
            max_tokens: 16_384,
            temperature: 1.0,
            top_p: 1.0,
            thinking: true,
            timeout_secs: 300,
            max_retries: 3,
            backoff_ms: 2_000,
        }
    }
}

/// Effective configuration after defaults, config file, env and CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Character ceiling for the context bundle.
    pub budget_chars: usize,
    pub max_file_bytes: u64,
    pub preview_lines: usize,
    pub respect_gitignore: bool,
    pub exclude_globs: Vec<String>,
    pub similarity_threshold: f64,
    pub similarity_char_ceiling: usize,
    pub verify_command: Option<String>,
    pub verify_timeout_secs: u64,
    pub max_attempts: usize,
    pub verify_output_limit: usize,
    pub memory_cap: usize,
    pub on_failure: FailurePolicy,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget_chars: 60_000,
            max_file_bytes: 512_000,
            preview_lines: 15,
            respect_gitignore: true,
            exclude_globs: Vec::new(),
            similarity_threshold: 0.8,
            similarity_char_ceiling: 1_000,
            verify_command: None,
            verify_timeout_secs: 180,
            max_attempts: 3,
            verify_output_limit: 4_000,
            memory_cap: 40,
            on_failure: FailurePolicy::Keep,
            generator: GeneratorConfig::default(),
        }
    }
}
