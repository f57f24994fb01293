//! Prompt assembly for edit requests.

use crate::domain::{ChatMessage, Role};

pub const SYSTEM_PROMPT: &str = r#"You are a careful software engineer editing a project you can only see through the context provided.

Reply with a single JSON object and nothing else:

{
  "plan": ["short description of each step"],
  "files": [
    {"path": "relative/path.ext", "action": "create", "content": "full new file content"},
    {"path": "relative/other.ext", "action": "edit", "edits": [
      {"search": "exact text currently in the file", "replace": "text to put instead"}
    ]}
  ],
  "instructions": ["anything the user must do by hand"]
}

Rules:
- Paths are relative to the project root.
- Use "content" for new files or full rewrites and "edits" for small changes to existing files.
- Each "search" must be copied verbatim from the current file, including indentation, and be long enough to be unique.
- Edits in one file are applied in order against the result of the previous edit.
- Never truncate file content with placeholders such as "...".
"#;

/// Build the message list: system prompt, prior history, then the request
/// followed by the context bundle.
pub fn build_messages(history: &[ChatMessage], request: &str, bundle: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if history.first().map(|m| m.role) != Some(Role::System) {
        messages.push(ChatMessage::new(Role::System, SYSTEM_PROMPT));
    }
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::new(Role::User, user_message(request, bundle)));
    messages
}

pub fn user_message(request: &str, bundle: &str) -> String {
    format!("{}\n\n# Project context\n\n{}", request.trim(), bundle)
}
