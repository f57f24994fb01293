//! Bounded conversation history persisted next to the project.

use crate::domain::{ChatMessage, Role, MEMORY_FILE_NAME};
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Message history capped at `cap` entries.
///
/// A leading system message is pinned and never evicted; beyond the cap,
/// the oldest remaining entries are dropped first.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedHistory {
    system: Option<ChatMessage>,
    entries: VecDeque<ChatMessage>,
    cap: usize,
}

impl BoundedHistory {
    pub fn new(cap: usize) -> Self {
        Self { system: None, entries: VecDeque::new(), cap: cap.max(1) }
    }

    /// Rebuild from a message list, applying the cap.
    pub fn from_messages(messages: Vec<ChatMessage>, cap: usize) -> Self {
        let mut history = Self::new(cap);
        for message in messages {
            history.push(message);
        }
        history
    }

    pub fn push(&mut self, message: ChatMessage) {
        if self.system.is_none() && self.entries.is_empty() && message.role == Role::System {
            self.system = Some(message);
            return;
        }
        self.entries.push_back(message);
        while self.len() > self.cap && !self.entries.is_empty() {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len() + usize::from(self.system.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.system.iter().cloned().chain(self.entries.iter().cloned()).collect()
    }

    pub fn clear(&mut self) {
        self.system = None;
        self.entries.clear();
    }
}

pub fn memory_path(root: &Path) -> PathBuf {
    root.join(MEMORY_FILE_NAME)
}

/// Load the history stored under `root`.
///
/// A missing file is an empty history. Unreadable, corrupt or non-array
/// content is discarded with a warning.
pub fn load(root: &Path, cap: usize) -> BoundedHistory {
    let path = memory_path(root);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BoundedHistory::new(cap),
        Err(err) => {
            tracing::warn!("Could not read {}: {}; starting a new conversation", path.display(), err);
            return BoundedHistory::new(cap);
        }
    };

    match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
        Ok(messages) => BoundedHistory::from_messages(messages, cap),
        Err(err) => {
            tracing::warn!("Discarding corrupt memory file {}: {}", path.display(), err);
            BoundedHistory::new(cap)
        }
    }
}

pub fn save(root: &Path, history: &BoundedHistory) -> Result<()> {
    let path = memory_path(root);
    let json = serde_json::to_string_pretty(&history.messages())?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write memory file: {}", path.display()))?;
    Ok(())
}
