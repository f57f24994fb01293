//! Incremental accumulation of a server-sent-events chat completion stream.

use serde_json::Value;

/// Collects `choices[0].delta.content` from `data:` lines.
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence, so
/// only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    pending: Vec<u8>,
    /// Lines outside any `data:` field, kept in case the body is plain JSON.
    unframed: String,
    content: String,
    done: bool,
    events: usize,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the response body.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.done {
            return;
        }
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if self.events == 0 && !line.starts_with("data:") {
                self.unframed.push_str(&line);
            }
            self.handle_line(&line);
            if self.done {
                self.pending.clear();
                return;
            }
        }
    }

    /// True once the `[DONE]` sentinel was seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of data events that carried content.
    pub fn events(&self) -> usize {
        self.events
    }

    /// Flush any trailing partial line and return the accumulated text.
    pub fn finish(mut self) -> String {
        if !self.done && !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let rest = String::from_utf8_lossy(&rest).into_owned();
            if !rest.starts_with("data:") {
                self.unframed.push_str(&rest);
            }
            self.handle_line(&rest);
        }
        if self.events == 0 {
            // Some endpoints ignore `stream: true` and answer with one JSON body.
            if let Some(text) = non_streaming_content(&self.unframed) {
                return text;
            }
        }
        self.content
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);
        let Some(payload) = line.strip_prefix("data:") else {
            // Comments (`: keep-alive`), `event:` and `id:` fields carry no text.
            return;
        };
        let payload = payload.trim();
        if payload == "[DONE]" {
            self.done = true;
            return;
        }
        let Ok(value) = serde_json::from_str::<Value>(payload) else {
            tracing::debug!("Skipping malformed stream event: {}", payload);
            return;
        };
        if let Some(text) = value
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
        {
            if !text.is_empty() {
                self.content.push_str(text);
                self.events += 1;
            }
        }
    }
}

fn non_streaming_content(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_accumulates_across_split_chunks() {
        let stream = format!("{}{}data: [DONE]\n\n", event("Hel"), event("lo"));
        let bytes = stream.as_bytes();
        let mut acc = SseAccumulator::new();
        for chunk in bytes.chunks(7) {
            acc.feed(chunk);
        }
        assert!(acc.is_done());
        assert_eq!(acc.finish(), "Hello");
    }

    #[test]
    fn test_multibyte_split_is_preserved() {
        let stream = event("héllo 🚀");
        let bytes = stream.as_bytes();
        let mut acc = SseAccumulator::new();
        for chunk in bytes.chunks(1) {
            acc.feed(chunk);
        }
        assert_eq!(acc.finish(), "héllo 🚀");
    }

    #[test]
    fn test_reasoning_and_keepalives_ignored() {
        let mut acc = SseAccumulator::new();
        acc.feed(b": keep-alive\n\n");
        acc.feed(b"data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"thinking...\"}}]}\n\n");
        acc.feed(event("answer").as_bytes());
        acc.feed(b"data: not json\n\n");
        assert_eq!(acc.events(), 1);
        assert_eq!(acc.finish(), "answer");
    }

    #[test]
    fn test_content_after_done_is_dropped() {
        let mut acc = SseAccumulator::new();
        acc.feed(format!("{}data: [DONE]\n\n{}", event("a"), event("b")).as_bytes());
        assert_eq!(acc.finish(), "a");
    }

    #[test]
    fn test_trailing_line_without_newline() {
        let mut acc = SseAccumulator::new();
        acc.feed(event("x").trim_end().as_bytes());
        assert_eq!(acc.finish(), "x");
    }

    #[test]
    fn test_plain_json_body_fallback() {
        let mut acc = SseAccumulator::new();
        acc.feed(b"{\n  \"choices\": [{\"message\": {\"content\": \"plain\"}}]\n}\n");
        assert_eq!(acc.finish(), "plain");
    }
}
