//! Turns vendor response payloads into ordered partial/final text events.
//!
//! The service emits overlapping, revising transcripts. Two monotone
//! identities keep finalization idempotent across repeated deliveries:
//! `end_time` when utterances are present, and prefix-extension of the
//! rolling full text otherwise.

use anytalk_foundation::Mode;
use serde_json::Value;

/// Events produced from one response payload, in order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Transcripts {
    /// At most one revisable preview per response.
    pub partial: Option<String>,
    /// Stable segments, safe for the host to append.
    pub finals: Vec<String>,
}

/// Per-session interpreter state.
pub struct Interpreter {
    mode: Mode,
    last_committed_end_time: i64,
    last_full_text: String,
}

impl Interpreter {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            last_committed_end_time: -1,
            last_full_text: String::new(),
        }
    }

    /// Interpret one response payload. Malformed JSON or a missing `result`
    /// produces no events; the session keeps reading.
    pub fn ingest(&mut self, payload: &[u8]) -> Transcripts {
        let Ok(value) = serde_json::from_slice::<Value>(payload) else {
            tracing::debug!("dropping malformed response payload");
            return Transcripts::default();
        };
        let Some(result) = value.get("result") else {
            return Transcripts::default();
        };

        if let Some(utterances) = result.get("utterances").and_then(Value::as_array) {
            return self.ingest_utterances(utterances);
        }
        if let Some(text) = result.get("text").and_then(Value::as_str) {
            return self.ingest_rolling_text(text);
        }
        Transcripts::default()
    }

    fn ingest_utterances(&mut self, utterances: &[Value]) -> Transcripts {
        let mut out = Transcripts::default();

        for u in utterances {
            if !u.get("definite").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }
            let end_time = u.get("end_time").and_then(Value::as_i64).unwrap_or(-1);
            if end_time <= self.last_committed_end_time {
                tracing::debug!(
                    end_time,
                    last = self.last_committed_end_time,
                    "skipping already-committed utterance"
                );
                continue;
            }
            if let Some(text) = u.get("text").and_then(Value::as_str) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.finals.push(trimmed.to_string());
                    self.last_committed_end_time = end_time;
                }
            }
        }

        // Latest in-progress utterance is the current preview.
        for u in utterances.iter().rev() {
            if u.get("definite").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }
            if let Some(text) = u.get("text").and_then(Value::as_str) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.partial = Some(trimmed.to_string());
                    break;
                }
            }
        }

        out
    }

    fn ingest_rolling_text(&mut self, text: &str) -> Transcripts {
        let mut out = Transcripts::default();
        let full = text.trim().to_string();
        if full.is_empty() {
            return out;
        }

        if self.mode == Mode::BidiAsync {
            // The async endpoint revises aggressively; each whole text is
            // both the preview and a committed segment.
            out.partial = Some(full.clone());
            out.finals.push(full.clone());
        } else if !self.last_full_text.is_empty() && full.starts_with(&self.last_full_text) {
            let suffix = full[self.last_full_text.len()..].trim();
            if !suffix.is_empty() {
                out.finals.push(suffix.to_string());
            }
        } else if full != self.last_full_text {
            out.finals.push(full.clone());
        }
        self.last_full_text = full;
        out
    }
}
