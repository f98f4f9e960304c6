//! Events delivered to the embedding host.
//!
//! The callback may be invoked from the session worker or the capture
//! thread's context; hosts that need UI-thread dispatch marshal internally.

use std::sync::Arc;

/// Coarse session status observable by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// A session was requested but the pool had no hot spare; dialing.
    Connecting,
    /// Session is live and consuming microphone input.
    Recording,
    /// No session is consuming audio. Emitted exactly once per session at
    /// termination, and idempotently by the control operations.
    Idle,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Connecting => "connecting",
            SessionStatus::Recording => "recording",
            SessionStatus::Idle => "idle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsrEvent {
    /// Revisable transcription preview for the in-progress utterance.
    Partial(String),
    /// Stable segment the host may commit to its document.
    Final(String),
    Status(SessionStatus),
    /// Short human-readable message. Wire-level error codes are logged, not
    /// forwarded.
    Error(String),
}

/// Host callback. Invoked from background threads; events of a single
/// session arrive in production order.
pub type EventSink = Arc<dyn Fn(AsrEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(SessionStatus::Connecting.as_str(), "connecting");
        assert_eq!(SessionStatus::Recording.as_str(), "recording");
        assert_eq!(SessionStatus::Idle.as_str(), "idle");
    }
}
