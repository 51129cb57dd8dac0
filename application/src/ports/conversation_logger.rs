//! Transcript port
//!
//! The orchestrator reports every published message, phase transition,
//! consensus result and validation outcome here. `tracing` carries the
//! diagnostic log; this port carries the session's record of play.

use serde_json::Value;

/// One transcript entry: a type tag and an event-specific JSON payload.
/// The adapter adds the timestamp.
pub struct ConversationEvent {
    /// `message_published`, `phase_transition`, `consensus`, `validation`
    /// or `turn_suspended`
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Sink for transcript entries.
///
/// `log` cannot fail: a transcript that stops writing never affects the turn.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// Transcript disabled
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
