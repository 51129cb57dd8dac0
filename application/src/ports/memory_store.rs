//! Memory store port
//!
//! Long-term memory is an external collaborator. The orchestrator writes
//! context at phase exits and retrieves facts per agent once per turn.

use super::action_producer::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use table_domain::{AgentProfile, Message};

/// What gets written to the memory store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryPayload {
    /// The game master's narration opening a turn
    Narration { text: String },
    /// Every message published during one turn
    TurnLog { messages: Vec<Message> },
    /// The whole session log, written once when the session ends
    SessionArchive { messages: Vec<Message> },
}

impl MemoryPayload {
    pub fn kind(&self) -> &str {
        match self {
            MemoryPayload::Narration { .. } => "narration",
            MemoryPayload::TurnLog { .. } => "turn_log",
            MemoryPayload::SessionArchive { .. } => "session_archive",
        }
    }
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Record `payload` for `(session, turn)`
    async fn write_context(
        &self,
        session: u64,
        turn: u64,
        payload: MemoryPayload,
    ) -> Result<(), CollaboratorError>;

    /// Facts relevant to `query` that `reader` is allowed to know, at most
    /// `limit`. Recalled messages follow the channel visibility rules.
    async fn retrieve_context(
        &self,
        reader: &AgentProfile,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, CollaboratorError>;
}
