//! In-process long-term memory.
//!
//! Keeps a per-session context log built from what the orchestrator
//! writes, plus per-agent fact lists seeded by the host. Everything is
//! lost when the process exits; see
//! [`JsonFileMemoryStore`](super::JsonFileMemoryStore) for a store that
//! survives restarts.

use super::index::MemoryIndex;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use table_application::ports::action_producer::CollaboratorError;
use table_application::ports::memory_store::{MemoryPayload, MemoryStore};
use table_domain::channel::router::DEFAULT_SUMMARY_LEN;
use table_domain::{AgentId, AgentProfile, Message};

/// Memory store kept entirely in process memory
pub struct InMemoryMemoryStore {
    index: Mutex<MemoryIndex>,
    summary_len: usize,
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self {
            index: Mutex::new(MemoryIndex::default()),
            summary_len: DEFAULT_SUMMARY_LEN,
        }
    }
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte budget of the in-character summaries strategic agents recall
    pub fn with_summary_len(mut self, summary_len: usize) -> Self {
        self.summary_len = summary_len;
        self
    }

    /// Give `agent` standing knowledge (backstory, character sheet lines)
    pub fn with_facts(self, agent: impl Into<AgentId>, facts: Vec<String>) -> Self {
        if let Ok(mut index) = self.index.lock() {
            index.add_facts(agent.into(), facts);
        }
        self
    }

    /// Messages archived when `session` ended
    pub fn archive(&self, session: u64) -> Option<Vec<Message>> {
        self.lock().ok()?.archive(session).cloned()
    }

    /// Number of context entries recorded for `session`
    pub fn entry_count(&self, session: u64) -> usize {
        self.lock()
            .map(|index| index.entry_count(session))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryIndex>, CollaboratorError> {
        self.index
            .lock()
            .map_err(|e| CollaboratorError::Failed(format!("memory store poisoned: {}", e)))
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn write_context(
        &self,
        session: u64,
        turn: u64,
        payload: MemoryPayload,
    ) -> Result<(), CollaboratorError> {
        self.lock()?.record(session, turn, payload);
        Ok(())
    }

    async fn retrieve_context(
        &self,
        reader: &AgentProfile,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.lock()?.recall(reader, query, limit, self.summary_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_domain::{MessageKind, Phase, PhaseStamp};

    fn stamp() -> PhaseStamp {
        PhaseStamp::new(1, 1, Phase::Validation)
    }

    fn turn_log() -> Vec<Message> {
        vec![
            Message::in_character(
                AgentId::narrator(),
                MessageKind::Narration,
                "A troll guards the bridge.",
                stamp(),
            ),
            Message::out_of_character(
                "alice.player",
                MessageKind::Discussion,
                "Let's bait the troll",
                stamp(),
            ),
            Message::directive("alice.player", "alice.character", "Distract the troll", stamp()),
            Message::in_character(
                "bob.character",
                MessageKind::Action,
                "I attempt to climb the bridge rail",
                stamp(),
            ),
        ]
    }

    fn character(name: &str) -> AgentProfile {
        AgentProfile::role_play(format!("{}.character", name), name)
    }

    fn player(name: &str) -> AgentProfile {
        AgentProfile::strategic(format!("{}.player", name), name)
    }

    #[tokio::test]
    async fn test_out_of_character_talk_is_never_recalled() {
        let store = InMemoryMemoryStore::new();
        store
            .write_context(1, 1, MemoryPayload::TurnLog { messages: turn_log() })
            .await
            .unwrap();

        let facts = store
            .retrieve_context(&player("alice"), "bait the troll", 10)
            .await
            .unwrap();
        assert!(facts.iter().all(|f| !f.contains("bait")));
        // Narration is indexed through its own payload, not the turn log
        assert_eq!(store.entry_count(1), 2);
    }

    #[tokio::test]
    async fn test_directives_stay_between_their_endpoints() {
        let store = InMemoryMemoryStore::new();
        store
            .write_context(1, 1, MemoryPayload::TurnLog { messages: turn_log() })
            .await
            .unwrap();

        let alice = store
            .retrieve_context(&character("alice"), "distract troll", 5)
            .await
            .unwrap();
        let sender = store
            .retrieve_context(&player("alice"), "distract troll", 5)
            .await
            .unwrap();
        let bob = store
            .retrieve_context(&character("bob"), "distract troll", 5)
            .await
            .unwrap();

        assert!(alice.iter().any(|f| f.contains("Distract the troll")));
        assert!(sender.iter().any(|f| f.contains("Distract the troll")));
        assert!(bob.iter().all(|f| !f.contains("Distract")));
    }

    #[tokio::test]
    async fn test_strategic_recall_respects_summary_len() {
        let store = InMemoryMemoryStore::new().with_summary_len(12);
        store
            .write_context(1, 1, MemoryPayload::TurnLog { messages: turn_log() })
            .await
            .unwrap();

        let facts = store
            .retrieve_context(&player("bob"), "climb", 5)
            .await
            .unwrap();
        assert!(facts.is_empty());
        let facts = store
            .retrieve_context(&player("bob"), "attempt", 5)
            .await
            .unwrap();
        assert_eq!(facts, vec!["[turn 1] bob.character: I attempt..."]);
    }

    #[tokio::test]
    async fn test_ranked_by_overlap_and_truncated() {
        let store = InMemoryMemoryStore::new().with_facts(
            "bob.character",
            vec![
                "Lyra fears deep water".to_string(),
                "Lyra once fought a troll under a stone bridge".to_string(),
            ],
        );
        store
            .write_context(
                1,
                1,
                MemoryPayload::Narration {
                    text: "The stone bridge creaks.".to_string(),
                },
            )
            .await
            .unwrap();

        let facts = store
            .retrieve_context(&character("bob"), "a troll on the stone bridge", 2)
            .await
            .unwrap();

        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0], "Lyra once fought a troll under a stone bridge");
        assert_eq!(facts[1], "[turn 1] The stone bridge creaks.");
    }

    #[tokio::test]
    async fn test_unrelated_query_recalls_nothing() {
        let store = InMemoryMemoryStore::new()
            .with_facts("bob.character", vec!["Lyra fears deep water".to_string()]);
        let facts = store
            .retrieve_context(&character("bob"), "dragon hoard", 5)
            .await
            .unwrap();
        assert!(facts.is_empty());
    }

    #[tokio::test]
    async fn test_archive_is_kept() {
        let store = InMemoryMemoryStore::new();
        store
            .write_context(2, 4, MemoryPayload::SessionArchive { messages: turn_log() })
            .await
            .unwrap();
        assert_eq!(store.archive(2).unwrap().len(), 4);
        assert!(store.archive(1).is_none());
    }
}
