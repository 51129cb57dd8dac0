//! Keyword index behind the memory store adapters.
//!
//! Records are kept as the messages they came from, so recall applies the
//! channel visibility rules for the reader: role-play agents recall
//! in-character records in full, strategic agents only their summaries,
//! and directives and addressed messages stay with the agents involved.
//! Out-of-character talk is never indexed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use table_application::ports::memory_store::MemoryPayload;
use table_domain::channel::policy::visibility;
use table_domain::{
    AgentId, AgentProfile, Channel, Message, MessageKind, Phase, PhaseStamp, Visibility,
};
use tracing::debug;

const STOPWORDS: [&str; 16] = [
    "the", "and", "for", "with", "that", "this", "from", "into", "you", "your", "are", "was",
    "his", "her", "its", "they",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct MemoryIndex {
    log: BTreeMap<u64, Vec<Message>>,
    archives: BTreeMap<u64, Vec<Message>>,
    /// Standing knowledge seeded by the host on every start
    #[serde(skip)]
    facts: HashMap<AgentId, Vec<String>>,
}

impl MemoryIndex {
    pub fn add_facts(&mut self, agent: AgentId, facts: impl IntoIterator<Item = String>) {
        self.facts.entry(agent).or_default().extend(facts);
    }

    pub fn archive(&self, session: u64) -> Option<&Vec<Message>> {
        self.archives.get(&session)
    }

    pub fn entry_count(&self, session: u64) -> usize {
        self.log.get(&session).map_or(0, Vec::len)
    }

    pub fn record(&mut self, session: u64, turn: u64, payload: MemoryPayload) {
        match payload {
            MemoryPayload::Narration { text } => {
                let stamp = PhaseStamp::new(session, turn, Phase::Narration);
                let narration =
                    Message::in_character(AgentId::narrator(), MessageKind::Narration, text, stamp);
                self.log.entry(session).or_default().push(narration);
            }
            MemoryPayload::TurnLog { messages } => {
                let total = messages.len();
                let entries: Vec<Message> = messages
                    .into_iter()
                    // Narration was already recorded on its own
                    .filter(|m| m.kind != MessageKind::Narration)
                    .filter(|m| !m.degraded && m.channel != Channel::OutOfCharacter)
                    .collect();
                debug!(
                    "Session {} turn {}: {} of {} messages indexed",
                    session,
                    turn,
                    entries.len(),
                    total
                );
                self.log.entry(session).or_default().extend(entries);
            }
            MemoryPayload::SessionArchive { messages } => {
                debug!("Session {} archived ({} messages)", session, messages.len());
                self.archives.insert(session, messages);
            }
        }
    }

    /// Up to `limit` records for `reader`, best keyword overlap with
    /// `query` first and later records winning ties.
    pub fn recall(
        &self,
        reader: &AgentProfile,
        query: &str,
        limit: usize,
        summary_len: usize,
    ) -> Vec<String> {
        let wanted = keywords(query);

        let own = self.facts.get(&reader.id).into_iter().flatten().cloned();
        let recalled = self
            .log
            .values()
            .flatten()
            .filter_map(|message| match visibility(reader, message) {
                Visibility::Full => Some(render(message)),
                Visibility::Summary => Some(render(&message.summarized(summary_len))),
                Visibility::Hidden => None,
            });

        let mut scored: Vec<(usize, usize, String)> = own
            .chain(recalled)
            .enumerate()
            .map(|(order, fact)| (keywords(&fact).intersection(&wanted).count(), order, fact))
            .filter(|(overlap, _, _)| *overlap > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        let mut seen = HashSet::new();
        scored
            .into_iter()
            .map(|(_, _, fact)| fact)
            .filter(|fact| seen.insert(fact.clone()))
            .take(limit)
            .collect()
    }
}

fn render(message: &Message) -> String {
    if message.kind == MessageKind::Narration {
        format!("[turn {}] {}", message.stamp.turn, message.content)
    } else {
        format!(
            "[turn {}] {}: {}",
            message.stamp.turn, message.sender, message.content
        )
    }
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_domain::channel::router::DEFAULT_SUMMARY_LEN;

    fn stamp() -> PhaseStamp {
        PhaseStamp::new(1, 1, Phase::Validation)
    }

    fn recall(index: &MemoryIndex, reader: &AgentProfile, query: &str) -> Vec<String> {
        index.recall(reader, query, 10, DEFAULT_SUMMARY_LEN)
    }

    #[test]
    fn test_strategic_reader_recalls_only_summaries() {
        let mut index = MemoryIndex::default();
        index.record(
            1,
            1,
            MemoryPayload::TurnLog {
                messages: vec![Message::in_character(
                    "bob.character",
                    MessageKind::Action,
                    "I attempt to open the vault door. The code is 7351.",
                    stamp(),
                )],
            },
        );

        let player = AgentProfile::strategic("bob.player", "bob");
        let facts = recall(&index, &player, "vault door code");
        assert_eq!(
            facts,
            vec!["[turn 1] bob.character: I attempt to open the vault door.".to_string()]
        );

        let character = AgentProfile::role_play("bob.character", "Lyra");
        let facts = recall(&index, &character, "vault door code");
        assert!(facts[0].contains("7351"));
    }

    #[test]
    fn test_addressed_message_stays_with_its_recipients() {
        let mut index = MemoryIndex::default();
        let whisper = Message::in_character(
            "alice.character",
            MessageKind::Dialogue,
            "The vault code is 7351",
            stamp(),
        )
        .with_recipient("bob.character");
        index.record(1, 1, MemoryPayload::TurnLog { messages: vec![whisper] });

        let bob = AgentProfile::role_play("bob.character", "Lyra");
        let carol = AgentProfile::role_play("carol.character", "Mira");
        let carol_player = AgentProfile::strategic("carol.player", "carol");

        assert_eq!(recall(&index, &bob, "vault code").len(), 1);
        assert!(recall(&index, &carol, "vault code").is_empty());
        assert!(recall(&index, &carol_player, "vault code").is_empty());
    }

    #[test]
    fn test_seeded_facts_are_not_persisted() {
        let mut index = MemoryIndex::default();
        index.add_facts("bob.character".into(), ["Lyra fears deep water".to_string()]);
        index.record(
            1,
            1,
            MemoryPayload::Narration {
                text: "Deep water churns below.".to_string(),
            },
        );

        let json = serde_json::to_string(&index).unwrap();
        let restored: MemoryIndex = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.entry_count(1), 1);
        let character = AgentProfile::role_play("bob.character", "Lyra");
        assert_eq!(
            recall(&restored, &character, "deep water"),
            vec!["[turn 1] Deep water churns below.".to_string()]
        );
    }
}
