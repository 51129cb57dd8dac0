//! Channel Router - visibility-filtered, append-only message log.
//!
//! Publishing validates the sender/channel combination and appends to the
//! session log. Reading filters the log through [`visibility`] for the
//! reader. Appends from concurrently completing agents are linearized by a
//! single mutex, so a reader never observes a partially written message.

use super::entities::{Channel, Message};
use super::policy::{Visibility, check_publish, visibility};
use crate::agent::{AgentId, AgentLayer, AgentProfile};
use crate::core::error::DomainError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

/// Default byte budget for in-character summaries shown to strategic agents
pub const DEFAULT_SUMMARY_LEN: usize = 160;

/// Routes messages among registered agents.
#[derive(Debug)]
pub struct ChannelRouter {
    agents: RwLock<HashMap<AgentId, AgentProfile>>,
    log: Mutex<Vec<Message>>,
    summary_len: usize,
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_LEN)
    }
}

impl ChannelRouter {
    /// Create an empty router. The narrator is always registered.
    pub fn new(summary_len: usize) -> Self {
        let router = Self {
            agents: RwLock::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            summary_len,
        };
        router.register(AgentProfile::narrator());
        router
    }

    /// Rebuild a router around a previously persisted log.
    pub fn with_log(messages: Vec<Message>, summary_len: usize) -> Self {
        let router = Self::new(summary_len);
        *router.lock_log() = messages;
        router
    }

    /// Register (or re-register) an agent
    pub fn register(&self, profile: AgentProfile) {
        self.agents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.id.clone(), profile);
    }

    pub fn register_all<'a>(&self, profiles: impl IntoIterator<Item = &'a AgentProfile>) {
        for profile in profiles {
            self.register(profile.clone());
        }
    }

    /// Look up a registered agent
    pub fn profile(&self, agent: &AgentId) -> Option<AgentProfile> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(agent)
            .cloned()
    }

    fn layer_of(&self, agent: &AgentId) -> Option<AgentLayer> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(agent)
            .map(|p| p.layer)
    }

    fn lock_log(&self) -> MutexGuard<'_, Vec<Message>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate a message without publishing it.
    pub fn check(&self, message: &Message) -> Result<(), DomainError> {
        let sender = self
            .profile(&message.sender)
            .ok_or_else(|| DomainError::UnknownAgent(message.sender.clone()))?;
        check_publish(&sender, message, |id| self.layer_of(id))
    }

    /// Publish a single message.
    pub fn publish(&self, message: Message) -> Result<(), DomainError> {
        self.check(&message)?;
        self.lock_log().push(message);
        Ok(())
    }

    /// Publish a batch atomically: either every message is appended, in
    /// order, or none is.
    pub fn publish_batch(&self, messages: Vec<Message>) -> Result<usize, DomainError> {
        for message in &messages {
            self.check(message)?;
        }
        let count = messages.len();
        self.lock_log().extend(messages);
        Ok(count)
    }

    /// Messages on `channel` visible to `agent`, in creation order.
    pub fn read(&self, agent: &AgentId, channel: Channel) -> Result<Vec<Message>, DomainError> {
        self.read_filtered(agent, channel, |_| true)
    }

    /// Like [`read`](Self::read), restricted to messages matching `filter`.
    fn read_filtered(
        &self,
        agent: &AgentId,
        channel: Channel,
        filter: impl Fn(&Message) -> bool,
    ) -> Result<Vec<Message>, DomainError> {
        let reader = self
            .profile(agent)
            .ok_or_else(|| DomainError::UnknownAgent(agent.clone()))?;

        let log = self.lock_log();
        Ok(log
            .iter()
            .filter(|m| m.channel == channel && filter(m))
            .filter_map(|m| self.view(&reader, m))
            .collect())
    }

    /// Everything `agent` may see on every channel, in log order.
    pub fn read_visible(&self, agent: &AgentId) -> Result<Vec<Message>, DomainError> {
        let reader = self
            .profile(agent)
            .ok_or_else(|| DomainError::UnknownAgent(agent.clone()))?;

        let log = self.lock_log();
        Ok(log.iter().filter_map(|m| self.view(&reader, m)).collect())
    }

    fn view(&self, reader: &AgentProfile, message: &Message) -> Option<Message> {
        match visibility(reader, message) {
            Visibility::Full => Some(message.clone()),
            Visibility::Summary => Some(message.summarized(self.summary_len)),
            Visibility::Hidden => None,
        }
    }

    /// Full copy of the log (narrator's view), for persistence and archiving.
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock_log().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_log().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Participant;
    use crate::channel::entities::{MessageKind, PhaseStamp};
    use crate::turn::phase::Phase;
    use std::sync::Arc;

    fn stamp() -> PhaseStamp {
        PhaseStamp::new(1, 1, Phase::OocDiscussion)
    }

    fn table() -> (ChannelRouter, Participant, Participant) {
        let router = ChannelRouter::new(40);
        let alice = Participant::new("alice", "Thorin");
        let bob = Participant::new("bob", "Lyra");
        router.register_all(alice.agents());
        router.register_all(bob.agents());
        (router, alice, bob)
    }

    #[test]
    fn test_rejected_message_never_enters_log() {
        let (router, alice, _) = table();
        let bad = Message::out_of_character(
            alice.character.id.clone(),
            MessageKind::Discussion,
            "meta",
            stamp(),
        );
        let err = router.publish(bad).unwrap_err();
        assert!(err.is_routing());
        assert!(router.is_empty());
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let (router, _, _) = table();
        let m = Message::in_character("stranger", MessageKind::Action, "hi", stamp());
        assert_eq!(
            router.publish(m),
            Err(DomainError::UnknownAgent(AgentId::new("stranger")))
        );
    }

    #[test]
    fn test_strategic_reads_ic_summary() {
        let (router, alice, bob) = table();
        router
            .publish(Message::in_character(
                alice.character.id.clone(),
                MessageKind::Dialogue,
                "We should not linger here. The torches are burning low and I hear drums.",
                stamp(),
            ))
            .unwrap();

        let seen_by_player = router.read(&bob.strategic.id, Channel::InCharacter).unwrap();
        assert_eq!(seen_by_player.len(), 1);
        assert!(seen_by_player[0].summarized);
        assert_eq!(seen_by_player[0].content, "We should not linger here.");

        let seen_by_character = router.read(&bob.character.id, Channel::InCharacter).unwrap();
        assert!(!seen_by_character[0].summarized);
        assert!(seen_by_character[0].content.contains("drums"));
    }

    #[test]
    fn test_role_play_never_sees_ooc() {
        let (router, alice, bob) = table();
        router
            .publish(Message::out_of_character(
                alice.strategic.id.clone(),
                MessageKind::Discussion,
                "Let's flank",
                stamp(),
            ))
            .unwrap();
        assert!(router
            .read(&bob.character.id, Channel::OutOfCharacter)
            .unwrap()
            .is_empty());
        assert_eq!(
            router
                .read(&bob.strategic.id, Channel::OutOfCharacter)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_directive_point_to_point() {
        let (router, alice, bob) = table();
        router
            .publish(Message::directive(
                alice.strategic.id.clone(),
                alice.character.id.clone(),
                "Guard the rear",
                stamp(),
            ))
            .unwrap();

        let read = |id: &AgentId| router.read(id, Channel::Directive).unwrap().len();
        assert_eq!(read(&alice.strategic.id), 1);
        assert_eq!(read(&alice.character.id), 1);
        assert_eq!(read(&bob.strategic.id), 0);
        assert_eq!(read(&bob.character.id), 0);
    }

    #[test]
    fn test_read_visible_spans_channels() {
        let (router, alice, bob) = table();
        router
            .publish_batch(vec![
                Message::in_character(
                    "dm",
                    MessageKind::Narration,
                    "Rain falls. It is cold.",
                    stamp(),
                ),
                Message::out_of_character(
                    alice.strategic.id.clone(),
                    MessageKind::Discussion,
                    "Plan?",
                    stamp(),
                ),
                Message::directive(
                    alice.strategic.id.clone(),
                    alice.character.id.clone(),
                    "Hide",
                    stamp(),
                ),
            ])
            .unwrap();

        let character = router.read_visible(&alice.character.id).unwrap();
        assert_eq!(character.len(), 2);
        assert_eq!(character[1].channel, Channel::Directive);

        let player = router.read_visible(&bob.strategic.id).unwrap();
        assert_eq!(player.len(), 2);
        assert!(player[0].summarized);
        assert_eq!(player[0].content, "Rain falls.");

        assert_eq!(router.read_visible(&AgentId::narrator()).unwrap().len(), 3);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let (router, alice, _) = table();
        let good = Message::out_of_character(
            alice.strategic.id.clone(),
            MessageKind::Discussion,
            "ok",
            stamp(),
        );
        let bad = Message::in_character(
            alice.strategic.id.clone(),
            MessageKind::Action,
            "not allowed",
            stamp(),
        );
        assert!(router.publish_batch(vec![good, bad]).is_err());
        assert!(router.is_empty());
    }

    #[test]
    fn test_read_preserves_creation_order() {
        let (router, alice, bob) = table();
        for i in 0..5 {
            let sender = if i % 2 == 0 { &alice } else { &bob };
            router
                .publish(Message::out_of_character(
                    sender.strategic.id.clone(),
                    MessageKind::Discussion,
                    format!("msg {}", i),
                    stamp(),
                ))
                .unwrap();
        }
        let contents: Vec<_> = router
            .read(&alice.strategic.id, Channel::OutOfCharacter)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publish_keeps_messages_whole() {
        let (router, alice, bob) = table();
        let router = Arc::new(router);
        let mut handles = Vec::new();

        for i in 0..40 {
            let router = Arc::clone(&router);
            let sender = if i % 2 == 0 {
                alice.character.id.clone()
            } else {
                bob.character.id.clone()
            };
            handles.push(tokio::spawn(async move {
                let content = format!("{}:{}", sender, "x".repeat(i));
                router
                    .publish(Message::in_character(
                        sender,
                        MessageKind::Action,
                        content,
                        stamp(),
                    ))
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let log = router.snapshot();
        assert_eq!(log.len(), 40);
        for m in &log {
            let (sender, body) = m.content.split_once(':').unwrap();
            assert_eq!(sender, m.sender.as_str());
            assert!(body.chars().all(|c| c == 'x'));
        }

        // Role-play readers see everything in full; strategic readers see summaries.
        assert_eq!(
            router
                .read(&alice.character.id, Channel::InCharacter)
                .unwrap()
                .iter()
                .filter(|m| !m.summarized)
                .count(),
            40
        );
        assert!(router
            .read(&alice.strategic.id, Channel::InCharacter)
            .unwrap()
            .iter()
            .all(|m| m.summarized));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_half_a_batch() {
        const BATCH: usize = 3;
        let (router, alice, bob) = table();
        let router = Arc::new(router);

        let mut publishers = Vec::new();
        for i in 0..20 {
            let router = Arc::clone(&router);
            let sender = if i % 2 == 0 {
                alice.strategic.id.clone()
            } else {
                bob.strategic.id.clone()
            };
            publishers.push(tokio::spawn(async move {
                let batch = (0..BATCH)
                    .map(|part| {
                        Message::out_of_character(
                            sender.clone(),
                            MessageKind::Discussion,
                            format!("{}/{}", i, part),
                            stamp(),
                        )
                    })
                    .collect();
                router.publish_batch(batch).unwrap();
            }));
        }

        let mut readers = Vec::new();
        for _ in 0..4 {
            let router = Arc::clone(&router);
            let reader = bob.strategic.id.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let seen = router.read_visible(&reader).unwrap();
                    assert_eq!(seen.len() % BATCH, 0);
                    for batch in seen.chunks(BATCH) {
                        let (owner, _) = batch[0].content.split_once('/').unwrap();
                        for (part, m) in batch.iter().enumerate() {
                            assert_eq!(m.content, format!("{}/{}", owner, part));
                            assert_eq!(m.sender, batch[0].sender);
                        }
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        for handle in publishers.into_iter().chain(readers) {
            handle.await.unwrap();
        }
        assert_eq!(router.len(), 20 * BATCH);
    }
}
