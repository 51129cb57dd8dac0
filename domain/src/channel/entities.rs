//! Channel and message entities

use crate::agent::AgentId;
use crate::core::string::first_sentence;
use crate::quorum::Stance;
use crate::turn::phase::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visibility scope of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Spoken and acted at the table, inside the fiction
    InCharacter,
    /// Strategy talk between players, outside the fiction
    OutOfCharacter,
    /// Point-to-point instruction from a player to their character
    Directive,
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Channel::InCharacter => "ic",
            Channel::OutOfCharacter => "ooc",
            Channel::Directive => "directive",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ic" | "in_character" | "in-character" => Ok(Channel::InCharacter),
            "ooc" | "out_of_character" | "out-of-character" => Ok(Channel::OutOfCharacter),
            "directive" | "dm" => Ok(Channel::Directive),
            _ => Err(format!("Unknown channel: {}. Valid: ic, ooc, directive", s)),
        }
    }
}

/// Unique message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where in the session a message was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseStamp {
    pub session: u64,
    pub turn: u64,
    pub phase: Phase,
}

impl PhaseStamp {
    pub fn new(session: u64, turn: u64, phase: Phase) -> Self {
        Self {
            session,
            turn,
            phase,
        }
    }
}

/// Message type tag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    Narration,
    Discussion,
    /// A declared position in an out-of-character discussion round
    Stance {
        stance: Stance,
        confidence: f64,
    },
    Intent,
    Directive,
    Action,
    Dialogue,
    Ruling,
    Outcome,
    Reaction,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Narration => "narration",
            MessageKind::Discussion => "discussion",
            MessageKind::Stance { .. } => "stance",
            MessageKind::Intent => "intent",
            MessageKind::Directive => "directive",
            MessageKind::Action => "action",
            MessageKind::Dialogue => "dialogue",
            MessageKind::Ruling => "ruling",
            MessageKind::Outcome => "outcome",
            MessageKind::Reaction => "reaction",
            MessageKind::System => "system",
        }
    }
}

/// An immutable routed message (Entity)
///
/// Built with the constructor and `with_*` methods, then handed to the
/// router. Once in the log it is only ever handed out as a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
    pub channel: Channel,
    pub sender: AgentId,
    /// Empty means broadcast within the channel's scope
    pub recipients: Vec<AgentId>,
    pub content: String,
    pub kind: MessageKind,
    pub stamp: PhaseStamp,
    /// Discussion round (out-of-character discussion only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    /// Placeholder standing in for a failed contribution
    #[serde(default)]
    pub degraded: bool,
    /// Set on read copies that carry a summary instead of the full content
    #[serde(default)]
    pub summarized: bool,
}

impl Message {
    pub fn new(
        channel: Channel,
        sender: impl Into<AgentId>,
        kind: MessageKind,
        content: impl Into<String>,
        stamp: PhaseStamp,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            timestamp: Utc::now(),
            channel,
            sender: sender.into(),
            recipients: Vec::new(),
            content: content.into(),
            kind,
            stamp,
            round: None,
            degraded: false,
            summarized: false,
        }
    }

    pub fn in_character(
        sender: impl Into<AgentId>,
        kind: MessageKind,
        content: impl Into<String>,
        stamp: PhaseStamp,
    ) -> Self {
        Self::new(Channel::InCharacter, sender, kind, content, stamp)
    }

    pub fn out_of_character(
        sender: impl Into<AgentId>,
        kind: MessageKind,
        content: impl Into<String>,
        stamp: PhaseStamp,
    ) -> Self {
        Self::new(Channel::OutOfCharacter, sender, kind, content, stamp)
    }

    pub fn directive(
        sender: impl Into<AgentId>,
        recipient: impl Into<AgentId>,
        content: impl Into<String>,
        stamp: PhaseStamp,
    ) -> Self {
        Self::new(
            Channel::Directive,
            sender,
            MessageKind::Directive,
            content,
            stamp,
        )
        .with_recipient(recipient)
    }

    pub fn with_recipient(mut self, recipient: impl Into<AgentId>) -> Self {
        self.recipients.push(recipient.into());
        self
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn marked_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Whether this message is broadcast within its channel
    pub fn is_broadcast(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Whether `agent` is the sender or one of the addressees
    pub fn involves(&self, agent: &AgentId) -> bool {
        &self.sender == agent || self.recipients.contains(agent)
    }

    /// A read copy carrying only the first sentence of the content.
    pub fn summarized(&self, max_len: usize) -> Self {
        Self {
            content: first_sentence(&self.content, max_len),
            summarized: true,
            ..self.clone()
        }
    }
}
