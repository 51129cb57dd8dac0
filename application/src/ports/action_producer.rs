//! Action producer port
//!
//! Each agent is an opaque collaborator that turns a context into a proposed
//! action or utterance. How the text is produced (an LLM, a script, a human
//! at a terminal) is an infrastructure concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use table_domain::{AgentProfile, ConsensusResult, Message, Phase, Stance};
use thiserror::Error;

/// Errors raised by external collaborators (producers and the memory store)
///
/// These never abort a turn: the orchestrator retries, then degrades.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Timeout")]
    Timeout,

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Collaborator failed: {0}")]
    Failed(String),
}

/// What the agent is being asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerTask {
    /// Out-of-character discussion contribution plus a stance
    Discussion,
    /// The group's plan for this participant
    Intent,
    /// An in-character action statement
    Action,
    /// An in-character reaction to the ruling
    Reaction,
}

/// Read-only snapshot handed to a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerContext {
    pub session: u64,
    pub turn: u64,
    pub phase: Phase,
    pub task: ProducerTask,
    pub agent: AgentProfile,
    pub narration: Option<String>,
    /// Facts retrieved from the memory store for this agent
    #[serde(default)]
    pub facts: Vec<String>,
    /// Messages this agent is allowed to see, in log order
    #[serde(default)]
    pub visible_messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusResult>,
    /// Directive from the participant's strategic agent (role-play only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
    /// 1-based action attempt (action task only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u8>,
    /// Correction hints from earlier failed attempts, oldest first
    #[serde(default)]
    pub correction_hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruling: Option<String>,
}

/// Optional structured data accompanying a produced action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A producer's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducedAction {
    pub intent_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_text: Option<String>,
    #[serde(default)]
    pub metadata: ActionMetadata,
}

impl ProducedAction {
    pub fn new(intent_text: impl Into<String>) -> Self {
        Self {
            intent_text: intent_text.into(),
            dialogue_text: None,
            metadata: ActionMetadata::default(),
        }
    }

    pub fn with_dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.dialogue_text = Some(dialogue.into());
        self
    }

    pub fn with_stance(mut self, stance: Stance, confidence: f64) -> Self {
        self.metadata.stance = Some(stance);
        self.metadata.confidence = Some(confidence);
        self
    }
}

/// Semantic-check answer from a producer in its evaluation role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    /// True when the text only describes an attempt
    pub attempt_only: bool,
    #[serde(default)]
    pub reason: String,
}

/// One agent's producer
#[async_trait]
pub trait ActionProducer: Send + Sync {
    /// The agent this producer speaks for
    fn agent(&self) -> &AgentProfile;

    /// Produce an action or utterance for `context`.
    ///
    /// May be re-invoked within the same phase with an evolving context.
    async fn produce(&self, context: &ProducerContext) -> Result<ProducedAction, CollaboratorError>;

    /// Judge whether `text` describes an attempt only.
    async fn evaluate_attempt(
        &self,
        text: &str,
        context: &ProducerContext,
    ) -> Result<EvaluationVerdict, CollaboratorError>;
}

/// Gateway to agent producers
///
/// This port defines how the application layer reaches agents.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Obtain the producer for `agent`
    async fn connect(&self, agent: &AgentProfile)
    -> Result<Arc<dyn ActionProducer>, CollaboratorError>;
}
