//! Per-turn records

use super::phase::Phase;
use crate::agent::{AgentId, AgentLayer};
use crate::quorum::ConsensusResult;
use crate::validation::ValidationOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text produced by one agent in one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentContribution {
    pub agent: AgentId,
    pub layer: AgentLayer,
    pub phase: Phase,
    pub intent_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_text: Option<String>,
    /// Placeholder standing in for a failed or timed-out invocation
    #[serde(default)]
    pub degraded: bool,
}

impl AgentContribution {
    pub fn new(
        agent: AgentId,
        layer: AgentLayer,
        phase: Phase,
        intent_text: impl Into<String>,
        dialogue_text: Option<String>,
    ) -> Self {
        Self {
            agent,
            layer,
            phase,
            intent_text: intent_text.into(),
            dialogue_text,
            degraded: false,
        }
    }

    /// Placeholder contribution for an agent whose invocation failed
    pub fn placeholder(agent: AgentId, layer: AgentLayer, phase: Phase) -> Self {
        let text = format!("[{} did not respond]", agent);
        Self {
            degraded: true,
            ..Self::new(agent, layer, phase, text, None)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnWarningKind {
    /// Collaborator retries exhausted; placeholder used
    DegradedContribution,
    /// Validation attempts exhausted; action passed through for review
    ValidationExhausted,
    /// Discussion budget exhausted without agreement
    ConsensusTimeout,
    /// Memory store write or retrieval failed
    MemoryUnavailable,
}

impl TurnWarningKind {
    pub fn as_str(&self) -> &str {
        match self {
            TurnWarningKind::DegradedContribution => "degraded_contribution",
            TurnWarningKind::ValidationExhausted => "validation_exhausted",
            TurnWarningKind::ConsensusTimeout => "consensus_timeout",
            TurnWarningKind::MemoryUnavailable => "memory_unavailable",
        }
    }
}

/// A non-fatal condition the human should know about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnWarning {
    pub kind: TurnWarningKind,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentId>,
    pub detail: String,
}

impl TurnWarning {
    pub fn new(kind: TurnWarningKind, phase: Phase, detail: impl Into<String>) -> Self {
        Self {
            kind,
            phase,
            agent: None,
            detail: detail.into(),
        }
    }

    pub fn for_agent(mut self, agent: AgentId) -> Self {
        self.agent = Some(agent);
        self
    }
}

impl std::fmt::Display for TurnWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.agent {
            Some(agent) => write!(
                f,
                "[{}] {} ({}): {}",
                self.phase,
                self.kind.as_str(),
                agent,
                self.detail
            ),
            None => write!(f, "[{}] {}: {}", self.phase, self.kind.as_str(), self.detail),
        }
    }
}

/// Kind of human input accepted at adjudication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjudicationKind {
    Ruling,
    DiceResult,
    /// Apply the ruling, finish the turn, then end the session
    EndSession,
}

impl AdjudicationKind {
    pub fn as_str(&self) -> &str {
        match self {
            AdjudicationKind::Ruling => "ruling",
            AdjudicationKind::DiceResult => "dice_result",
            AdjudicationKind::EndSession => "end_session",
        }
    }
}

impl std::str::FromStr for AdjudicationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ruling" => Ok(AdjudicationKind::Ruling),
            "dice" | "dice_result" => Ok(AdjudicationKind::DiceResult),
            "end" | "end_session" => Ok(AdjudicationKind::EndSession),
            _ => Err(format!("Unknown adjudication kind: {}", s)),
        }
    }
}

/// Human input supplied at the adjudication suspension point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjudicationInput {
    pub kind: AdjudicationKind,
    pub data: String,
}

impl AdjudicationInput {
    pub fn new(kind: AdjudicationKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn ruling(data: impl Into<String>) -> Self {
        Self::new(AdjudicationKind::Ruling, data)
    }

    pub fn ends_session(&self) -> bool {
        self.kind == AdjudicationKind::EndSession
    }
}

/// Where a turn cycle call left the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Waiting at adjudication for human input
    Suspended,
    /// Turn finished; ready for the next narration
    Completed,
    SessionEnded,
}

/// What a turn cycle call hands back to the human interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub session: u64,
    pub turn: u64,
    pub status: TurnStatus,
    /// Last phase whose effects were committed
    pub completed_phase: Phase,
    /// Phase the session now rests in
    pub current_phase: Phase,
    pub phase_history: Vec<Phase>,
    pub contributions: Vec<AgentContribution>,
    pub consensus: Option<ConsensusResult>,
    pub validations: BTreeMap<AgentId, ValidationOutcome>,
    pub warnings: Vec<TurnWarning>,
}

impl TurnResult {
    /// Agents whose action went through with the validation warning flag
    pub fn flagged_agents(&self) -> Vec<&AgentId> {
        self.validations
            .iter()
            .filter(|(_, outcome)| outcome.warning_flag)
            .map(|(agent, _)| agent)
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty() || self.validations.values().any(|o| o.warning_flag)
    }

    pub fn degraded_count(&self) -> usize {
        self.contributions.iter().filter(|c| c.degraded).count()
    }
}
