//! Persisted session state
//!
//! [`SessionState`] is the single flat record that survives between turn
//! cycle invocations. Everything needed to resume at adjudication from a
//! different process lives here.

use super::phase::{GateResult, Phase};
use super::records::{
    AdjudicationInput, AgentContribution, TurnResult, TurnStatus, TurnWarning,
};
use crate::agent::{AgentId, AgentProfile, Participant};
use crate::channel::{Message, PhaseStamp};
use crate::core::error::DomainError;
use crate::quorum::ConsensusResult;
use crate::validation::ValidationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data accumulated while a single turn is in flight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnWorkingSet {
    pub narration: Option<String>,
    /// Facts retrieved per agent at MEMORY_RETRIEVAL
    #[serde(default)]
    pub facts: BTreeMap<AgentId, Vec<String>>,
    #[serde(default)]
    pub discussion_rounds: u32,
    #[serde(default)]
    pub discussion_elapsed_secs: f64,
    pub consensus: Option<ConsensusResult>,
    #[serde(default)]
    pub intents: BTreeMap<AgentId, AgentContribution>,
    #[serde(default)]
    pub actions: BTreeMap<AgentId, AgentContribution>,
    /// Latest outcome per acting agent
    #[serde(default)]
    pub validations: BTreeMap<AgentId, ValidationOutcome>,
    /// Correction hints handed to each agent so far, oldest first
    #[serde(default)]
    pub hints: BTreeMap<AgentId, Vec<String>>,
    pub ruling: Option<AdjudicationInput>,
    #[serde(default)]
    pub reactions: BTreeMap<AgentId, AgentContribution>,
    #[serde(default)]
    pub warnings: Vec<TurnWarning>,
}

impl TurnWorkingSet {
    /// Every contribution of the turn: intents, then actions, then reactions
    pub fn contributions(&self) -> Vec<AgentContribution> {
        self.intents
            .values()
            .chain(self.actions.values())
            .chain(self.reactions.values())
            .cloned()
            .collect()
    }

    /// Acting agents that still owe a (re)validated action.
    ///
    /// Degraded placeholders are never validated.
    pub fn awaiting_action(&self) -> Vec<AgentId> {
        self.actions
            .iter()
            .filter(|(agent, contribution)| {
                !contribution.degraded
                    && self
                        .validations
                        .get(*agent)
                        .is_none_or(ValidationOutcome::requires_retry)
            })
            .map(|(agent, _)| agent.clone())
            .collect()
    }
}

/// Marker recorded while the session waits for human input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suspension {
    pub phase: Phase,
    pub turn: u64,
    pub since: DateTime<Utc>,
}

/// Result of the last successful resume, kept so that replaying the same
/// input returns it instead of applying the turn twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeReceipt {
    pub turn: u64,
    pub input: AdjudicationInput,
    pub result: TurnResult,
}

/// Flat, serializable record of one session keyed by its number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session: u64,
    /// Current turn; starts at 1 and only ever increments
    pub turn: u64,
    pub phase: Phase,
    pub last_completed_phase: Option<Phase>,
    /// Phases entered during the current turn, in order
    pub phase_history: Vec<Phase>,
    pub participants: Vec<Participant>,
    /// Full message log of the session
    pub messages: Vec<Message>,
    #[serde(default)]
    pub working: TurnWorkingSet,
    pub suspension: Option<Suspension>,
    pub last_resume: Option<ResumeReceipt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session: u64) -> Self {
        let now = Utc::now();
        Self {
            session,
            turn: 1,
            phase: Phase::SessionStart,
            last_completed_phase: None,
            phase_history: vec![Phase::SessionStart],
            participants: Vec::new(),
            messages: Vec::new(),
            working: TurnWorkingSet::default(),
            suspension: None,
            last_resume: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// A turn stopped between phases without reaching a resting point,
    /// e.g. when persisting a committed phase failed.
    pub fn is_interrupted(&self) -> bool {
        !self.is_ended()
            && !self.is_suspended()
            && !matches!(self.phase, Phase::SessionStart | Phase::Narration)
    }

    /// The game master's ruling has been applied to the current turn.
    pub fn is_past_adjudication(&self) -> bool {
        self.phase > Phase::Adjudication && !self.is_ended()
    }

    /// Stamp for messages created in the current phase
    pub fn stamp(&self) -> PhaseStamp {
        PhaseStamp::new(self.session, self.turn, self.phase)
    }

    /// Take the edge selected by `gate` and record it.
    ///
    /// On a gate mismatch the state is left untouched.
    pub fn advance(&mut self, gate: GateResult) -> Result<Phase, DomainError> {
        let next = self.phase.next(gate)?;
        self.last_completed_phase = Some(self.phase);
        self.phase = next;
        self.phase_history.push(next);
        self.updated_at = Utc::now();
        Ok(next)
    }

    /// Clear per-turn data ahead of a new narration.
    pub fn begin_turn(&mut self) {
        self.working = TurnWorkingSet::default();
        self.phase_history = vec![self.phase];
    }

    /// Close the current turn; the counter never decreases.
    pub fn complete_turn(&mut self) {
        self.turn += 1;
    }

    pub fn suspend(&mut self) {
        self.suspension = Some(Suspension {
            phase: self.phase,
            turn: self.turn,
            since: Utc::now(),
        });
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentProfile> {
        self.participants.iter().flat_map(|p| p.agents())
    }

    pub fn participant_of(&self, agent: &AgentId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| &p.strategic.id == agent || &p.character.id == agent)
    }

    /// Snapshot of the current turn for the human interface.
    ///
    /// `turn` is passed explicitly because consolidation may already have
    /// advanced the counter.
    pub fn to_result(&self, turn: u64, status: TurnStatus) -> TurnResult {
        TurnResult {
            session: self.session,
            turn,
            status,
            completed_phase: self.last_completed_phase.unwrap_or(self.phase),
            current_phase: self.phase,
            phase_history: self.phase_history.clone(),
            contributions: self.working.contributions(),
            consensus: self.working.consensus.clone(),
            validations: self.working.validations.clone(),
            warnings: self.working.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentLayer;
    use crate::validation::ViolationKind;

    #[test]
    fn test_new_session_starts_at_turn_one() {
        let state = SessionState::new(4);
        assert_eq!(state.turn, 1);
        assert_eq!(state.phase, Phase::SessionStart);
        assert!(!state.is_ended());
        assert!(!state.is_suspended());
    }

    #[test]
    fn test_advance_records_history() {
        let mut state = SessionState::new(1);
        state.advance(GateResult::Unconditional).unwrap();
        state.advance(GateResult::Unconditional).unwrap();

        assert_eq!(state.phase, Phase::MemoryRetrieval);
        assert_eq!(state.last_completed_phase, Some(Phase::Narration));
        assert_eq!(
            state.phase_history,
            vec![Phase::SessionStart, Phase::Narration, Phase::MemoryRetrieval]
        );
        assert!(Phase::is_valid_path(&state.phase_history));
    }

    #[test]
    fn test_interrupted_excludes_resting_points() {
        let mut state = SessionState::new(1);
        assert!(!state.is_interrupted());
        state.advance(GateResult::Unconditional).unwrap();
        assert!(!state.is_interrupted());

        state.advance(GateResult::Unconditional).unwrap();
        assert!(state.is_interrupted());
        assert!(!state.is_past_adjudication());

        state.phase = Phase::Adjudication;
        state.suspend();
        assert!(!state.is_interrupted());

        state.suspension = None;
        state.phase = Phase::Outcome;
        assert!(state.is_interrupted());
        assert!(state.is_past_adjudication());

        state.phase = Phase::SessionEnd;
        assert!(!state.is_interrupted());
        assert!(!state.is_past_adjudication());
    }

    #[test]
    fn test_corrupt_gate_leaves_state_untouched() {
        let mut state = SessionState::new(1);
        let before = state.clone();
        let err = state.advance(GateResult::HumanInput).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(state, before);
    }

    #[test]
    fn test_awaiting_action_tracks_retries() {
        let mut working = TurnWorkingSet::default();
        for id in ["a.character", "b.character", "c.character"] {
            working.actions.insert(
                id.into(),
                AgentContribution::new(id.into(), AgentLayer::RolePlay, Phase::Action, "x", None),
            );
        }
        working.actions.insert(
            "d.character".into(),
            AgentContribution::placeholder(
                "d.character".into(),
                AgentLayer::RolePlay,
                Phase::Action,
            ),
        );
        working
            .validations
            .insert("a.character".into(), ValidationOutcome::passed("x", 1));
        working.validations.insert(
            "b.character".into(),
            ValidationOutcome::failed("x", 1, ViolationKind::OutcomeLanguage, None, "h"),
        );

        assert_eq!(
            working.awaiting_action(),
            vec![AgentId::from("b.character"), AgentId::from("c.character")]
        );
    }

    #[test]
    fn test_state_survives_serialization() {
        let mut state = SessionState::new(2);
        state.participants.push(Participant::new("alice", "Thorin"));
        state.advance(GateResult::Unconditional).unwrap();
        state.working.narration = Some("A cold wind.".into());
        state.suspend();

        let json = serde_json::to_string(&state).unwrap();
        let restored: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_participant_lookup() {
        let mut state = SessionState::new(1);
        state.participants.push(Participant::new("alice", "Thorin"));
        assert!(state.participant_of(&"alice.character".into()).is_some());
        assert!(state.participant_of(&"bob.player".into()).is_none());
        assert_eq!(state.agents().count(), 2);
    }
}
