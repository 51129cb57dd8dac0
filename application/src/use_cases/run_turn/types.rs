//! Type definitions for the RunTurn use case.

use crate::ports::memory_store::MemoryPayload;
use crate::ports::session_repository::SessionStoreError;
use table_domain::{DomainError, GateResult, Message, Participant, Phase, TurnWorkingSet};
use thiserror::Error;

/// Hard failures of a turn cycle call.
///
/// Collaborator failures never appear here: they are absorbed into
/// degraded contributions and warnings on the `TurnResult`.
#[derive(Error, Debug)]
pub enum RunTurnError {
    /// Routing violation or phase state corruption on internally
    /// generated data
    #[error("Invariant violated: {0}")]
    Invariant(#[from] DomainError),

    #[error("Unknown session {0}")]
    UnknownSession(u64),

    #[error("Session {0} has already ended")]
    AlreadyEnded(u64),

    #[error("Session {session} is not suspended at adjudication (current phase: {phase})")]
    NotSuspended { session: u64, phase: Phase },

    #[error("Session {session} cannot start a turn from {phase}")]
    NotReady { session: u64, phase: Phase },

    #[error("Session {requested} is older than the latest session {latest}")]
    SessionOutOfOrder { requested: u64, latest: u64 },

    #[error("Turn number mismatch: session is on turn {expected}, caller asked for {requested}")]
    TurnMismatch { expected: u64, requested: u64 },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] SessionStoreError),
}

impl RunTurnError {
    /// Whether this error reports a broken internal invariant
    pub fn is_invariant(&self) -> bool {
        matches!(self, RunTurnError::Invariant(_))
    }
}

/// Input for [`execute_turn_cycle`](super::RunTurnUseCase::execute_turn_cycle)
#[derive(Debug, Clone)]
pub struct TurnCycleInput {
    pub session: u64,
    pub turn: u64,
    /// The game master's narration opening the turn
    pub narration: String,
    /// Participants active this turn
    pub participants: Vec<Participant>,
}

impl TurnCycleInput {
    pub fn new(session: u64, turn: u64, narration: impl Into<String>) -> Self {
        Self {
            session,
            turn,
            narration: narration.into(),
            participants: Vec::new(),
        }
    }

    pub fn with_participants(mut self, participants: Vec<Participant>) -> Self {
        self.participants = participants;
        self
    }
}

/// Staged effects of one phase, applied together at phase exit
pub(super) struct PhaseExit {
    pub gate: GateResult,
    /// Replacement working set for the turn
    pub working: TurnWorkingSet,
    /// Router-checked messages awaiting publication
    pub messages: Vec<Message>,
    pub memory: Vec<MemoryPayload>,
}

impl PhaseExit {
    pub fn new(gate: GateResult, working: TurnWorkingSet) -> Self {
        Self {
            gate,
            working,
            messages: Vec::new(),
            memory: Vec::new(),
        }
    }
}
