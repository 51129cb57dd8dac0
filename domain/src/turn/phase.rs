//! Turn phases and the transition function.
//!
//! ```text
//! SESSION_START → NARRATION → MEMORY_RETRIEVAL → OOC_DISCUSSION ⟲
//!   → STRATEGIC_INTENT → DIRECTIVE → ACTION ⇄ VALIDATION
//!   → ADJUDICATION (suspends) → RESOLUTION → OUTCOME → REACTION
//!   → MEMORY_CONSOLIDATION → NARRATION (next turn) | SESSION_END
//! ```
//!
//! Any non-terminal phase may additionally be torn down to `SESSION_END`.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// One stage of the turn cycle, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    SessionStart,
    Narration,
    MemoryRetrieval,
    OocDiscussion,
    StrategicIntent,
    Directive,
    Action,
    Validation,
    Adjudication,
    Resolution,
    Outcome,
    Reaction,
    MemoryConsolidation,
    SessionEnd,
}

impl Phase {
    /// Every phase, in order.
    pub const ALL: [Phase; 14] = [
        Phase::SessionStart,
        Phase::Narration,
        Phase::MemoryRetrieval,
        Phase::OocDiscussion,
        Phase::StrategicIntent,
        Phase::Directive,
        Phase::Action,
        Phase::Validation,
        Phase::Adjudication,
        Phase::Resolution,
        Phase::Outcome,
        Phase::Reaction,
        Phase::MemoryConsolidation,
        Phase::SessionEnd,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Phase::SessionStart => "SESSION_START",
            Phase::Narration => "NARRATION",
            Phase::MemoryRetrieval => "MEMORY_RETRIEVAL",
            Phase::OocDiscussion => "OOC_DISCUSSION",
            Phase::StrategicIntent => "STRATEGIC_INTENT",
            Phase::Directive => "DIRECTIVE",
            Phase::Action => "ACTION",
            Phase::Validation => "VALIDATION",
            Phase::Adjudication => "ADJUDICATION",
            Phase::Resolution => "RESOLUTION",
            Phase::Outcome => "OUTCOME",
            Phase::Reaction => "REACTION",
            Phase::MemoryConsolidation => "MEMORY_CONSOLIDATION",
            Phase::SessionEnd => "SESSION_END",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Phase::SessionStart => "Session Start",
            Phase::Narration => "Narration",
            Phase::MemoryRetrieval => "Memory Retrieval",
            Phase::OocDiscussion => "Out-of-Character Discussion",
            Phase::StrategicIntent => "Strategic Intent",
            Phase::Directive => "Directive",
            Phase::Action => "Action",
            Phase::Validation => "Validation",
            Phase::Adjudication => "Adjudication",
            Phase::Resolution => "Resolution",
            Phase::Outcome => "Outcome",
            Phase::Reaction => "Reaction",
            Phase::MemoryConsolidation => "Memory Consolidation",
            Phase::SessionEnd => "Session End",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::SessionEnd)
    }

    /// The only phase that yields control to an external actor.
    pub fn is_suspension_point(&self) -> bool {
        matches!(self, Phase::Adjudication)
    }

    /// The kind of gate this phase is exited through.
    pub fn expected_gate(&self) -> Option<GateKind> {
        match self {
            Phase::OocDiscussion => Some(GateKind::Consensus),
            Phase::Validation => Some(GateKind::Validation),
            Phase::Adjudication => Some(GateKind::HumanInput),
            Phase::MemoryConsolidation => Some(GateKind::Continuation),
            Phase::SessionEnd => None,
            _ => Some(GateKind::Unconditional),
        }
    }

    /// Whether an agent-driven gate may be bypassed when no agents are assigned.
    fn accepts_skip(&self) -> bool {
        matches!(self, Phase::OocDiscussion | Phase::Validation)
    }

    /// Successor on the fixed single-successor edge, if there is one.
    fn fixed_successor(&self) -> Option<Phase> {
        match self {
            Phase::SessionStart => Some(Phase::Narration),
            Phase::Narration => Some(Phase::MemoryRetrieval),
            Phase::MemoryRetrieval => Some(Phase::OocDiscussion),
            Phase::OocDiscussion => Some(Phase::StrategicIntent),
            Phase::StrategicIntent => Some(Phase::Directive),
            Phase::Directive => Some(Phase::Action),
            Phase::Action => Some(Phase::Validation),
            Phase::Validation => Some(Phase::Adjudication),
            Phase::Adjudication => Some(Phase::Resolution),
            Phase::Resolution => Some(Phase::Outcome),
            Phase::Outcome => Some(Phase::Reaction),
            Phase::Reaction => Some(Phase::MemoryConsolidation),
            Phase::MemoryConsolidation => Some(Phase::Narration),
            Phase::SessionEnd => None,
        }
    }

    /// Transition function: the phase that follows `self` given `gate`.
    ///
    /// A gate that does not belong to this phase is a broken invariant and
    /// yields [`DomainError::PhaseStateCorruption`].
    pub fn next(self, gate: GateResult) -> Result<Phase, DomainError> {
        let corrupt = || DomainError::PhaseStateCorruption {
            phase: self,
            gate: gate.kind(),
        };

        if self.is_terminal() {
            return Err(corrupt());
        }
        if let GateResult::Teardown = gate {
            return Ok(Phase::SessionEnd);
        }
        if let GateResult::Skipped = gate {
            return if self.accepts_skip() {
                self.fixed_successor().ok_or_else(corrupt)
            } else {
                Err(corrupt())
            };
        }
        if self.expected_gate() != Some(gate.kind()) {
            return Err(corrupt());
        }

        match (self, gate) {
            (Phase::OocDiscussion, GateResult::Consensus { proceed: false }) => {
                Ok(Phase::OocDiscussion)
            }
            (Phase::Validation, GateResult::Validation { retry: true }) => Ok(Phase::Action),
            (Phase::MemoryConsolidation, GateResult::Continuation { end_session: true }) => {
                Ok(Phase::SessionEnd)
            }
            _ => self.fixed_successor().ok_or_else(corrupt),
        }
    }

    /// Whether `from → to` is an edge of the phase graph.
    pub fn is_legal_edge(from: Phase, to: Phase) -> bool {
        if from.is_terminal() {
            return false;
        }
        if to == Phase::SessionEnd {
            return true;
        }
        from.fixed_successor() == Some(to)
            || (from == Phase::OocDiscussion && to == Phase::OocDiscussion)
            || (from == Phase::Validation && to == Phase::Action)
    }

    /// Whether a sequence of phases is a valid walk through the graph.
    pub fn is_valid_path(path: &[Phase]) -> bool {
        path.windows(2).all(|w| Phase::is_legal_edge(w[0], w[1]))
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Phase::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("Unknown phase: {}", s))
    }
}

/// Result of a phase's gate, fed into [`Phase::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateResult {
    /// Single-successor edge
    Unconditional,
    /// The phase had no assigned agents; its gate was not evaluated
    Skipped,
    /// Consensus Detector decision
    Consensus { proceed: bool },
    /// Validation Pipeline decision; `retry` when any action must be re-produced
    Validation { retry: bool },
    /// External human input was supplied
    HumanInput,
    /// End of turn: continue to the next narration or end the session
    Continuation { end_session: bool },
    /// External teardown
    Teardown,
}

impl GateResult {
    pub fn kind(&self) -> GateKind {
        match self {
            GateResult::Unconditional => GateKind::Unconditional,
            GateResult::Skipped => GateKind::Skipped,
            GateResult::Consensus { .. } => GateKind::Consensus,
            GateResult::Validation { .. } => GateKind::Validation,
            GateResult::HumanInput => GateKind::HumanInput,
            GateResult::Continuation { .. } => GateKind::Continuation,
            GateResult::Teardown => GateKind::Teardown,
        }
    }
}

/// Discriminant of [`GateResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    Unconditional,
    Skipped,
    Consensus,
    Validation,
    HumanInput,
    Continuation,
    Teardown,
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GateKind::Unconditional => "unconditional",
            GateKind::Skipped => "skipped",
            GateKind::Consensus => "consensus",
            GateKind::Validation => "validation",
            GateKind::HumanInput => "human input",
            GateKind::Continuation => "continuation",
            GateKind::Teardown => "teardown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourteen_totally_ordered_phases() {
        assert_eq!(Phase::ALL.len(), 14);
        assert!(Phase::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unconditional_chain() {
        let mut phase = Phase::SessionStart;
        let mut path = vec![phase];
        while phase != Phase::OocDiscussion {
            phase = phase.next(GateResult::Unconditional).unwrap();
            path.push(phase);
        }
        assert_eq!(
            path,
            vec![
                Phase::SessionStart,
                Phase::Narration,
                Phase::MemoryRetrieval,
                Phase::OocDiscussion
            ]
        );
    }

    #[test]
    fn test_consensus_gate() {
        assert_eq!(
            Phase::OocDiscussion.next(GateResult::Consensus { proceed: false }),
            Ok(Phase::OocDiscussion)
        );
        assert_eq!(
            Phase::OocDiscussion.next(GateResult::Consensus { proceed: true }),
            Ok(Phase::StrategicIntent)
        );
    }

    #[test]
    fn test_validation_gate() {
        assert_eq!(
            Phase::Validation.next(GateResult::Validation { retry: true }),
            Ok(Phase::Action)
        );
        assert_eq!(
            Phase::Validation.next(GateResult::Validation { retry: false }),
            Ok(Phase::Adjudication)
        );
    }

    #[test]
    fn test_adjudication_requires_human_input() {
        assert!(Phase::Adjudication.is_suspension_point());
        assert_eq!(
            Phase::Adjudication.next(GateResult::HumanInput),
            Ok(Phase::Resolution)
        );
        assert!(Phase::Adjudication
            .next(GateResult::Unconditional)
            .unwrap_err()
            .is_corruption());
    }

    #[test]
    fn test_continuation_gate() {
        assert_eq!(
            Phase::MemoryConsolidation.next(GateResult::Continuation { end_session: false }),
            Ok(Phase::Narration)
        );
        assert_eq!(
            Phase::MemoryConsolidation.next(GateResult::Continuation { end_session: true }),
            Ok(Phase::SessionEnd)
        );
    }

    #[test]
    fn test_mismatched_gate_is_corruption() {
        assert_eq!(
            Phase::Action.next(GateResult::Consensus { proceed: true }),
            Err(DomainError::PhaseStateCorruption {
                phase: Phase::Action,
                gate: GateKind::Consensus,
            })
        );
        assert!(Phase::Narration
            .next(GateResult::Validation { retry: false })
            .is_err());
        assert!(Phase::Directive.next(GateResult::Skipped).is_err());
    }

    #[test]
    fn test_skip_only_on_agent_gates() {
        assert_eq!(
            Phase::OocDiscussion.next(GateResult::Skipped),
            Ok(Phase::StrategicIntent)
        );
        assert_eq!(
            Phase::Validation.next(GateResult::Skipped),
            Ok(Phase::Adjudication)
        );
    }

    #[test]
    fn test_teardown_from_any_live_phase() {
        for phase in Phase::ALL {
            let result = phase.next(GateResult::Teardown);
            if phase.is_terminal() {
                assert!(result.is_err());
            } else {
                assert_eq!(result, Ok(Phase::SessionEnd));
            }
        }
    }

    #[test]
    fn test_session_end_is_terminal() {
        for gate in [
            GateResult::Unconditional,
            GateResult::HumanInput,
            GateResult::Continuation { end_session: false },
        ] {
            assert!(Phase::SessionEnd.next(gate).is_err());
        }
    }

    #[test]
    fn test_every_transition_is_a_legal_edge() {
        let gates = [
            GateResult::Unconditional,
            GateResult::Skipped,
            GateResult::Consensus { proceed: true },
            GateResult::Consensus { proceed: false },
            GateResult::Validation { retry: true },
            GateResult::Validation { retry: false },
            GateResult::HumanInput,
            GateResult::Continuation { end_session: true },
            GateResult::Continuation { end_session: false },
            GateResult::Teardown,
        ];
        for phase in Phase::ALL {
            for gate in gates {
                if let Ok(next) = phase.next(gate) {
                    assert!(
                        Phase::is_legal_edge(phase, next),
                        "{} --{:?}--> {} is not a graph edge",
                        phase,
                        gate,
                        next
                    );
                }
            }
        }
    }

    #[test]
    fn test_illegal_jumps() {
        assert!(!Phase::is_legal_edge(Phase::Narration, Phase::Action));
        assert!(!Phase::is_legal_edge(Phase::Action, Phase::Adjudication));
        assert!(!Phase::is_legal_edge(Phase::SessionEnd, Phase::Narration));
        assert!(!Phase::is_valid_path(&[
            Phase::Narration,
            Phase::OocDiscussion
        ]));
    }

    #[test]
    fn test_parse_phase() {
        assert_eq!("ooc-discussion".parse::<Phase>(), Ok(Phase::OocDiscussion));
        assert_eq!("SESSION_END".parse::<Phase>(), Ok(Phase::SessionEnd));
        assert!("lunch".parse::<Phase>().is_err());
    }
}
