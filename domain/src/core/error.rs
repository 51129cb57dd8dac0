//! Domain error types

use crate::agent::AgentId;
use crate::channel::Channel;
use crate::turn::phase::{GateKind, Phase};
use thiserror::Error;

/// Domain-level errors
///
/// Every variant here is a contract violation. Runtime failures of
/// collaborators never reach this type; they are absorbed by the
/// orchestrator and surface as degraded contributions instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Agent {sender} may not publish on the {channel} channel: {reason}")]
    InvalidChannel {
        sender: AgentId,
        channel: Channel,
        reason: String,
    },

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Phase state corruption: {phase} cannot consume a {gate} gate")]
    PhaseStateCorruption { phase: Phase, gate: GateKind },
}

impl DomainError {
    /// Routing violations are rejected at publish time and never enter the log.
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidChannel { .. } | DomainError::UnknownAgent(_)
        )
    }

    /// Check if this error represents a broken phase invariant
    pub fn is_corruption(&self) -> bool {
        matches!(self, DomainError::PhaseStateCorruption { .. })
    }
}
