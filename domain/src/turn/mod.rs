//! Turn cycle domain
//!
//! The phase graph ([`Phase`]), per-turn records handed back to the human
//! interface ([`TurnResult`]) and the flat persisted [`SessionState`] that
//! makes suspension at adjudication resumable across processes.

pub mod phase;
pub mod records;
pub mod session;

pub use phase::{GateKind, GateResult, Phase};
pub use records::{
    AdjudicationInput, AdjudicationKind, AgentContribution, TurnResult, TurnStatus, TurnWarning,
    TurnWarningKind,
};
pub use session::{ResumeReceipt, SessionState, Suspension, TurnWorkingSet};
