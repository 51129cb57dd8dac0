//! Domain layer for quorum-table
//!
//! This crate contains the core rules of the table: who may say what,
//! who sees what, when the group agrees, and whether an action is phrased
//! as an attempt. It has no dependencies on infrastructure or presentation
//! concerns.
//!
//! # Core Concepts
//!
//! ## Two layers per participant
//!
//! Every participant is a **strategic** agent (plans out of character) paired
//! with a **role-play** agent (acts in character). The [`ChannelRouter`]
//! keeps the layers' information apart.
//!
//! ## The turn cycle
//!
//! A turn walks a fixed [`Phase`] graph. Two phases are gated by agent
//! output: out-of-character discussion by the [`ConsensusDetector`], and
//! validation by the attempt-language [`validation`] rules. The cycle
//! suspends once per turn for the human game master's ruling.

pub mod agent;
pub mod channel;
pub mod config;
pub mod core;
pub mod quorum;
pub mod turn;
pub mod validation;

// Re-export commonly used types
pub use agent::{AgentId, AgentLayer, AgentProfile, Participant};
pub use channel::{Channel, ChannelRouter, Message, MessageKind, PhaseStamp, Visibility};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::error::DomainError;
pub use quorum::{
    ConsensusClassification, ConsensusDetector, ConsensusResult, DiscussionBudget, Position,
    Stance, parse_stance, positions_from_messages,
};
pub use turn::{
    AdjudicationInput, AdjudicationKind, AgentContribution, GateKind, GateResult, Phase,
    ResumeReceipt, SessionState, TurnResult, TurnStatus, TurnWarning, TurnWarningKind,
    TurnWorkingSet,
};
pub use validation::{MAX_VALIDATION_ATTEMPTS, ValidationOutcome, ViolationKind};
