//! Quorum discussion domain
//!
//! Strategic agents discuss out of character in bounded rounds. After each
//! round every agent's declared [`Stance`] is aggregated by the
//! [`ConsensusDetector`] into one of four classifications:
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────────┬─────────┐
//! │ UNANIMOUS  │ every agent AGREE                        │ proceed │
//! │ MAJORITY   │ no DISAGREE, > half of non-silent AGREE  │ proceed │
//! │ CONFLICTED │ budget remains, no agreement yet         │ loop    │
//! │ TIMEOUT    │ round/time budget spent                  │ proceed │
//! └────────────┴──────────────────────────────────────────┴─────────┘
//! ```
//!
//! This is a small-group agreement heuristic, not a fault-tolerant
//! distributed protocol. Silence never blocks progress.

pub mod consensus;
pub mod parsing;
pub mod stance;

pub use consensus::{
    ConsensusClassification, ConsensusDetector, ConsensusResult, DiscussionBudget,
    positions_from_messages,
};
pub use parsing::parse_stance;
pub use stance::{Position, Stance};
