//! Consensus classification over a bounded discussion window.

use super::stance::{Position, Stance};
use crate::agent::AgentId;
use crate::channel::{Channel, Message, MessageKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Classification of one discussion round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusClassification {
    Unanimous,
    Majority,
    Conflicted,
    Timeout,
}

impl std::fmt::Display for ConsensusClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusClassification::Unanimous => write!(f, "UNANIMOUS"),
            ConsensusClassification::Majority => write!(f, "MAJORITY"),
            ConsensusClassification::Conflicted => write!(f, "CONFLICTED"),
            ConsensusClassification::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

/// Round and wall-time limits for one discussion phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscussionBudget {
    pub round_limit: u32,
    pub time_limit: Duration,
}

impl Default for DiscussionBudget {
    fn default() -> Self {
        Self {
            round_limit: 3,
            time_limit: Duration::from_secs(120),
        }
    }
}

impl DiscussionBudget {
    pub fn new(round_limit: u32, time_limit: Duration) -> Self {
        Self {
            round_limit,
            time_limit,
        }
    }

    /// Whether another round may still be run
    pub fn remains(&self, rounds_elapsed: u32, elapsed: Duration) -> bool {
        rounds_elapsed < self.round_limit && elapsed < self.time_limit
    }
}

/// Outcome of a discussion phase instance (immutable once computed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub classification: ConsensusClassification,
    pub positions: BTreeMap<AgentId, Position>,
    pub rounds: u32,
    pub elapsed_secs: f64,
    pub proceed: bool,
    pub dissenting: Vec<AgentId>,
}

impl ConsensusResult {
    pub fn count(&self, stance: Stance) -> usize {
        self.positions.values().filter(|p| p.stance == stance).count()
    }

    /// Visual summary in agent-id order (e.g. "[●●○·]")
    pub fn stance_summary(&self) -> String {
        let mut summary = String::from("[");
        for position in self.positions.values() {
            summary.push(position.stance.glyph());
        }
        summary.push(']');
        summary
    }

    /// Aggregate the rationale of dissenting agents into one string
    pub fn dissent_feedback(&self) -> String {
        self.dissenting
            .iter()
            .filter_map(|id| {
                self.positions
                    .get(id)
                    .filter(|p| !p.rationale.is_empty())
                    .map(|p| format!("{}: {}", id, p.rationale))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Stateless consensus classifier
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::time::Duration;
/// use table_domain::agent::AgentId;
/// use table_domain::quorum::{
///     ConsensusClassification, ConsensusDetector, DiscussionBudget, Position,
/// };
///
/// let mut positions: BTreeMap<AgentId, Position> = BTreeMap::new();
/// positions.insert("a".into(), Position::agree("go"));
/// positions.insert("b".into(), Position::silent());
///
/// let budget = DiscussionBudget::default();
/// let result = ConsensusDetector::evaluate(&positions, 1, Duration::ZERO, &budget);
/// assert_eq!(result.classification, ConsensusClassification::Majority);
/// assert!(result.proceed);
/// ```
pub struct ConsensusDetector;

impl ConsensusDetector {
    /// Classify `positions` after `rounds_elapsed` rounds and `elapsed` wall time.
    ///
    /// Priority: unanimous, then majority, then conflicted while budget
    /// remains, then timeout. SILENT agents are excluded from the majority
    /// denominator and block unanimity. A round with no explicit
    /// engagement (every agent silent, or no agents) is conflicted rather
    /// than approved.
    pub fn evaluate(
        positions: &BTreeMap<AgentId, Position>,
        rounds_elapsed: u32,
        elapsed: Duration,
        budget: &DiscussionBudget,
    ) -> ConsensusResult {
        let agree = Self::count(positions, Stance::Agree);
        let disagree = Self::count(positions, Stance::Disagree);
        let non_silent = positions.len() - Self::count(positions, Stance::Silent);

        let with_stance = |stance: Stance| -> Vec<AgentId> {
            positions
                .iter()
                .filter(|(_, p)| p.stance == stance)
                .map(|(id, _)| id.clone())
                .collect()
        };

        let (classification, proceed, dissenting) = if !positions.is_empty()
            && agree == positions.len()
        {
            (ConsensusClassification::Unanimous, true, Vec::new())
        } else if disagree == 0 && non_silent > 0 && agree * 2 > non_silent {
            (ConsensusClassification::Majority, true, Vec::new())
        } else if budget.remains(rounds_elapsed, elapsed) {
            (
                ConsensusClassification::Conflicted,
                false,
                with_stance(Stance::Disagree),
            )
        } else {
            let dissenting = positions
                .iter()
                .filter(|(_, p)| p.stance != Stance::Agree)
                .map(|(id, _)| id.clone())
                .collect();
            (ConsensusClassification::Timeout, true, dissenting)
        };

        ConsensusResult {
            classification,
            positions: positions.clone(),
            rounds: rounds_elapsed,
            elapsed_secs: elapsed.as_secs_f64(),
            proceed,
            dissenting,
        }
    }

    fn count(positions: &BTreeMap<AgentId, Position>, stance: Stance) -> usize {
        positions.values().filter(|p| p.stance == stance).count()
    }
}

/// Collect each expected agent's latest stance for `round` from the
/// out-of-character log. Agents without a stance message are SILENT.
pub fn positions_from_messages(
    expected: &[AgentId],
    messages: &[Message],
    round: u32,
) -> BTreeMap<AgentId, Position> {
    let mut positions: BTreeMap<AgentId, Position> = expected
        .iter()
        .map(|id| (id.clone(), Position::silent()))
        .collect();

    for message in messages {
        if message.channel != Channel::OutOfCharacter || message.round != Some(round) {
            continue;
        }
        if let MessageKind::Stance { stance, confidence } = message.kind
            && let Some(slot) = positions.get_mut(&message.sender)
        {
            *slot = Position::new(stance, message.content.clone()).with_confidence(confidence);
        }
    }

    positions
}
