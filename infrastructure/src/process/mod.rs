//! Agents as external processes
//!
//! Every agent is a command line. Each call spawns it once, writes one
//! JSON request to its stdin and reads one JSON answer from its stdout.
//!
//! # Protocol
//!
//! Request (stdin):
//!
//! ```json
//! {"mode": "produce", "context": { ...ProducerContext... }}
//! {"mode": "evaluate", "text": "I attempt to ...", "context": { ... }}
//! ```
//!
//! Answer (stdout): a `ProducedAction` for `produce`
//! (`{"intent_text": "...", "dialogue_text": "...", "metadata": {...}}`)
//! or an `EvaluationVerdict` for `evaluate`
//! (`{"attempt_only": true, "reason": "..."}`). When the agent prints
//! other lines first, the last non-empty line is taken as the answer.
//!
//! The orchestrator owns timeouts; a call it abandons kills the child.

mod gateway;
mod producer;

pub use gateway::ProcessAgentGateway;
pub use producer::{AGENT_ENV, ProcessProducer};
