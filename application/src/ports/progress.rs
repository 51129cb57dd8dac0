//! Progress notification port
//!
//! Defines the interface for reporting progress while a turn runs.

use table_domain::{AgentId, Phase};

/// Callback for progress updates during a turn cycle
///
/// Implementations live in the binary and can display progress in various
/// ways (console, log lines, etc.)
pub trait TurnProgressNotifier: Send + Sync {
    /// Called when a phase starts with the number of agents it invokes
    fn on_phase_start(&self, phase: Phase, agents: usize);

    /// Called when one agent's invocation finishes within a phase
    fn on_agent_complete(&self, phase: Phase, agent: &AgentId, success: bool);

    /// Called when a phase's effects have been committed
    fn on_phase_complete(&self, phase: Phase);

    /// Called when the turn suspends awaiting human input
    fn on_suspended(&self, _session: u64, _turn: u64) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl TurnProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: Phase, _agents: usize) {}
    fn on_agent_complete(&self, _phase: Phase, _agent: &AgentId, _success: bool) {}
    fn on_phase_complete(&self, _phase: Phase) {}
}
