//! Engine parameters for the turn cycle.
//!
//! [`EngineConfig`] groups the static parameters that bound the turn
//! cycle: per-agent timeouts, collaborator retries, the discussion budget
//! and validation strictness. These are application-layer concerns, not
//! domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use table_domain::channel::router::DEFAULT_SUMMARY_LEN;
use table_domain::{DiscussionBudget, MAX_VALIDATION_ATTEMPTS};

/// Turn cycle control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Budget for a single producer or memory call.
    pub agent_timeout: Duration,
    /// Retries after the first failed collaborator call.
    pub collaborator_retries: u32,
    /// Validation attempts before an action goes through with a warning.
    pub max_validation_attempts: u8,
    /// Round and wall-time limits for out-of-character discussion.
    pub discussion: DiscussionBudget,
    /// Facts retrieved per agent per turn.
    pub retrieval_limit: usize,
    /// Byte budget of in-character summaries shown to strategic agents.
    pub summary_len: usize,
    /// Strip outcome adverbs instead of rejecting.
    pub auto_fix: bool,
    /// Ask the evaluator on retries.
    pub semantic_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(60),
            collaborator_retries: 2,
            max_validation_attempts: MAX_VALIDATION_ATTEMPTS,
            discussion: DiscussionBudget::default(),
            retrieval_limit: 5,
            summary_len: DEFAULT_SUMMARY_LEN,
            auto_fix: false,
            semantic_check: true,
        }
    }
}

impl EngineConfig {
    // ==================== Builder Methods ====================

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn with_collaborator_retries(mut self, retries: u32) -> Self {
        self.collaborator_retries = retries;
        self
    }

    /// Clamped to `1..=MAX_VALIDATION_ATTEMPTS`.
    pub fn with_max_validation_attempts(mut self, attempts: u8) -> Self {
        self.max_validation_attempts = attempts.clamp(1, MAX_VALIDATION_ATTEMPTS);
        self
    }

    pub fn with_discussion_budget(mut self, budget: DiscussionBudget) -> Self {
        self.discussion = budget;
        self
    }

    pub fn with_retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval_limit = limit;
        self
    }

    pub fn with_summary_len(mut self, len: usize) -> Self {
        self.summary_len = len;
        self
    }

    pub fn with_auto_fix(mut self, enabled: bool) -> Self {
        self.auto_fix = enabled;
        self
    }

    pub fn with_semantic_check(mut self, enabled: bool) -> Self {
        self.semantic_check = enabled;
        self
    }

    /// Total invocations per collaborator call (first try plus retries)
    pub fn collaborator_attempts(&self) -> u32 {
        self.collaborator_retries + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = EngineConfig::default();
        assert_eq!(config.agent_timeout, Duration::from_secs(60));
        assert_eq!(config.collaborator_retries, 2);
        assert_eq!(config.collaborator_attempts(), 3);
        assert_eq!(config.max_validation_attempts, 3);
        assert_eq!(config.discussion.round_limit, 3);
        assert_eq!(config.discussion.time_limit, Duration::from_secs(120));
        assert_eq!(config.retrieval_limit, 5);
        assert_eq!(config.summary_len, 160);
        assert!(!config.auto_fix);
        assert!(config.semantic_check);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_agent_timeout(Duration::from_secs(5))
            .with_collaborator_retries(0)
            .with_auto_fix(true)
            .with_max_validation_attempts(9);

        assert_eq!(config.agent_timeout, Duration::from_secs(5));
        assert_eq!(config.collaborator_attempts(), 1);
        assert!(config.auto_fix);
        assert_eq!(config.max_validation_attempts, MAX_VALIDATION_ATTEMPTS);
    }
}
