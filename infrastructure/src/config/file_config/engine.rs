//! Turn cycle configuration from TOML (`[engine]`, `[discussion]`,
//! `[validation]` and `[memory]` sections)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use table_application::EngineConfig;
use table_domain::{ConfigIssue, ConfigIssueCode, DiscussionBudget, MAX_VALIDATION_ATTEMPTS};

/// Shortest in-character summary worth showing strategic agents.
const MIN_SUMMARY_LEN: usize = 16;

/// Raw `[engine]` section
///
/// # Example
///
/// ```toml
/// [engine]
/// agent_timeout_secs = 60
/// collaborator_retries = 2
/// summary_len = 160
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Budget for a single producer or memory call.
    pub agent_timeout_secs: u64,
    /// Retries after the first failed collaborator call.
    pub collaborator_retries: u32,
    /// Byte budget of in-character summaries shown to strategic agents.
    pub summary_len: usize,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            agent_timeout_secs: engine.agent_timeout.as_secs(),
            collaborator_retries: engine.collaborator_retries,
            summary_len: engine.summary_len,
        }
    }
}

/// Raw `[discussion]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscussionConfig {
    pub round_limit: u32,
    pub time_limit_secs: u64,
}

impl Default for FileDiscussionConfig {
    fn default() -> Self {
        let budget = DiscussionBudget::default();
        Self {
            round_limit: budget.round_limit,
            time_limit_secs: budget.time_limit.as_secs(),
        }
    }
}

/// Raw `[validation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileValidationConfig {
    /// Attempts before an action goes through flagged (1 to 3).
    pub max_attempts: u8,
    /// Strip outcome adverbs instead of rejecting.
    pub auto_fix: bool,
    /// Ask the agent's evaluator on retries.
    pub semantic_check: bool,
}

impl Default for FileValidationConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            max_attempts: engine.max_validation_attempts,
            auto_fix: engine.auto_fix,
            semantic_check: engine.semantic_check,
        }
    }
}

/// Raw `[memory]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMemoryConfig {
    /// Facts retrieved per agent per turn.
    pub retrieval_limit: usize,
}

impl Default for FileMemoryConfig {
    fn default() -> Self {
        Self {
            retrieval_limit: EngineConfig::default().retrieval_limit,
        }
    }
}

/// Build the [`EngineConfig`] from the four turn cycle sections.
///
/// Out-of-range values fall back to their defaults (or are clamped) and
/// are reported as warnings.
pub(super) fn build_engine_config(
    engine: &FileEngineConfig,
    discussion: &FileDiscussionConfig,
    validation: &FileValidationConfig,
    memory: &FileMemoryConfig,
) -> (EngineConfig, Vec<ConfigIssue>) {
    let defaults = EngineConfig::default();
    let mut issues = Vec::new();
    let mut out_of_range = |key: &str, message: String| {
        issues.push(ConfigIssue::warning(ConfigIssueCode::OutOfRange, key, message));
    };

    let agent_timeout = if engine.agent_timeout_secs == 0 {
        out_of_range(
            "engine.agent_timeout_secs",
            format!("must be at least 1, using {}", defaults.agent_timeout.as_secs()),
        );
        defaults.agent_timeout
    } else {
        Duration::from_secs(engine.agent_timeout_secs)
    };

    let summary_len = if engine.summary_len < MIN_SUMMARY_LEN {
        out_of_range(
            "engine.summary_len",
            format!(
                "{} is below the minimum of {}, using {}",
                engine.summary_len, MIN_SUMMARY_LEN, defaults.summary_len
            ),
        );
        defaults.summary_len
    } else {
        engine.summary_len
    };

    let round_limit = if discussion.round_limit == 0 {
        out_of_range(
            "discussion.round_limit",
            format!("must be at least 1, using {}", defaults.discussion.round_limit),
        );
        defaults.discussion.round_limit
    } else {
        discussion.round_limit
    };

    let time_limit = if discussion.time_limit_secs == 0 {
        out_of_range(
            "discussion.time_limit_secs",
            format!(
                "must be at least 1, using {}",
                defaults.discussion.time_limit.as_secs()
            ),
        );
        defaults.discussion.time_limit
    } else {
        Duration::from_secs(discussion.time_limit_secs)
    };

    if !(1..=MAX_VALIDATION_ATTEMPTS).contains(&validation.max_attempts) {
        out_of_range(
            "validation.max_attempts",
            format!(
                "{} is outside 1..={}, clamping",
                validation.max_attempts, MAX_VALIDATION_ATTEMPTS
            ),
        );
    }

    if memory.retrieval_limit == 0 {
        out_of_range(
            "memory.retrieval_limit",
            "0 disables fact retrieval for every agent".to_string(),
        );
    }

    let config = EngineConfig::default()
        .with_agent_timeout(agent_timeout)
        .with_collaborator_retries(engine.collaborator_retries)
        .with_summary_len(summary_len)
        .with_discussion_budget(DiscussionBudget::new(round_limit, time_limit))
        .with_max_validation_attempts(validation.max_attempts)
        .with_auto_fix(validation.auto_fix)
        .with_semantic_check(validation.semantic_check)
        .with_retrieval_limit(memory.retrieval_limit);

    (config, issues)
}
