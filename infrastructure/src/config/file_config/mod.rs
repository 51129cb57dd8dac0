//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod engine;
mod output;
mod participants;
mod storage;

pub use engine::{FileDiscussionConfig, FileEngineConfig, FileMemoryConfig, FileValidationConfig};
pub use output::FileOutputConfig;
pub use participants::FileParticipantConfig;
pub use storage::{FileLoggingConfig, FileStorageConfig};

use serde::{Deserialize, Serialize};
use table_application::EngineConfig;
use table_domain::{ConfigIssue, Participant};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Timeouts, retries and summary length
    pub engine: FileEngineConfig,
    /// Out-of-character discussion budget
    pub discussion: FileDiscussionConfig,
    /// Action validation strictness
    pub validation: FileValidationConfig,
    /// Memory retrieval settings
    pub memory: FileMemoryConfig,
    /// Where sessions are persisted
    pub storage: FileStorageConfig,
    /// Log files and transcripts
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Seats at the table, in turn order
    pub participants: Vec<FileParticipantConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks engine ranges, the log level and the participant list.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.to_engine_config().1;
        issues.extend(self.logging.validate());
        issues.extend(participants::validate_participants(&self.participants));
        issues
    }

    /// Convert to the application's [`EngineConfig`], returning the issues
    /// found on the way.
    pub fn to_engine_config(&self) -> (EngineConfig, Vec<ConfigIssue>) {
        engine::build_engine_config(&self.engine, &self.discussion, &self.validation, &self.memory)
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.participants
            .iter()
            .map(FileParticipantConfig::to_participant)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use table_domain::{ConfigIssueCode, OutputFormat};

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[engine]
agent_timeout_secs = 30
collaborator_retries = 1

[discussion]
round_limit = 2
time_limit_secs = 45

[validation]
max_attempts = 2
auto_fix = true

[memory]
retrieval_limit = 8

[storage]
dir = "/var/lib/table"

[logging]
level = "debug"
transcript = true

[output]
format = "json"
color = false

[[participants]]
name = "alice"
character = "Thorin"
command = ["agent", "--seat", "alice"]

[[participants]]
name = "bob"
strategic_command = ["planner"]
character_command = ["actor", "--name", "Lyra"]
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.agent_timeout_secs, 30);
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert!(!config.output.color);
        assert!(config.logging.transcript);
        assert_eq!(config.participants.len(), 2);
        assert!(config.validate().is_empty());

        let (engine, _) = config.to_engine_config();
        assert_eq!(engine.agent_timeout, Duration::from_secs(30));
        assert_eq!(engine.collaborator_retries, 1);
        assert_eq!(engine.discussion.round_limit, 2);
        assert_eq!(engine.max_validation_attempts, 2);
        assert!(engine.auto_fix);
        assert!(engine.semantic_check);
        assert_eq!(engine.retrieval_limit, 8);

        let participants = config.participants();
        assert_eq!(participants[0].character.display_name, "Thorin");
        assert_eq!(participants[1].character.id.as_str(), "bob.character");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[discussion]
round_limit = 5
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.discussion.round_limit, 5);
        // Defaults should apply
        assert_eq!(config.discussion.time_limit_secs, 120);
        assert_eq!(config.validation.max_attempts, 3);
        assert!(config.output.color);
        assert!(config.participants.is_empty());
    }

    #[test]
    fn test_default_config_only_warns_about_empty_table() {
        let issues = FileConfig::default().validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::NoParticipants);
    }
}
