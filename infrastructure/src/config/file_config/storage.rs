//! Persistence and logging locations from TOML (`[storage]` and
//! `[logging]` sections)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use table_domain::{ConfigIssue, ConfigIssueCode};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Raw `[storage]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding `session-<n>.json` files and `memory.json`
    pub dir: Option<PathBuf>,
}

impl FileStorageConfig {
    /// Configured session directory, else the platform data directory,
    /// else `./.quorum-table/sessions`.
    pub fn session_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("quorum-table").join("sessions"))
                .unwrap_or_else(|| PathBuf::from(".quorum-table").join("sessions"))
        })
    }
}

/// Raw `[logging]` section
///
/// # Example
///
/// ```toml
/// [logging]
/// level = "debug"
/// dir = "~/.local/state/quorum-table"
/// transcript = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Default tracing level when neither `-v` nor `RUST_LOG` is given
    pub level: Option<String>,
    /// Write daily-rotated log files here instead of stderr
    pub dir: Option<PathBuf>,
    /// Write a JSONL transcript of every published message per session
    pub transcript: bool,
}

impl FileLoggingConfig {
    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        match &self.level {
            Some(level) if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) => {
                vec![ConfigIssue::warning(
                    ConfigIssueCode::UnknownValue,
                    "logging.level",
                    format!(
                        "unknown level '{}', expected one of {}",
                        level,
                        LOG_LEVELS.join(", ")
                    ),
                )]
            }
            _ => Vec::new(),
        }
    }

    /// Directory for transcripts: the log directory if set, else the
    /// session directory.
    pub fn transcript_dir(&self, storage: &FileStorageConfig) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| storage.session_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_session_dir_wins() {
        let storage = FileStorageConfig {
            dir: Some(PathBuf::from("/tmp/table")),
        };
        assert_eq!(storage.session_dir(), PathBuf::from("/tmp/table"));
    }

    #[test]
    fn test_default_session_dir_is_namespaced() {
        let dir = FileStorageConfig::default().session_dir();
        assert!(dir.ends_with("quorum-table/sessions"));
    }

    #[test]
    fn test_unknown_log_level_is_a_warning() {
        let logging = FileLoggingConfig {
            level: Some("loud".to_string()),
            ..Default::default()
        };
        let issues = logging.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::UnknownValue);

        let logging = FileLoggingConfig {
            level: Some("DEBUG".to_string()),
            ..Default::default()
        };
        assert!(logging.validate().is_empty());
    }
}
