//! Structured configuration issues.
//!
//! Configuration loaders report problems as [`ConfigIssue`] values rather
//! than failing outright, so the caller decides whether to abort or warn.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the value was clamped or ignored.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A numeric value outside its accepted range.
    OutOfRange,
    /// A string value that names no known option.
    UnknownValue,
    /// Two participants share a name, so their agent ids would collide.
    DuplicateParticipant,
    /// A participant has no command to run its agents.
    MissingCommand,
    /// No participants configured; every agent-driven phase will be skipped.
    NoParticipants,
}

/// A detected issue in the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    /// Dotted key the issue refers to (e.g. `"discussion.round_limit"`)
    pub key: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(
        code: ConfigIssueCode,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            code,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn warning(
        code: ConfigIssueCode,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", label, self.key, self.message)
    }
}
