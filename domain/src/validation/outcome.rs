//! Validation outcome record

use serde::{Deserialize, Serialize};

/// Attempts allowed before an action is waved through with a warning
pub const MAX_VALIDATION_ATTEMPTS: u8 = 3;

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Stage 1: outcome-asserting vocabulary
    OutcomeLanguage,
    /// Stage 2: no intent clause or attempt marker
    MissingIntent,
    /// Stage 3: the evaluator judged the text to narrate an outcome
    SemanticOutcome,
}

impl ViolationKind {
    pub fn as_str(&self) -> &str {
        match self {
            ViolationKind::OutcomeLanguage => "outcome_language",
            ViolationKind::MissingIntent => "missing_intent",
            ViolationKind::SemanticOutcome => "semantic_outcome",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of validating one action attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// 1-based attempt number
    pub attempt: u8,
    pub violation: Option<ViolationKind>,
    /// Text fragment that triggered the violation
    pub detected_pattern: Option<String>,
    pub suggestion: Option<String>,
    /// Final action text (possibly auto-fixed)
    pub action_text: String,
    pub auto_fixed: bool,
    /// Raised when the attempt budget was spent; needs human review
    pub warning_flag: bool,
}

impl ValidationOutcome {
    pub fn passed(action_text: impl Into<String>, attempt: u8) -> Self {
        Self {
            valid: true,
            attempt,
            violation: None,
            detected_pattern: None,
            suggestion: None,
            action_text: action_text.into(),
            auto_fixed: false,
            warning_flag: false,
        }
    }

    pub fn fixed(fixed_text: impl Into<String>, attempt: u8, pattern: impl Into<String>) -> Self {
        Self {
            detected_pattern: Some(pattern.into()),
            auto_fixed: true,
            ..Self::passed(fixed_text, attempt)
        }
    }

    pub fn failed(
        action_text: impl Into<String>,
        attempt: u8,
        violation: ViolationKind,
        detected_pattern: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        let warning_flag = attempt >= MAX_VALIDATION_ATTEMPTS;
        Self {
            valid: false,
            attempt,
            violation: Some(violation),
            detected_pattern,
            suggestion: Some(suggestion.into()),
            action_text: action_text.into(),
            auto_fixed: false,
            warning_flag,
        }
    }

    /// Mark a failure as the last one allowed; the action goes through
    /// with the warning flag raised.
    pub fn exhausted(mut self) -> Self {
        if !self.valid {
            self.warning_flag = true;
        }
        self
    }

    /// Whether the caller must re-produce the action and validate again
    pub fn requires_retry(&self) -> bool {
        !self.valid && !self.warning_flag
    }

    /// Whether this outcome ends the retry loop (passed or budget spent)
    pub fn is_settled(&self) -> bool {
        !self.requires_retry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_flags_only_on_last_attempt() {
        let first = ValidationOutcome::failed(
            "x",
            1,
            ViolationKind::OutcomeLanguage,
            None,
            "hint",
        );
        assert!(first.requires_retry());
        assert!(!first.warning_flag);

        let last = ValidationOutcome::failed(
            "x",
            MAX_VALIDATION_ATTEMPTS,
            ViolationKind::OutcomeLanguage,
            None,
            "hint",
        );
        assert!(!last.requires_retry());
        assert!(last.is_settled());
        assert!(last.warning_flag);
    }

    #[test]
    fn test_fixed_outcome_is_valid() {
        let outcome = ValidationOutcome::fixed("I strike", 1, "successfully");
        assert!(outcome.valid);
        assert!(outcome.auto_fixed);
        assert!(outcome.is_settled());
    }

    #[test]
    fn test_violation_codes() {
        assert_eq!(ViolationKind::OutcomeLanguage.to_string(), "outcome_language");
        assert_eq!(ViolationKind::MissingIntent.to_string(), "missing_intent");
        assert_eq!(ViolationKind::SemanticOutcome.to_string(), "semantic_outcome");
    }
}
