//! Escalating correction hints

use super::outcome::{MAX_VALIDATION_ATTEMPTS, ViolationKind};

/// Template offered on the final attempt
pub const STRICT_TEMPLATE: &str = "I attempt to <verb> <target> [by <method>].";

/// Build the correction hint for a failed attempt.
///
/// Attempt 1 gets a gentle reminder, attempt 2 names the offending text,
/// and the last attempt hands over a fill-in template.
pub fn correction_hint(attempt: u8, violation: ViolationKind, pattern: Option<&str>) -> String {
    let problem = match violation {
        ViolationKind::OutcomeLanguage => "describes how the action turns out",
        ViolationKind::MissingIntent => "does not state what your character is trying to do",
        ViolationKind::SemanticOutcome => "narrates a result the Dungeon Master has not ruled on",
    };

    match attempt {
        0 | 1 => format!(
            "Your action {problem}. Describe only what your character attempts; the Dungeon Master decides the outcome."
        ),
        a if a < MAX_VALIDATION_ATTEMPTS => match pattern {
            Some(p) if !p.is_empty() => format!(
                "Your action {problem}: remove \"{p}\" and phrase it as an attempt (\"I try to...\", \"I attempt to...\")."
            ),
            _ => format!(
                "Your action {problem}. Phrase it as an attempt (\"I try to...\", \"I attempt to...\")."
            ),
        },
        _ => format!(
            "Final attempt. Your action {problem}. Use exactly this form: {STRICT_TEMPLATE}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_escalate() {
        let first = correction_hint(1, ViolationKind::OutcomeLanguage, Some("successfully"));
        let second = correction_hint(2, ViolationKind::OutcomeLanguage, Some("successfully"));
        let third = correction_hint(3, ViolationKind::OutcomeLanguage, Some("successfully"));

        assert!(!first.contains("successfully"));
        assert!(second.contains("\"successfully\""));
        assert!(third.contains(STRICT_TEMPLATE));
        assert_ne!(first, second);
    }

    #[test]
    fn test_second_hint_without_pattern() {
        let hint = correction_hint(2, ViolationKind::SemanticOutcome, None);
        assert!(hint.contains("I try to"));
        assert!(!hint.contains("remove"));
    }
}
