//! Lexical and structural validation rules.
//!
//! Each rule is a pure function over the action text. Quoted speech is
//! split off first: characters may *say* anything, so only the intent
//! clause is checked.

use super::outcome::ViolationKind;
use regex::Regex;
use std::sync::LazyLock;

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|“([^”]*)”"#).expect("QUOTED regex should compile")
});

/// Adverbs asserting the attempt already worked. The only strippable rule.
static OUTCOME_ADVERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(successfully|effortlessly|flawlessly|easily|instantly)\b")
        .expect("OUTCOME_ADVERB regex should compile")
});

static SUCCESS_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(manages? to|managed to|succeeds? (?:in|at|to)|succeeded|is able to)\b")
        .expect("SUCCESS_PHRASE regex should compile")
});

static COMPLETED_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(kills|killed|slays|slew|slain|defeats|defeated|destroys|destroyed|dies|died|hits|lands|landed|misses|missed|knocks? out|knocked out|collapses|crumples|(?:is|are|was|were|falls) (?:dead|unconscious|killed|slain|defeated|destroyed))\b",
    )
    .expect("COMPLETED_RESULT regex should compile")
});

static ATTEMPT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(try|tries|trying|attempt|attempts|attempting|aim|aims|aiming|reach(?:es)? for|move(?:s)? to|want(?:s)? to|intend(?:s)? to|prepare(?:s)? to|ready|readies|going to|look(?:s)? to|lunge(?:s)? at|swing(?:s)? at|will|'ll)\b",
    )
    .expect("ATTEMPT_MARKER regex should compile")
});

static IMPERATIVE_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(kill|slay|defeat|destroy|finish off|knock out|disarm|behead|execute|overpower|subdue|capture|convince|persuade|win)\b",
    )
    .expect("IMPERATIVE_RESULT regex should compile")
});

/// An action decomposed into its intent clause and quoted speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionClauses {
    pub intent: String,
    pub dialogue: Vec<String>,
}

impl ActionClauses {
    pub fn parse(text: &str) -> Self {
        let dialogue = QUOTED
            .captures_iter(text)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let intent = QUOTED
            .replace_all(text, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Self { intent, dialogue }
    }
}

/// A failed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub kind: ViolationKind,
    /// Rule name, e.g. "outcome_adverb"
    pub rule: &'static str,
    /// The matched text
    pub pattern: String,
}

impl RuleViolation {
    fn new(kind: ViolationKind, rule: &'static str, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            rule,
            pattern: pattern.into(),
        }
    }
}

/// Stage 1: reject outcome-asserting vocabulary in the intent clause.
pub fn check_lexical(text: &str) -> Result<(), RuleViolation> {
    let intent = ActionClauses::parse(text).intent;
    let rules: [(&'static str, &LazyLock<Regex>); 3] = [
        ("outcome_adverb", &OUTCOME_ADVERB),
        ("success_phrase", &SUCCESS_PHRASE),
        ("completed_result", &COMPLETED_RESULT),
    ];

    for (rule, regex) in rules {
        if let Some(m) = regex.find(&intent) {
            return Err(RuleViolation::new(
                ViolationKind::OutcomeLanguage,
                rule,
                m.as_str(),
            ));
        }
    }
    Ok(())
}

/// Stage 2: require an intent clause phrased as an attempt.
///
/// Passes when the intent clause carries an attempt marker, or when it
/// contains no completed-result verb at all.
pub fn check_structure(text: &str) -> Result<(), RuleViolation> {
    let clauses = ActionClauses::parse(text);
    if clauses.intent.is_empty() {
        return Err(RuleViolation::new(
            ViolationKind::MissingIntent,
            "empty_intent",
            text.trim(),
        ));
    }
    if ATTEMPT_MARKER.is_match(&clauses.intent) {
        return Ok(());
    }
    match IMPERATIVE_RESULT.find(&clauses.intent) {
        Some(m) => Err(RuleViolation::new(
            ViolationKind::MissingIntent,
            "result_without_attempt",
            m.as_str(),
        )),
        None => Ok(()),
    }
}

/// Strip outcome adverbs from the intent clause when they are the first
/// lexical problem found.
///
/// Returns the rewritten text only if it then passes both stages.
pub fn auto_fix(text: &str) -> Option<String> {
    match check_lexical(text) {
        Err(violation) if violation.rule == "outcome_adverb" => {}
        _ => return None,
    }

    let mut stripped = String::with_capacity(text.len());
    let mut last = 0;
    for quote in QUOTED.find_iter(text) {
        stripped.push_str(&OUTCOME_ADVERB.replace_all(&text[last..quote.start()], ""));
        stripped.push_str(quote.as_str());
        last = quote.end();
    }
    stripped.push_str(&OUTCOME_ADVERB.replace_all(&text[last..], ""));

    let fixed = stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" ,", ",")
        .replace(" .", ".");

    (check_lexical(&fixed).is_ok() && check_structure(&fixed).is_ok()).then_some(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_language_passes_both_stages() {
        let text = "I attempt to strike the creature's leg";
        assert!(check_lexical(text).is_ok());
        assert!(check_structure(text).is_ok());
    }

    #[test]
    fn test_outcome_language_rejected() {
        let err = check_lexical("I successfully kill the creature").unwrap_err();
        assert_eq!(err.kind, ViolationKind::OutcomeLanguage);
        assert_eq!(err.rule, "outcome_adverb");
        assert_eq!(err.pattern, "successfully");
    }

    #[test]
    fn test_third_party_narration_rejected() {
        let err = check_lexical("I swing my axe and the orc falls dead").unwrap_err();
        assert_eq!(err.rule, "completed_result");
        assert_eq!(err.pattern, "falls dead");

        let err = check_lexical("My arrow hits the guard").unwrap_err();
        assert_eq!(err.pattern, "hits");
    }

    #[test]
    fn test_success_phrase_rejected() {
        let err = check_lexical("I manage to pick the lock").unwrap_err();
        assert_eq!(err.rule, "success_phrase");
    }

    #[test]
    fn test_dialogue_is_not_checked() {
        let text = r#"I draw my blade and shout "You're dead, I killed your brother!""#;
        assert!(check_lexical(text).is_ok());
        assert!(check_structure(text).is_ok());
    }

    #[test]
    fn test_clause_split() {
        let clauses =
            ActionClauses::parse(r#"I step forward. "Stand aside." Then I try the door."#);
        assert_eq!(clauses.intent, "I step forward. Then I try the door.");
        assert_eq!(clauses.dialogue, vec!["Stand aside."]);

        let curly = ActionClauses::parse("I bow. “Well met.”");
        assert_eq!(curly.dialogue, vec!["Well met."]);
    }

    #[test]
    fn test_result_verb_without_marker_rejected() {
        let err = check_structure("I kill the goblin").unwrap_err();
        assert_eq!(err.kind, ViolationKind::MissingIntent);
        assert_eq!(err.rule, "result_without_attempt");
        assert_eq!(err.pattern, "kill");
    }

    #[test]
    fn test_result_verb_with_marker_passes() {
        assert!(check_structure("I try to kill the goblin").is_ok());
        assert!(check_structure("I'll attempt to persuade the guard").is_ok());
    }

    #[test]
    fn test_plain_action_without_result_verb_passes() {
        assert!(check_structure("I crouch behind the barrel").is_ok());
    }

    #[test]
    fn test_speech_only_has_no_intent() {
        let err = check_structure(r#""Hello there!""#).unwrap_err();
        assert_eq!(err.rule, "empty_intent");
        assert!(check_structure("   ").is_err());
    }

    #[test]
    fn test_auto_fix_strips_adverb() {
        assert_eq!(
            auto_fix("I successfully climb the wall"),
            Some("I climb the wall".to_string())
        );
        assert_eq!(
            auto_fix("I easily leap the gap, landing softly."),
            Some("I leap the gap, landing softly.".to_string())
        );
    }

    #[test]
    fn test_auto_fix_leaves_dialogue_alone() {
        assert_eq!(
            auto_fix(r#"I easily vault the rail. "That was easily done.""#),
            Some(r#"I vault the rail. "That was easily done.""#.to_string())
        );
    }

    #[test]
    fn test_auto_fix_refuses_deeper_violations() {
        // Stripping the adverb leaves an outcome claim behind
        assert_eq!(auto_fix("I successfully kill the creature"), None);
        assert_eq!(auto_fix("I try to sneak past"), None);
    }
}
