//! Stance parsing for producers that answer in prose.
//!
//! Pure text pattern matching, no I/O. Structured answers are preferred;
//! keyword matching is the fallback.
//!
//! | Input | Result |
//! |-------|--------|
//! | `{"stance": "agree", "confidence": 0.8}` | AGREE, 0.8 |
//! | `I DISAGREE, the bridge is trapped` | DISAGREE |
//! | `Agree.` | AGREE |
//! | `Not sure yet` | NEUTRAL (conservative) |
//! | empty | SILENT |

use super::stance::{Position, Stance};

/// Confidence assigned when the text does not state one
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Parse a free-form discussion contribution into a [`Position`].
///
/// # Examples
///
/// ```
/// use table_domain::quorum::{parse_stance, Stance};
///
/// let json = r#"{"stance": "disagree", "confidence": 0.9}"#;
/// assert_eq!(parse_stance(json).stance, Stance::Disagree);
/// assert_eq!(parse_stance("I agree with the plan").stance, Stance::Agree);
/// assert_eq!(parse_stance("I don't agree").stance, Stance::Disagree);
/// assert_eq!(parse_stance("").stance, Stance::Silent);
/// ```
pub fn parse_stance(response: &str) -> Position {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Position::silent();
    }

    if let Some(position) = parse_json_stance(trimmed) {
        return position;
    }

    let upper = trimmed.to_uppercase();
    let disagree = upper.contains("DISAGREE")
        || upper.contains("NOT AGREE")
        || upper.contains("DON'T AGREE")
        || upper.contains("CANNOT AGREE")
        || upper.contains("OBJECT");
    let agree = !disagree && upper.contains("AGREE");

    let stance = if disagree {
        Stance::Disagree
    } else if agree {
        Stance::Agree
    } else {
        Stance::Neutral
    };

    Position::new(stance, trimmed).with_confidence(DEFAULT_CONFIDENCE)
}

fn parse_json_stance(response: &str) -> Option<Position> {
    let start = response.find('{')?;
    let end = response[start..].rfind('}')?;
    let value: serde_json::Value = serde_json::from_str(&response[start..start + end + 1]).ok()?;

    let stance = value.get("stance")?.as_str()?.parse::<Stance>().ok()?;
    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(DEFAULT_CONFIDENCE);
    let rationale = value
        .get("rationale")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    Some(Position::new(stance, rationale).with_confidence(confidence))
}
