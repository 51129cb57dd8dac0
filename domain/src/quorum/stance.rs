//! Stance primitives for quorum discussion.

use serde::{Deserialize, Serialize};

/// An agent's declared position on the current plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Agree,
    Disagree,
    Neutral,
    /// No position declared (including agents that failed to respond)
    Silent,
}

impl Stance {
    pub fn as_str(&self) -> &str {
        match self {
            Stance::Agree => "AGREE",
            Stance::Disagree => "DISAGREE",
            Stance::Neutral => "NEUTRAL",
            Stance::Silent => "SILENT",
        }
    }

    /// Glyph used in round summaries
    pub fn glyph(&self) -> char {
        match self {
            Stance::Agree => '●',
            Stance::Disagree => '○',
            Stance::Neutral => '◐',
            Stance::Silent => '·',
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "agree" | "yes" | "approve" => Ok(Stance::Agree),
            "disagree" | "no" | "reject" | "object" => Ok(Stance::Disagree),
            "neutral" | "abstain" => Ok(Stance::Neutral),
            "silent" | "" => Ok(Stance::Silent),
            other => Err(format!(
                "Unknown stance: {}. Valid: agree, disagree, neutral, silent",
                other
            )),
        }
    }
}

/// A stance with its confidence and reasoning
///
/// # Example
///
/// ```
/// use table_domain::quorum::{Position, Stance};
///
/// let p = Position::agree("Flanking works").with_confidence(1.4);
/// assert_eq!(p.stance, Stance::Agree);
/// assert_eq!(p.confidence, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub stance: Stance,
    /// Confidence level (0.0 to 1.0)
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}

impl Position {
    pub fn new(stance: Stance, rationale: impl Into<String>) -> Self {
        Self {
            stance,
            confidence: 1.0,
            rationale: rationale.into(),
        }
    }

    pub fn agree(rationale: impl Into<String>) -> Self {
        Self::new(Stance::Agree, rationale)
    }

    pub fn disagree(rationale: impl Into<String>) -> Self {
        Self::new(Stance::Disagree, rationale)
    }

    pub fn neutral(rationale: impl Into<String>) -> Self {
        Self::new(Stance::Neutral, rationale)
    }

    pub fn silent() -> Self {
        Self {
            stance: Stance::Silent,
            confidence: 0.0,
            rationale: String::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(Position::agree("").with_confidence(-2.0).confidence, 0.0);
        assert_eq!(Position::agree("").with_confidence(0.4).confidence, 0.4);
    }

    #[test]
    fn test_parse_stance() {
        assert_eq!("Agree".parse::<Stance>(), Ok(Stance::Agree));
        assert_eq!("abstain".parse::<Stance>(), Ok(Stance::Neutral));
        assert!("maybe".parse::<Stance>().is_err());
    }

    #[test]
    fn test_silent_has_no_confidence() {
        let p = Position::silent();
        assert_eq!(p.stance, Stance::Silent);
        assert_eq!(p.confidence, 0.0);
    }
}
