//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Condense free text to its first sentence, bounded by `max_len` bytes.
///
/// This is what strategic agents see of in-character speech.
pub fn first_sentence(s: &str, max_len: usize) -> String {
    let trimmed = s.trim();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(trimmed.len());
    truncate(trimmed[..end].trim_end(), max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "é" is two bytes; cutting inside it must back off to a boundary
        assert_eq!(truncate("café au lait", 7), "caf...");
        assert_eq!(truncate("éééé", 8), "éééé");
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(
            first_sentence("The door creaks open. A cold draft follows.", 100),
            "The door creaks open."
        );
        assert_eq!(first_sentence("No terminator here", 100), "No terminator here");
        assert_eq!(
            first_sentence("A very long opening sentence that goes on.", 12),
            "A very lo..."
        );
    }
}
