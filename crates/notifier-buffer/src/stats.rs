//! Live word and character counts for the status line.

use serde::Serialize;

/// Word and character counts of a piece of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    /// Maximal runs of non-whitespace
    pub words: usize,
    /// Unicode scalar values
    pub chars: usize,
}

impl TextStats {
    /// Counts `text`.
    pub fn of(text: &str) -> Self {
        Self {
            words: text.split_whitespace().count(),
            chars: text.chars().count(),
        }
    }
}

impl std::fmt::Display for TextStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Words: {} | Characters: {}", self.words, self.chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_chars() {
        let stats = TextStats::of("  hello\tworld\n\nagain ");
        assert_eq!(stats.words, 3);
        assert_eq!(stats.chars, 21);
    }

    #[test]
    fn empty_text() {
        assert_eq!(TextStats::of(""), TextStats::default());
        assert_eq!(TextStats::of(" \n\t").words, 0);
    }

    #[test]
    fn display_format() {
        let stats = TextStats::of("a bc");
        assert_eq!(stats.to_string(), "Words: 2 | Characters: 4");
    }
}
