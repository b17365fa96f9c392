//! Query normalization before embedding

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+").unwrap();
}

/// Common English stop words dropped from natural language queries
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
    "has", "have", "he", "in", "is", "it", "its", "of", "on", "that",
    "the", "to", "was", "will", "with", "does", "do", "did", "can",
    "could", "should", "would", "what", "where", "when", "why", "how",
    "who", "which", "this", "these", "those", "there", "here", "i",
    "me", "my", "we", "our", "you", "your", "or", "if", "then", "so",
];

/// Lower-case the query, keep word tokens, drop stop words.
///
/// Falls back to the trimmed original when nothing would remain, so a query
/// made only of stop words still embeds to something.
pub fn preprocess_query(query: &str) -> String {
    let lower = query.to_lowercase();
    let tokens: Vec<&str> = WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|token| !STOP_WORDS.contains(token))
        .collect();

    if tokens.is_empty() {
        return query.trim().to_string();
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_stop_words_and_punctuation() {
        assert_eq!(
            preprocess_query("Where is the rate limiter configured?"),
            "rate limiter configured"
        );
    }

    #[test]
    fn test_keeps_identifiers() {
        assert_eq!(preprocess_query("How does parse_ignore_file work"), "parse_ignore_file work");
    }

    #[test]
    fn test_only_stop_words_falls_back() {
        assert_eq!(preprocess_query("  What is this? "), "What is this?");
    }
}
