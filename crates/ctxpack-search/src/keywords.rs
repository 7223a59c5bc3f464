//! Keyword extraction for the lexical subtrack

use std::collections::HashSet;

use lazy_static::lazy_static;

lazy_static! {
    /// Fixed stop-word set; dropped from extracted keywords
    static ref STOP_WORDS: HashSet<&'static str> = [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "in", "on", "at",
        "to", "for", "of", "and", "or", "not", "no", "with", "without", "by", "from", "as",
        "how", "what", "where", "when", "why", "who", "which", "do", "does", "did", "done",
        "can", "could", "should", "would", "will", "shall", "may", "might", "must", "i", "you",
        "he", "she", "we", "they", "it", "this", "that", "these", "those", "my", "our", "your",
        "their", "its", "me", "us", "them", "there", "here", "then", "than", "so", "if", "but",
        "about", "into", "over", "under", "all", "any", "some", "each", "both", "more", "most",
        "other", "such", "only", "own", "same", "very", "just", "also", "too",
    ]
    .into_iter()
    .collect();
}

/// Extract search keywords from a free-form query
///
/// Splits on whitespace, strips leading/trailing characters outside
/// `[A-Za-z0-9_.]`, drops tokens shorter than 2 characters and stop words,
/// and deduplicates preserving first-seen order.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for token in query.split_whitespace() {
        let trimmed =
            token.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'));
        if trimmed.len() < 2 {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if STOP_WORDS.contains(lowered.as_str()) {
            continue;
        }
        if seen.insert(lowered) {
            keywords.push(trimmed.to_string());
        }
    }

    keywords
}

/// The lexical pattern derived from a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPattern {
    /// Zero or one keyword: search a literal string
    Fixed(String),
    /// Multiple keywords: a case-insensitive alternation of escaped keywords
    Alternation(String),
}

/// Turn a query into the pattern the grep subprocess runs
pub fn build_pattern(query: &str) -> QueryPattern {
    let keywords = extract_keywords(query);
    match keywords.as_slice() {
        [] => QueryPattern::Fixed(query.trim().to_string()),
        [single] => QueryPattern::Fixed(single.clone()),
        many => QueryPattern::Alternation(
            many.iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|"),
        ),
    }
}
