//! Deterministic follow-up question derived from a candidate's main answer.

/// Asked when the answer carries no usable keyword.
pub const FALLBACK_CROSS_QUESTION: &str = "Can you explain that in more detail?";

/// Words never picked as the follow-up keyword. Compared lowercase.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "done", "down", "during", "each",
    "else", "etc", "even", "ever", "every", "few", "for", "from", "further", "get", "got", "had",
    "has", "have", "having", "he", "her", "here", "hers", "herself", "him", "himself", "his",
    "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "know", "like", "me",
    "more", "most", "much", "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "really",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "thing", "things", "think", "this",
    "those", "through", "to", "too", "um", "uh", "under", "until", "up", "use", "used", "using",
    "very", "was", "we", "well", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "would", "yeah", "yes", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Picks the last content word of `answer` and turns it into `What is {Word}?`.
///
/// A content word survives edge-punctuation trimming, is longer than two
/// characters and is not a stop word.
pub fn derive_cross_question(answer: &str) -> String {
    match last_keyword(answer) {
        Some(word) => format!("What is {}?", capitalize(word)),
        None => FALLBACK_CROSS_QUESTION.to_string(),
    }
}

fn last_keyword(answer: &str) -> Option<&str> {
    answer
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.chars().count() > 2)
        .filter(|word| !STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .last()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
