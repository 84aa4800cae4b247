//! Sentence-level statements with topic words and polarity, the unit the
//! consistency checks compare.

use std::collections::BTreeSet;

use lumen_core::similarity::overlap_coefficient;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "cannot", "none", "nobody", "nothing", "neither", "nor", "without",
];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "with", "this", "that", "these", "those", "from",
    "has", "have", "had", "its", "it's", "but", "also", "into", "than", "then", "there", "their",
    "they", "them", "which", "who", "whom", "what", "when", "where", "been", "being", "will",
    "would", "can", "could", "should", "may", "might", "does", "did", "our", "your", "his", "her",
    "she", "him", "all", "any", "every", "always", "very", "more", "most", "some", "such",
];

/// Topic words two statements must share before they are compared.
pub const MIN_SHARED_TOPICS: usize = 2;
/// Overlap coefficient of topic sets at which statements are about the same thing.
pub const MIN_TOPIC_OVERLAP: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absolute {
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    pub topics: BTreeSet<String>,
    pub negated: bool,
    pub absolute: Option<Absolute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// One statement negates the other.
    Negation,
    /// "always" against "never".
    Absolute,
}

impl Conflict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conflict::Negation => "negation",
            Conflict::Absolute => "absolute",
        }
    }
}

fn parse(sentence: &str) -> Option<Statement> {
    let mut topics = BTreeSet::new();
    let mut negated = false;
    let mut absolute = None;
    for raw in sentence.split_whitespace() {
        let word = raw
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
            .to_lowercase()
            .replace('\u{2019}', "'");
        if word.is_empty() {
            continue;
        }
        if word.ends_with("n't") || NEGATIONS.contains(&word.as_str()) {
            negated = true;
        }
        match word.as_str() {
            "always" => absolute = Some(Absolute::Always),
            "never" => absolute = Some(Absolute::Never),
            _ => {}
        }
        let is_topic = word.chars().count() >= 3
            && !word.contains('\'')
            && !NEGATIONS.contains(&word.as_str())
            && !STOPWORDS.contains(&word.as_str());
        if is_topic {
            topics.insert(word);
        }
    }
    if topics.is_empty() {
        return None;
    }
    Some(Statement {
        text: sentence.trim().to_string(),
        topics,
        negated,
        absolute,
    })
}

/// Split `text` into statements at sentence terminators and line breaks.
/// Sentences with no topic words are dropped; at most `limit` are kept.
pub fn split(text: &str, limit: usize) -> Vec<Statement> {
    text.split(['.', '!', '?', '\n', ';'])
        .filter_map(parse)
        .take(limit)
        .collect()
}

/// Whether two statements talk about the same thing.
pub fn comparable(a: &Statement, b: &Statement) -> bool {
    let shared = a.topics.intersection(&b.topics).count();
    shared >= MIN_SHARED_TOPICS && overlap_coefficient(&a.topics, &b.topics) >= MIN_TOPIC_OVERLAP
}

/// How two comparable statements contradict each other, if they do.
pub fn conflict(a: &Statement, b: &Statement) -> Option<Conflict> {
    if !comparable(a, b) {
        return None;
    }
    match (a.absolute, b.absolute) {
        (Some(Absolute::Always), Some(Absolute::Never))
        | (Some(Absolute::Never), Some(Absolute::Always)) => return Some(Conflict::Absolute),
        _ => {}
    }
    (a.negated != b.negated).then_some(Conflict::Negation)
}
