//! Entity mention and co-occurrence extraction.
//!
//! Mentions are capitalized word runs (with `of`/`de`/`von`-style connectors),
//! all-caps acronyms, and double-quoted terms. Leading sentence starters such
//! as "The" or "In" are stripped from runs. Types come from surface cues:
//! organisational or geographic suffix words, personal titles, a preceding
//! locative preposition, or a following reporting verb.
//!
//! Pairs of mentions within `sentence_window` sentences of each other become
//! co-occurrence evidence. Same-sentence pairs also get a relation label from
//! cue phrases between the two mentions and the sentence's valid-time range.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use lumen_core::models::{EntityType, ValidTime};
use regex::Regex;
use tracing::warn;

use crate::temporal::extract_valid_time;

/// Default relation label when no cue phrase is found.
pub const RELATED_TO: &str = "related_to";

/// Cue phrase to relation label. Earlier cues win.
const RELATION_CUES: &[(&str, &str)] = &[
    (" capital of ", "capital_of"),
    (" born in ", "born_in"),
    (" headquartered in ", "located_in"),
    (" located in ", "located_in"),
    (" part of ", "part_of"),
    (" member of ", "member_of"),
    (" works for ", "works_for"),
    (" works at ", "works_for"),
    (" worked for ", "works_for"),
    (" worked at ", "works_for"),
    (" employed by ", "works_for"),
    (" founded ", "founded"),
    (" established ", "founded"),
    (" acquired ", "acquired"),
    (" designed ", "designed"),
    (" built ", "built"),
    (" in ", "located_in"),
];

const SENTENCE_STARTERS: &[&str] = &[
    "a", "after", "all", "also", "although", "an", "and", "as", "at", "before", "both", "but",
    "by", "during", "each", "every", "for", "from", "he", "her", "here", "his", "however", "i",
    "if", "in", "it", "its", "many", "most", "my", "on", "or", "our", "she", "since", "so",
    "some", "that", "the", "their", "then", "there", "these", "they", "this", "those", "today",
    "we", "when", "while", "with", "yesterday", "you", "your",
];

const CONNECTORS: &[&str] = &["of", "de", "la", "del", "du", "da", "der", "van", "von", "le"];

const CALENDAR_WORDS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday",
];

const ORG_SUFFIXES: &[&str] = &[
    "agency", "association", "bank", "co", "committee", "company", "corp", "corporation",
    "council", "foundation", "group", "inc", "institute", "llc", "ltd", "ministry", "party",
    "society", "university",
];

const LOCATION_SUFFIXES: &[&str] = &[
    "avenue", "bay", "bridge", "cathedral", "city", "coast", "county", "desert", "forest",
    "island", "islands", "kingdom", "lake", "mountain", "mountains", "museum", "ocean", "palace",
    "park", "province", "republic", "river", "sea", "square", "street", "tower", "valley",
];

const PERSON_TITLES: &[&str] = &[
    "dr", "king", "lady", "lord", "mr", "mrs", "ms", "president", "prof", "professor", "queen",
    "senator", "sir",
];

const PERSON_VERBS: &[&str] = &[
    "argued", "claimed", "said", "says", "stated", "told", "wrote", "writes",
];

const LOCATIVE_PREPOSITIONS: &[&str] = &["across", "at", "in", "inside", "near", "outside", "from"];

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "st", "sr", "jr", "vs", "inc", "ltd", "co"];

const QUOTED_PATTERN: &str = r#""([^"\n]{2,60})"|\u{201C}([^\u{201D}\n]{2,60})\u{201D}"#;

/// `None` only if the pattern fails to compile; quoted terms are then skipped.
static QUOTED_RE: LazyLock<Option<Regex>> = LazyLock::new(|| match Regex::new(QUOTED_PATTERN) {
    Ok(re) => Some(re),
    Err(e) => {
        warn!(error = %e, "quoted-term pattern did not compile, quoted mentions disabled");
        None
    }
});

/// Normalized lookup key for an entity name: lowercase, single-spaced,
/// punctuation-free, without a leading article.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let start = usize::from(words.len() > 1 && matches!(words[0], "the" | "a" | "an"));
    words[start..].join(" ")
}

#[derive(Debug, Clone)]
struct Token {
    /// Word with surrounding punctuation and possessive removed.
    core: String,
    start: usize,
    end: usize,
    sentence: usize,
    /// Trailing punctuation stops a capitalized run.
    breaks_run: bool,
}

/// One entity mention in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub name: String,
    pub key: String,
    pub entity_type: EntityType,
    pub sentence: usize,
    pub token_start: usize,
    pub token_end: usize,
    pub byte_start: usize,
    pub byte_end: usize,
}

/// Co-occurrence of two mentions (indices into `Extraction::mentions`, in
/// text order).
#[derive(Debug, Clone, PartialEq)]
pub struct PairEvidence {
    pub first: usize,
    pub second: usize,
    /// Tokens between the end of the first mention and the start of the second.
    pub distance: u32,
    pub relation_type: String,
    pub valid_time: Option<ValidTime>,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub mentions: Vec<Mention>,
    pub pairs: Vec<PairEvidence>,
}

impl Extraction {
    /// Distinct normalized names mentioned.
    pub fn keys(&self) -> BTreeSet<String> {
        self.mentions.iter().map(|m| m.key.clone()).collect()
    }
}

fn contains(list: &[&str], word: &str) -> bool {
    list.contains(&word)
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn is_acronym(word: &str) -> bool {
    (2..=6).contains(&word.chars().count()) && word.chars().all(|c| c.is_ascii_uppercase())
}

fn tokenize(text: &str) -> (Vec<Token>, Vec<(usize, usize)>) {
    let mut tokens = Vec::new();
    let mut sentences = Vec::new();
    let mut sentence = 0;
    let mut sentence_start = 0;
    let mut last_end = 0;

    let mut offset = 0;
    for raw in text.split_inclusive(char::is_whitespace) {
        let word_start = offset;
        offset += raw.len();
        let trimmed = raw.trim_end();
        let newline_break = raw.ends_with('\n') && trimmed.is_empty();
        if trimmed.is_empty() {
            if newline_break && sentence_start < last_end {
                sentences.push((sentence_start, last_end));
                sentence += 1;
                sentence_start = offset;
            }
            continue;
        }

        let lead = trimmed.len() - trimmed.trim_start_matches(|c: char| !c.is_alphanumeric()).len();
        let body = trimmed.trim_matches(|c: char| !c.is_alphanumeric());
        if body.is_empty() {
            continue;
        }
        let core = body
            .strip_suffix("'s")
            .or_else(|| body.strip_suffix("\u{2019}s"))
            .unwrap_or(body);
        let start = word_start + lead;
        let tail = &trimmed[lead + body.len()..];
        let lower = core.to_lowercase();
        let ends_sentence = tail.contains(|c: char| matches!(c, '.' | '!' | '?'))
            && !(tail.starts_with('.') && (contains(ABBREVIATIONS, &lower) || core.chars().count() == 1));

        tokens.push(Token {
            core: core.to_string(),
            start,
            end: start + core.len(),
            sentence,
            breaks_run: raw.ends_with('\n')
                || (!tail.is_empty() && !tail.starts_with('\'') && !tail.starts_with('\u{2019}')),
        });
        last_end = word_start + trimmed.len();

        if ends_sentence {
            sentences.push((sentence_start, last_end));
            sentence += 1;
            sentence_start = offset;
        }
    }
    if sentence_start < last_end {
        sentences.push((sentence_start, last_end));
    }
    (tokens, sentences)
}

fn infer_type(words: &[String], prev: Option<&Token>, next: Option<&Token>) -> EntityType {
    // The head noun precedes the first connector: "University of Paris".
    let head = words
        .iter()
        .take_while(|w| !contains(CONNECTORS, &w.to_lowercase()))
        .last()
        .map(|w| w.to_lowercase())
        .unwrap_or_default();
    if contains(ORG_SUFFIXES, &head) || (words.len() == 1 && is_acronym(&words[0])) {
        return EntityType::Organization;
    }
    if contains(LOCATION_SUFFIXES, &head) {
        return EntityType::Location;
    }
    let prev_lower = prev.map(|t| t.core.to_lowercase());
    if prev_lower.as_deref().is_some_and(|p| contains(PERSON_TITLES, p)) {
        return EntityType::Person;
    }
    if next.is_some_and(|t| contains(PERSON_VERBS, &t.core.to_lowercase())) {
        return EntityType::Person;
    }
    if prev_lower.as_deref().is_some_and(|p| contains(LOCATIVE_PREPOSITIONS, p)) {
        return EntityType::Location;
    }
    EntityType::Other
}

fn capitalized_mentions(tokens: &[Token]) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        let lower = tok.core.to_lowercase();
        if !is_capitalized(&tok.core) || contains(CALENDAR_WORDS, &lower) {
            i += 1;
            continue;
        }

        let sentence = tok.sentence;
        let mut j = i;
        loop {
            let t = &tokens[j];
            j += 1;
            if t.breaks_run || j >= tokens.len() || tokens[j].sentence != sentence {
                break;
            }
            let next = &tokens[j];
            let next_lower = next.core.to_lowercase();
            let continues = (is_capitalized(&next.core) && !contains(CALENDAR_WORDS, &next_lower))
                || (contains(CONNECTORS, &next_lower)
                    && tokens
                        .get(j + 1)
                        .is_some_and(|after| after.sentence == sentence && is_capitalized(&after.core)));
            if !continues {
                break;
            }
        }

        // Leading sentence starters and titles are not part of the name.
        let mut start = i;
        while start < j {
            let w = tokens[start].core.to_lowercase();
            if contains(SENTENCE_STARTERS, &w) || contains(PERSON_TITLES, &w) {
                start += 1;
            } else {
                break;
            }
        }
        // Trailing connectors never end a name.
        let mut end = j;
        while end > start && contains(CONNECTORS, &tokens[end - 1].core.to_lowercase()) {
            end -= 1;
        }

        if start < end {
            let words: Vec<String> = tokens[start..end].iter().map(|t| t.core.clone()).collect();
            let name = words.join(" ");
            let key = normalize_name(&name);
            if !key.is_empty() && key.chars().any(char::is_alphabetic) {
                let prev = start.checked_sub(1).map(|p| &tokens[p]);
                mentions.push(Mention {
                    entity_type: infer_type(&words, prev, tokens.get(end)),
                    name,
                    key,
                    sentence,
                    token_start: start,
                    token_end: end,
                    byte_start: tokens[start].start,
                    byte_end: tokens[end - 1].end,
                });
            }
        }
        i = j.max(i + 1);
    }
    mentions
}

fn quoted_mentions(text: &str, tokens: &[Token]) -> Vec<Mention> {
    let Some(re) = QUOTED_RE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| {
            let name = m.as_str().trim().to_string();
            if name.split_whitespace().count() > 4 {
                return None;
            }
            let key = normalize_name(&name);
            if key.is_empty() {
                return None;
            }
            let token_start = tokens.iter().position(|t| t.end > m.start())?;
            let token_end = tokens
                .iter()
                .position(|t| t.start >= m.end())
                .unwrap_or(tokens.len())
                .max(token_start + 1);
            Some(Mention {
                name,
                key,
                entity_type: EntityType::Concept,
                sentence: tokens[token_start].sentence,
                token_start,
                token_end,
                byte_start: m.start(),
                byte_end: m.end(),
            })
        })
        .collect()
}

/// Label for a same-sentence pair from the text between the two mentions.
pub fn relation_label(between: &str) -> &'static str {
    let padded = format!(" {} ", between.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" "));
    RELATION_CUES
        .iter()
        .find(|(cue, _)| padded.contains(cue))
        .map(|(_, label)| *label)
        .unwrap_or(RELATED_TO)
}

/// Extract mentions and co-occurrence pairs from `text`.
pub fn extract(text: &str, sentence_window: usize) -> Extraction {
    let (tokens, sentences) = tokenize(text);

    let mut mentions = capitalized_mentions(&tokens);
    for quoted in quoted_mentions(text, &tokens) {
        let overlaps = mentions
            .iter()
            .any(|m| m.byte_start < quoted.byte_end && quoted.byte_start < m.byte_end);
        if !overlaps {
            mentions.push(quoted);
        }
    }
    mentions.sort_by_key(|m| (m.token_start, m.token_end));

    let sentence_times: Vec<Option<ValidTime>> = sentences
        .iter()
        .map(|&(s, e)| text.get(s..e).and_then(extract_valid_time))
        .collect();

    let mut pairs = Vec::new();
    for (a, first) in mentions.iter().enumerate() {
        for (offset, second) in mentions[a + 1..].iter().enumerate() {
            if second.sentence > first.sentence + sentence_window {
                break;
            }
            if first.key == second.key {
                continue;
            }
            let same_sentence = first.sentence == second.sentence;
            let (relation_type, valid_time) = if same_sentence {
                let between = text.get(first.byte_end..second.byte_start).unwrap_or("");
                (
                    relation_label(between).to_string(),
                    sentence_times.get(first.sentence).copied().flatten(),
                )
            } else {
                (RELATED_TO.to_string(), None)
            };
            pairs.push(PairEvidence {
                first: a,
                second: a + 1 + offset,
                distance: second.token_start.saturating_sub(first.token_end) as u32,
                relation_type,
                valid_time,
            });
        }
    }

    Extraction { mentions, pairs }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ex: &Extraction) -> Vec<&str> {
        ex.mentions.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn quoted_pattern_compiles() {
        assert!(QUOTED_RE.is_some(), "pattern {QUOTED_PATTERN} failed to compile");
    }

    #[test]
    fn strips_leading_article_and_starters() {
        let ex = extract("The Eiffel Tower is in Paris. In Paris the weather is mild.", 0);
        assert_eq!(names(&ex), vec!["Eiffel Tower", "Paris", "Paris"]);
        assert_eq!(ex.mentions[0].key, "eiffel tower");
    }

    #[test]
    fn infers_types_from_cues() {
        let ex = extract(
            "Dr. Alice Martin works for Acme Corp. She moved to a flat near Lyon. NASA said so.",
            0,
        );
        let by_name = |n: &str| ex.mentions.iter().find(|m| m.name == n).map(|m| m.entity_type);
        assert_eq!(by_name("Alice Martin"), Some(EntityType::Person));
        assert_eq!(by_name("Acme Corp"), Some(EntityType::Organization));
        assert_eq!(by_name("Lyon"), Some(EntityType::Location));
        assert_eq!(by_name("NASA"), Some(EntityType::Organization));
    }

    #[test]
    fn connectors_join_runs() {
        let ex = extract("She studied at the University of Paris last year.", 0);
        assert_eq!(names(&ex), vec!["University of Paris"]);
        assert_eq!(ex.mentions[0].entity_type, EntityType::Organization);
    }

    #[test]
    fn calendar_words_are_not_entities() {
        let ex = extract("On Monday in March 1889 the tower opened.", 0);
        assert!(ex.mentions.is_empty());
    }

    #[test]
    fn quoted_terms_are_concepts() {
        let ex = extract(r#"engineers call it "wind bracing" in their notes"#, 0);
        assert_eq!(ex.mentions.len(), 1);
        assert_eq!(ex.mentions[0].entity_type, EntityType::Concept);
        assert_eq!(ex.mentions[0].key, "wind bracing");
    }

    #[test]
    fn same_sentence_pair_gets_label_and_distance() {
        let ex = extract("The Eiffel Tower is in Paris.", 0);
        assert_eq!(ex.pairs.len(), 1);
        let pair = &ex.pairs[0];
        assert_eq!(pair.relation_type, "located_in");
        assert_eq!(pair.distance, 2);
    }

    #[test]
    fn window_controls_cross_sentence_pairs() {
        let text = "Gustave Eiffel was an engineer. The tower stands in Paris.";
        assert!(extract(text, 0).pairs.is_empty());
        let ex = extract(text, 1);
        assert_eq!(ex.pairs.len(), 1);
        assert_eq!(ex.pairs[0].relation_type, RELATED_TO);
    }

    #[test]
    fn pair_carries_sentence_valid_time() {
        let ex = extract("Bob Stone worked for Acme Corp from 2001 to 2005.", 0);
        let pair = ex.pairs.first().unwrap();
        assert_eq!(pair.relation_type, "works_for");
        assert!(pair.valid_time.is_some());
    }

    #[test]
    fn normalize_name_folds_case_and_article() {
        assert_eq!(normalize_name("The  Eiffel-Tower"), "eiffel tower");
        assert_eq!(normalize_name("The"), "the");
        assert_eq!(normalize_name("PARIS"), "paris");
    }

    #[test]
    fn possessive_is_stripped() {
        let ex = extract("Paris's museums are famous.", 0);
        assert_eq!(names(&ex), vec!["Paris"]);
    }
}
