//! Synonym-based query expansion.

use lumen_core::constants::MAX_QUERY_EXPANSIONS;
use lumen_core::similarity::tokenize;

/// Term → related terms, looked up by lowercased query token.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("city", &["town", "capital"]),
    ("capital", &["city"]),
    ("tower", &["landmark", "monument"]),
    ("monument", &["landmark", "memorial"]),
    ("museum", &["gallery", "exhibition"]),
    ("river", &["stream", "waterway"]),
    ("mountain", &["peak", "summit"]),
    ("company", &["firm", "corporation", "business"]),
    ("corp", &["company", "corporation"]),
    ("worked", &["employed"]),
    ("job", &["employment", "position"]),
    ("doctor", &["physician"]),
    ("car", &["automobile", "vehicle"]),
    ("buy", &["purchase"]),
    ("error", &["failure", "fault"]),
    ("bug", &["defect", "error"]),
    ("fast", &["quick", "rapid"]),
    ("big", &["large"]),
    ("small", &["little", "tiny"]),
    ("begin", &["start"]),
    ("start", &["begin"]),
    ("built", &["constructed", "completed"]),
    ("designed", &["engineered"]),
    ("famous", &["renowned", "celebrated"]),
];

fn synonyms_of(token: &str) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(term, _)| *term == token)
        .map_or(&[], |(_, related)| *related)
}

/// Up to `MAX_QUERY_EXPANSIONS` related terms not already in the query,
/// in query-token order.
pub fn expand(query: &str) -> Vec<String> {
    let tokens = tokenize(query);
    let mut out: Vec<String> = Vec::new();
    for token in &tokens {
        for related in synonyms_of(token) {
            if out.len() == MAX_QUERY_EXPANSIONS {
                return out;
            }
            if tokens.iter().any(|t| t == related) || out.iter().any(|o| o == related) {
                continue;
            }
            out.push((*related).to_string());
        }
    }
    out
}

/// The query with its expansions appended.
pub fn expanded_query(query: &str) -> String {
    let extra = expand(query);
    if extra.is_empty() {
        query.to_string()
    } else {
        format!("{query} {}", extra.join(" "))
    }
}
