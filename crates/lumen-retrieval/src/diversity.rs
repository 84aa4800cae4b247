//! Result diversity: drop near-duplicate snippets and cap hits per document.

use std::collections::{BTreeMap, BTreeSet};

use lumen_core::similarity::{jaccard, tokenize};

/// Something with a source document and comparable text.
pub trait Diversifiable {
    fn document_id(&self) -> &str;
    fn text(&self) -> &str;
}

/// Keep items in their given order, skipping any whose text is at least
/// `threshold` similar (token Jaccard) to an already kept item, and any
/// beyond `max_per_document` from one document. Stops at `limit`.
pub fn diversify<T: Diversifiable>(
    ranked: Vec<T>,
    threshold: f64,
    max_per_document: usize,
    limit: usize,
) -> Vec<T> {
    let max_per_document = max_per_document.max(1);
    let mut kept: Vec<T> = Vec::new();
    let mut kept_tokens: Vec<BTreeSet<String>> = Vec::new();
    let mut per_document: BTreeMap<String, usize> = BTreeMap::new();

    for item in ranked {
        if kept.len() >= limit {
            break;
        }
        let count = per_document.get(item.document_id()).copied().unwrap_or(0);
        if count >= max_per_document {
            continue;
        }
        let tokens: BTreeSet<String> = tokenize(item.text()).into_iter().collect();
        if kept_tokens.iter().any(|k| jaccard(k, &tokens) >= threshold) {
            continue;
        }
        per_document.insert(item.document_id().to_string(), count + 1);
        kept_tokens.push(tokens);
        kept.push(item);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str, &'static str);

    impl Diversifiable for Item {
        fn document_id(&self) -> &str {
            self.0
        }
        fn text(&self) -> &str {
            self.1
        }
    }

    impl Diversifiable for (String, String) {
        fn document_id(&self) -> &str {
            &self.0
        }
        fn text(&self) -> &str {
            &self.1
        }
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.0).collect()
    }

    #[test]
    fn near_duplicate_snippets_are_dropped() {
        let out = diversify(
            vec![
                Item("a", "The Eiffel Tower is in Paris"),
                Item("b", "the eiffel tower is in paris"),
                Item("c", "The Louvre holds the Mona Lisa"),
            ],
            0.9,
            3,
            10,
        );
        assert_eq!(ids(&out), ["a", "c"]);
    }

    #[test]
    fn per_document_cap_and_limit() {
        let ranked = vec![
            Item("a", "one alpha"),
            Item("a", "two beta"),
            Item("a", "three gamma"),
            Item("b", "four delta"),
            Item("c", "five epsilon"),
        ];
        let out = diversify(ranked, 0.9, 2, 3);
        assert_eq!(ids(&out), ["a", "a", "b"]);
    }

    proptest::proptest! {
        #[test]
        fn caps_hold_and_order_is_kept(
            docs in proptest::collection::vec((0u8..4, "[a-e ]{0,12}"), 0..30),
            cap in 0usize..4,
            limit in 0usize..10,
        ) {
            let ranked: Vec<(String, String)> =
                docs.into_iter().map(|(d, t)| (format!("d{d}"), t)).collect();
            let out = diversify(ranked.clone(), 0.8, cap, limit);
            proptest::prop_assert!(out.len() <= limit);
            for doc in ["d0", "d1", "d2", "d3"] {
                let n = out.iter().filter(|(d, _)| d == doc).count();
                proptest::prop_assert!(n <= cap.max(1));
            }
            let mut rest = ranked.iter();
            for kept in &out {
                proptest::prop_assert!(rest.any(|r| r == kept));
            }
        }
    }
}
