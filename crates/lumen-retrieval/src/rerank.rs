//! Default pairwise reranker: lexical overlap between query and passage.

use std::collections::BTreeSet;

use lumen_core::errors::LumenResult;
use lumen_core::similarity::tokenize;
use lumen_core::traits::IReranker;

/// Scores each passage by the share of query keywords it contains.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalReranker;

fn keywords(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= 3)
        .collect()
}

impl IReranker for LexicalReranker {
    fn rerank(&self, query: &str, passages: &[&str]) -> LumenResult<Vec<f64>> {
        let terms = keywords(query);
        Ok(passages
            .iter()
            .map(|passage| {
                if terms.is_empty() {
                    return 0.0;
                }
                let haystack = keywords(passage);
                terms.intersection(&haystack).count() as f64 / terms.len() as f64
            })
            .collect())
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_share() {
        let scores = LexicalReranker
            .rerank(
                "eiffel tower paris",
                &["The Eiffel Tower is in Paris.", "Paris is in France.", "Nothing."],
            )
            .unwrap();
        assert_eq!(scores[0], 1.0);
        assert!((scores[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn short_queries_score_zero() {
        assert_eq!(LexicalReranker.rerank("a", &["a b c"]).unwrap(), [0.0]);
    }
}
