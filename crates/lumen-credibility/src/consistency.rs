//! Internal and cross-document consistency checks.

use lumen_core::constants::NEUTRAL_SCORE;
use lumen_core::errors::LumenResult;
use lumen_core::traits::ICorpusView;

use crate::engine::CheckOutcome;
use crate::statements::{self, comparable, conflict};

/// Statements considered per text; bounds the quadratic comparison.
const MAX_STATEMENTS: usize = 200;
/// Score lost per internal contradiction.
const CONTRADICTION_PENALTY: f64 = 0.25;

/// Contradictions between statements of the same text.
pub fn internal(text: &str) -> CheckOutcome {
    let stmts = statements::split(text, MAX_STATEMENTS);
    let mut found = Vec::new();
    for (i, a) in stmts.iter().enumerate() {
        for b in &stmts[i + 1..] {
            if let Some(kind) = conflict(a, b) {
                found.push(kind);
            }
        }
    }
    if found.is_empty() {
        return CheckOutcome::new(1.0, format!("{} statements, no contradictions", stmts.len()));
    }
    let score = (1.0 - CONTRADICTION_PENALTY * found.len() as f64).max(0.0);
    let kinds: Vec<&str> = found.iter().map(|k| k.as_str()).collect();
    CheckOutcome::flagged(
        score,
        format!("{} contradictions ({})", found.len(), kinds.join(", ")),
    )
}

/// Agreement against similar passages from the rest of the corpus.
///
/// Each comparable statement pair counts as agreement when polarity matches
/// and as contradiction when it conflicts, weighted by passage similarity.
/// The score is 0.5 shifted by the net agreement.
pub fn cross_document(
    corpus: Option<&dyn ICorpusView>,
    document_id: &str,
    text: &str,
    sample: usize,
) -> LumenResult<CheckOutcome> {
    let Some(corpus) = corpus else {
        return Ok(CheckOutcome::new(NEUTRAL_SCORE, "no corpus view"));
    };
    let passages = corpus.similar_passages(text, document_id, sample)?;
    if passages.is_empty() {
        return Ok(CheckOutcome::new(NEUTRAL_SCORE, "empty corpus"));
    }

    let own = statements::split(text, MAX_STATEMENTS);
    let mut agree = 0.0;
    let mut contradict = 0.0;
    for passage in &passages {
        let weight = passage.similarity.clamp(0.0, 1.0);
        for theirs in statements::split(&passage.text, MAX_STATEMENTS) {
            for mine in &own {
                if !comparable(mine, &theirs) {
                    continue;
                }
                if conflict(mine, &theirs).is_some() {
                    contradict += weight;
                } else {
                    agree += weight;
                }
            }
        }
    }

    let total = agree + contradict;
    if total <= f64::EPSILON {
        return Ok(CheckOutcome::new(
            NEUTRAL_SCORE,
            format!("{} passages, nothing comparable", passages.len()),
        ));
    }
    let score = (NEUTRAL_SCORE + 0.5 * (agree - contradict) / total).clamp(0.0, 1.0);
    let detail = format!(
        "{} passages, agreement {agree:.2}, contradiction {contradict:.2}",
        passages.len()
    );
    Ok(if contradict > agree {
        CheckOutcome::flagged(score, detail)
    } else {
        CheckOutcome::new(score, detail)
    })
}
