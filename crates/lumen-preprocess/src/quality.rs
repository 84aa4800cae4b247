//! Quality assessment: language, structure, and malicious-pattern heuristics.

use std::collections::HashMap;
use std::sync::LazyLock;

use lumen_core::config::{PreprocessConfig, QualityPolicy};
use lumen_core::errors::LumenResult;
use lumen_core::models::StageResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::language;
use crate::stage::{Stage, StageContext};

static RE_SCRIPT_INJECTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<\s*script\b|javascript\s*:|\bon(?:error|load|click|mouseover)\s*=|\beval\s*\(|document\.cookie",
    )
    .ok()
});

/// Score assumed for the language signal when no language is detected.
const UNKNOWN_LANGUAGE_SCORE: f64 = 0.3;
/// Alphabetic share of non-space characters that counts as fully textual.
const FULL_ALPHA_RATIO: f64 = 0.7;
/// Repetition is only judged on texts with at least this many words.
const REPETITION_MIN_WORDS: usize = 12;
/// A single word making up more than this share of the text is spam.
const REPETITION_MAX_SHARE: f64 = 0.4;

/// Itemized quality signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub score: f64,
    pub language: Option<String>,
    pub language_confidence: f64,
    pub flags: Vec<String>,
}

fn excessive_repetition(text: &str) -> bool {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() < REPETITION_MIN_WORDS {
        return false;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for w in &words {
        *counts.entry(w.as_str()).or_default() += 1;
    }
    let top = counts.values().copied().max().unwrap_or(0);
    top as f64 / words.len() as f64 > REPETITION_MAX_SHARE
}

/// Score normalized `text` in [0, 1].
///
/// The score is the length factor times a blend of alphabetic ratio (0.4),
/// sentence termination (0.2), and language confidence (0.4). Malicious
/// patterns then scale it down.
pub fn assess(text: &str, min_chars: usize) -> QualityAssessment {
    let mut flags = Vec::new();
    let chars = text.chars().count();

    let length = if min_chars == 0 {
        1.0
    } else {
        (chars as f64 / min_chars as f64).min(1.0)
    };
    if chars < min_chars {
        flags.push("too_short".to_string());
    }

    let termination = match text.trim_end().chars().last() {
        Some('.' | '!' | '?' | '"' | '\'' | ')' | '\u{bb}' | '\u{201d}') => 1.0,
        _ => {
            flags.push("unterminated".to_string());
            0.6
        }
    };

    let visible: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let alpha_ratio = if visible.is_empty() {
        0.0
    } else {
        visible.iter().filter(|c| c.is_alphabetic()).count() as f64 / visible.len() as f64
    };
    if alpha_ratio < 0.5 {
        flags.push("low_alpha_ratio".to_string());
    }
    let alpha = (alpha_ratio / FULL_ALPHA_RATIO).min(1.0);

    let guess = language::detect(text);
    let language_score = match &guess {
        Some(g) => g.confidence,
        None => {
            flags.push("unknown_language".to_string());
            UNKNOWN_LANGUAGE_SCORE
        }
    };

    let mut score = length * (0.4 * alpha + 0.2 * termination + 0.4 * language_score);

    if RE_SCRIPT_INJECTION
        .as_ref()
        .is_some_and(|re| re.is_match(text))
    {
        flags.push("script_injection".to_string());
        score *= 0.25;
    }
    if excessive_repetition(text) {
        flags.push("excessive_repetition".to_string());
        score *= 0.5;
    }

    QualityAssessment {
        score: score.clamp(0.0, 1.0),
        language: guess.as_ref().map(|g| g.code.to_string()),
        language_confidence: guess.map(|g| g.confidence).unwrap_or(0.0),
        flags,
    }
}

/// Sets language, quality score and flags; applies the quality policy.
#[derive(Debug, Clone)]
pub struct QualityAssess {
    threshold: f64,
    policy: QualityPolicy,
    min_chars: usize,
}

impl QualityAssess {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            threshold: config.quality_threshold,
            policy: config.quality_policy,
            min_chars: config.min_content_chars,
        }
    }
}

impl Stage for QualityAssess {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn execute(&self, ctx: &mut StageContext<'_>) -> LumenResult<StageResult> {
        let assessment = assess(&ctx.document.content, self.min_chars);
        let doc = &mut *ctx.document;
        doc.language = assessment.language.clone();
        doc.language_confidence = assessment.language_confidence;
        doc.quality_score = assessment.score;
        doc.quality_flags = assessment.flags;

        debug!(
            document_id = %doc.id,
            score = assessment.score,
            language = ?assessment.language,
            "quality assessed"
        );

        if assessment.score >= self.threshold {
            let note = format!("score {:.2}", assessment.score);
            ctx.note(note);
            return Ok(StageResult::Accepted);
        }
        let note = format!(
            "score {:.2} below {:.2}",
            assessment.score, self.threshold
        );
        ctx.note(note);
        match self.policy {
            QualityPolicy::Flag => {
                ctx.document.quality_flags.push("low_quality".to_string());
                Ok(StageResult::Accepted)
            }
            QualityPolicy::Reject => Ok(StageResult::rejected(format!(
                "low quality: {:.2}",
                assessment.score
            ))),
        }
    }
}
