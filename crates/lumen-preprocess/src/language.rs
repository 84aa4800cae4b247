//! Stopword-profile language detection.

const PROFILES: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "is", "are", "was", "were", "of", "to", "in", "that", "it", "for",
            "with", "as", "on", "this", "by", "be", "at", "from", "has", "have", "which", "not",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "des", "est", "et", "un", "une", "du", "dans", "que", "qui", "pour",
            "pas", "sur", "au", "avec", "ce", "sont", "il", "elle", "nous", "mais", "de",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "den", "mit", "sich",
            "auf", "für", "von", "dem", "des", "auch", "es", "wir", "sind", "ich", "wird", "im",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "que", "es", "y", "en", "un", "una", "por", "con", "para",
            "del", "se", "no", "su", "al", "lo", "como", "más", "pero", "sus", "de",
        ],
    ),
    (
        "it",
        &[
            "il", "la", "che", "di", "e", "è", "un", "una", "per", "non", "con", "sono", "gli",
            "della", "del", "nel", "alla", "anche", "come", "più", "lo", "questo", "ma", "si",
        ],
    ),
    (
        "pt",
        &[
            "o", "a", "os", "as", "que", "é", "e", "um", "uma", "do", "da", "em", "para", "com",
            "não", "dos", "das", "se", "por", "mais", "ao", "seu", "sua", "de",
        ],
    ),
    (
        "nl",
        &[
            "de", "het", "een", "en", "van", "is", "dat", "op", "te", "zijn", "niet", "met",
            "voor", "ook", "aan", "er", "maar", "om", "bij", "wordt", "naar", "dit", "ze", "ik",
        ],
    ),
];

/// A detected language and how sure the detector is.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageGuess {
    /// ISO 639-1 code.
    pub code: &'static str,
    /// In [0, 1]; grows with stopword coverage and with the margin over the
    /// runner-up profile.
    pub confidence: f64,
}

/// Guess the language of `text`. `None` when too few words match any profile.
pub fn detect(text: &str) -> Option<LanguageGuess> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    if words.len() < 3 {
        return None;
    }

    // Stable sort: profile order breaks ties.
    let mut ranked: Vec<(&'static str, usize)> = PROFILES
        .iter()
        .map(|(code, stopwords)| {
            let hits = words.iter().filter(|w| stopwords.contains(&w.as_str())).count();
            (*code, hits)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let (code, best) = ranked[0];
    if best == 0 {
        return None;
    }
    let runner_up = ranked.get(1).map(|r| r.1).unwrap_or(0);
    let coverage = (best as f64 / words.len() as f64 * 2.5).min(1.0);
    let margin = (best - runner_up) as f64 / best as f64;
    Some(LanguageGuess {
        code,
        confidence: (coverage * (0.5 + 0.5 * margin)).clamp(0.0, 1.0),
    })
}
