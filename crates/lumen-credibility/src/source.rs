//! Source reliability from the origin domain.

use std::collections::BTreeMap;

use lumen_core::constants::NEUTRAL_SCORE;
use lumen_core::models::SourceMetadata;

use crate::engine::CheckOutcome;

const AUTHOR_BONUS: f64 = 0.05;
const LICENSE_BONUS: f64 = 0.05;

/// Reliability for `domain`: an exact table entry wins, otherwise the longest
/// matching suffix. A key starting with "." matches any domain ending in it
/// (".gov"); a bare key matches the domain itself and its subdomains.
pub fn lookup(table: &BTreeMap<String, f64>, domain: &str) -> Option<(String, f64)> {
    let domain = domain.to_lowercase();
    if let Some(score) = table.get(&domain) {
        return Some((domain, *score));
    }
    table
        .iter()
        .filter(|(key, _)| {
            let key = key.to_lowercase();
            if key.starts_with('.') {
                domain.ends_with(&key)
            } else {
                domain.ends_with(&format!(".{key}"))
            }
        })
        .max_by_key(|(key, _)| key.len())
        .map(|(key, score)| (key.clone(), *score))
}

pub fn check(metadata: &SourceMetadata, table: &BTreeMap<String, f64>) -> CheckOutcome {
    let Some(domain) = metadata.domain.as_deref() else {
        return CheckOutcome::new(NEUTRAL_SCORE, "no origin");
    };
    let (mut score, mut detail) = match lookup(table, domain) {
        Some((key, score)) => (score, format!("{domain} matched {key}")),
        None => (NEUTRAL_SCORE, format!("{domain} not rated")),
    };
    if metadata.author.is_some() {
        score += AUTHOR_BONUS;
        detail.push_str(", author");
    }
    if metadata.license.is_some() {
        score += LICENSE_BONUS;
        detail.push_str(", license");
    }
    CheckOutcome::new(score.clamp(0.0, 1.0), detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BTreeMap<String, f64> {
        [(".gov", 0.9), ("wikipedia.org", 0.75), (".org", 0.65)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn suffix_and_exact_matching() {
        let t = table();
        assert_eq!(lookup(&t, "nasa.gov").map(|m| m.1), Some(0.9));
        assert_eq!(lookup(&t, "en.wikipedia.org").map(|m| m.1), Some(0.75));
        assert_eq!(lookup(&t, "wikipedia.org").map(|m| m.1), Some(0.75));
        assert_eq!(lookup(&t, "example.org").map(|m| m.1), Some(0.65));
        assert_eq!(lookup(&t, "example.com"), None);
        assert_eq!(lookup(&t, "notwikipedia.org").map(|m| m.1), Some(0.65));
    }

    #[test]
    fn missing_origin_is_neutral_and_bonuses_apply() {
        let t = table();
        let mut meta = SourceMetadata::default();
        assert_eq!(check(&meta, &t).score, NEUTRAL_SCORE);

        meta.domain = Some("nasa.gov".into());
        meta.author = Some("J. Doe".into());
        meta.license = Some("public domain".into());
        assert!((check(&meta, &t).score - 1.0).abs() < 1e-9);
    }
}
