//! Canonical source metadata from free-form key/value pairs.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lumen_core::errors::LumenResult;
use lumen_core::models::{SourceMetadata, StageResult};

use crate::stage::{Stage, StageContext};

const ORIGIN_KEYS: &[&str] = &["origin", "url", "source", "source_url", "link", "uri"];
const AUTHOR_KEYS: &[&str] = &["author", "creator", "by", "byline"];
const TIMESTAMP_KEYS: &[&str] = &[
    "retrieved_at",
    "date",
    "fetched",
    "fetched_at",
    "published",
    "timestamp",
];
const LICENSE_KEYS: &[&str] = &["license", "licence", "rights"];
const BUCKET_KEYS: &[&str] = &["collection", "bucket"];

/// Bucket used when neither a collection nor a language is known.
pub const DEFAULT_BUCKET: &str = "default";

fn canonical_key(key: &str) -> String {
    key.trim().to_lowercase().replace(['-', ' '], "_")
}

/// Lowercased host of a URL or bare domain, without "www." or port.
pub fn normalize_domain(origin: &str) -> Option<String> {
    let origin = origin.trim();
    let rest = match origin.split_once("://") {
        Some((_, rest)) => rest,
        None if !origin.contains(char::is_whitespace) && origin.contains('.') => origin,
        None => return None,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.rsplit_once('@').map(|(_, h)| h).unwrap_or(host);
    let host = host.split(':').next().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Parse RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, or epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
    }
    None
}

/// Map raw metadata onto [`SourceMetadata`]. For each field the first alias
/// present wins; losing aliases and unknown keys land in `extra`.
pub fn unify(raw: &BTreeMap<String, String>, language: Option<&str>) -> SourceMetadata {
    let mut pending: BTreeMap<String, String> = BTreeMap::new();
    for (k, v) in raw {
        let v = v.trim();
        if !v.is_empty() {
            pending.insert(canonical_key(k), v.to_string());
        }
    }

    let mut take = |aliases: &[&str]| -> Option<String> {
        let found = aliases.iter().find(|a| pending.contains_key(**a))?;
        pending.remove(*found)
    };

    let origin = take(ORIGIN_KEYS);
    let author = take(AUTHOR_KEYS);
    let retrieved_at_raw = take(TIMESTAMP_KEYS);
    let license = take(LICENSE_KEYS);
    let collection = take(BUCKET_KEYS);

    let bucket = collection
        .map(|c| c.to_lowercase())
        .or_else(|| language.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_BUCKET.to_string());

    SourceMetadata {
        domain: origin.as_deref().and_then(normalize_domain),
        origin,
        retrieved_at: retrieved_at_raw.as_deref().and_then(parse_timestamp),
        retrieved_at_raw,
        author,
        license,
        bucket,
        extra: pending,
    }
}

/// Fills `Document::metadata` and derives the dedup bucket.
#[derive(Debug, Default)]
pub struct MetadataUnify;

impl Stage for MetadataUnify {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn execute(&self, ctx: &mut StageContext<'_>) -> LumenResult<StageResult> {
        let doc = &mut *ctx.document;
        let metadata = unify(&doc.raw_metadata, doc.language.as_deref());
        let unparsed = metadata.retrieved_at_raw.is_some() && metadata.retrieved_at.is_none();
        let note = format!("bucket {}", metadata.bucket);
        doc.metadata = metadata;
        if unparsed {
            ctx.note(format!("{note}; unparseable timestamp"));
        } else {
            ctx.note(note);
        }
        Ok(StageResult::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn maps_aliases_to_canonical_fields() {
        let m = unify(
            &meta(&[
                ("URL", "https://www.Example.gov/a/b?q=1"),
                ("creator", "Jane Roe"),
                ("fetched", "2024-03-01"),
                ("rights", "CC-BY"),
                ("topic", "towers"),
            ]),
            Some("en"),
        );
        assert_eq!(m.origin.as_deref(), Some("https://www.Example.gov/a/b?q=1"));
        assert_eq!(m.domain.as_deref(), Some("example.gov"));
        assert_eq!(m.author.as_deref(), Some("Jane Roe"));
        assert_eq!(m.license.as_deref(), Some("CC-BY"));
        assert_eq!(
            m.retrieved_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(m.bucket, "en");
        assert_eq!(m.extra.get("topic").map(String::as_str), Some("towers"));
    }

    #[test]
    fn first_alias_wins_and_rest_is_kept() {
        let m = unify(&meta(&[("source", "b.org"), ("url", "https://a.org")]), None);
        assert_eq!(m.origin.as_deref(), Some("https://a.org"));
        assert_eq!(m.extra.get("source").map(String::as_str), Some("b.org"));
        assert_eq!(m.bucket, DEFAULT_BUCKET);
    }

    #[test]
    fn collection_overrides_language_bucket() {
        let m = unify(&meta(&[("collection", "News")]), Some("en"));
        assert_eq!(m.bucket, "news");
    }

    #[test]
    fn parses_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(parse_timestamp("2023-05-06T07:08:09Z"), Some(expected));
        assert_eq!(parse_timestamp("2023-05-06T09:08:09+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-05-06 07:08:09"), Some(expected));
        assert_eq!(parse_timestamp(&expected.timestamp().to_string()), Some(expected));
        assert_eq!(parse_timestamp("last tuesday"), None);
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(normalize_domain("http://user@News.BBC.co.uk:8080/x").as_deref(), Some("news.bbc.co.uk"));
        assert_eq!(normalize_domain("www.nasa.gov").as_deref(), Some("nasa.gov"));
        assert_eq!(normalize_domain("not a url"), None);
    }
}
