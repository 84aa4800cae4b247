//! Valid-time extraction from sentence text.
//!
//! Recognized forms, checked in order:
//! `from X to Y`, `between X and Y`, `since X`, `until X`, `in X` / `on X` / `during X`,
//! where X is an ISO date, `Month [Day,] Year`, `Day Month Year`, or a bare year.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use lumen_core::models::ValidTime;
use regex::Regex;

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

fn date_pattern() -> String {
    format!(
        r"(\d{{4}}-\d{{2}}-\d{{2}}|{MONTH}\.?\s+(?:\d{{1,2}},?\s+)?\d{{4}}|\d{{1,2}}\s+{MONTH}\.?\s+\d{{4}}|[12]\d{{3}})\b"
    )
}

fn compile(template: &str) -> Option<Regex> {
    Regex::new(&template.replace("DATE", &date_pattern())).ok()
}

static RANGE_FROM_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\bfrom\s+DATE\s+(?:to|until|till|through)\s+DATE"));
static RANGE_BETWEEN_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\bbetween\s+DATE\s+and\s+DATE"));
static SINCE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"(?i)\bsince\s+DATE"));
static UNTIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\b(?:until|till|through)\s+DATE"));
static AT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\b(?:in|on|during)\s+DATE"));

/// The first and last day a date expression can denote.
pub fn parse_date_span(expr: &str) -> Option<(NaiveDate, NaiveDate)> {
    let expr = expr.trim();
    if let Ok(day) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Some((day, day));
    }

    let mut year = None;
    let mut month = None;
    let mut day = None;
    for part in expr
        .split(|c: char| c.is_whitespace() || c == ',' || c == '.')
        .filter(|p| !p.is_empty())
    {
        if let Ok(n) = part.parse::<u32>() {
            if part.len() == 4 {
                year = Some(n as i32);
            } else {
                day = Some(n);
            }
        } else {
            month = month_number(part);
        }
    }

    let year = year?;
    match (month, day) {
        (Some(m), Some(d)) => NaiveDate::from_ymd_opt(year, m, d).map(|date| (date, date)),
        (Some(m), None) => {
            let first = NaiveDate::from_ymd_opt(year, m, 1)?;
            Some((first, last_day_of_month(first)?))
        }
        _ => Some((
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        )),
    }
}

fn month_number(word: &str) -> Option<u32> {
    let lower = word.to_ascii_lowercase();
    const NAMES: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    NAMES
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
}

fn captures<'a>(re: &LazyLock<Option<Regex>>, text: &'a str) -> Option<regex::Captures<'a>> {
    re.as_ref().and_then(|r| r.captures(text))
}

/// Valid-time range stated in `sentence`, if any.
pub fn extract_valid_time(sentence: &str) -> Option<ValidTime> {
    for re in [&RANGE_FROM_RE, &RANGE_BETWEEN_RE] {
        if let Some(caps) = captures(re, sentence) {
            let start = caps.get(1).and_then(|m| parse_date_span(m.as_str()));
            let end = caps.get(2).and_then(|m| parse_date_span(m.as_str()));
            if let (Some((s, _)), Some((_, e))) = (start, end) {
                if s <= e {
                    return Some(ValidTime {
                        start: Some(s),
                        end: Some(e),
                    });
                }
            }
        }
    }
    if let Some((s, _)) = captures(&SINCE_RE, sentence)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_date_span(m.as_str()))
    {
        return Some(ValidTime {
            start: Some(s),
            end: None,
        });
    }
    if let Some((_, e)) = captures(&UNTIL_RE, sentence)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_date_span(m.as_str()))
    {
        return Some(ValidTime {
            start: None,
            end: Some(e),
        });
    }
    captures(&AT_RE, sentence)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_date_span(m.as_str()))
        .map(|(s, e)| ValidTime {
            start: Some(s),
            end: Some(e),
        })
}
