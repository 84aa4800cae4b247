//! Timestamp validity: present, parseable, not in the future, not stale.

use chrono::{DateTime, Duration, Utc};
use lumen_core::constants::NEUTRAL_SCORE;
use lumen_core::models::SourceMetadata;

use crate::engine::CheckOutcome;

/// Score of a timestamp exactly `max_age_days` old.
const OLDEST_VALID_SCORE: f64 = 0.6;

pub fn check(
    metadata: &SourceMetadata,
    now: DateTime<Utc>,
    max_age_days: i64,
    clock_skew_secs: i64,
) -> CheckOutcome {
    let Some(raw) = metadata.retrieved_at_raw.as_deref() else {
        return CheckOutcome::new(NEUTRAL_SCORE, "no timestamp");
    };
    let Some(at) = metadata.retrieved_at else {
        return CheckOutcome::flagged(0.0, format!("unparseable timestamp {raw:?}"));
    };
    if at > now + Duration::seconds(clock_skew_secs) {
        return CheckOutcome::flagged(0.0, format!("timestamp {} is in the future", at.to_rfc3339()));
    }
    let age = now.signed_duration_since(at);
    let max_age = Duration::days(max_age_days.max(1));
    if age > max_age {
        return CheckOutcome::flagged(0.0, format!("older than {max_age_days} days"));
    }
    let fraction = (age.num_seconds().max(0) as f64 / max_age.num_seconds() as f64).clamp(0.0, 1.0);
    let score = 1.0 - (1.0 - OLDEST_VALID_SCORE) * fraction;
    CheckOutcome::new(score, format!("{} days old", age.num_days().max(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(at: Option<DateTime<Utc>>, raw: Option<&str>) -> SourceMetadata {
        SourceMetadata {
            retrieved_at: at,
            retrieved_at_raw: raw.map(String::from),
            ..SourceMetadata::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn missing_is_neutral() {
        let c = check(&meta(None, None), now(), 3650, 300);
        assert_eq!(c.score, NEUTRAL_SCORE);
        assert!(!c.flagged);
    }

    #[test]
    fn unparseable_future_and_stale_score_zero() {
        assert_eq!(check(&meta(None, Some("soon")), now(), 3650, 300).score, 0.0);
        let future = now() + Duration::days(2);
        let c = check(&meta(Some(future), Some("x")), now(), 3650, 300);
        assert_eq!(c.score, 0.0);
        assert!(c.flagged);
        let stale = now() - Duration::days(4000);
        assert_eq!(check(&meta(Some(stale), Some("x")), now(), 3650, 300).score, 0.0);
    }

    #[test]
    fn skew_is_tolerated() {
        let slightly_ahead = now() + Duration::seconds(60);
        let c = check(&meta(Some(slightly_ahead), Some("x")), now(), 3650, 300);
        assert_eq!(c.score, 1.0);
    }

    #[test]
    fn decays_linearly() {
        let fresh = check(&meta(Some(now()), Some("x")), now(), 100, 300).score;
        let half = check(&meta(Some(now() - Duration::days(50)), Some("x")), now(), 100, 300).score;
        let edge = check(&meta(Some(now() - Duration::days(100)), Some("x")), now(), 100, 300).score;
        assert_eq!(fresh, 1.0);
        assert!((half - 0.8).abs() < 1e-9);
        assert!((edge - 0.6).abs() < 1e-9);
    }
}
