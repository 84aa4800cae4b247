use lumen_preprocess::language;
use lumen_preprocess::normalize::normalize_text;
use lumen_preprocess::quality::assess;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalization_is_idempotent_on_plain_text(text in "[a-zA-Z0-9 \t\r\n.,!?'é\u{a0}\u{feff}]{0,200}") {
        let once = normalize_text(&text);
        prop_assert_eq!(normalize_text(&once), once.clone());
        prop_assert!(!once.contains("  "));
        prop_assert_eq!(once.trim(), once.as_str());
    }

    #[test]
    fn quality_score_in_unit_range(text in "\\PC{0,300}", min_chars in 0usize..100) {
        let q = assess(&text, min_chars);
        prop_assert!((0.0..=1.0).contains(&q.score), "score {}", q.score);
        prop_assert!((0.0..=1.0).contains(&q.language_confidence));
    }

    #[test]
    fn language_confidence_in_unit_range(text in "[a-z ]{0,200}") {
        if let Some(g) = language::detect(&text) {
            prop_assert!(g.confidence > 0.0 && g.confidence <= 1.0);
        }
    }
}
