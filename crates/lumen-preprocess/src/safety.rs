//! Regex safety filter over pattern categories.

use std::sync::LazyLock;

use lumen_core::errors::{LumenError, LumenResult};
use lumen_core::models::StageResult;
use regex::Regex;
use tracing::debug;

use crate::stage::{Stage, StageContext};

/// A built-in detection pattern.
pub struct SafetyPattern {
    pub category: &'static str,
    pub name: &'static str,
    pub regex: &'static LazyLock<Option<Regex>>,
}

macro_rules! safety_pattern {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── Credential leaks ───────────────────────────────────────────────────────
safety_pattern!(RE_AWS_ACCESS_KEY, r"\bAKIA[0-9A-Z]{16}\b");
safety_pattern!(
    RE_PRIVATE_KEY,
    r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----"
);
safety_pattern!(RE_GITHUB_TOKEN, r"\bgh[pousr]_[A-Za-z0-9]{36}\b");
safety_pattern!(
    RE_PASSWORD_ASSIGN,
    r#"(?i)\b(?:password|passwd|pwd)\s*[=:]\s*['"]?[^\s'"]{6,}"#
);
safety_pattern!(
    RE_API_KEY_ASSIGN,
    r#"(?i)\b(?:api[_-]?key|secret[_-]?key|access[_-]?token)\s*[=:]\s*['"]?[A-Za-z0-9_\-]{16,}"#
);

// ── Violence instructions ──────────────────────────────────────────────────
safety_pattern!(
    RE_EXPLOSIVE_HOWTO,
    r"(?i)\bhow\s+to\s+(?:make|build|assemble)\s+(?:a\s+|an\s+)?(?:pipe\s+)?(?:bomb|explosive|ied)s?\b"
);
safety_pattern!(
    RE_HARM_STEPS,
    r"(?i)\b(?:step[- ]by[- ]step|instructions?)\s+(?:to|for|on)\s+(?:killing|kill|poisoning|poison|murdering|murder)\b"
);

static BUILTIN: &[SafetyPattern] = &[
    SafetyPattern {
        category: "credential_leak",
        name: "aws_access_key",
        regex: &RE_AWS_ACCESS_KEY,
    },
    SafetyPattern {
        category: "credential_leak",
        name: "private_key",
        regex: &RE_PRIVATE_KEY,
    },
    SafetyPattern {
        category: "credential_leak",
        name: "github_token",
        regex: &RE_GITHUB_TOKEN,
    },
    SafetyPattern {
        category: "credential_leak",
        name: "password_assignment",
        regex: &RE_PASSWORD_ASSIGN,
    },
    SafetyPattern {
        category: "credential_leak",
        name: "api_key_assignment",
        regex: &RE_API_KEY_ASSIGN,
    },
    SafetyPattern {
        category: "violence_instructions",
        name: "explosive_howto",
        regex: &RE_EXPLOSIVE_HOWTO,
    },
    SafetyPattern {
        category: "violence_instructions",
        name: "harm_steps",
        regex: &RE_HARM_STEPS,
    },
];

/// The built-in patterns.
pub fn builtin_patterns() -> &'static [SafetyPattern] {
    BUILTIN
}

/// A pattern match that blocks a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyHit {
    pub category: String,
    pub pattern: String,
}

/// Rejects documents matching any built-in or custom pattern.
#[derive(Debug, Default)]
pub struct SafetyFilter {
    custom: Vec<Regex>,
}

impl SafetyFilter {
    /// Filter with the built-in categories plus `custom_patterns`, which are
    /// compiled here. An invalid pattern is a configuration error.
    pub fn new(custom_patterns: &[String]) -> LumenResult<Self> {
        let custom = custom_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| LumenError::ConfigError(format!("invalid safety pattern {p:?}: {e}")))
            })
            .collect::<LumenResult<Vec<_>>>()?;
        Ok(Self { custom })
    }

    /// First pattern that matches `text`, built-ins first.
    pub fn scan(&self, text: &str) -> Option<SafetyHit> {
        for pattern in BUILTIN {
            let Some(re) = pattern.regex.as_ref() else {
                continue;
            };
            if re.is_match(text) {
                return Some(SafetyHit {
                    category: pattern.category.to_string(),
                    pattern: pattern.name.to_string(),
                });
            }
        }
        self.custom
            .iter()
            .enumerate()
            .find(|(_, re)| re.is_match(text))
            .map(|(i, _)| SafetyHit {
                category: "custom".to_string(),
                pattern: format!("custom_{i}"),
            })
    }
}

impl Stage for SafetyFilter {
    fn name(&self) -> &'static str {
        "safety"
    }

    fn execute(&self, ctx: &mut StageContext<'_>) -> LumenResult<StageResult> {
        match self.scan(&ctx.document.content) {
            Some(hit) => {
                debug!(
                    document_id = %ctx.document.id,
                    category = %hit.category,
                    pattern = %hit.pattern,
                    "safety filter hit"
                );
                ctx.note(hit.pattern.clone());
                Ok(StageResult::rejected(format!("unsafe content: {}", hit.category)))
            }
            None => Ok(StageResult::Accepted),
        }
    }
}
