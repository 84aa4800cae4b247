//! Markup stripping and text cleanup.

use std::sync::LazyLock;

use lumen_core::errors::LumenResult;
use lumen_core::models::{content_hash, StageResult};
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use crate::stage::{Stage, StageContext};

static RE_SCRIPT_STYLE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*(?:script|style)\b[^>]*>.*?<\s*/\s*(?:script|style)\s*>").ok()
});
static RE_COMMENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").ok());
static RE_DECLARATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[|\]\]>|<![A-Za-z][^>]*>|<\?.*?\?>").ok());
static RE_BLOCK_END: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*/\s*(?:p|div|h[1-6]|title|section|article|blockquote|table)\s*>").ok()
});
static RE_LINE_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*(?:br\s*/?|/\s*li|/\s*tr)\s*>").ok());
static RE_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9:-]*(?:\s[^<>]*)?/?>").ok());
static RE_ENTITY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").ok());

/// UTF-8 punctuation mis-decoded as Windows-1252.
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "'"),
    ("â€\u{2dc}", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€\u{201c}", "-"),
    ("â€\u{201d}", "-"),
    ("â€¦", "..."),
    ("â€¢", "*"),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ã¼", "ü"),
    ("Ã¶", "ö"),
    ("Ã¤", "ä"),
    ("Â\u{a0}", " "),
    ("Â ", " "),
];

fn replace(re: &LazyLock<Option<Regex>>, text: &str, with: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ndash" => "-",
        "mdash" => "-",
        "hellip" => "...",
        "lsquo" | "rsquo" => "'",
        "ldquo" | "rdquo" => "\"",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "eacute" => "é",
        "egrave" => "è",
        "uuml" => "ü",
        "ouml" => "ö",
        "auml" => "ä",
        _ => return None,
    };
    Some(decoded.to_string())
}

fn decode_entities(text: &str) -> String {
    let Some(re) = RE_ENTITY.as_ref() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// Strip markup.
pub fn strip_markup(text: &str) -> String {
    let text = replace(&RE_SCRIPT_STYLE, text, " ");
    let text = replace(&RE_COMMENT, &text, " ");
    let text = replace(&RE_DECLARATION, &text, " ");
    let text = replace(&RE_BLOCK_END, &text, "\n\n");
    let text = replace(&RE_LINE_BREAK, &text, "\n");
    replace(&RE_TAG, &text, " ")
}

/// Repair encoding artifacts: BOM, replacement characters, mojibake, and
/// compatibility forms (NFKC).
pub fn repair_encoding(text: &str) -> String {
    let mut out = text.replace(['\u{feff}', '\u{fffd}'], "");
    for (bad, good) in MOJIBAKE {
        if out.contains(bad) {
            out = out.replace(bad, good);
        }
    }
    out.nfkc().collect()
}

/// Collapse runs of spaces, drop control characters, and keep at most one
/// blank line between paragraphs.
pub fn collapse_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = Vec::new();
    let mut blank = false;
    for line in unified.split('\n') {
        let cleaned: String = line
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let line = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank = !lines.is_empty();
            continue;
        }
        if blank {
            lines.push(String::new());
            blank = false;
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// The full normalization: markup, entities, encoding, whitespace.
pub fn normalize_text(raw: &str) -> String {
    let stripped = strip_markup(raw);
    let decoded = decode_entities(&stripped);
    let repaired = repair_encoding(&decoded);
    collapse_whitespace(&repaired)
}

/// Produces the document's normalized content and content hash.
#[derive(Debug, Default)]
pub struct Normalize;

impl Stage for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn execute(&self, ctx: &mut StageContext<'_>) -> LumenResult<StageResult> {
        let content = normalize_text(&ctx.document.raw_content);
        if content.is_empty() {
            return Ok(StageResult::rejected("empty content"));
        }
        let removed = ctx.document.raw_content.len().saturating_sub(content.len());
        ctx.document.content_hash = content_hash(&content);
        ctx.document.content = content;
        if removed > 0 {
            ctx.note(format!("removed {removed} bytes"));
        }
        Ok(StageResult::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_scripts_and_comments() {
        let html = "<html><head><style>p{color:red}</style><script>alert(1)</script></head>\
                    <body><!-- hidden --><p>Hello <b>world</b></p><p>Second</p></body></html>";
        assert_eq!(normalize_text(html), "Hello world\n\nSecond");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(
            normalize_text("Fish &amp; chips &lt;3 &#233;t&#xE9; &bogus;"),
            "Fish & chips <3 été &bogus;"
        );
    }

    #[test]
    fn repairs_mojibake_bom_and_compat_forms() {
        let text = "\u{feff}Itâ€™s a \u{fb01}ne day\u{fffd}";
        assert_eq!(normalize_text(text), "It's a fine day");
    }

    #[test]
    fn keeps_comparison_operators() {
        assert_eq!(normalize_text("if a < b and c > d"), "if a < b and c > d");
    }

    #[test]
    fn collapses_whitespace_and_blank_lines() {
        let text = "  one\t\ttwo \r\n\r\n\r\n\n three\u{7}four  ";
        assert_eq!(normalize_text(text), "one two\n\nthree four");
    }

    #[test]
    fn markup_only_input_is_empty() {
        assert_eq!(normalize_text("<div><br/></div>  <!-- x -->"), "");
    }
}
