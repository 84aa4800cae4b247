//! Sentence-aware chunking with overlap.
//!
//! Text is cut into sentence spans, oversized sentences are split at
//! whitespace, and consecutive spans are packed into windows of at most
//! `size` characters. Each window after the first starts on a span boundary
//! and repeats up to `overlap` characters of trailing spans from the one
//! before it. Offsets are byte offsets into the input.

use lumen_core::models::Chunk;

/// A trimmed byte range of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn chars(&self, text: &str) -> usize {
        text[self.start..self.end].chars().count()
    }
}

/// Split `text` into chunks belonging to `document_id`.
pub fn chunk_text(document_id: &str, text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let size = size.max(1);
    let overlap = overlap.min(size.saturating_sub(1));
    let units: Vec<Span> = sentence_spans(text)
        .into_iter()
        .flat_map(|s| hard_split(text, s, size))
        .collect();
    if units.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut i = 0;
    loop {
        let mut j = i;
        let mut len = 0;
        while j < units.len() {
            let unit_len = units[j].chars(text);
            let added = if j == i {
                unit_len
            } else {
                unit_len + text[units[j - 1].end..units[j].start].chars().count()
            };
            if j > i && len + added > size {
                break;
            }
            len += added;
            j += 1;
        }

        let start = units[i].start;
        let end = units[j - 1].end;
        chunks.push(Chunk::new(
            document_id,
            chunks.len(),
            start,
            text[start..end].to_string(),
        ));
        if j >= units.len() {
            break;
        }

        let mut k = j;
        let mut carried = 0;
        while k > i + 1 {
            let unit_len = units[k - 1].chars(text);
            if carried + unit_len > overlap {
                break;
            }
            carried += unit_len;
            k -= 1;
        }
        i = k;
    }
    chunks
}

fn trimmed(text: &str, start: usize, end: usize) -> Option<Span> {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    let span = Span {
        start: start + lead,
        end: end - trail,
    };
    (span.start < span.end).then_some(span)
}

/// Sentences end at `.`, `!` or `?` followed by whitespace, or at a newline.
fn sentence_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();
    while let Some((idx, c)) = iter.next() {
        let boundary = match c {
            '\n' => true,
            '.' | '!' | '?' => iter.peek().map_or(true, |(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let end = idx + c.len_utf8();
            spans.extend(trimmed(text, start, end));
            start = end;
        }
    }
    spans.extend(trimmed(text, start, text.len()));
    spans
}

/// Split a span longer than `size` chars, preferring the last whitespace
/// inside each window.
fn hard_split(text: &str, span: Span, size: usize) -> Vec<Span> {
    if span.chars(text) <= size {
        return vec![span];
    }
    let mut out = Vec::new();
    let mut start = span.start;
    while start < span.end {
        let rest = &text[start..span.end];
        if rest.chars().count() <= size {
            out.extend(trimmed(text, start, span.end));
            break;
        }
        let limit = rest
            .char_indices()
            .nth(size)
            .map_or(rest.len(), |(i, _)| i);
        let cut = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        out.extend(trimmed(text, start, start + cut));
        start += cut;
    }
    out
}
