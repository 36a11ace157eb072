//! Paragraph-packing chunker.

use regex::Regex;
use std::sync::LazyLock;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Splits `text` into chunks of roughly `max_words` words.
///
/// Paragraphs (separated by blank lines) are packed greedily. A chunk is
/// closed before a paragraph that would overflow it, so paragraphs are never
/// split: one longer than `max_words` becomes an oversized chunk of its own.
/// Whitespace inside a chunk is normalized to single spaces.
pub fn chunk(text: &str, max_words: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for paragraph in PARAGRAPH_BREAK.split(text).map(str::trim) {
        if paragraph.is_empty() {
            continue;
        }
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if current.len() + words.len() > max_words && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
        }
        current.extend(words);
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}
