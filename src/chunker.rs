//! Paragraph-boundary text chunker.
//!
//! Splits extracted document text into retrieval-sized passages. Splitting
//! occurs on blank-line boundaries (one or more newlines surrounded by
//! optional whitespace) so each passage keeps its semantic coherence.
//! Segments shorter than the minimum length are discarded as noise —
//! page numbers, stray headers, and similar fragments carry no retrieval
//! value.

/// Minimum trimmed length (in characters) for a segment to become a chunk.
pub const MIN_CHUNK_CHARS: usize = 20;

/// Split text into passages on blank-line boundaries.
///
/// Returns trimmed passages in source order, skipping any whose trimmed
/// character count is below `min_chars`. A document that produces zero
/// qualifying passages yields an empty vector; callers treat that as a
/// valid outcome, not an error.
pub fn split_passages(text: &str, min_chars: usize) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_passage(&mut passages, &mut current, min_chars);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    flush_passage(&mut passages, &mut current, min_chars);

    passages
}

fn flush_passage(passages: &mut Vec<String>, current: &mut String, min_chars: usize) {
    let trimmed = current.trim();
    if trimmed.chars().count() >= min_chars {
        passages.push(trimmed.to_string());
    }
    current.clear();
}
