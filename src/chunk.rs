//! Overlapping text chunker with sentence-boundary snapping.
//!
//! Splits document text into windows of `chunk_size` characters. When a
//! window's right edge falls inside the text, the boundary is snapped back
//! to just after the nearest sentence terminator past the window's midpoint,
//! so most chunks end on a sentence. Consecutive windows overlap by
//! `overlap` characters to keep context across boundaries.
//!
//! Each chunk's id is a content hash of `(source_url, chunk_index, content
//! prefix)`, so re-chunking identical input yields identical ids.

use sha2::{Digest, Sha256};

/// Default window width in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between consecutive windows, in characters.
pub const DEFAULT_OVERLAP: usize = 50;

/// Sentence terminators searched for when snapping a window boundary,
/// in preference order.
const TERMINATORS: [&str; 4] = [". ", "! ", "? ", "\n\n"];

/// Split `text` into overlapping chunks.
///
/// Requires `overlap < chunk_size`. If the whole text fits in one window,
/// a single-element vector containing the text is returned.
///
/// # Guarantees
///
/// - Every chunk is non-empty after trimming.
/// - Chunks appear in source order and jointly cover the input.
/// - A snapped boundary never extends a window; every chunk is at most
///   `chunk_size` bytes.
/// - Window arithmetic respects UTF-8 character boundaries.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap < chunk_size, "overlap must be smaller than chunk_size");

    if text.len() <= chunk_size {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![text.to_string()];
    }

    let len = text.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        // Window end may run past the text; the slice below clamps it, but
        // the advance step uses the unclamped value.
        let mut end = start + chunk_size;

        if end < len {
            end = snap_to_char_boundary(text, end);
            let midpoint = start + chunk_size / 2;
            for punct in TERMINATORS {
                if let Some(rel) = text[start..end].rfind(punct) {
                    let abs = start + rel;
                    if abs > midpoint {
                        end = abs + punct.len();
                        break;
                    }
                }
            }
        }

        let slice_end = snap_to_char_boundary(text, end.min(len));
        let piece = text[start..slice_end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        let next = end.saturating_sub(overlap);
        if next >= len {
            break;
        }
        let next = snap_to_char_boundary(text, next);
        // Forward progress even for degenerate overlap/snap combinations.
        start = if next > start { next } else { slice_end };
    }

    chunks
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Derive the deterministic id for a chunk at `chunk_index` of `source_url`.
///
/// The id hashes the URL, the index, and the first 100 characters of the
/// content, so identical input re-ingests to the same id while changed
/// content at the same position gets a new one.
pub fn chunk_id(source_url: &str, chunk_index: i64, content: &str) -> String {
    let prefix: String = content.chars().take(100).collect();
    let mut hasher = Sha256::new();
    hasher.update(source_url.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_index.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(prefix.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}", &digest[..32], chunk_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(n: usize) -> String {
        (0..n)
            .map(|i| format!("This is sentence number {} of the test corpus.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("Hello, world!", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Hello, world!");
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(split_text("   \n\n  ", 500, 50).is_empty());
    }

    #[test]
    fn test_long_text_produces_multiple_chunks() {
        let text = sentences(40);
        let chunks = split_text(&text, 500, 50);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(!c.trim().is_empty());
            assert!(c.len() <= 500, "chunk exceeds window: {} bytes", c.len());
        }
    }

    #[test]
    fn test_chunks_cover_text_in_order() {
        let text = sentences(40);
        let chunks = split_text(&text, 500, 50);

        assert!(text.starts_with(&chunks[0]));
        assert!(text.ends_with(chunks.last().unwrap().as_str()));

        let mut cursor = 0;
        for c in &chunks {
            let pos = text[cursor..]
                .find(c.as_str())
                .expect("chunk must appear in source text after the previous chunk");
            cursor += pos;
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = sentences(40);
        let chunks = split_text(&text, 500, 50);
        for pair in chunks.windows(2) {
            let head: String = pair[1].chars().take(20).collect();
            assert!(
                pair[0].contains(&head),
                "window overlap lost between consecutive chunks"
            );
        }
    }

    #[test]
    fn test_snaps_to_sentence_boundary() {
        // One sentence ending well past the midpoint of the first window.
        let mut text = "x".repeat(300);
        text.push_str(". ");
        text.push_str(&"y".repeat(400));
        let chunks = split_text(&text, 500, 50);
        assert!(chunks[0].ends_with('.'), "first chunk: {:?}", &chunks[0]);
    }

    #[test]
    fn test_raw_cut_when_no_terminator() {
        // No terminators at all: boundary falls mid-run at chunk_size.
        let text = "a".repeat(1200);
        let chunks = split_text(&text, 500, 50);
        assert_eq!(chunks[0].len(), 500);
        assert!(chunks.len() >= 3);
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "日本語のテキスト。".repeat(120);
        let chunks = split_text(&text, 500, 50);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(!c.is_empty());
        }
    }

    #[test]
    fn test_degenerate_overlap_still_terminates() {
        let text = "b".repeat(2000);
        let chunks = split_text(&text, 100, 99);
        assert!(!chunks.is_empty());
        assert!(text.ends_with(chunks.last().unwrap().as_str()));
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let a = chunk_id("https://example.com/a", 0, "some content here");
        let b = chunk_id("https://example.com/a", 0, "some content here");
        assert_eq!(a, b);
        assert!(a.ends_with("_0"));
    }

    #[test]
    fn test_chunk_id_varies_with_inputs() {
        let base = chunk_id("https://example.com/a", 0, "some content here");
        assert_ne!(base, chunk_id("https://example.com/b", 0, "some content here"));
        assert_ne!(base, chunk_id("https://example.com/a", 1, "some content here"));
        assert_ne!(base, chunk_id("https://example.com/a", 0, "different content"));
    }

    #[test]
    fn test_chunk_id_uses_content_prefix_only() {
        // Identical first 100 chars hash identically regardless of the tail.
        let prefix = "p".repeat(100);
        let a = chunk_id("u", 2, &format!("{}tail-one", prefix));
        let b = chunk_id("u", 2, &format!("{}tail-two", prefix));
        assert_eq!(a, b);
    }
}
