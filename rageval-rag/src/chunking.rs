//! Splitting extracted document text into chunks.
//!
//! - [`FixedSizeChunker`] - splits by character count with configurable overlap
//! - [`RecursiveChunker`] - splits hierarchically by paragraphs, sentences, then words
//!
//! Sizes are counted in characters and every split lands on a char boundary,
//! so multi-byte text extracted from PDFs is safe.

use crate::document::{DocumentChunk, SOURCE_KEY, SourceDocument};

/// Metadata key holding the position of the chunk within its source.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split `document` into chunks tagged with `document_id`.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &SourceDocument, document_id: &str) -> Vec<DocumentChunk>;
}

fn into_chunks(
    texts: Vec<String>,
    document: &SourceDocument,
    document_id: &str,
) -> Vec<DocumentChunk> {
    texts
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(i, text)| {
            let mut chunk = DocumentChunk::new(text, document_id);
            chunk.metadata.insert(SOURCE_KEY.to_string(), document.name.clone());
            chunk.metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
            chunk
        })
        .collect()
}

/// Byte offset of the `n`th character of `text`, or `text.len()` past the end.
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// The last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    &text[byte_offset(text, count.saturating_sub(n))..]
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// # Example
///
/// ```rust,ignore
/// use rageval_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50);
/// let chunks = chunker.chunk(&document, "doc-42");
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &SourceDocument, document_id: &str) -> Vec<DocumentChunk> {
        let raw_chunks = split_by_size(&document.text, self.chunk_size, self.chunk_overlap);
        into_chunks(raw_chunks, document, document_id)
    }
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// First splits by paragraph separators (`\n\n`). If a paragraph exceeds
/// `chunk_size`, splits by sentence boundaries (`. `, `! `, `? `), then by
/// line breaks, then by words. Consecutive chunks share up to
/// `chunk_overlap` trailing characters.
///
/// # Example
///
/// ```rust,ignore
/// use rageval_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&document, "doc-42");
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

const SEPARATORS: [&str; 6] = ["\n\n", ". ", "! ", "? ", "\n", " "];

/// Split text by a separator, then merge segments into chunks that respect
/// `chunk_size`. If a segment exceeds `chunk_size`, it is split further
/// using the next-level separator.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }
    let Some((separator, remaining_separators)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };

    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in split_keeping_separator(text, separator) {
        let segment_len = segment.chars().count();
        if segment_len > chunk_size {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let pieces = split_and_merge(segment, chunk_size, chunk_overlap, remaining_separators);
            chunks.extend(pieces);
            continue;
        }

        if current.chars().count() + segment_len <= chunk_size {
            current.push_str(segment);
            continue;
        }

        // Current chunk is full; start the next one with its tail as overlap.
        let overlap = tail_chars(&current, chunk_overlap).to_string();
        chunks.push(std::mem::take(&mut current));
        if overlap.chars().count() + segment_len <= chunk_size {
            current.push_str(&overlap);
        }
        current.push_str(segment);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Simple character-based splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &SourceDocument, document_id: &str) -> Vec<DocumentChunk> {
        let raw_chunks =
            split_and_merge(&document.text, self.chunk_size, self.chunk_overlap, &SEPARATORS);
        into_chunks(raw_chunks, document, document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> SourceDocument {
        SourceDocument { name: "policy.pdf".into(), text: text.into() }
    }

    #[test]
    fn fixed_size_overlaps() {
        let chunks = FixedSizeChunker::new(4, 2).chunk(&doc("abcdefgh"), "d");
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "héllo wörld ".repeat(50);
        let chunks = RecursiveChunker::new(30, 5).chunk(&doc(&text), "d");
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 30));
    }

    #[test]
    fn chunks_carry_metadata() {
        let chunks = RecursiveChunker::new(40, 0)
            .chunk(&doc("First paragraph here.\n\nSecond paragraph is here too."), "doc-42");
        assert_eq!(chunks.len(), 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.document_id(), Some("doc-42"));
            assert_eq!(chunk.metadata.get(SOURCE_KEY).map(String::as_str), Some("policy.pdf"));
            assert_eq!(chunk.metadata.get(CHUNK_INDEX_KEY), Some(&i.to_string()));
        }
    }

    #[test]
    fn whitespace_only_document_yields_nothing() {
        assert!(RecursiveChunker::new(100, 10).chunk(&doc("   \n\n  "), "d").is_empty());
    }
}
