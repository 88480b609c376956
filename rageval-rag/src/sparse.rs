//! Local BM25-style sparse embedder.
//!
//! [`Bm25SparseEmbedder`] turns text into term-weight vectors compatible with
//! Qdrant's sparse vector format. Tokens are lowercased alphanumeric runs,
//! hashed into a 32-bit index space; each weight is the BM25 term-frequency
//! saturation `tf * (k1 + 1) / (tf + k1 * (1 - b + b * len / avg_len))`.
//! Inverse document frequency is left to the vector store.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::document::SparseVector;
use crate::embedding::SparseEmbeddingProvider;
use crate::error::Result;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Common English words that carry no lexical signal.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "was", "were", "will", "with",
];

/// A deterministic sparse embedder using hashed BM25 term weights.
#[derive(Debug, Clone)]
pub struct Bm25SparseEmbedder {
    k1: f32,
    b: f32,
    avg_len: f32,
}

impl Default for Bm25SparseEmbedder {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, avg_len: 256.0 }
    }
}

impl Bm25SparseEmbedder {
    /// Create an embedder with the standard BM25 parameters (`k1 = 1.2`, `b = 0.75`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the term-frequency saturation parameters.
    pub fn with_params(mut self, k1: f32, b: f32) -> Self {
        self.k1 = k1;
        self.b = b;
        self
    }

    /// Set the expected average document length in tokens.
    pub fn with_avg_len(mut self, avg_len: f32) -> Self {
        self.avg_len = avg_len.max(1.0);
        self
    }

    /// Compute the sparse vector synchronously.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let tokens = tokenize(text);
        let doc_len = tokens.len() as f32;

        let mut frequencies: BTreeMap<u32, f32> = BTreeMap::new();
        for token in &tokens {
            *frequencies.entry(token_index(token)).or_default() += 1.0;
        }

        let norm = self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_len);
        let (indices, values) = frequencies
            .into_iter()
            .map(|(idx, tf)| (idx, tf * (self.k1 + 1.0) / (tf + norm)))
            .unzip();
        SparseVector { indices, values }
    }
}

#[async_trait]
impl SparseEmbeddingProvider for Bm25SparseEmbedder {
    async fn embed_sparse(&self, text: &str) -> Result<SparseVector> {
        Ok(self.vectorize(text))
    }
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// FNV-1a hash of the token bytes.
pub(crate) fn token_index(token: &str) -> u32 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME))
}
