//! Embedding provider traits for dense and sparse vectors.

use async_trait::async_trait;

use crate::document::SparseVector;
use crate::error::Result;

/// A provider that generates dense vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use rageval_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// A provider that generates sparse (index/value) embeddings for lexical matching.
#[async_trait]
pub trait SparseEmbeddingProvider: Send + Sync {
    /// Generate a sparse vector for a single text input.
    ///
    /// Returned indices must be strictly ascending.
    async fn embed_sparse(&self, text: &str) -> Result<SparseVector>;
}
