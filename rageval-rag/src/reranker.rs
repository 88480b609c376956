//! Reranker trait for re-scoring search results.

use async_trait::async_trait;

use crate::document::ScoredPoint;
use crate::error::Result;

/// A reranker that re-scores and reorders search results.
///
/// Implementations can use cross-encoder models, hosted rerank APIs, or
/// other strategies to improve precision beyond fused vector similarity.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank search results given the original query.
    ///
    /// Returns results in a new order with potentially updated scores.
    async fn rerank(&self, query: &str, results: Vec<ScoredPoint>) -> Result<Vec<ScoredPoint>>;
}

/// A no-op reranker that returns results unchanged.
///
/// Used when no rerank model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(&self, _query: &str, results: Vec<ScoredPoint>) -> Result<Vec<ScoredPoint>> {
        Ok(results)
    }
}
