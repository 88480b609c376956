//! Retriever trait and the single-field dense and sparse retrievers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::document::ScoredPoint;
use crate::embedding::{EmbeddingProvider, SparseEmbeddingProvider};
use crate::error::{RagError, Result};
use crate::vectorstore::{MetadataFilter, QueryRequest, VectorQuery, VectorStore};

/// A retrieval strategy returning ranked chunks of one source document.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short strategy name used in logs.
    fn name(&self) -> &str;

    /// Retrieve chunks of `document_id` relevant to `query` from `collection`.
    async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<ScoredPoint>>;
}

/// Log a failed retrieval step and wrap it as a pipeline error.
pub(crate) fn retrieval_failed(strategy: &str, step: &str, e: RagError) -> RagError {
    error!(strategy, step, error = %e, "retrieval failed");
    RagError::PipelineError(format!("{strategy} {step} failed: {e}"))
}

/// Nearest-neighbour search on the dense field.
pub struct DenseRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    limit: usize,
}

impl DenseRetriever {
    /// Create a dense retriever returning at most `limit` results.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        limit: usize,
    ) -> Self {
        Self { embedder, store, limit }
    }

    /// Search with an already computed query vector.
    pub async fn dense_search(
        &self,
        query: Vec<f32>,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<ScoredPoint>> {
        let request = QueryRequest::nearest(VectorQuery::Dense(query), self.limit)
            .with_filter(MetadataFilter::document(document_id));
        let results = self
            .store
            .query(collection, request)
            .await
            .map_err(|e| retrieval_failed("dense", "search", e))?;
        info!(collection, result_count = results.len(), "dense search completed");
        Ok(results)
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    fn name(&self) -> &str {
        "dense"
    }

    async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<ScoredPoint>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| retrieval_failed("dense", "embedding", e))?;
        self.dense_search(vector, document_id, collection).await
    }
}

/// Nearest-neighbour search on the sparse field.
pub struct SparseRetriever {
    embedder: Arc<dyn SparseEmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    limit: usize,
}

impl SparseRetriever {
    /// Create a sparse retriever returning at most `limit` results.
    pub fn new(
        embedder: Arc<dyn SparseEmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        limit: usize,
    ) -> Self {
        Self { embedder, store, limit }
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    fn name(&self) -> &str {
        "sparse"
    }

    async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<ScoredPoint>> {
        let vector = self
            .embedder
            .embed_sparse(query)
            .await
            .map_err(|e| retrieval_failed("sparse", "embedding", e))?;

        let request = QueryRequest::nearest(VectorQuery::Sparse(vector), self.limit)
            .with_filter(MetadataFilter::document(document_id));
        let results = self
            .store
            .query(collection, request)
            .await
            .map_err(|e| retrieval_failed("sparse", "search", e))?;

        info!(collection, result_count = results.len(), "sparse search completed");
        Ok(results)
    }
}
