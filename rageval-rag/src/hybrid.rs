//! Hybrid retrieval: sparse + dense prefetch, RRF fusion, rerank.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::document::{ScoredPoint, SparseVector};
use crate::embedding::{EmbeddingProvider, SparseEmbeddingProvider};
use crate::error::Result;
use crate::reranker::{NoOpReranker, Reranker};
use crate::retriever::{Retriever, retrieval_failed};
use crate::vectorstore::{Fusion, MetadataFilter, Prefetch, QueryRequest, VectorQuery, VectorStore};

/// Fuses sparse and dense nearest-neighbour lists with RRF, then reranks.
pub struct HybridRetriever {
    dense: Arc<dyn EmbeddingProvider>,
    sparse: Arc<dyn SparseEmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    reranker: Arc<dyn Reranker>,
    limit: usize,
}

impl HybridRetriever {
    /// Create a hybrid retriever with no reranking and the given result limit.
    pub fn new(
        dense: Arc<dyn EmbeddingProvider>,
        sparse: Arc<dyn SparseEmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        limit: usize,
    ) -> Self {
        Self { dense, sparse, store, reranker: Arc::new(NoOpReranker), limit }
    }

    /// Set the reranker applied to the fused results.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Build the fused request: each prefetch and the final list are limited to `limit`.
    pub fn fusion_request(
        dense: Vec<f32>,
        sparse: SparseVector,
        document_id: &str,
        limit: usize,
    ) -> QueryRequest {
        QueryRequest::fusion(
            vec![
                Prefetch { query: VectorQuery::Sparse(sparse), limit },
                Prefetch { query: VectorQuery::Dense(dense), limit },
            ],
            Fusion::Rrf,
            limit,
        )
        .with_filter(MetadataFilter::document(document_id))
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<ScoredPoint>> {
        info!(collection, document_id, "performing hybrid search");

        let dense = self
            .dense
            .embed(query)
            .await
            .map_err(|e| retrieval_failed("hybrid", "dense embedding", e))?;
        let sparse = self
            .sparse
            .embed_sparse(query)
            .await
            .map_err(|e| retrieval_failed("hybrid", "sparse embedding", e))?;

        let request = Self::fusion_request(dense, sparse, document_id, self.limit);
        let fused = self
            .store
            .query(collection, request)
            .await
            .map_err(|e| retrieval_failed("hybrid", "search", e))?;

        let mut reranked = self
            .reranker
            .rerank(query, fused)
            .await
            .map_err(|e| retrieval_failed("hybrid", "rerank", e))?;
        reranked.truncate(self.limit);

        info!(collection, result_count = reranked.len(), "hybrid search completed");
        Ok(reranked)
    }
}
