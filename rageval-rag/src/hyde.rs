//! Hypothetical-document-embedding (HyDE) retrieval.
//!
//! The language model first writes a passage that would answer the query.
//! That passage, not the literal query, is embedded and searched; the
//! candidates are then narrowed with maximal marginal relevance.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::document::ScoredPoint;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::mmr::maximal_marginal_relevance;
use crate::prompt::PromptTemplate;
use crate::retriever::{Retriever, retrieval_failed};
use crate::vectorstore::{MetadataFilter, QueryRequest, VectorQuery, VectorStore};

/// MMR parameters for the HyDE retriever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrParams {
    /// Number of documents returned.
    pub k: usize,
    /// Number of candidates fetched before selection.
    pub fetch_k: usize,
    /// Relevance/diversity trade-off.
    pub lambda: f32,
}

impl Default for MmrParams {
    fn default() -> Self {
        Self { k: 4, fetch_k: 20, lambda: 0.5 }
    }
}

/// Retrieves with the embedding of a generated hypothetical answer.
pub struct HydeRetriever {
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    template: PromptTemplate,
    mmr: MmrParams,
}

impl HydeRetriever {
    /// Create a HyDE retriever. `template` must carry a `{question}` slot.
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        template: PromptTemplate,
    ) -> Self {
        Self { llm, embedder, store, template, mmr: MmrParams::default() }
    }

    /// Override the MMR parameters.
    pub fn with_mmr(mut self, mmr: MmrParams) -> Self {
        self.mmr = mmr;
        self
    }

    /// Ask the model for a passage answering `query`.
    pub async fn hypothetical_document(&self, query: &str) -> Result<String> {
        let prompt = self.template.render(&[("question", query)]);
        let passage = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| retrieval_failed("hyde", "hypothetical document", e))?;
        debug!(passage_len = passage.len(), "hypothetical document generated");
        Ok(passage)
    }
}

#[async_trait]
impl Retriever for HydeRetriever {
    fn name(&self) -> &str {
        "hyde"
    }

    async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<ScoredPoint>> {
        let passage = self.hypothetical_document(query).await?;
        let query_vector = self
            .embedder
            .embed(&passage)
            .await
            .map_err(|e| retrieval_failed("hyde", "embedding", e))?;

        let request =
            QueryRequest::nearest(VectorQuery::Dense(query_vector.clone()), self.mmr.fetch_k)
                .with_filter(MetadataFilter::document(document_id));
        let candidates = self
            .store
            .query(collection, request)
            .await
            .map_err(|e| retrieval_failed("hyde", "search", e))?;

        if candidates.len() <= 1 {
            return Ok(candidates);
        }

        let texts: Vec<&str> = candidates.iter().map(|c| c.content.as_str()).collect();
        let candidate_vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| retrieval_failed("hyde", "candidate embedding", e))?;

        let MmrParams { k, lambda, .. } = self.mmr;
        let picked = maximal_marginal_relevance(&query_vector, &candidate_vectors, k, lambda);
        let results: Vec<ScoredPoint> = picked.into_iter().map(|i| candidates[i].clone()).collect();

        info!(
            collection,
            candidates = candidates.len(),
            result_count = results.len(),
            "hyde search completed"
        );
        Ok(results)
    }
}
