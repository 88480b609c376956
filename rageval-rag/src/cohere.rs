//! Cohere-compatible rerank client.
//!
//! This module is only available when the `cohere` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::ScoredPoint;
use crate::error::{RagError, Result};
use crate::reranker::Reranker;

/// The default Cohere rerank endpoint.
pub const DEFAULT_RERANK_URL: &str = "https://api.cohere.com/v2/rerank";

const DEFAULT_MODEL: &str = "rerank-v3.5";

/// A [`Reranker`] calling a Cohere-compatible `/rerank` API.
///
/// Results are reordered by the returned relevance score, which replaces the
/// fused retrieval score.
///
/// # Example
///
/// ```rust,ignore
/// use rageval_rag::cohere::CohereReranker;
///
/// let reranker = CohereReranker::new("co-...")?;
/// let hybrid = hybrid.with_reranker(Arc::new(reranker));
/// ```
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
}

impl CohereReranker {
    /// Create a reranker with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::RerankerError {
                reranker: "Cohere".into(),
                message: "API key must not be empty".into(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            url: DEFAULT_RERANK_URL.into(),
            model: DEFAULT_MODEL.into(),
        })
    }

    /// Create a reranker using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY").map_err(|_| RagError::RerankerError {
            reranker: "Cohere".into(),
            message: "COHERE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the rerank endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the rerank model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn failure(message: String) -> RagError {
        RagError::RerankerError { reranker: "Cohere".into(), message }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

/// Reorder `results` by the scored indices, dropping indices out of range.
fn apply_ranking(results: Vec<ScoredPoint>, ranking: Vec<RerankResult>) -> Vec<ScoredPoint> {
    let mut slots: Vec<Option<ScoredPoint>> = results.into_iter().map(Some).collect();
    ranking
        .into_iter()
        .filter_map(|r| {
            let mut point = slots.get_mut(r.index)?.take()?;
            point.score = r.relevance_score;
            Some(point)
        })
        .collect()
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(&self, query: &str, results: Vec<ScoredPoint>) -> Result<Vec<ScoredPoint>> {
        if results.is_empty() {
            return Ok(results);
        }

        debug!(reranker = "Cohere", model = %self.model, documents = results.len(), "reranking");

        let body = RerankRequest {
            model: &self.model,
            query,
            documents: results.iter().map(|r| r.content.as_str()).collect(),
            top_n: results.len(),
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(reranker = "Cohere", error = %e, "request failed");
                Self::failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(reranker = "Cohere", %status, "API error");
            return Err(Self::failure(format!("API returned {status}: {text}")));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("failed to parse response: {e}")))?;

        let mut ranking = parsed.results;
        ranking.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        Ok(apply_ranking(results, ranking))
    }
}
