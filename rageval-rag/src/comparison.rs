//! Side-by-side comparison orchestrator.
//!
//! The [`RagComparison`] ingests the uploaded documents once into the hybrid
//! collection, then answers the same query through every selected strategy:
//! retrieve → format context → generate → evaluate.
//!
//! # Example
//!
//! ```rust,ignore
//! use rageval_rag::{InMemoryVectorStore, ModelSelection, RagComparison, RagConfig};
//!
//! let comparison = RagComparison::builder()
//!     .config(RagConfig::default())
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .embedding_provider(Arc::new(my_embedder))
//!     .language_model(Arc::new(my_llm))
//!     .build()?;
//!
//! let report = comparison
//!     .run(&documents, "What is the refund policy?", ModelSelection::All)
//!     .await?;
//! let body = report.response_body(ModelSelection::All);
//! ```

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{DocumentChunk, ScoredPoint, SourceDocument};
use crate::embedding::{EmbeddingProvider, SparseEmbeddingProvider};
use crate::error::{RagError, Result};
use crate::eval::{LlmEvaluation, RetrieverEvaluation};
use crate::generation::{ResponseGenerator, format_context};
use crate::hybrid::HybridRetriever;
use crate::hyde::{HydeRetriever, MmrParams};
use crate::indexing::{HybridIndexer, IndexReport};
use crate::llm::LanguageModel;
use crate::multiquery::MultiQueryRetriever;
use crate::prompt::PromptTemplates;
use crate::protocol::{ModelSelection, Strategy, StrategyOutcome, response_body};
use crate::reranker::Reranker;
use crate::retriever::{DenseRetriever, Retriever};
use crate::session::StoreSession;
use crate::sparse::Bm25SparseEmbedder;
use crate::vectorstore::{CollectionSchema, VectorStore};

/// What one strategy produced for a query.
#[derive(Debug, Clone)]
pub struct StrategyResult {
    /// The generated answer.
    pub answer: String,
    /// The chunks the answer was generated from.
    pub retrieved: Vec<ScoredPoint>,
    /// Metrics of the answer.
    pub llm_eval: LlmEvaluation,
    /// Metrics of the retrieved list.
    pub retriever_eval: RetrieverEvaluation,
}

/// One strategy's run within a comparison.
#[derive(Debug)]
pub struct StrategyRun {
    /// The strategy that ran.
    pub strategy: Strategy,
    /// Its result, or the logged error that stopped it.
    pub result: Result<StrategyResult>,
}

impl StrategyRun {
    /// The wire form of this run.
    pub fn outcome(&self) -> StrategyOutcome {
        match &self.result {
            Ok(r) => StrategyOutcome {
                response: r.answer.clone(),
                llm_eval: Some(r.llm_eval.to_metric_line()),
                retriever_eval: Some(r.retriever_eval.to_metric_line()),
            },
            Err(e) => StrategyOutcome::failed(e),
        }
    }
}

/// Result of [`RagComparison::run`].
#[derive(Debug)]
pub struct ComparisonReport {
    /// Identifier assigned to the uploaded documents.
    pub document_id: String,
    /// Outcome of indexing the uploads.
    pub index: IndexReport,
    /// One entry per selected strategy, in display order.
    pub runs: Vec<StrategyRun>,
}

impl ComparisonReport {
    /// Build the JSON response object for `selection`.
    pub fn response_body(
        &self,
        selection: ModelSelection,
    ) -> serde_json::Map<String, serde_json::Value> {
        let outcomes: Vec<(Strategy, StrategyOutcome)> =
            self.runs.iter().map(|run| (run.strategy, run.outcome())).collect();
        response_body(selection, &outcomes)
    }
}

/// Ingests uploads and answers a query through each retrieval strategy.
///
/// Construct one via [`RagComparison::builder()`].
pub struct RagComparison {
    config: RagConfig,
    session: StoreSession,
    indexer: HybridIndexer,
    chunker: Arc<dyn Chunker>,
    hybrid: HybridRetriever,
    hyde: HydeRetriever,
    multiquery: MultiQueryRetriever,
    dense: DenseRetriever,
    standard: ResponseGenerator,
    conversational: ResponseGenerator,
}

impl RagComparison {
    /// Create a new [`RagComparisonBuilder`].
    pub fn builder() -> RagComparisonBuilder {
        RagComparisonBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the vector-store session.
    pub fn session(&self) -> &StoreSession {
        &self.session
    }

    /// The retriever backing `strategy`.
    pub fn retriever(&self, strategy: Strategy) -> &dyn Retriever {
        match strategy {
            Strategy::Hybrid => &self.hybrid,
            Strategy::Hyde => &self.hyde,
            Strategy::MultiQuery => &self.multiquery,
            Strategy::Dense => &self.dense,
        }
    }

    fn generator(&self, strategy: Strategy) -> &ResponseGenerator {
        match strategy {
            Strategy::Hyde => &self.conversational,
            _ => &self.standard,
        }
    }

    /// Chunk every document, tagging the chunks with `document_id`.
    pub fn chunk_documents(
        &self,
        documents: &[SourceDocument],
        document_id: &str,
    ) -> Vec<DocumentChunk> {
        documents.iter().flat_map(|doc| self.chunker.chunk(doc, document_id)).collect()
    }

    /// Ingest `documents` under a fresh document id and run the selected strategies.
    ///
    /// A failing strategy is logged and recorded in its [`StrategyRun`]; the
    /// other strategies still run.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidRequest`] if there are no documents, the
    /// query is blank, or the documents yield no text, and
    /// [`RagError::PipelineError`] if nothing could be indexed.
    /// Store errors while ensuring the collection are propagated.
    pub async fn run(
        &self,
        documents: &[SourceDocument],
        query: &str,
        selection: ModelSelection,
    ) -> Result<ComparisonReport> {
        if documents.is_empty() {
            return Err(RagError::InvalidRequest("at least one document is required".into()));
        }
        if query.trim().is_empty() {
            return Err(RagError::InvalidRequest("query must not be empty".into()));
        }

        self.session.create_hybrid_collection().await?;
        let collection = self.session.collection();

        let document_id = Uuid::new_v4().to_string();
        let chunks = self.chunk_documents(documents, &document_id);
        if chunks.is_empty() {
            error!(%document_id, "uploaded documents contain no text");
            return Err(RagError::InvalidRequest("uploaded documents contain no text".into()));
        }

        let index = self
            .indexer
            .index_hybrid_collection(&chunks, collection, self.config.batch_size)
            .await?;
        if index.indexed == 0 {
            error!(%document_id, invalid = index.invalid, "no chunk could be indexed");
            return Err(RagError::PipelineError(format!(
                "none of the {} chunks could be indexed",
                index.total
            )));
        }

        let mut runs = Vec::new();
        for strategy in selection.strategies() {
            let result = self.run_strategy(strategy, query, &document_id).await;
            if let Err(e) = &result {
                error!(strategy = strategy.wire_name(), error = %e, "strategy failed");
            }
            runs.push(StrategyRun { strategy, result });
        }

        info!(
            %document_id,
            selection = selection.wire_name(),
            indexed = index.indexed,
            succeeded = runs.iter().filter(|r| r.result.is_ok()).count(),
            "comparison finished"
        );
        Ok(ComparisonReport { document_id, index, runs })
    }

    /// Retrieve, generate and evaluate with one strategy over indexed chunks of `document_id`.
    pub async fn run_strategy(
        &self,
        strategy: Strategy,
        query: &str,
        document_id: &str,
    ) -> Result<StrategyResult> {
        let collection = self.session.collection();
        let retrieved = self.retriever(strategy).retrieve(query, document_id, collection).await?;
        let context = format_context(&retrieved);
        let answer = self.generator(strategy).generate_response(query, &context).await?;

        Ok(StrategyResult {
            llm_eval: LlmEvaluation::assess(query, &answer, &context),
            retriever_eval: RetrieverEvaluation::assess(query, &retrieved),
            answer,
            retrieved,
        })
    }
}

/// Builder for [`RagComparison`].
///
/// `vector_store`, `embedding_provider` and `language_model` are required.
/// The sparse embedder defaults to [`Bm25SparseEmbedder`], the chunker to a
/// [`RecursiveChunker`] sized from the config, and the prompts to
/// [`PromptTemplates::default`].
#[derive(Default)]
pub struct RagComparisonBuilder {
    config: Option<RagConfig>,
    vector_store: Option<Arc<dyn VectorStore>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    sparse_provider: Option<Arc<dyn SparseEmbeddingProvider>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    chunker: Option<Arc<dyn Chunker>>,
    reranker: Option<Arc<dyn Reranker>>,
    templates: Option<PromptTemplates>,
}

impl RagComparisonBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the shared vector store handle.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the dense embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the sparse embedding provider.
    pub fn sparse_provider(mut self, provider: Arc<dyn SparseEmbeddingProvider>) -> Self {
        self.sparse_provider = Some(provider);
        self
    }

    /// Set the language model used for answers, HyDE passages and query rewrites.
    pub fn language_model(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(llm);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the reranker applied to hybrid results.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Replace the prompt templates.
    pub fn templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Build the [`RagComparison`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// embedding provider's dimensionality differs from the configured one.
    pub fn build(self) -> Result<RagComparison> {
        let config = self.config.unwrap_or_default();
        let store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let dense = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let llm = self
            .language_model
            .ok_or_else(|| RagError::ConfigError("language_model is required".to_string()))?;

        if dense.dimensions() != config.dense_dimensions {
            return Err(RagError::ConfigError(format!(
                "embedding provider produces {} dimensions but the collection expects {}",
                dense.dimensions(),
                config.dense_dimensions
            )));
        }

        let sparse = self.sparse_provider.unwrap_or_else(|| Arc::new(Bm25SparseEmbedder::new()));
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let templates = self.templates.unwrap_or_default();

        let session = StoreSession::new(
            store.clone(),
            config.collection.clone(),
            CollectionSchema::hybrid(config.dense_dimensions),
        );
        let indexer = HybridIndexer::new(dense.clone(), sparse.clone(), store.clone());

        let mut hybrid =
            HybridRetriever::new(dense.clone(), sparse, store.clone(), config.hybrid_limit);
        if let Some(reranker) = self.reranker {
            hybrid = hybrid.with_reranker(reranker);
        }
        let hyde = HydeRetriever::new(
            llm.clone(),
            dense.clone(),
            store.clone(),
            templates.hypothetical_document.clone(),
        )
        .with_mmr(MmrParams {
            k: config.mmr_k,
            fetch_k: config.mmr_fetch_k,
            lambda: config.mmr_lambda,
        });
        let multiquery = MultiQueryRetriever::new(
            llm.clone(),
            DenseRetriever::new(dense.clone(), store.clone(), config.search_limit),
            templates.query_variants.clone(),
            config.query_variants,
            config.search_limit,
        );
        let dense_retriever = DenseRetriever::new(dense, store, config.search_limit);

        Ok(RagComparison {
            standard: ResponseGenerator::new(llm.clone(), templates.standard),
            conversational: ResponseGenerator::new(llm, templates.conversational),
            config,
            session,
            indexer,
            chunker,
            hybrid,
            hyde,
            multiquery,
            dense: dense_retriever,
        })
    }
}
