//! # rageval-rag
//!
//! Retrieval pipelines for comparing RAG strategies side by side.
//!
//! ## Overview
//!
//! Uploaded document text is chunked, embedded twice (dense and sparse) and
//! indexed into one hybrid collection. The same query is then answered by
//! each strategy:
//!
//! - [`HybridRetriever`] - sparse + dense prefetch fused with RRF, optional rerank
//! - [`HydeRetriever`] - search with the embedding of a generated hypothetical answer, MMR
//! - [`MultiQueryRetriever`] - dense search over model-generated query rewrites
//! - [`DenseRetriever`] - plain nearest-neighbour search
//!
//! [`RagComparison`] ties indexing, retrieval, generation and evaluation
//! together; [`protocol`] defines the JSON contract shared by the backend
//! and its clients.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rageval_rag::{InMemoryVectorStore, ModelSelection, RagComparison, SourceDocument};
//! use rageval_rag::mock::{HashEmbeddingProvider, MockLanguageModel};
//!
//! let comparison = RagComparison::builder()
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::new(384)))
//!     .language_model(Arc::new(MockLanguageModel::fixed("Thirty days.")))
//!     .build()?;
//!
//! let docs = vec![SourceDocument { name: "policy.pdf".into(), text: policy_text }];
//! let report = comparison
//!     .run(&docs, "What is the refund policy?", ModelSelection::All)
//!     .await?;
//! ```
//!
//! ## Features
//!
//! | Feature  | Enables |
//! |----------|---------|
//! | `qdrant` | [`qdrant::QdrantVectorStore`] over gRPC |
//! | `openai` | OpenAI-compatible embeddings and chat completions |
//! | `cohere` | Cohere-compatible rerank API |
//! | `full`   | all of the above |

pub mod chunking;
#[cfg(feature = "cohere")]
pub mod cohere;
pub mod comparison;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod fusion;
pub mod generation;
pub mod hybrid;
pub mod hyde;
pub mod indexing;
pub mod inmemory;
pub mod llm;
pub mod mmr;
pub mod mock;
pub mod multiquery;
#[cfg(feature = "openai")]
pub mod openai;
pub mod prompt;
pub mod protocol;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod reranker;
pub mod retriever;
pub mod session;
pub mod sparse;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use comparison::{
    ComparisonReport, RagComparison, RagComparisonBuilder, StrategyResult, StrategyRun,
};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{DocumentChunk, Point, ScoredPoint, SourceDocument, SparseVector};
pub use embedding::{EmbeddingProvider, SparseEmbeddingProvider};
pub use error::{RagError, Result};
pub use eval::{LlmEvaluation, RetrieverEvaluation};
pub use generation::{ResponseGenerator, format_context};
pub use hybrid::HybridRetriever;
pub use hyde::{HydeRetriever, MmrParams};
pub use indexing::{
    DualEmbedding, EmbeddingOutcome, HybridIndexer, IndexReport, InclusionRule, Modality,
};
pub use inmemory::InMemoryVectorStore;
pub use llm::LanguageModel;
pub use multiquery::MultiQueryRetriever;
pub use prompt::{PromptTemplate, PromptTemplates};
pub use protocol::{ModelSelection, Strategy, StrategyOutcome, StrategyView};
pub use reranker::{NoOpReranker, Reranker};
pub use retriever::{DenseRetriever, Retriever, SparseRetriever};
pub use session::{CollectionStatus, StoreSession};
pub use sparse::Bm25SparseEmbedder;
pub use vectorstore::{CollectionSchema, Distance, MetadataFilter, QueryRequest, VectorStore};

#[cfg(feature = "cohere")]
pub use cohere::CohereReranker;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
