//! Error types for the `rageval-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing, retrieving, or generating.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model failed to produce a completion.
    #[error("Generation error ({model}): {message}")]
    GenerationError {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The caller supplied no documents, a blank query, or documents without text.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the retrieval pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Whether the error was caused by the request rather than a backend.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RagError::InvalidRequest(_))
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
