//! Hybrid indexing: dual embedding with per-chunk failure isolation, batched upload.
//!
//! Each chunk is embedded twice (dense and sparse) independently. A failure in
//! either modality is logged and recorded in the chunk's [`DualEmbedding`]; the
//! [`InclusionRule`] then decides whether the chunk becomes a [`Point`]. A chunk
//! that is left out counts as invalid. Nothing is ever stored with a missing
//! vector.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::document::{DocumentChunk, Point, SparseVector};
use crate::embedding::{EmbeddingProvider, SparseEmbeddingProvider};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Default number of chunks per batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// An embedding modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Dense semantic vector.
    Dense,
    /// Sparse lexical vector.
    Sparse,
}

/// Result of one modality's embedding attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome<T> {
    /// The vector was produced.
    Ready(T),
    /// Generation failed; holds the error message.
    Failed(String),
}

impl<T> EmbeddingOutcome<T> {
    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Ready(v),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Whether the vector was produced.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Failed(_) => None,
        }
    }
}

/// The dense and sparse embedding attempts for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DualEmbedding {
    /// Dense attempt.
    pub dense: EmbeddingOutcome<Vec<f32>>,
    /// Sparse attempt.
    pub sparse: EmbeddingOutcome<SparseVector>,
}

impl DualEmbedding {
    /// Whether the given modality succeeded.
    pub fn has(&self, modality: Modality) -> bool {
        match modality {
            Modality::Dense => self.dense.is_ready(),
            Modality::Sparse => self.sparse.is_ready(),
        }
    }

    /// Both vectors, if both succeeded.
    pub fn into_vectors(self) -> Option<(Vec<f32>, SparseVector)> {
        Some((self.dense.into_ready()?, self.sparse.into_ready()?))
    }
}

/// Which modalities a chunk needs before it may be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionRule {
    required: Vec<Modality>,
}

impl Default for InclusionRule {
    fn default() -> Self {
        Self::all_modalities()
    }
}

impl InclusionRule {
    /// Require every modality the hybrid collection stores.
    pub fn all_modalities() -> Self {
        Self { required: vec![Modality::Dense, Modality::Sparse] }
    }

    /// The modalities this rule requires.
    pub fn required(&self) -> &[Modality] {
        &self.required
    }

    /// Whether the chunk's embeddings satisfy the rule.
    pub fn admits(&self, embedding: &DualEmbedding) -> bool {
        self.required.iter().all(|m| embedding.has(*m))
    }
}

/// Summary of one indexing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Number of chunks received.
    pub total: usize,
    /// Number of points uploaded.
    pub indexed: usize,
    /// Number of chunks skipped because an embedding failed.
    pub invalid: usize,
    /// Number of batches processed.
    pub batches: usize,
    /// Number of batches whose upload failed.
    pub failed_batches: usize,
    /// Number of points lost in failed uploads.
    pub failed_points: usize,
}

impl IndexReport {
    /// Whether every chunk was embedded and uploaded.
    pub fn all_indexed(&self) -> bool {
        self.invalid == 0 && self.failed_batches == 0
    }
}

/// Split `chunks` into consecutive batches of `batch_size`, the last one possibly shorter.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `batch_size` is zero.
pub fn plan_batches<T>(chunks: &[T], batch_size: usize) -> Result<std::slice::Chunks<'_, T>> {
    if batch_size == 0 {
        return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
    }
    Ok(chunks.chunks(batch_size))
}

/// Embeds chunks with both modalities and uploads them to a hybrid collection.
pub struct HybridIndexer {
    dense: Arc<dyn EmbeddingProvider>,
    sparse: Arc<dyn SparseEmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    rule: InclusionRule,
}

impl HybridIndexer {
    /// Create an indexer requiring both modalities.
    pub fn new(
        dense: Arc<dyn EmbeddingProvider>,
        sparse: Arc<dyn SparseEmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { dense, sparse, store, rule: InclusionRule::default() }
    }

    /// Replace the inclusion rule.
    pub fn with_rule(mut self, rule: InclusionRule) -> Self {
        self.rule = rule;
        self
    }

    /// Attempt both embeddings for one text. Never fails; failures are recorded.
    pub async fn embed_chunk(&self, text: &str) -> DualEmbedding {
        DualEmbedding {
            dense: EmbeddingOutcome::from_result(self.dense.embed(text).await),
            sparse: EmbeddingOutcome::from_result(self.sparse.embed_sparse(text).await),
        }
    }

    /// Index `chunks` into `collection` in batches of `batch_size`.
    ///
    /// Chunks whose dense or sparse embedding fails are logged and skipped.
    /// A batch whose upload fails is logged and counted; the remaining
    /// batches are still processed. Check [`IndexReport::all_indexed`] for the
    /// overall outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `batch_size` is zero.
    pub async fn index_hybrid_collection(
        &self,
        chunks: &[DocumentChunk],
        collection: &str,
        batch_size: usize,
    ) -> Result<IndexReport> {
        let batches = plan_batches(chunks, batch_size)?;
        info!(
            collection,
            chunk_count = chunks.len(),
            batch_size,
            "indexing into hybrid collection"
        );

        let mut report = IndexReport { total: chunks.len(), ..IndexReport::default() };

        for (batch_idx, batch) in batches.enumerate() {
            report.batches += 1;
            let mut points = Vec::with_capacity(batch.len());

            for (i, chunk) in batch.iter().enumerate() {
                let position = batch_idx * batch_size + i;
                let embedding = self.embed_chunk(&chunk.text).await;

                if let EmbeddingOutcome::Failed(message) = &embedding.dense {
                    error!(chunk = position, error = %message, "dense embedding failed");
                }
                if let EmbeddingOutcome::Failed(message) = &embedding.sparse {
                    error!(chunk = position, error = %message, "sparse embedding failed");
                }

                if !self.rule.admits(&embedding) {
                    warn!(chunk = position, "skipping chunk with failed embeddings");
                    report.invalid += 1;
                    continue;
                }

                match embedding.into_vectors() {
                    Some((dense, sparse)) => points.push(Point {
                        id: Uuid::new_v4().to_string(),
                        dense,
                        sparse,
                        content: chunk.text.clone(),
                        metadata: chunk.metadata.clone(),
                    }),
                    None => {
                        warn!(chunk = position, "rule admitted chunk without both vectors");
                        report.invalid += 1;
                    }
                }
            }

            if points.is_empty() {
                continue;
            }

            let count = points.len();
            match self.store.upload_points(collection, points, batch_size).await {
                Ok(()) => {
                    report.indexed += count;
                    info!(collection, batch = batch_idx, count, "uploaded batch");
                }
                Err(e) => {
                    error!(collection, batch = batch_idx, count, error = %e, "batch upload failed");
                    report.failed_batches += 1;
                    report.failed_points += count;
                }
            }
        }

        info!(
            collection,
            total = report.total,
            indexed = report.indexed,
            invalid = report.invalid,
            failed_batches = report.failed_batches,
            "indexing finished"
        );
        Ok(report)
    }
}
