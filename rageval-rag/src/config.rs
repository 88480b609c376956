//! Configuration for indexing and retrieval.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters shared by the indexing pipeline and the retrievers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// URL of the vector store (gRPC endpoint for Qdrant).
    pub qdrant_url: String,
    /// Name of the hybrid collection holding both vector fields.
    pub collection: String,
    /// Dimensionality of the dense vector field.
    pub dense_dimensions: usize,
    /// Number of chunks embedded and uploaded per batch.
    pub batch_size: usize,
    /// Result limit for hybrid search, applied to each prefetch and to the fused list.
    pub hybrid_limit: usize,
    /// Result limit for dense, sparse and multi-query search.
    pub search_limit: usize,
    /// Number of documents returned by maximal marginal relevance selection.
    pub mmr_k: usize,
    /// Number of candidates fetched before maximal marginal relevance selection.
    pub mmr_fetch_k: usize,
    /// Relevance/diversity trade-off: 1.0 is pure relevance, 0.0 pure diversity.
    pub mmr_lambda: f32,
    /// Number of query rewrites generated by the multi-query retriever.
    pub query_variants: usize,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "hybrid_collection".to_string(),
            dense_dimensions: 384,
            batch_size: 64,
            hybrid_limit: 20,
            search_limit: 10,
            mmr_k: 4,
            mmr_fetch_k: 20,
            mmr_lambda: 0.5,
            query_variants: 3,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from the defaults overlaid with `RAGEVAL_*`
    /// environment variables.
    ///
    /// Recognised variables: `QDRANT_URL`, `RAGEVAL_COLLECTION`,
    /// `RAGEVAL_DENSE_DIMENSIONS`, `RAGEVAL_BATCH_SIZE`, `RAGEVAL_HYBRID_LIMIT`,
    /// `RAGEVAL_SEARCH_LIMIT`, `RAGEVAL_MMR_K`, `RAGEVAL_MMR_FETCH_K`,
    /// `RAGEVAL_MMR_LAMBDA`, `RAGEVAL_QUERY_VARIANTS`, `RAGEVAL_CHUNK_SIZE`,
    /// `RAGEVAL_CHUNK_OVERLAP`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a variable cannot be parsed or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(url) = lookup("QDRANT_URL") {
            builder = builder.qdrant_url(url);
        }
        if let Some(name) = lookup("RAGEVAL_COLLECTION") {
            builder = builder.collection(name);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_DENSE_DIMENSIONS")? {
            builder = builder.dense_dimensions(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_BATCH_SIZE")? {
            builder = builder.batch_size(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_HYBRID_LIMIT")? {
            builder = builder.hybrid_limit(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_SEARCH_LIMIT")? {
            builder = builder.search_limit(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_MMR_K")? {
            builder = builder.mmr_k(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_MMR_FETCH_K")? {
            builder = builder.mmr_fetch_k(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_MMR_LAMBDA")? {
            builder = builder.mmr_lambda(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_QUERY_VARIANTS")? {
            builder = builder.query_variants(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_CHUNK_SIZE")? {
            builder = builder.chunk_size(v);
        }
        if let Some(v) = parse_var(&lookup, "RAGEVAL_CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(v);
        }
        builder.build()
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| RagError::ConfigError(format!("invalid value for {key} ({raw}): {e}")))
        })
        .transpose()
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the vector store URL.
    pub fn qdrant_url(mut self, url: impl Into<String>) -> Self {
        self.config.qdrant_url = url.into();
        self
    }

    /// Set the hybrid collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the dense vector dimensionality.
    pub fn dense_dimensions(mut self, dims: usize) -> Self {
        self.config.dense_dimensions = dims;
        self
    }

    /// Set the indexing batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the hybrid search result limit.
    pub fn hybrid_limit(mut self, limit: usize) -> Self {
        self.config.hybrid_limit = limit;
        self
    }

    /// Set the single-field search result limit.
    pub fn search_limit(mut self, limit: usize) -> Self {
        self.config.search_limit = limit;
        self
    }

    /// Set the number of documents kept by MMR selection.
    pub fn mmr_k(mut self, k: usize) -> Self {
        self.config.mmr_k = k;
        self
    }

    /// Set the number of MMR candidates.
    pub fn mmr_fetch_k(mut self, fetch_k: usize) -> Self {
        self.config.mmr_fetch_k = fetch_k;
        self
    }

    /// Set the MMR relevance/diversity trade-off.
    pub fn mmr_lambda(mut self, lambda: f32) -> Self {
        self.config.mmr_lambda = lambda;
        self
    }

    /// Set the number of multi-query rewrites.
    pub fn query_variants(mut self, n: usize) -> Self {
        self.config.query_variants = n;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `collection` is empty
    /// - `dense_dimensions`, `batch_size`, `hybrid_limit`, `search_limit` or `mmr_k` is zero
    /// - `mmr_fetch_k < mmr_k`
    /// - `mmr_lambda` is outside `0.0..=1.0`
    /// - `chunk_overlap >= chunk_size`
    pub fn build(self) -> Result<RagConfig> {
        let c = &self.config;
        if c.collection.trim().is_empty() {
            return Err(RagError::ConfigError("collection must not be empty".to_string()));
        }
        for (name, value) in [
            ("dense_dimensions", c.dense_dimensions),
            ("batch_size", c.batch_size),
            ("hybrid_limit", c.hybrid_limit),
            ("search_limit", c.search_limit),
            ("mmr_k", c.mmr_k),
        ] {
            if value == 0 {
                return Err(RagError::ConfigError(format!("{name} must be greater than zero")));
            }
        }
        if c.mmr_fetch_k < c.mmr_k {
            return Err(RagError::ConfigError(format!(
                "mmr_fetch_k ({}) must be at least mmr_k ({})",
                c.mmr_fetch_k, c.mmr_k
            )));
        }
        if !(0.0..=1.0).contains(&c.mmr_lambda) {
            return Err(RagError::ConfigError(format!(
                "mmr_lambda ({}) must be within 0.0..=1.0",
                c.mmr_lambda
            )));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        Ok(self.config)
    }
}
