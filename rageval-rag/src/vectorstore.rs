//! Vector store trait and query types for named dense and sparse fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{DOCUMENT_ID_KEY, Point, ScoredPoint, SparseVector};
use crate::error::Result;

/// Name of the dense vector field.
pub const DENSE_VECTOR: &str = "dense";

/// Name of the sparse vector field.
pub const SPARSE_VECTOR: &str = "sparse";

/// Distance function of the dense vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Raw dot product.
    Dot,
}

/// Field configuration of a hybrid collection: one dense field, one sparse field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Dimensionality of the dense field.
    pub dense_dimensions: usize,
    /// Distance function of the dense field.
    pub distance: Distance,
}

impl CollectionSchema {
    /// A hybrid schema with a cosine dense field of the given size.
    pub fn hybrid(dense_dimensions: usize) -> Self {
        Self { dense_dimensions, distance: Distance::Cosine }
    }
}

/// Exact-match filter on a metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Metadata key, without the `metadata.` payload prefix.
    pub key: String,
    /// Required value.
    pub value: String,
}

impl MetadataFilter {
    /// Restrict results to chunks of a single source document.
    pub fn document(document_id: impl Into<String>) -> Self {
        Self { key: DOCUMENT_ID_KEY.to_string(), value: document_id.into() }
    }

    /// The payload path of the filtered field, e.g. `metadata.pdf_id`.
    pub fn payload_key(&self) -> String {
        format!("metadata.{}", self.key)
    }

    /// Whether a metadata map satisfies this filter.
    pub fn matches(&self, metadata: &std::collections::HashMap<String, String>) -> bool {
        metadata.get(&self.key).is_some_and(|v| *v == self.value)
    }
}

/// A query vector targeting one named field.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorQuery {
    /// Nearest neighbours on the [`DENSE_VECTOR`] field.
    Dense(Vec<f32>),
    /// Nearest neighbours on the [`SPARSE_VECTOR`] field.
    Sparse(SparseVector),
}

impl VectorQuery {
    /// The field this query searches.
    pub fn field(&self) -> &'static str {
        match self {
            VectorQuery::Dense(_) => DENSE_VECTOR,
            VectorQuery::Sparse(_) => SPARSE_VECTOR,
        }
    }
}

/// Rule combining several prefetched result lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fusion {
    /// Reciprocal Rank Fusion.
    Rrf,
}

/// An independent sub-query whose results feed a fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefetch {
    /// The sub-query vector.
    pub query: VectorQuery,
    /// Maximum number of results of this sub-query.
    pub limit: usize,
}

/// The main query of a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// Single-field nearest-neighbour search.
    Nearest(VectorQuery),
    /// Multi-field search combining prefetch results.
    Fusion {
        /// Sub-queries, each run with the request filter.
        prefetch: Vec<Prefetch>,
        /// How the sub-query results are combined.
        fusion: Fusion,
    },
}

/// A filtered search against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// What to search for.
    pub query: QueryKind,
    /// Optional exact-match filter, applied to prefetches and the final result.
    pub filter: Option<MetadataFilter>,
    /// Maximum number of results.
    pub limit: usize,
}

impl QueryRequest {
    /// A single-field search.
    pub fn nearest(query: VectorQuery, limit: usize) -> Self {
        Self { query: QueryKind::Nearest(query), filter: None, limit }
    }

    /// A fused search over the given prefetches.
    pub fn fusion(prefetch: Vec<Prefetch>, fusion: Fusion, limit: usize) -> Self {
        Self { query: QueryKind::Fusion { prefetch, fusion }, filter: None, limit }
    }

    /// Attach an exact-match filter.
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// A storage backend holding points with named dense and sparse vectors.
///
/// # Example
///
/// ```rust,ignore
/// use rageval_rag::{CollectionSchema, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", &CollectionSchema::hybrid(384)).await?;
/// store.upload_points("docs", points, 64).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether a collection with this name exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a collection. Fails if it already exists.
    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()>;

    /// Delete a named collection and all its points.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upload points, sending at most `batch_size` per request.
    ///
    /// A point whose id already exists replaces the stored one.
    async fn upload_points(&self, collection: &str, points: Vec<Point>, batch_size: usize)
    -> Result<()>;

    /// Delete points by id.
    async fn delete_points(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// Run a query and return results ordered by descending score.
    async fn query(&self, collection: &str, request: QueryRequest) -> Result<Vec<ScoredPoint>>;
}
