//! In-memory hybrid vector store.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It mirrors the
//! query semantics of the Qdrant backend (named dense/sparse fields, filtered
//! prefetch, RRF fusion) and is suitable for development and testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Point, ScoredPoint, sort_by_score};
use crate::error::{RagError, Result};
use crate::fusion::{DEFAULT_RRF_K, reciprocal_rank_fusion};
use crate::vectorstore::{
    CollectionSchema, Distance, Fusion, MetadataFilter, QueryKind, QueryRequest, VectorQuery,
    VectorStore,
};

#[derive(Debug)]
struct Collection {
    schema: CollectionSchema,
    points: HashMap<String, Point>,
}

/// An in-memory vector store with named dense and sparse fields.
///
/// # Example
///
/// ```rust,ignore
/// use rageval_rag::{CollectionSchema, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", &CollectionSchema::hybrid(384)).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points stored in a collection, if it exists.
    pub async fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections.read().await.get(collection).map(|c| c.points.len())
    }

    /// The schema a collection was created with, if it exists.
    pub async fn schema(&self, collection: &str) -> Option<CollectionSchema> {
        self.collections.read().await.get(collection).map(|c| c.schema)
    }

    /// Number of collections.
    pub async fn collection_count(&self) -> usize {
        self.collections.read().await.len()
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn scored(point: &Point, score: f32) -> ScoredPoint {
    ScoredPoint {
        id: point.id.clone(),
        score,
        content: point.content.clone(),
        metadata: point.metadata.clone(),
    }
}

/// Run one single-field search over the filtered points of a collection.
fn nearest(
    collection: &Collection,
    query: &VectorQuery,
    filter: Option<&MetadataFilter>,
    limit: usize,
) -> Vec<ScoredPoint> {
    let candidates = collection
        .points
        .values()
        .filter(|p| filter.is_none_or(|f| f.matches(&p.metadata)));

    let mut results: Vec<ScoredPoint> = match query {
        VectorQuery::Dense(vector) => candidates
            .map(|p| {
                let score = match collection.schema.distance {
                    Distance::Cosine => cosine_similarity(&p.dense, vector),
                    Distance::Dot => dot_product(&p.dense, vector),
                };
                scored(p, score)
            })
            .collect(),
        // Points sharing no index with the query are not matches.
        VectorQuery::Sparse(vector) => {
            candidates.filter_map(|p| p.sparse.dot(vector).map(|score| scored(p, score))).collect()
        }
    };

    sort_by_score(&mut results);
    results.truncate(limit);
    results
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(RagError::VectorStoreError {
                backend: "InMemory".to_string(),
                message: format!("collection '{name}' already exists"),
            });
        }
        let collection = Collection { schema: *schema, points: HashMap::new() };
        collections.insert(name.to_string(), collection);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn upload_points(
        &self,
        collection: &str,
        points: Vec<Point>,
        _batch_size: usize,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;

        let expected = store.schema.dense_dimensions;
        if let Some(bad) = points.iter().find(|p| p.dense.len() != expected) {
            return Err(RagError::VectorStoreError {
                backend: "InMemory".to_string(),
                message: format!(
                    "point '{}' has {} dense dimensions, collection expects {expected}",
                    bad.id,
                    bad.dense.len()
                ),
            });
        }

        for point in points {
            store.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn delete_points(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        for id in ids {
            store.points.remove(*id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, request: QueryRequest) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        let filter = request.filter.as_ref();

        let results = match &request.query {
            QueryKind::Nearest(query) => nearest(store, query, filter, request.limit),
            QueryKind::Fusion { prefetch, fusion: Fusion::Rrf } => {
                let lists: Vec<Vec<ScoredPoint>> =
                    prefetch.iter().map(|p| nearest(store, &p.query, filter, p.limit)).collect();
                reciprocal_rank_fusion(&lists, DEFAULT_RRF_K, request.limit)
            }
        };
        Ok(results)
    }
}
