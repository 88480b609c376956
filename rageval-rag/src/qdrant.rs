//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//! Collections carry a named `dense` field and a named `sparse` field;
//! hybrid queries use server-side prefetch with RRF fusion.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rageval_rag::qdrant::QdrantVectorStore;
//!
//! let store = Arc::new(QdrantVectorStore::connect("http://localhost:6334", None)?);
//! let session = StoreSession::new(store, "hybrid_collection", CollectionSchema::hybrid(384));
//! session.create_hybrid_collection().await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance as QdrantDistance, Filter,
    Fusion as QdrantFusion, NamedVectors, PointStruct, PointsIdsList, PrefetchQueryBuilder, Query,
    QueryPointsBuilder, ScoredPoint as QdrantScoredPoint, SparseVectorParamsBuilder,
    SparseVectorsConfigBuilder, UpsertPointsBuilder, Value as QdrantValue, Vector, VectorInput,
    VectorParamsBuilder, VectorsConfigBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};

use crate::document::{Point, ScoredPoint};
use crate::error::{RagError, Result};
use crate::vectorstore::{
    CollectionSchema, DENSE_VECTOR, Distance, Fusion, MetadataFilter, QueryKind, QueryRequest,
    SPARSE_VECTOR, VectorQuery, VectorStore,
};

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Wraps a single [`qdrant_client::Qdrant`] connection. Construct it once and
/// share it behind an `Arc`; the handle is never rebuilt.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Connect to the Qdrant gRPC endpoint at `url`.
    pub fn connect(url: &str, api_key: Option<String>) -> Result<Self> {
        let mut config = Qdrant::from_url(url);
        if let Some(key) = api_key {
            config = config.api_key(key);
        }
        let client = config.build().map_err(Self::map_err)?;
        info!(url, "qdrant client created");
        Ok(Self { client })
    }

    /// Create a store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &Qdrant {
        &self.client
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: "qdrant".to_string(), message: e.to_string() }
    }

    /// Extract a string from a Qdrant payload value.
    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            Some(Kind::IntegerValue(n)) => Some(n.to_string()),
            Some(Kind::DoubleValue(n)) => Some(n.to_string()),
            Some(Kind::BoolValue(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    fn to_point_struct(point: Point) -> Result<PointStruct> {
        let metadata: serde_json::Map<String, serde_json::Value> = point
            .metadata
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        let payload = Payload::try_from(serde_json::json!({
            "content": point.content,
            "metadata": metadata,
        }))
        .map_err(|e| RagError::VectorStoreError {
            backend: "qdrant".to_string(),
            message: format!("invalid payload for point: {e}"),
        })?;

        let vectors = NamedVectors::default()
            .add_vector(DENSE_VECTOR, Vector::new_dense(point.dense))
            .add_vector(
                SPARSE_VECTOR,
                Vector::new_sparse(point.sparse.indices, point.sparse.values),
            );

        Ok(PointStruct::new(point.id, vectors, payload))
    }

    fn from_scored(scored: QdrantScoredPoint) -> ScoredPoint {
        let id = scored
            .id
            .as_ref()
            .and_then(|pid| match &pid.point_id_options {
                Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                None => None,
            })
            .unwrap_or_default();

        let content =
            scored.payload.get("content").and_then(Self::extract_string).unwrap_or_default();

        let metadata: HashMap<String, String> = scored
            .payload
            .get("metadata")
            .and_then(|v| match &v.kind {
                Some(Kind::StructValue(s)) => Some(
                    s.fields
                        .iter()
                        .filter_map(|(k, v)| Self::extract_string(v).map(|s| (k.clone(), s)))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        ScoredPoint { id, score: scored.score, content, metadata }
    }
}

fn vector_input(query: &VectorQuery) -> VectorInput {
    match query {
        VectorQuery::Dense(v) => VectorInput::new_dense(v.clone()),
        VectorQuery::Sparse(s) => VectorInput::new_sparse(s.indices.clone(), s.values.clone()),
    }
}

fn filter(filter: &MetadataFilter) -> Filter {
    Filter::must([Condition::matches(filter.payload_key(), filter.value.clone())])
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.client.collection_exists(name).await.map_err(Self::map_err)
    }

    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        let distance = match schema.distance {
            Distance::Cosine => QdrantDistance::Cosine,
            Distance::Dot => QdrantDistance::Dot,
        };

        let mut vectors = VectorsConfigBuilder::default();
        vectors.add_named_vector_params(
            DENSE_VECTOR,
            VectorParamsBuilder::new(schema.dense_dimensions as u64, distance),
        );
        let mut sparse = SparseVectorsConfigBuilder::default();
        sparse.add_named_vector_params(SPARSE_VECTOR, SparseVectorParamsBuilder::default());

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors)
                    .sparse_vectors_config(sparse),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(
            collection = name,
            dimensions = schema.dense_dimensions,
            "created qdrant collection"
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upload_points(
        &self,
        collection: &str,
        points: Vec<Point>,
        batch_size: usize,
    ) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let count = points.len();
        let points =
            points.into_iter().map(Self::to_point_struct).collect::<Result<Vec<PointStruct>>>()?;

        self.client
            .upsert_points_chunked(
                UpsertPointsBuilder::new(collection, points).wait(true),
                batch_size.max(1),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count, "uploaded points to qdrant");
        Ok(())
    }

    async fn delete_points(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let point_ids: Vec<qdrant_client::qdrant::PointId> =
            ids.iter().map(|id| (*id).into()).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(())
    }

    async fn query(&self, collection: &str, request: QueryRequest) -> Result<Vec<ScoredPoint>> {
        let mut builder = QueryPointsBuilder::new(collection)
            .limit(request.limit as u64)
            .with_payload(true);

        match &request.query {
            QueryKind::Nearest(query) => {
                builder =
                    builder.query(Query::new_nearest(vector_input(query))).using(query.field());
            }
            QueryKind::Fusion { prefetch, fusion } => {
                for p in prefetch {
                    let mut sub = PrefetchQueryBuilder::default()
                        .query(Query::new_nearest(vector_input(&p.query)))
                        .using(p.query.field())
                        .limit(p.limit as u64);
                    if let Some(f) = &request.filter {
                        sub = sub.filter(filter(f));
                    }
                    builder = builder.add_prefetch(sub);
                }
                let fusion = match fusion {
                    Fusion::Rrf => QdrantFusion::Rrf,
                };
                builder = builder.query(Query::new_fusion(fusion));
            }
        }

        if let Some(f) = &request.filter {
            builder = builder.filter(filter(f));
        }

        let response = self.client.query(builder).await.map_err(Self::map_err)?;
        Ok(response.result.into_iter().map(Self::from_scored).collect())
    }
}
