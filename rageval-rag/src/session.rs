//! Vector-store session: the shared store handle plus the hybrid collection it serves.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::vectorstore::{CollectionSchema, VectorStore};

/// Outcome of [`StoreSession::create_hybrid_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// The collection was missing and has been created.
    Created,
    /// The collection already existed and was left untouched.
    AlreadyExists,
}

/// Owns the single store handle and the hybrid collection configuration.
///
/// The handle is built once by the caller and injected here; every component
/// that needs the store receives the same `Arc` through [`client`](Self::client).
#[derive(Clone)]
pub struct StoreSession {
    store: Arc<dyn VectorStore>,
    collection: String,
    schema: CollectionSchema,
}

impl StoreSession {
    /// Create a session over an existing store handle.
    pub fn new(
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        schema: CollectionSchema,
    ) -> Self {
        Self { store, collection: collection.into(), schema }
    }

    /// The shared store handle. Always the same instance.
    pub fn client(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Name of the hybrid collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Field configuration used when the collection is created.
    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Create the hybrid collection unless it already exists.
    ///
    /// # Errors
    ///
    /// Propagates store errors from the existence check or the creation.
    pub async fn create_hybrid_collection(&self) -> Result<CollectionStatus> {
        if self.store.collection_exists(&self.collection).await? {
            info!(collection = %self.collection, "hybrid collection already exists");
            return Ok(CollectionStatus::AlreadyExists);
        }

        self.store.create_collection(&self.collection, &self.schema).await?;
        info!(
            collection = %self.collection,
            dense_dimensions = self.schema.dense_dimensions,
            "created hybrid collection"
        );
        Ok(CollectionStatus::Created)
    }
}
