//! Hybrid indexing: partial-failure isolation, batching and upload accounting.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use rageval_rag::document::{DocumentChunk, Point, ScoredPoint, SparseVector};
use rageval_rag::embedding::{EmbeddingProvider, SparseEmbeddingProvider};
use rageval_rag::error::{RagError, Result};
use rageval_rag::indexing::{HybridIndexer, plan_batches};
use rageval_rag::inmemory::InMemoryVectorStore;
use rageval_rag::mock::HashEmbeddingProvider;
use rageval_rag::sparse::Bm25SparseEmbedder;
use rageval_rag::vectorstore::{CollectionSchema, QueryRequest, VectorQuery, VectorStore};

const DIM: usize = 16;
const COLLECTION: &str = "hybrid_collection";

/// Dense embedder failing for the listed texts.
struct FlakyDense {
    inner: HashEmbeddingProvider,
    fail_on: HashSet<String>,
}

#[async_trait]
impl EmbeddingProvider for FlakyDense {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail_on.contains(text) {
            return Err(RagError::EmbeddingError {
                provider: "flaky".into(),
                message: "dense model unavailable".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Sparse embedder failing for the listed texts.
struct FlakySparse {
    inner: Bm25SparseEmbedder,
    fail_on: HashSet<String>,
}

#[async_trait]
impl SparseEmbeddingProvider for FlakySparse {
    async fn embed_sparse(&self, text: &str) -> Result<SparseVector> {
        if self.fail_on.contains(text) {
            return Err(RagError::EmbeddingError {
                provider: "flaky".into(),
                message: "sparse model unavailable".into(),
            });
        }
        self.inner.embed_sparse(text).await
    }
}

/// Store wrapper recording upload sizes, optionally failing chosen uploads.
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryVectorStore,
    uploads: Mutex<Vec<usize>>,
    fail_uploads: HashSet<usize>,
}

impl RecordingStore {
    fn upload_sizes(&self) -> Vec<usize> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.inner.collection_exists(name).await
    }

    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        self.inner.create_collection(name, schema).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn upload_points(
        &self,
        collection: &str,
        points: Vec<Point>,
        batch_size: usize,
    ) -> Result<()> {
        let call = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(points.len());
            uploads.len() - 1
        };
        if self.fail_uploads.contains(&call) {
            return Err(RagError::VectorStoreError {
                backend: "recording".into(),
                message: "connection reset".into(),
            });
        }
        self.inner.upload_points(collection, points, batch_size).await
    }

    async fn delete_points(&self, collection: &str, ids: &[&str]) -> Result<()> {
        self.inner.delete_points(collection, ids).await
    }

    async fn query(&self, collection: &str, request: QueryRequest) -> Result<Vec<ScoredPoint>> {
        self.inner.query(collection, request).await
    }
}

fn chunk_text(i: usize) -> String {
    format!("chunk {i} of the refund policy")
}

fn chunks(n: usize) -> Vec<DocumentChunk> {
    (0..n).map(|i| DocumentChunk::new(chunk_text(i), "doc-1")).collect()
}

async fn setup(
    dense_fail: &[usize],
    sparse_fail: &[usize],
    fail_uploads: &[usize],
) -> (Arc<RecordingStore>, HybridIndexer) {
    let store = Arc::new(RecordingStore {
        fail_uploads: fail_uploads.iter().copied().collect(),
        ..RecordingStore::default()
    });
    store.create_collection(COLLECTION, &CollectionSchema::hybrid(DIM)).await.unwrap();

    let dense = FlakyDense {
        inner: HashEmbeddingProvider::new(DIM),
        fail_on: dense_fail.iter().map(|i| chunk_text(*i)).collect(),
    };
    let sparse = FlakySparse {
        inner: Bm25SparseEmbedder::new(),
        fail_on: sparse_fail.iter().map(|i| chunk_text(*i)).collect(),
    };
    let indexer = HybridIndexer::new(Arc::new(dense), Arc::new(sparse), store.clone());
    (store, indexer)
}

#[tokio::test]
async fn one_sparse_failure_in_130_chunks() {
    let (store, indexer) = setup(&[], &[70], &[]).await;

    let report = indexer.index_hybrid_collection(&chunks(130), COLLECTION, 64).await.unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(store.upload_sizes(), vec![64, 63, 2]);
    assert_eq!(report.indexed, 129);
    assert_eq!(report.invalid, 1);
    assert!(!report.all_indexed());
    assert_eq!(store.inner.point_count(COLLECTION).await, Some(129));
}

#[tokio::test]
async fn clean_run_indexes_everything() {
    let (store, indexer) = setup(&[], &[], &[]).await;

    let report = indexer.index_hybrid_collection(&chunks(10), COLLECTION, 4).await.unwrap();

    assert!(report.all_indexed());
    assert_eq!(report.indexed, 10);
    assert_eq!(store.upload_sizes(), vec![4, 4, 2]);
}

#[tokio::test]
async fn failed_upload_is_counted_and_later_batches_still_run() {
    let (store, indexer) = setup(&[], &[], &[0]).await;

    let report = indexer.index_hybrid_collection(&chunks(10), COLLECTION, 4).await.unwrap();

    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.failed_points, 4);
    assert_eq!(report.indexed, 6);
    assert!(!report.all_indexed());
    assert_eq!(store.inner.point_count(COLLECTION).await, Some(6));
}

#[tokio::test]
async fn batch_with_no_valid_chunk_is_not_uploaded() {
    let (store, indexer) = setup(&[0, 1], &[], &[]).await;

    let report = indexer.index_hybrid_collection(&chunks(3), COLLECTION, 2).await.unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(store.upload_sizes(), vec![1]);
    assert_eq!(report.invalid, 2);
}

#[tokio::test]
async fn zero_batch_size_is_a_config_error() {
    let (_store, indexer) = setup(&[], &[], &[]).await;
    let err = indexer.index_hybrid_collection(&chunks(3), COLLECTION, 0).await.unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));
}

#[tokio::test]
async fn points_keep_payload_and_get_unique_ids() {
    let (store, indexer) = setup(&[], &[], &[]).await;
    indexer.index_hybrid_collection(&chunks(5), COLLECTION, 64).await.unwrap();

    let query = VectorQuery::Dense(vec![1.0; DIM]);
    let results = store.query(COLLECTION, QueryRequest::nearest(query, 10)).await.unwrap();

    assert_eq!(results.len(), 5);
    let ids: HashSet<_> = results.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids.len(), 5);
    assert!(ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
    assert!(results.iter().all(|r| r.document_id() == Some("doc-1")));
    assert!(results.iter().all(|r| r.content.starts_with("chunk ")));
}

/// A chunk is uploaded iff both of its embeddings succeeded.
mod prop_inclusion {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn uploaded_iff_both_modalities_succeeded(
            n in 1usize..40,
            dense_fail in proptest::collection::hash_set(0usize..40, 0..10),
            sparse_fail in proptest::collection::hash_set(0usize..40, 0..10),
            batch_size in 1usize..16,
        ) {
            let dense_fail: Vec<usize> = dense_fail.into_iter().filter(|i| *i < n).collect();
            let sparse_fail: Vec<usize> = sparse_fail.into_iter().filter(|i| *i < n).collect();
            let failed: HashSet<usize> = dense_fail.iter().chain(&sparse_fail).copied().collect();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let (report, stored) = rt.block_on(async {
                let (store, indexer) = setup(&dense_fail, &sparse_fail, &[]).await;
                let report = indexer
                    .index_hybrid_collection(&chunks(n), COLLECTION, batch_size)
                    .await
                    .unwrap();
                let query = VectorQuery::Dense(vec![1.0; DIM]);
                let request = QueryRequest::nearest(query, n);
                let stored = store.query(COLLECTION, request).await.unwrap();
                (report, stored)
            });

            prop_assert_eq!(report.invalid, failed.len());
            prop_assert_eq!(report.indexed, n - failed.len());
            prop_assert_eq!(report.all_indexed(), failed.is_empty());

            let stored_texts: HashSet<String> = stored.into_iter().map(|p| p.content).collect();
            for i in 0..n {
                prop_assert_eq!(stored_texts.contains(&chunk_text(i)), !failed.contains(&i));
            }
        }

        #[test]
        fn batches_preserve_order_and_sizes(
            items in proptest::collection::vec(any::<u16>(), 0..200),
            batch_size in 1usize..70,
        ) {
            let batches: Vec<&[u16]> = plan_batches(&items, batch_size).unwrap().collect();

            prop_assert_eq!(batches.len(), items.len().div_ceil(batch_size));
            if let Some((last, full)) = batches.split_last() {
                prop_assert!(full.iter().all(|b| b.len() == batch_size));
                prop_assert!(!last.is_empty() && last.len() <= batch_size);
            }
            let flattened: Vec<u16> = batches.concat();
            prop_assert_eq!(flattened, items);
        }
    }
}
