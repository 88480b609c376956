//! Filtered retrieval across the dense, sparse, hybrid, HyDE and multi-query strategies.

use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use rageval_rag::document::{DocumentChunk, ScoredPoint};
use rageval_rag::error::Result;
use rageval_rag::hybrid::HybridRetriever;
use rageval_rag::hyde::{HydeRetriever, MmrParams};
use rageval_rag::indexing::HybridIndexer;
use rageval_rag::inmemory::InMemoryVectorStore;
use rageval_rag::mock::{HashEmbeddingProvider, MockLanguageModel};
use rageval_rag::multiquery::MultiQueryRetriever;
use rageval_rag::prompt::PromptTemplates;
use rageval_rag::reranker::Reranker;
use rageval_rag::retriever::{DenseRetriever, Retriever, SparseRetriever};
use rageval_rag::session::{CollectionStatus, StoreSession};
use rageval_rag::sparse::Bm25SparseEmbedder;
use rageval_rag::vectorstore::{CollectionSchema, VectorStore};

const DIM: usize = 256;
const COLLECTION: &str = "hybrid_collection";

const TOPICS: &[&str] = &[
    "refund policy allows returns within thirty days",
    "shipping is free for orders above fifty euros",
    "warranty covers manufacturing defects for two years",
    "refund requests need the original receipt",
    "customer support answers within one business day",
    "the refund policy excludes digital goods",
];

struct Fixture {
    store: Arc<InMemoryVectorStore>,
    dense: Arc<HashEmbeddingProvider>,
    sparse: Arc<Bm25SparseEmbedder>,
}

impl Fixture {
    async fn new() -> Self {
        let store = Arc::new(InMemoryVectorStore::new());
        let session =
            StoreSession::new(store.clone(), COLLECTION, CollectionSchema::hybrid(DIM));
        session.create_hybrid_collection().await.unwrap();
        Self {
            store,
            dense: Arc::new(HashEmbeddingProvider::new(DIM)),
            sparse: Arc::new(Bm25SparseEmbedder::new()),
        }
    }

    /// Index `copies` rounds of every topic for each document id.
    async fn index(&self, documents: &[&str], copies: usize) {
        let chunks: Vec<DocumentChunk> = documents
            .iter()
            .flat_map(|doc| {
                (0..copies).flat_map(move |round| {
                    TOPICS.iter().map(move |t| DocumentChunk::new(format!("{t} ({round})"), *doc))
                })
            })
            .collect();
        let indexer =
            HybridIndexer::new(self.dense.clone(), self.sparse.clone(), self.store.clone());
        let report = indexer.index_hybrid_collection(&chunks, COLLECTION, 64).await.unwrap();
        assert!(report.all_indexed());
    }
}

fn all_from(results: &[ScoredPoint], doc: &str) -> bool {
    results.iter().all(|r| r.document_id() == Some(doc))
}

#[tokio::test]
async fn collection_creation_is_idempotent() {
    let store = Arc::new(InMemoryVectorStore::new());
    let session = StoreSession::new(store.clone(), COLLECTION, CollectionSchema::hybrid(DIM));

    assert_eq!(session.create_hybrid_collection().await.unwrap(), CollectionStatus::Created);
    assert_eq!(
        session.create_hybrid_collection().await.unwrap(),
        CollectionStatus::AlreadyExists
    );
    assert_eq!(store.collection_count().await, 1);
    assert_eq!(store.schema(COLLECTION).await, Some(CollectionSchema::hybrid(DIM)));
}

#[tokio::test]
async fn session_hands_out_the_same_handle() {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let session = StoreSession::new(store.clone(), COLLECTION, CollectionSchema::hybrid(DIM));
    assert!(Arc::ptr_eq(session.client(), &store));
    assert!(Arc::ptr_eq(session.client(), session.clone().client()));
}

#[tokio::test]
async fn hybrid_search_stays_within_limit_and_document() {
    let fx = Fixture::new().await;
    fx.index(&["doc-41", "doc-42", "doc-43"], 5).await;

    let hybrid = HybridRetriever::new(fx.dense.clone(), fx.sparse.clone(), fx.store.clone(), 20);
    let results = hybrid.retrieve("refund policy", "doc-42", COLLECTION).await.unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 20);
    assert!(all_from(&results, "doc-42"));
    assert!(results[0].content.contains("refund"));
}

#[tokio::test]
async fn hybrid_search_for_unknown_document_is_empty() {
    let fx = Fixture::new().await;
    fx.index(&["doc-1"], 1).await;

    let hybrid = HybridRetriever::new(fx.dense.clone(), fx.sparse.clone(), fx.store.clone(), 20);
    let results = hybrid.retrieve("refund policy", "doc-404", COLLECTION).await.unwrap();
    assert!(results.is_empty());
}

/// Reverses the fused order so the test can see the reranker ran.
struct ReverseReranker;

#[async_trait]
impl Reranker for ReverseReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut results: Vec<ScoredPoint>,
    ) -> Result<Vec<ScoredPoint>> {
        results.reverse();
        Ok(results)
    }
}

#[tokio::test]
async fn hybrid_results_pass_through_the_reranker() {
    let fx = Fixture::new().await;
    fx.index(&["doc-1"], 1).await;

    let plain = HybridRetriever::new(fx.dense.clone(), fx.sparse.clone(), fx.store.clone(), 3);
    let reranked = HybridRetriever::new(fx.dense.clone(), fx.sparse.clone(), fx.store.clone(), 3)
        .with_reranker(Arc::new(ReverseReranker));

    let mut expected = plain.retrieve("refund", "doc-1", COLLECTION).await.unwrap();
    expected.reverse();
    let got = reranked.retrieve("refund", "doc-1", COLLECTION).await.unwrap();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn hyde_embeds_the_hypothetical_passage_and_applies_mmr() {
    let fx = Fixture::new().await;
    fx.index(&["doc-1", "doc-2"], 3).await;

    let llm = Arc::new(MockLanguageModel::fixed("Our warranty covers manufacturing defects."));
    let hyde = HydeRetriever::new(
        llm.clone(),
        fx.dense.clone(),
        fx.store.clone(),
        PromptTemplates::default().hypothetical_document,
    )
    .with_mmr(MmrParams { k: 4, fetch_k: 12, lambda: 0.5 });

    let question = "what does the guarantee include?";
    let results = hyde.retrieve(question, "doc-2", COLLECTION).await.unwrap();

    assert_eq!(results.len(), 4);
    assert!(all_from(&results, "doc-2"));
    assert!(results[0].content.contains("warranty"));
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(question));
}

#[tokio::test]
async fn hyde_generation_failure_is_raised() {
    let fx = Fixture::new().await;
    fx.index(&["doc-1"], 1).await;

    let hyde = HydeRetriever::new(
        Arc::new(MockLanguageModel::failing("model offline")),
        fx.dense.clone(),
        fx.store.clone(),
        PromptTemplates::default().hypothetical_document,
    );
    let err = hyde.retrieve("refund", "doc-1", COLLECTION).await.unwrap_err();
    assert!(err.to_string().contains("model offline"));
}

#[tokio::test]
async fn multiquery_unions_rewrites() {
    let fx = Fixture::new().await;
    fx.index(&["doc-1", "doc-2"], 1).await;

    let llm = Arc::new(MockLanguageModel::fixed(
        "1. How long is the warranty?\n2. What does shipping cost?\n3. how long is the warranty?",
    ));
    let multiquery = MultiQueryRetriever::new(
        llm,
        DenseRetriever::new(fx.dense.clone(), fx.store.clone(), 2),
        PromptTemplates::default().query_variants,
        3,
        6,
    );

    let results = multiquery.retrieve("refund policy", "doc-1", COLLECTION).await.unwrap();

    assert!(results.len() <= 6);
    assert!(all_from(&results, "doc-1"));
    let ids: std::collections::HashSet<_> = results.iter().map(|r| &r.id).collect();
    assert_eq!(ids.len(), results.len());
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.iter().any(|r| r.content.contains("warranty")));
    assert!(results.iter().any(|r| r.content.contains("shipping")));
}

#[tokio::test]
async fn multiquery_fails_when_rewriting_fails() {
    let fx = Fixture::new().await;
    fx.index(&["doc-1"], 1).await;

    let multiquery = MultiQueryRetriever::new(
        Arc::new(MockLanguageModel::failing("quota exceeded")),
        DenseRetriever::new(fx.dense.clone(), fx.store.clone(), 4),
        PromptTemplates::default().query_variants,
        3,
        4,
    );
    assert!(multiquery.retrieve("refund", "doc-1", COLLECTION).await.is_err());
}

/// Filtered single-field searches never leak chunks of other documents.
mod prop_filtering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn dense_and_sparse_results_match_the_filter(
            doc_count in 1usize..4,
            target in 0usize..4,
            query in "(refund|shipping|warranty|support|policy|receipt)( [a-z]{3,8}){0,3}",
            limit in 1usize..30,
        ) {
            let docs: Vec<String> = (0..doc_count).map(|i| format!("doc-{i}")).collect();
            let target = format!("doc-{target}");

            let rt = tokio::runtime::Runtime::new().unwrap();
            let (dense, sparse) = rt.block_on(async {
                let fx = Fixture::new().await;
                let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
                fx.index(&doc_refs, 2).await;

                let dense = DenseRetriever::new(fx.dense.clone(), fx.store.clone(), limit);
                let sparse = SparseRetriever::new(fx.sparse.clone(), fx.store.clone(), limit);
                (
                    dense.retrieve(&query, &target, COLLECTION).await.unwrap(),
                    sparse.retrieve(&query, &target, COLLECTION).await.unwrap(),
                )
            });

            prop_assert!(dense.len() <= limit);
            prop_assert!(sparse.len() <= limit);
            prop_assert!(all_from(&dense, &target));
            prop_assert!(all_from(&sparse, &target));
            if !docs.contains(&target) {
                prop_assert!(dense.is_empty() && sparse.is_empty());
            }
        }
    }
}
