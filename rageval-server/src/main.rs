use std::sync::Arc;

use anyhow::Context;
use rageval_rag::{
    CohereReranker, InMemoryVectorStore, OpenAIChatModel, OpenAIEmbeddingProvider,
    QdrantVectorStore, RagComparison, RagConfig, VectorStore,
};
use rageval_server::{AppState, ServerConfig, run_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn vector_store(config: &RagConfig) -> anyhow::Result<Arc<dyn VectorStore>> {
    match std::env::var("RAGEVAL_VECTOR_STORE").as_deref() {
        Ok("memory") => {
            warn!("using the in-memory vector store; uploads are lost on restart");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
        _ => {
            let api_key = std::env::var("QDRANT_API_KEY").ok();
            let store = QdrantVectorStore::connect(&config.qdrant_url, api_key)
                .with_context(|| format!("failed to connect to Qdrant at {}", config.qdrant_url))?;
            Ok(Arc::new(store))
        }
    }
}

fn build_comparison(config: RagConfig) -> anyhow::Result<RagComparison> {
    let mut embedder =
        OpenAIEmbeddingProvider::from_env()?.with_dimensions(config.dense_dimensions);
    if let Ok(model) = std::env::var("RAGEVAL_EMBEDDING_MODEL") {
        embedder = embedder.with_model(model);
    }
    let mut llm = OpenAIChatModel::from_env()?;
    if let Ok(model) = std::env::var("RAGEVAL_CHAT_MODEL") {
        llm = llm.with_model(model);
    }

    let mut builder = RagComparison::builder()
        .vector_store(vector_store(&config)?)
        .embedding_provider(Arc::new(embedder))
        .language_model(Arc::new(llm))
        .config(config);
    if std::env::var("COHERE_API_KEY").is_ok() {
        info!("hybrid results will be reranked with Cohere");
        builder = builder.reranker(Arc::new(CohereReranker::from_env()?));
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = ServerConfig::from_env()?;
    let rag = RagConfig::from_env()?;
    info!(
        qdrant = %rag.qdrant_url,
        collection = %rag.collection,
        dense_dimensions = rag.dense_dimensions,
        "starting rageval-server"
    );

    let comparison = build_comparison(rag)?;
    run_server(server, AppState::new(comparison)).await
}
