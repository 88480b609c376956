use std::sync::Arc;

use rageval_rag::{
    InMemoryVectorStore, RagComparison, RagConfig,
    mock::{HashEmbeddingProvider, MockLanguageModel},
};
use rageval_server::{AppState, app_router};
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::Value;

const DIM: usize = 64;
const ANSWER: &str = "Refunds are accepted within thirty days of delivery.";
const POLICY: &str = "Refund policy. Refunds are accepted within thirty days of delivery.\n\n\
    Shipping. Orders above fifty euros ship for free.\n\n\
    Warranty. Manufacturing defects are covered for two years.";

fn state() -> AppState {
    let config = RagConfig::builder()
        .dense_dimensions(DIM)
        .chunk_size(80)
        .chunk_overlap(10)
        .build()
        .expect("config");
    let comparison = RagComparison::builder()
        .config(config)
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .language_model(Arc::new(MockLanguageModel::fixed(ANSWER)))
        .build()
        .expect("comparison");
    AppState::new(comparison)
}

async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

fn text_file(name: &str, text: &str) -> Part {
    Part::bytes(text.as_bytes().to_vec())
        .file_name(name.to_string())
        .mime_str("text/plain")
        .expect("mime")
}

fn form(query: &str) -> Form {
    Form::new().part("files", text_file("policy.txt", POLICY)).text("query", query.to_string())
}

#[tokio::test]
async fn health_and_index_are_served() {
    let (base, handle) = spawn_server(state()).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], "ok");

    let page = client.get(&base).send().await.expect("index response");
    assert!(page.status().is_success());
    let html = page.text().await.expect("index html");
    assert!(html.contains("Multiquery Retriever"));

    handle.abort();
}

#[tokio::test]
async fn single_model_response_uses_wire_name_keys() {
    let (base, handle) = spawn_server(state()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/dense_rag", base))
        .multipart(form("What is the refund policy?"))
        .send()
        .await
        .expect("compare response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("compare json");
    let object = body.as_object().expect("json object");
    assert_eq!(object.len(), 3);
    assert_eq!(body["dense_rag_response"], ANSWER);
    let llm_eval = body["dense_rag_llm_eval"].as_array().expect("llm eval array");
    assert_eq!(llm_eval.len(), 1);
    assert!(llm_eval[0].as_str().expect("metric line").contains(','));

    handle.abort();
}

#[tokio::test]
async fn all_returns_every_strategy_under_label_keys() {
    let (base, handle) = spawn_server(state()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/all", base))
        .multipart(
            form("What is the refund policy?").part("files", text_file("extra.txt", "Support.")),
        )
        .send()
        .await
        .expect("compare response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("compare json");
    for prefix in ["hybrid_retriever", "hyde_retriever", "multiquery_retriever", "dense_retriever"] {
        assert_eq!(body[format!("{prefix}_response")], ANSWER, "{prefix}");
        assert!(body[format!("{prefix}_llm_eval")].is_array(), "{prefix}");
        assert!(body[format!("{prefix}_retriever_eval")].is_array(), "{prefix}");
    }
    assert_eq!(body.as_object().expect("json object").len(), 12);

    handle.abort();
}

#[tokio::test]
async fn unknown_model_is_not_found() {
    let (base, handle) = spawn_server(state()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/sparse_rag", base))
        .multipart(form("refund"))
        .send()
        .await
        .expect("compare response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].as_str().expect("error").contains("sparse_rag"));

    handle.abort();
}

#[tokio::test]
async fn missing_query_or_files_is_a_bad_request() {
    let (base, handle) = spawn_server(state()).await;
    let client = reqwest::Client::new();

    let no_query = client
        .post(format!("{}/api/hybrid_rag", base))
        .multipart(form("   "))
        .send()
        .await
        .expect("compare response");
    assert_eq!(no_query.status(), StatusCode::BAD_REQUEST);
    let body: Value = no_query.json().await.expect("error json");
    assert_eq!(body["error"], "Please enter a query.");

    let no_files = client
        .post(format!("{}/api/hybrid_rag", base))
        .multipart(Form::new().text("query", "refund"))
        .send()
        .await
        .expect("compare response");
    assert_eq!(no_files.status(), StatusCode::BAD_REQUEST);
    let body: Value = no_files.json().await.expect("error json");
    assert_eq!(body["error"], "Please upload at least one PDF document.");

    handle.abort();
}

#[tokio::test]
async fn unsupported_and_oversized_uploads_are_rejected() {
    let (base, handle) = spawn_server(state().with_upload_limit(1024)).await;
    let client = reqwest::Client::new();

    let image = Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("scan.png")
        .mime_str("image/png")
        .expect("mime");
    let response = client
        .post(format!("{}/api/dense_rag", base))
        .multipart(Form::new().part("files", image).text("query", "refund"))
        .send()
        .await
        .expect("compare response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let large = "refund policy ".repeat(200);
    let oversized = client
        .post(format!("{}/api/dense_rag", base))
        .multipart(
            Form::new().part("files", text_file("large.txt", &large)).text("query", "refund"),
        )
        .send()
        .await;
    // The server may close the connection before the whole body is sent.
    if let Ok(response) = oversized {
        assert!(response.status().is_client_error());
    }

    handle.abort();
}
