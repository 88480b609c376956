use std::path::PathBuf;

use axum::{
    Json, Router,
    extract::{Multipart, Path},
    http::StatusCode,
    routing::post,
};
use rageval_cli::{BackendClient, Outcome};
use rageval_rag::protocol::{ModelSelection, NO_RESPONSE, Strategy};
use serde_json::{Value, json};

/// Echoes what it received so the test can check the form.
async fn stub_compare(
    Path(model): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, String)> {
    if model == "hyde_rag" {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "qdrant unavailable".to_string()));
    }

    let mut files = Vec::new();
    let mut query = String::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        match field.name().map(str::to_string).as_deref() {
            Some("files") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                files.push(format!("{name} ({mime})"));
            }
            Some("query") => query = field.text().await.expect("query text"),
            _ => {}
        }
    }

    let summary = format!("{} | {}", files.join(", "), query);
    Ok(Json(match model.as_str() {
        "all" => json!({
            "hybrid_retriever_response": summary,
            "hybrid_retriever_llm_eval": ["answer_words: 3, context_grounding: 0.90"],
            "hybrid_retriever_retriever_eval": ["retrieved: 4"],
        }),
        _ => json!({
            (format!("{model}_response")): summary,
            (format!("{model}_llm_eval")): ["answer_words: 3"],
            (format!("{model}_retriever_eval")): [],
        }),
    }))
}

async fn spawn_backend() -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new().route("/api/{model}", post(stub_compare));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

fn write_files(dir: &tempfile::TempDir) -> Vec<PathBuf> {
    let pdf = dir.path().join("policy.pdf");
    let notes = dir.path().join("notes.txt");
    std::fs::write(&pdf, b"%PDF-1.4 stub").expect("write pdf");
    std::fs::write(&notes, b"refunds within thirty days").expect("write notes");
    vec![pdf, notes]
}

#[tokio::test]
async fn single_model_form_reaches_the_backend() {
    let (base, handle) = spawn_backend().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let files = write_files(&dir);

    let outcome = BackendClient::new(&base)
        .compare(&files, "refund window?", ModelSelection::Single(Strategy::Dense))
        .await;

    let Outcome::Results(views) = outcome else {
        panic!("expected results, got {outcome:?}");
    };
    assert_eq!(views.len(), 1);
    assert_eq!(
        views[0].response,
        "policy.pdf (application/pdf), notes.txt (text/plain) | refund window?"
    );
    assert_eq!(views[0].llm_eval, vec!["answer_words: 3"]);
    assert!(views[0].retriever_eval.is_empty());

    handle.abort();
}

#[tokio::test]
async fn all_fills_missing_strategies_with_defaults() {
    let (base, handle) = spawn_backend().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let files = write_files(&dir);

    let outcome = BackendClient::new(&base).compare(&files, "refund", ModelSelection::All).await;

    let Outcome::Results(views) = outcome else {
        panic!("expected results, got {outcome:?}");
    };
    assert_eq!(views.len(), 4);
    assert_eq!(views[0].llm_eval, vec!["answer_words: 3", "context_grounding: 0.90"]);
    assert!(views[1..].iter().all(|v| v.response == NO_RESPONSE && v.llm_eval.is_empty()));

    handle.abort();
}

#[tokio::test]
async fn backend_errors_become_an_error_banner() {
    let (base, handle) = spawn_backend().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let files = write_files(&dir);

    let outcome = BackendClient::new(&base)
        .compare(&files, "refund", ModelSelection::Single(Strategy::Hyde))
        .await;
    assert_eq!(outcome, Outcome::Failed("Error: 500 - qdrant unavailable".to_string()));

    handle.abort();
}

#[tokio::test]
async fn incomplete_forms_are_not_sent() {
    let client = BackendClient::new("http://127.0.0.1:9");

    let outcome = client.compare(&[], "refund", ModelSelection::All).await;
    assert_eq!(outcome, Outcome::Warning("Please upload at least one PDF document."));

    let files = vec![PathBuf::from("policy.pdf")];
    let outcome = client.compare(&files, " ", ModelSelection::All).await;
    assert_eq!(outcome, Outcome::Warning("Please enter a query."));
}

#[tokio::test]
async fn unreadable_files_are_reported() {
    let client = BackendClient::new("http://127.0.0.1:9");
    let files = vec![PathBuf::from("/definitely/missing/policy.pdf")];

    let Outcome::Failed(message) = client.compare(&files, "refund", ModelSelection::All).await
    else {
        panic!("expected a failure");
    };
    assert!(message.starts_with("An error occurred: failed to read"));
}
