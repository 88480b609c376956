use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use rageval_rag::protocol::{ModelSelection, StrategyView, parse_response};
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::Value;
use tracing::{debug, error};

/// Where the backend listens inside the compose network.
pub const DEFAULT_BACKEND_URL: &str = "http://backend:9000";

pub const MISSING_FILES: &str = "Please upload at least one PDF document.";
pub const MISSING_QUERY: &str = "Please enter a query.";

/// What a submission produced, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Per-strategy results in display order.
    Results(Vec<StrategyView>),
    /// The form was incomplete; nothing was sent.
    Warning(&'static str),
    /// The backend answered with an error, or could not be reached.
    Failed(String),
}

/// Accept a form label (`Dense Retriever`) or a wire name (`dense_rag`).
pub fn parse_selection(value: &str) -> Result<ModelSelection, String> {
    let value = value.trim();
    ModelSelection::OPTIONS
        .into_iter()
        .find(|o| o.label().eq_ignore_ascii_case(value))
        .map(Ok)
        .unwrap_or_else(|| ModelSelection::from_str(value).map_err(|e| e.to_string()))
}

/// The warning to show for an incomplete form, if any.
pub fn validate(files: &[PathBuf], query: &str) -> Option<&'static str> {
    if files.is_empty() {
        Some(MISSING_FILES)
    } else if query.trim().is_empty() {
        Some(MISSING_QUERY)
    } else {
        None
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("txt") | Some("md") => "text/plain",
        _ => "application/pdf",
    }
}

/// Build the multipart form: one `files` part per path, then `query`.
pub async fn build_form(files: &[PathBuf], query: &str) -> anyhow::Result<Form> {
    let mut form = Form::new();
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        let part = Part::bytes(bytes).file_name(name).mime_str(mime_for(path))?;
        form = form.part("files", part);
    }
    Ok(form.text("query", query.to_string()))
}

/// HTTP client for the comparison backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    pub fn endpoint(&self, selection: ModelSelection) -> String {
        format!("{}/api/{}", self.base_url.trim_end_matches('/'), selection.wire_name())
    }

    /// Validate the form, upload it and parse the backend's answer.
    pub async fn compare(
        &self,
        files: &[PathBuf],
        query: &str,
        selection: ModelSelection,
    ) -> Outcome {
        if let Some(warning) = validate(files, query) {
            return Outcome::Warning(warning);
        }
        match self.send(files, query, selection).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "comparison request failed");
                Outcome::Failed(format!("An error occurred: {e:#}"))
            }
        }
    }

    async fn send(
        &self,
        files: &[PathBuf],
        query: &str,
        selection: ModelSelection,
    ) -> anyhow::Result<Outcome> {
        let form = build_form(files, query).await?;
        let url = self.endpoint(selection);
        debug!(%url, files = files.len(), "posting comparison request");

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Ok(Outcome::Failed(format!("Error: {} - {}", status.as_u16(), text)));
        }

        let body: Value = serde_json::from_str(&text).context("backend returned invalid JSON")?;
        Ok(Outcome::Results(parse_response(selection, &body)))
    }
}

#[cfg(test)]
mod tests {
    use rageval_rag::protocol::Strategy;

    use super::*;

    #[test]
    fn labels_and_wire_names_select_models() {
        assert_eq!(parse_selection("HyDE Retriever"), Ok(ModelSelection::Single(Strategy::Hyde)));
        assert_eq!(parse_selection("all"), Ok(ModelSelection::All));
        assert_eq!(parse_selection("All"), Ok(ModelSelection::All));
        assert_eq!(
            parse_selection("multiquery_rag"),
            Ok(ModelSelection::Single(Strategy::MultiQuery))
        );
        assert!(parse_selection("sparse").is_err());
    }

    #[test]
    fn files_are_checked_before_the_query() {
        assert_eq!(validate(&[], ""), Some(MISSING_FILES));
        let files = vec![PathBuf::from("policy.pdf")];
        assert_eq!(validate(&files, "  \n"), Some(MISSING_QUERY));
        assert_eq!(validate(&files, "refund?"), None);
    }

    #[test]
    fn endpoint_uses_the_wire_name() {
        let client = BackendClient::new("http://localhost:9000/");
        assert_eq!(client.endpoint(ModelSelection::All), "http://localhost:9000/api/all");
        assert_eq!(
            client.endpoint(ModelSelection::Single(Strategy::Dense)),
            "http://localhost:9000/api/dense_rag"
        );
    }

    #[test]
    fn mime_follows_the_extension() {
        assert_eq!(mime_for(Path::new("a.PDF")), "application/pdf");
        assert_eq!(mime_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_for(Path::new("scan")), "application/pdf");
    }
}
