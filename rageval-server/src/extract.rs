//! Text extraction for uploaded files.
//!
//! PDFs are read page by page with `lopdf`; only text that is not drawn as
//! vector paths or images can be recovered. Plain-text uploads are taken as is.

use axum::body::Bytes;
use lopdf::Document;
use rageval_rag::SourceDocument;
use thiserror::Error;
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Kind of upload, decided from the content type, the file name and the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Text,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("'{name}' is not a readable PDF: {source}")]
    Pdf {
        name: String,
        #[source]
        source: lopdf::Error,
    },

    #[error("'{name}' is not valid UTF-8 text")]
    NotUtf8 { name: String },

    #[error("'{name}' has unsupported content type '{content_type}'")]
    Unsupported { name: String, content_type: String },

    #[error("extraction of '{name}' did not complete: {source}")]
    Interrupted {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl ExtractError {
    /// Whether the upload itself is at fault, as opposed to the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExtractError::Interrupted { .. })
    }
}

/// Classify an upload. Returns `None` for anything that is neither PDF nor text.
pub fn detect_kind(name: &str, content_type: Option<&str>, bytes: &[u8]) -> Option<UploadKind> {
    let lower = name.to_ascii_lowercase();
    let content_type = content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim());

    if bytes.starts_with(PDF_MAGIC) || content_type == Some("application/pdf") {
        return Some(UploadKind::Pdf);
    }
    match content_type {
        Some(ct) if ct.starts_with("text/") => Some(UploadKind::Text),
        Some("application/octet-stream") | None if lower.ends_with(".pdf") => {
            Some(UploadKind::Pdf)
        }
        Some("application/octet-stream") | None
            if lower.ends_with(".txt") || lower.ends_with(".md") =>
        {
            Some(UploadKind::Text)
        }
        _ => None,
    }
}

/// Run [`extract_document`] on the blocking pool so PDF parsing does not stall the runtime.
pub async fn extract_document_blocking(
    name: String,
    content_type: Option<String>,
    bytes: Bytes,
) -> Result<SourceDocument, ExtractError> {
    let task_name = name.clone();
    tokio::task::spawn_blocking(move || {
        extract_document(&task_name, content_type.as_deref(), &bytes)
    })
    .await
    .map_err(|source| ExtractError::Interrupted { name, source })?
}

/// Extract the text of one uploaded file.
pub fn extract_document(
    name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<SourceDocument, ExtractError> {
    let text = match detect_kind(name, content_type, bytes) {
        Some(UploadKind::Pdf) => extract_pdf_text(name, bytes)?,
        Some(UploadKind::Text) => String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractError::NotUtf8 { name: name.to_string() })?,
        None => {
            return Err(ExtractError::Unsupported {
                name: name.to_string(),
                content_type: content_type.unwrap_or("unknown").to_string(),
            });
        }
    };
    Ok(SourceDocument { name: name.to_string(), text })
}

/// Concatenate the text of every page, skipping pages whose content cannot be decoded.
pub fn extract_pdf_text(name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let document = Document::load_mem(bytes)
        .map_err(|source| ExtractError::Pdf { name: name.to_string(), source })?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    debug!(file = name, pages = pages.len(), "extracting PDF text");

    let mut text = String::new();
    for page in pages {
        match document.extract_text(&[page]) {
            Ok(content) if !content.trim().is_empty() => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(content.trim_end());
            }
            Ok(_) => {}
            Err(e) => warn!(file = name, page, error = %e, "skipping unreadable PDF page"),
        }
    }
    Ok(text)
}
