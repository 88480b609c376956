//! HTTP backend of the RAG comparison harness.
//!
//! `POST /api/{model}` takes a multipart form with one or more `files` and a
//! `query`, indexes the uploads into the hybrid collection and answers the
//! query with the selected strategy (`hybrid_rag`, `hyde_rag`,
//! `multiquery_rag`, `dense_rag`) or with all of them (`all`).

pub mod error;
pub mod extract;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, ServerConfig, app_router, run_server};
