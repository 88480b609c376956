//! Command-line front end of the RAG comparison harness.
//!
//! Uploads documents and a query to the backend, then prints each strategy's
//! answer next to its LLM and retriever evaluation tables.

pub mod client;
pub mod render;

pub use client::{BackendClient, DEFAULT_BACKEND_URL, Outcome, build_form, parse_selection};
pub use render::{render_outcome, render_results};
