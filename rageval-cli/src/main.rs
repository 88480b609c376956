use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rageval_cli::{BackendClient, DEFAULT_BACKEND_URL, Outcome, parse_selection, render_outcome};
use rageval_rag::protocol::ModelSelection;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rageval", version, about = "RAG Pipeline PDF Processing and Comparison")]
struct Cli {
    /// PDF documents to upload.
    files: Vec<PathBuf>,

    /// RAG model: "Hybrid Retriever", "HyDE Retriever", "Multiquery Retriever",
    /// "Dense Retriever" or "All" (wire names such as `dense_rag` work too).
    #[arg(short, long, default_value = "Hybrid Retriever", value_parser = parse_selection)]
    model: ModelSelection,

    /// The query to answer.
    #[arg(short, long, default_value = "")]
    query: String,

    /// Base URL of the comparison backend.
    #[arg(long, env = "RAGEVAL_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = BackendClient::new(cli.backend_url);
    eprintln!("Processing your request...");
    let outcome = client.compare(&cli.files, &cli.query, cli.model).await;

    print!("{}", render_outcome(cli.model, &outcome));
    match outcome {
        Outcome::Results(_) => ExitCode::SUCCESS,
        Outcome::Warning(_) | Outcome::Failed(_) => ExitCode::FAILURE,
    }
}
