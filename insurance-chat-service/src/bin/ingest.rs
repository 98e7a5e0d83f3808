//! Document ingestion: reads a paginated text file (pages separated by
//! form-feed characters, as emitted by common PDF text extractors), embeds
//! each non-empty page and upserts it into the vector index.
//!
//! Usage: ingest <pages-file> [collection]

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use chat_core::DocumentIndex;

#[path = "../gateways.rs"]
mod gateways;

use gateways::{FastembedEmbedder, QdrantVectorIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: ingest <pages-file> [collection]")?;
    let collection = match args.next() {
        Some(name) => name,
        None => std::env::var("DOCS_COLLECTION")
            .unwrap_or_else(|_| "medical_documents".to_string()),
    };

    let qdrant_url =
        std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6333".to_string());
    let qdrant_api_key = std::env::var("QDRANT_API_KEY").ok();

    let backend = Arc::new(QdrantVectorIndex::new(qdrant_url, qdrant_api_key));
    let index = DocumentIndex::new(backend, Arc::new(FastembedEmbedder), collection);

    index.ensure_collection().await?;

    let contents = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {path}"))?;
    let pages: Vec<String> = contents.split('\u{C}').map(str::to_string).collect();
    info!(file = %path, pages = pages.len(), "read source document");

    let stored = index.ingest_pages(pages).await?;
    info!(stored, "ingestion finished");

    Ok(())
}
