use async_trait::async_trait;

use crate::error::Result;
use crate::index::DocumentChunk;

/// Text generation capability. Implementations wrap a concrete LLM provider;
/// the orchestrator only sees prompt in, text out.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`, optionally grounded in an attached
    /// image (raw bytes as received from the caller).
    async fn generate(&self, prompt: &str, image: Option<&[u8]>) -> Result<String>;
}

/// Text embedding capability producing fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of the vectors this embedder produces. Collections are
    /// created with this size.
    fn dimension(&self) -> usize;
}

/// Vector index capability: named collections of document chunks with
/// inner-product nearest-neighbor search.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a collection. Creating a collection that already exists is a
    /// no-op (logged as a warning), never an error.
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()>;

    /// Insert or replace chunks by id. Best effort: a mid-batch failure does
    /// not roll back chunks already written.
    async fn upsert(&self, name: &str, chunks: Vec<DocumentChunk>) -> Result<()>;

    /// Top-`limit` most similar chunks by dot product, ordered by descending
    /// score.
    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(DocumentChunk, f32)>>;
}
