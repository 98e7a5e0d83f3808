use std::cmp::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::capability::{Embedder, VectorIndex};
use crate::error::{AssistError, Result};

/// One page-level unit of a source document plus its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    /// 1-based page number within the source document, when known.
    pub source_page: Option<u32>,
}

/// Retrieval front-end over an embedder and a vector index backend.
///
/// Search failures degrade to "no context available" rather than erroring, so
/// the assistant can still answer without document grounding.
pub struct DocumentIndex {
    backend: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    collection: String,
}

impl DocumentIndex {
    pub fn new(
        backend: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            embedder,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the backing collection if it does not exist yet. Idempotent.
    pub async fn ensure_collection(&self) -> Result<()> {
        self.backend
            .create_collection(&self.collection, self.embedder.dimension())
            .await
    }

    pub async fn upsert(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        self.backend.upsert(&self.collection, chunks).await
    }

    /// Embed and store the pages of a source document. Pages whose trimmed
    /// text is empty are skipped with a warning. Returns the number of chunks
    /// stored.
    pub async fn ingest_pages<I>(&self, pages: I) -> Result<usize>
    where
        I: IntoIterator<Item = String>,
    {
        let mut chunks = Vec::new();
        for (idx, page) in pages.into_iter().enumerate() {
            let page_number = idx as u32 + 1;
            if page.trim().is_empty() {
                warn!(page = page_number, "no text found on page, skipping");
                continue;
            }
            let vector = self.embedder.embed(&page).await?;
            chunks.push(DocumentChunk {
                id: Uuid::new_v4().to_string(),
                vector,
                text: page,
                source_page: Some(page_number),
            });
            info!(page = page_number, "processed page");
        }

        let stored = chunks.len();
        if stored > 0 {
            self.backend.upsert(&self.collection, chunks).await?;
        }
        info!(collection = %self.collection, stored, "ingestion complete");
        Ok(stored)
    }

    /// Top-`k` chunks most similar to `query`, ordered by descending score.
    ///
    /// An embedding or index failure is logged and yields an empty list:
    /// callers treat empty as "no context available", not as an error.
    pub async fn search(&self, query: &str, k: usize) -> Vec<(DocumentChunk, f32)> {
        let vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "query embedding failed, continuing without document context");
                return Vec::new();
            }
        };

        match self.backend.search(&self.collection, &vector, k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector search failed, continuing without document context");
                Vec::new()
            }
        }
    }
}

struct InMemoryCollection {
    dimension: usize,
    chunks: DashMap<String, DocumentChunk>,
}

/// In-memory vector index with inner-product ranking. Backs tests and
/// single-process deployments without an external index.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    collections: DashMap<String, Arc<InMemoryCollection>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Result<Arc<InMemoryCollection>> {
        self.collections
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| AssistError::IndexUnavailable(format!("unknown collection: {name}")))
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        if self.collections.contains_key(name) {
            warn!(collection = name, "collection already exists, keeping stored vectors");
            return Ok(());
        }
        self.collections.insert(
            name.to_string(),
            Arc::new(InMemoryCollection {
                dimension,
                chunks: DashMap::new(),
            }),
        );
        info!(collection = name, dimension, "collection created");
        Ok(())
    }

    async fn upsert(&self, name: &str, chunks: Vec<DocumentChunk>) -> Result<()> {
        let collection = self.collection(name)?;
        for chunk in chunks {
            if chunk.vector.len() != collection.dimension {
                return Err(AssistError::InvalidVector(format!(
                    "chunk {} has dimension {}, collection {} expects {}",
                    chunk.id,
                    chunk.vector.len(),
                    name,
                    collection.dimension
                )));
            }
            collection.chunks.insert(chunk.id.clone(), chunk);
        }
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(DocumentChunk, f32)>> {
        let collection = self.collection(name)?;
        let mut hits: Vec<(DocumentChunk, f32)> = collection
            .chunks
            .iter()
            .map(|entry| {
                let score = dot(&entry.value().vector, vector);
                (entry.value().clone(), score)
            })
            .collect();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}
