//! Concrete capability gateways: OpenRouter for generation, fastembed for
//! embeddings and Qdrant (REST) for vector search.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use chat_core::{AssistError, DocumentChunk, Embedder, Generator, Result, VectorIndex};

const OPENROUTER_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MAX_COMPLETION_TOKENS: u32 = 1024;

/// Text generation via the OpenRouter chat completions API. Image attachments
/// are sent as base64 data-URI parts of a multimodal content array.
pub struct OpenRouterGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenRouterGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Generator for OpenRouterGenerator {
    async fn generate(&self, prompt: &str, image: Option<&[u8]>) -> Result<String> {
        let mut content = vec![json!({
            "type": "text",
            "text": prompt,
        })];
        if let Some(bytes) = image {
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/png;base64,{}", STANDARD.encode(bytes)),
                },
            }));
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": content,
                }
            ],
            "max_tokens": MAX_COMPLETION_TOKENS,
        });

        let response = self
            .client
            .post(OPENROUTER_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AssistError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssistError::Generation(format!(
                "LLM API request failed: {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AssistError::Generation(e.to_string()))?;

        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AssistError::Generation("invalid response format from LLM".to_string())
            })?;

        Ok(text.to_string())
    }
}

/// Embeddings via fastembed's AllMiniLML6V2 (384 dimensions). The ONNX
/// inference runs on a blocking thread to keep the async scheduler free.
pub struct FastembedEmbedder;

pub const EMBEDDING_DIMENSION: usize = 384;

#[async_trait]
impl Embedder for FastembedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = text.to_owned();
        let embedding = tokio::task::spawn_blocking(move || {
            use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

            let mut model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
            )?;
            let embeddings = model.embed(vec![input], None)?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("no embedding returned"))
        })
        .await
        .map_err(|e| AssistError::Embedding(e.to_string()))?
        .map_err(|e: anyhow::Error| AssistError::Embedding(e.to_string()))?;

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}

/// Vector index backed by a Qdrant cluster over its REST API, using the dot
/// product metric.
pub struct QdrantVectorIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantVectorIndex {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }
}

fn unavailable(e: impl std::fmt::Display) -> AssistError {
    AssistError::IndexUnavailable(e.to_string())
}

fn chunk_from_hit(hit: &Value) -> Option<DocumentChunk> {
    let id = match &hit["id"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let text = hit["payload"]["page_text"].as_str().unwrap_or_default().to_string();
    let source_page = hit["payload"]["page_number"].as_u64().map(|n| n as u32);
    let vector = hit["vector"]
        .as_array()
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect()
        })
        .unwrap_or_default();

    Some(DocumentChunk {
        id,
        vector,
        text,
        source_page,
    })
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        let body = json!({
            "vectors": {
                "size": dimension,
                "distance": "Dot",
            }
        });

        let response = self
            .request(reqwest::Method::PUT, &format!("collections/{name}"))
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;

        if response.status().is_success() {
            info!(collection = name, dimension, "collection created");
            return Ok(());
        }

        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::CONFLICT || detail.contains("already exists") {
            warn!(collection = name, "collection already exists, keeping it as is");
            return Ok(());
        }

        Err(unavailable(format!(
            "collection creation failed ({status}): {detail}"
        )))
    }

    async fn upsert(&self, name: &str, chunks: Vec<DocumentChunk>) -> Result<()> {
        let points: Vec<Value> = chunks
            .iter()
            .map(|chunk| {
                json!({
                    "id": chunk.id,
                    "vector": chunk.vector,
                    "payload": {
                        "page_text": chunk.text,
                        "page_number": chunk.source_page,
                    },
                })
            })
            .collect();

        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("collections/{name}/points?wait=true"),
            )
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("upsert failed ({status}): {detail}")));
        }
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(DocumentChunk, f32)>> {
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "with_vector": true,
        });

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("collections/{name}/points/search"),
            )
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("search failed ({status}): {detail}")));
        }

        let body: Value = response.json().await.map_err(unavailable)?;
        let hits = body["result"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(hits
            .iter()
            .filter_map(|hit| {
                let score = hit["score"].as_f64()? as f32;
                let chunk = chunk_from_hit(hit)?;
                Some((chunk, score))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_from_hit_reads_payload_and_vector() {
        let hit = json!({
            "id": "abc",
            "score": 0.9,
            "payload": { "page_text": "hello", "page_number": 3 },
            "vector": [0.5, 0.25],
        });
        let chunk = chunk_from_hit(&hit).unwrap();
        assert_eq!(chunk.id, "abc");
        assert_eq!(chunk.text, "hello");
        assert_eq!(chunk.source_page, Some(3));
        assert_eq!(chunk.vector, vec![0.5, 0.25]);
    }

    #[test]
    fn chunk_from_hit_accepts_numeric_ids_and_missing_fields() {
        let hit = json!({ "id": 42, "payload": {} });
        let chunk = chunk_from_hit(&hit).unwrap();
        assert_eq!(chunk.id, "42");
        assert!(chunk.text.is_empty());
        assert_eq!(chunk.source_page, None);
        assert!(chunk.vector.is_empty());
    }
}
