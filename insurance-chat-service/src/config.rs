use anyhow::Context;

/// Service configuration resolved from environment variables at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub openrouter_api_key: String,
    pub model: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub port: u16,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let openrouter_api_key =
            std::env::var("OPENROUTER_API_KEY").context("OPENROUTER_API_KEY not set")?;
        let model = std::env::var("OPENROUTER_MODEL")
            .unwrap_or_else(|_| "openai/gpt-4.1-mini".to_string());
        let qdrant_url =
            std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6333".to_string());
        let qdrant_api_key = std::env::var("QDRANT_API_KEY").ok();
        let collection = std::env::var("DOCS_COLLECTION")
            .unwrap_or_else(|_| "medical_documents".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().context("PORT is not a valid port number")?,
            Err(_) => 3000,
        };

        Ok(Self {
            openrouter_api_key,
            model,
            qdrant_url,
            qdrant_api_key,
            collection,
            port,
        })
    }
}
