//! Embedding providers.
//!
//! [`EmbeddingClient`] talks to Voyage or any OpenAI-compatible
//! `/embeddings` endpoint. Documents are sent in batches of 64 with a short
//! pause between batches for rate limiting.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{EmbeddingConfig, HearthError};
use serde::{Deserialize, Serialize};

use crate::hash_embedder::HashEmbedder;

/// Turns text into vectors in a fixed embedding space.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier; vectors from different models are not comparable.
    fn model(&self) -> &str;

    /// Embed entity descriptions. Returns vectors in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, HearthError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, HearthError>;
}

/// Build the embedder selected by `config.provider`.
///
/// # Errors
///
/// Returns [`HearthError::Config`] for an unknown provider or a remote
/// provider without an API key.
///
/// # Examples
///
/// ```
/// use hearth_core::EmbeddingConfig;
/// use hearth_index::embedding::embedder_from_config;
///
/// let embedder = embedder_from_config(&EmbeddingConfig::default()).unwrap();
/// assert_eq!(embedder.model(), "hash-256");
/// ```
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, HearthError> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::with_model(
            &config.model,
            config.dimensions,
        )?)),
        "voyage" | "openai" => Ok(Arc::new(EmbeddingClient::with_config(config)?)),
        other => Err(HearthError::Config(format!(
            "unknown embedding provider '{other}' (expected \"hash\", \"voyage\" or \"openai\")"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Voyage,
    OpenAi,
}

/// Client for a remote embedding API.
///
/// # Examples
///
/// ```
/// use hearth_index::embedding::{Embedder, EmbeddingClient};
///
/// let client = EmbeddingClient::voyage("test-key");
/// assert_eq!(client.model(), "voyage-3-lite");
/// ```
pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    flavor: Flavor,
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

const VOYAGE_BASE_URL: &str = "https://api.voyageai.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const VOYAGE_DEFAULT_MODEL: &str = "voyage-3-lite";
const BATCH_SIZE: usize = 64;
const BATCH_DELAY_MS: u64 = 200;

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_type: Option<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDataItem>,
}

#[derive(Deserialize)]
struct EmbedDataItem {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a Voyage client with the default model.
    pub fn voyage(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: VOYAGE_BASE_URL.to_string(),
            model: VOYAGE_DEFAULT_MODEL.to_string(),
            flavor: Flavor::Voyage,
        }
    }

    /// Create a client from an [`EmbeddingConfig`].
    ///
    /// Falls back to the provider's API key env var if no key is in config.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Config`] if no API key is available.
    pub fn with_config(config: &EmbeddingConfig) -> Result<Self, HearthError> {
        let api_key = config.resolve_api_key()?;
        let flavor = if config.provider == "openai" {
            Flavor::OpenAi
        } else {
            Flavor::Voyage
        };
        let base_url = config.base_url.clone().unwrap_or_else(|| match flavor {
            Flavor::Voyage => VOYAGE_BASE_URL.to_string(),
            Flavor::OpenAi => OPENAI_BASE_URL.to_string(),
        });

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            flavor,
        })
    }

    fn build_request(&self, input: Vec<String>, input_type: &str) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            input,
            input_type: match self.flavor {
                Flavor::Voyage => Some(input_type.to_string()),
                Flavor::OpenAi => None,
            },
        }
    }

    async fn post_embeddings(&self, request: &EmbedRequest) -> Result<Vec<Vec<f32>>, HearthError> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| HearthError::Embedding(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(HearthError::Embedding(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| HearthError::Embedding(format!("failed to parse response: {e}")))?;

        if embed_response.data.len() != request.input.len() {
            return Err(HearthError::Embedding(format!(
                "expected {} embeddings, got {}",
                request.input.len(),
                embed_response.data.len()
            )));
        }

        Ok(embed_response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect())
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, HearthError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            if i > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(BATCH_DELAY_MS)).await;
            }

            let request = self.build_request(batch.to_vec(), "document");
            all_embeddings.extend(self.post_embeddings(&request).await?);
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, HearthError> {
        if text.trim().is_empty() {
            return Err(HearthError::Embedding("cannot embed empty text".into()));
        }

        let request = self.build_request(vec![text.to_string()], "query");
        self.post_embeddings(&request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HearthError::Embedding("empty response from embedding API".into()))
    }
}
