//! Query embeddings
//!
//! Questions are embedded with the same model that built the database, via a
//! Voyage-compatible `/v1/embeddings` endpoint.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{QueryError, QueryResult};

/// Turns text into a vector
pub trait Embedder {
    fn embed(&self, text: &str) -> QueryResult<Vec<f32>>;

    /// Model identifier reported alongside embeddings
    fn model(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Blocking client for the Voyage embeddings API
#[derive(Debug, Clone)]
pub struct VoyageEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl VoyageEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> QueryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QueryError::Embedding(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Embedder for VoyageEmbedder {
    fn embed(&self, text: &str) -> QueryResult<Vec<f32>> {
        let api_key = self.api_key.as_deref().ok_or(QueryError::MissingCredential)?;

        debug!(model = %self.model, chars = text.len(), "requesting embedding");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&json!({
                "input": [text],
                "model": self.model,
            }))
            .send()
            .map_err(|e| QueryError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QueryError::Embedding(format!(
                "embedding API returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| QueryError::Embedding(format!("invalid embedding response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| QueryError::Embedding("no embedding returned".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
