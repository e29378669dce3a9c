//! Query engine
//!
//! Retrieval only: embeds the question, pulls the nearest chunks for one
//! version/language pair and hands them back with citation metadata. Answer
//! generation is left to the MCP client.

use serde::Serialize;
use tracing::{debug, info};

use super::embedding::Embedder;
use super::store::{ChunkMetadata, QueryFilter, VectorStore};
use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};

/// One retrieved chunk as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub chunks: Vec<RetrievedChunk>,
    pub query_embedding: Vec<f32>,
    pub version: String,
    pub language: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
    pub model: String,
    pub dimension: usize,
}

/// Database label for a user-facing language name
fn storage_language(language: &str) -> &str {
    if language == "cpp" {
        "C++"
    } else {
        language
    }
}

pub struct QueryEngine {
    embedder: Box<dyn Embedder>,
    store: Box<dyn VectorStore>,
    settings: QueryConfig,
}

impl QueryEngine {
    pub fn new(embedder: Box<dyn Embedder>, store: Box<dyn VectorStore>, settings: QueryConfig) -> Self {
        Self {
            embedder,
            store,
            settings,
        }
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.settings.languages
    }

    pub fn default_version(&self) -> &str {
        &self.settings.default_version
    }

    fn validate_language(&self, language: &str) -> QueryResult<()> {
        if self.settings.languages.iter().any(|l| l == language) {
            Ok(())
        } else {
            Err(QueryError::UnsupportedLanguage {
                language: language.to_string(),
                supported: self.settings.languages.join(", "),
            })
        }
    }

    /// Retrieve the chunks closest to `question`
    pub fn query(
        &self,
        question: &str,
        version: &str,
        language: &str,
        top_k: Option<usize>,
    ) -> QueryResult<QueryResponse> {
        self.validate_language(language)?;
        let top_k = top_k.unwrap_or(self.settings.default_top_k).max(1);

        let query_embedding = self.embedder.embed(question)?;
        let filter = QueryFilter {
            version,
            language: storage_language(language),
        };
        let hits = self.store.query(&query_embedding, top_k, &filter)?;
        debug!(hits = hits.len(), top_k, "query finished");

        if hits.is_empty() {
            return Err(QueryError::NoResults {
                version: version.to_string(),
                language: language.to_string(),
            });
        }

        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                text: hit.document,
                metadata: hit.metadata,
                score: hit.score,
            })
            .collect();

        info!(
            "Retrieved {} chunks for version {} ({})",
            chunks.len(),
            version,
            language
        );
        Ok(QueryResponse {
            count: chunks.len(),
            chunks,
            query_embedding,
            version: version.to_string(),
            language: language.to_string(),
        })
    }

    /// Versions in the database, newest first
    pub fn available_versions(&self) -> QueryResult<Vec<String>> {
        self.store.versions()
    }

    /// Newest version in the database, or the configured default when empty
    pub fn latest_version(&self) -> QueryResult<String> {
        Ok(self
            .available_versions()?
            .into_iter()
            .next()
            .unwrap_or_else(|| self.settings.default_version.clone()))
    }

    pub fn available_languages(&self, version: Option<&str>) -> QueryResult<Vec<String>> {
        self.store.languages(version)
    }

    pub fn embed_query(&self, query: &str) -> QueryResult<EmbeddingResponse> {
        let embedding = self.embedder.embed(query)?;
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: self.embedder.model().to_string(),
        })
    }
}
