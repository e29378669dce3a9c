//! Error types
//!
//! `SyncError` covers the artifact synchronization path, `QueryError` the
//! retrieval path. CLI commands wrap both in `anyhow`.

/// Failure while obtaining or preparing the local artifact
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Network, timeout or bad HTTP status while talking to the artifact server
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Downloaded content is not a usable archive
    #[error("invalid archive: {0}")]
    ArchiveFormat(String),

    /// The artifact could not be made writable
    #[error("permission error: {0}")]
    Permission(String),

    /// No local artifact and no way to obtain one
    #[error("database missing: {0}")]
    ArtifactMissing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Short machine-friendly name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::RemoteUnavailable(_) => "remote_unavailable",
            SyncError::ArchiveFormat(_) => "archive_format",
            SyncError::Permission(_) => "permission",
            SyncError::ArtifactMissing(_) => "artifact_missing",
            SyncError::Io(_) => "io",
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure while answering a documentation query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unsupported language: {language}. Supported languages: {supported}")]
    UnsupportedLanguage { language: String, supported: String },

    #[error("no embedding API key configured. Set the VOYAGE_API_KEY environment variable")]
    MissingCredential,

    #[error("could not generate query embedding: {0}")]
    Embedding(String),

    #[error("database query failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("no documentation found for version {version} and language {language}")]
    NoResults { version: String, language: String },
}

pub type QueryResult<T> = Result<T, QueryError>;
