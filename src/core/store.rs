//! Vector store - SQLite backend
//!
//! The downloaded database is a single SQLite file holding documentation
//! chunks with their embeddings. Search is an exhaustive cosine scan over the
//! rows matching the version/language filter.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QueryResult;

/// Citation data stored with every chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub version: String,
    pub language: String,
    pub url: String,
    pub last_updated: String,
    pub title: String,
    pub component: String,
}

/// A stored documentation chunk
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub document: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Exact-match metadata filter applied before ranking
#[derive(Debug, Clone, Copy)]
pub struct QueryFilter<'a> {
    pub version: &'a str,
    pub language: &'a str,
}

/// Nearest-neighbour lookup over stored chunks
pub trait VectorStore {
    /// Up to `top_k` chunks matching `filter`, best first
    fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &QueryFilter<'_>,
    ) -> QueryResult<Vec<ScoredChunk>>;

    /// Distinct versions, newest first
    fn versions(&self) -> QueryResult<Vec<String>>;

    /// Distinct languages, optionally restricted to one version
    fn languages(&self, version: Option<&str>) -> QueryResult<Vec<String>>;
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut a_norm, mut b_norm) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }

    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    dot / (a_norm.sqrt() * b_norm.sqrt())
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// SQLite-backed [`VectorStore`]
pub struct SqliteVectorStore {
    conn: Connection,
}

impl SqliteVectorStore {
    /// Open an existing database file read-write
    pub fn open(path: &Path) -> QueryResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA busy_timeout=5000;")?;

        let store = Self { conn };
        store.init_schema()?;
        debug!(path = %path.display(), "vector store opened");
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_memory() -> QueryResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> QueryResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                embedding BLOB NOT NULL,
                version TEXT NOT NULL,
                language TEXT NOT NULL,
                url TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                component TEXT NOT NULL DEFAULT '',
                last_updated TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_filter ON chunks(version, language);
            "#,
        )?;
        Ok(())
    }

    /// Insert or replace a chunk
    pub fn insert(&self, chunk: &Chunk) -> QueryResult<()> {
        let m = &chunk.metadata;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO chunks (
                id, document, embedding, version, language,
                url, title, component, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                chunk.id,
                chunk.document,
                encode_embedding(&chunk.embedding),
                m.version,
                m.language,
                m.url,
                m.title,
                m.component,
                m.last_updated,
            ],
        )?;
        Ok(())
    }

    /// Number of stored chunks
    pub fn count(&self) -> QueryResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl VectorStore for SqliteVectorStore {
    fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &QueryFilter<'_>,
    ) -> QueryResult<Vec<ScoredChunk>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT document, embedding, version, language, url, title, component, last_updated
            FROM chunks
            WHERE version = ?1 AND language = ?2
            "#,
        )?;

        let mut hits = stmt
            .query_map(params![filter.version, filter.language], |row| {
                let blob: Vec<u8> = row.get(1)?;
                Ok(ScoredChunk {
                    document: row.get(0)?,
                    score: cosine_similarity(embedding, &decode_embedding(&blob)),
                    metadata: ChunkMetadata {
                        version: row.get(2)?,
                        language: row.get(3)?,
                        url: row.get(4)?,
                        title: row.get(5)?,
                        component: row.get(6)?,
                        last_updated: row.get(7)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            candidates = hits.len(),
            version = filter.version,
            language = filter.language,
            "ranking chunks"
        );

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn versions(&self) -> QueryResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT version FROM chunks")?;
        let mut versions = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        versions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    fn languages(&self, version: Option<&str>) -> QueryResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT language FROM chunks WHERE ?1 IS NULL OR version = ?1 ORDER BY language",
        )?;
        let languages = stmt
            .query_map([version], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(languages)
    }
}
