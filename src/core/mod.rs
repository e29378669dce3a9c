//! Core module - Business logic
//!
//! Artifact synchronization (fetch, extract, permissions, version marker)
//! and the retrieval path (embeddings, vector store, query engine).

pub mod archive;
pub mod embedding;
pub mod fetch;
pub mod ledger;
pub mod permissions;
pub mod query;
pub mod source;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;
