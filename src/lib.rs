//! ragdocs - versioned documentation knowledge base over MCP
//!
//! Keeps a local copy of a vector database in sync with an artifact server
//! and exposes retrieval tools to AI assistants through the Model Context
//! Protocol.
//!
//! ## Key Concepts
//!
//! - **Artifact**: the database directory; it is either fully installed or
//!   absent, never half-written
//! - **Version marker**: `.db_version` inside the artifact records which
//!   remote version populated it
//! - **Retrieval only**: tools return chunks with citations; answering is
//!   left to the client

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod mcp;
pub mod remote;

pub use core::query::QueryEngine;
pub use core::sync::{SyncOutcome, Synchronizer};
pub use error::{QueryError, SyncError};
pub use mcp::run_mcp_server;
