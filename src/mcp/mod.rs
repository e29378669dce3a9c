//! MCP (Model Context Protocol) Server
//!
//! Exposes the documentation database via MCP tools.
//!
//! # Tools
//! - `query_docs` - Retrieve chunks for a question, version and language
//! - `get_latest_version` - Newest version in the database
//! - `list_available_versions` - All versions
//! - `list_available_languages` - Languages, optionally per version
//! - `embed_query` - Embedding vector for arbitrary text

mod jsonrpc;
mod server;
mod tools;

pub use server::{run_mcp_server, DocsMcpServer};
