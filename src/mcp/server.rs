//! MCP Server implementation for the documentation database
//!
//! Implements the Model Context Protocol (JSON-RPC 2.0 over stdio) directly
//! without external SDK dependencies. Stdout carries protocol messages only;
//! all logging goes to stderr.

use std::io::{BufRead, Write};

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::jsonrpc::{ErrorCode, JsonRpcRequest, JsonRpcResponse, Message, ToolResult};
use super::tools::*;
use crate::core::query::QueryEngine;

/// MCP Server handler
pub struct DocsMcpServer {
    engine: QueryEngine,
    initialized: bool,
    /// Unique session ID for this MCP connection
    session_id: String,
}

impl DocsMcpServer {
    pub fn new(engine: QueryEngine) -> Self {
        Self {
            engine,
            initialized: false,
            session_id: format!("mcp-{}", Ulid::new()),
        }
    }

    /// Handle a JSON-RPC request; notifications get no response
    pub fn handle_request(&mut self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        let (id, method, params) = match request.message() {
            Message::Notification { method } => {
                self.handle_notification(method);
                return None;
            }
            Message::Call { id, method, params } => (id, method, params),
        };

        if !request.is_v2() {
            return Some(JsonRpcResponse::error(
                id,
                ErrorCode::InvalidRequest,
                format!("Unsupported jsonrpc version: '{}'", request.jsonrpc),
            ));
        }

        let result = match method {
            "initialize" => Ok(self.handle_initialize()),
            "tools/list" => Ok(self.handle_list_tools()),
            "tools/call" => self.handle_call_tool(params),
            "ping" => Ok(json!({})),
            _ => Err((ErrorCode::MethodNotFound, format!("Method not found: {}", method))),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, msg)) => JsonRpcResponse::error(id, code, msg),
        })
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" => {
                self.initialized = true;
                info!(session = %self.session_id, "MCP client initialized");
            }
            "notifications/cancelled" => debug!("MCP request cancelled"),
            other => debug!("MCP: Unknown notification: {}", other),
        }
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": "ragdocs",
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Versioned documentation retrieval. Call get_latest_version if unsure which version to use, then query_docs with the user's question, version and language. Answer from the returned chunks and cite their urls."
        })
    }

    fn handle_list_tools(&self) -> Value {
        let versions = self.engine.available_versions().unwrap_or_else(|e| {
            warn!("Error listing versions for tool list: {}", e);
            Vec::new()
        });
        tool_definitions(
            &versions,
            self.engine.default_version(),
            self.engine.supported_languages(),
        )
    }

    fn handle_call_tool(&self, params: &Value) -> Result<Value, (ErrorCode, String)> {
        let name = params["name"]
            .as_str()
            .ok_or((ErrorCode::InvalidParams, "Missing tool name".to_string()))?;
        let arguments = match &params["arguments"] {
            Value::Null => json!({}),
            other => other.clone(),
        };
        debug!(tool = name, "tool call");

        let result = match name {
            QUERY_DOCS => self.do_query_docs(arguments),
            GET_LATEST_VERSION => self.do_get_latest_version(),
            LIST_AVAILABLE_VERSIONS => self.do_list_versions(),
            LIST_AVAILABLE_LANGUAGES => self.do_list_languages(arguments),
            EMBED_QUERY => self.do_embed_query(arguments),
            _ => Err(format!("Unknown tool: {}", name)),
        };

        let result = match result {
            Ok(text) => ToolResult::text(text),
            Err(e) => ToolResult::error(&e),
        };
        Ok(result.into_value())
    }

    fn do_query_docs(&self, args: Value) -> Result<String, String> {
        let args: QueryDocsArgs =
            serde_json::from_value(args).map_err(|e| format!("Invalid params: {}", e))?;

        if args.question.trim().is_empty() {
            return Err("'question' parameter is required".to_string());
        }
        if args.version.trim().is_empty() {
            return Err("'version' parameter is required".to_string());
        }
        if args.language.trim().is_empty() {
            return Err(format!(
                "'language' parameter is required. Supported languages: {}",
                self.engine.supported_languages().join(", ")
            ));
        }

        let response = self
            .engine
            .query(&args.question, &args.version, &args.language, args.top_k)
            .map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
    }

    fn do_get_latest_version(&self) -> Result<String, String> {
        self.engine
            .latest_version()
            .map_err(|e| format!("Error getting latest version: {}", e))
    }

    fn do_list_versions(&self) -> Result<String, String> {
        let versions = self
            .engine
            .available_versions()
            .map_err(|e| format!("Error listing versions: {}", e))?;

        if versions.is_empty() {
            return Ok("No versions found in database.".to_string());
        }
        Ok(format!("Available versions: {}", versions.join(", ")))
    }

    fn do_list_languages(&self, args: Value) -> Result<String, String> {
        let args: ListLanguagesArgs =
            serde_json::from_value(args).map_err(|e| format!("Invalid params: {}", e))?;
        let version = args.version.as_deref().filter(|v| !v.trim().is_empty());

        let languages = self
            .engine
            .available_languages(version)
            .map_err(|e| format!("Error listing languages: {}", e))?;

        let scope = version
            .map(|v| format!(" for version {}", v))
            .unwrap_or_default();
        if languages.is_empty() {
            return Ok(format!("No languages found{}", scope));
        }
        Ok(format!("Available languages{}: {}", scope, languages.join(", ")))
    }

    fn do_embed_query(&self, args: Value) -> Result<String, String> {
        let args: EmbedQueryArgs =
            serde_json::from_value(args).map_err(|e| format!("Invalid params: {}", e))?;
        if args.query.trim().is_empty() {
            return Err("'query' parameter is required".to_string());
        }

        let response = self
            .engine
            .embed_query(&args.query)
            .map_err(|e| format!("Failed to generate embedding: {}", e))?;
        serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
    }

    /// Read newline-delimited requests until EOF, answering each on `writer`
    pub fn serve<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> anyhow::Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            debug!("MCP: Received: {}", preview(&line));

            let response = match JsonRpcRequest::parse(&line) {
                Ok(request) => self.handle_request(&request),
                Err(parse_error) => Some(parse_error),
            };

            if let Some(response) = response {
                let json = serde_json::to_string(&response)?;
                debug!("MCP: Sending: {}", preview(&json));
                writeln!(writer, "{}", json)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

/// First 100 characters of a protocol line, cut on a char boundary
fn preview(line: &str) -> &str {
    line.char_indices()
        .nth(100)
        .map_or(line, |(end, _)| &line[..end])
}

/// Serve MCP over stdin/stdout until the client disconnects
pub fn run_mcp_server(engine: QueryEngine) -> anyhow::Result<()> {
    info!("ragdocs MCP server starting...");

    let mut server = DocsMcpServer::new(engine);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    server.serve(stdin.lock(), stdout.lock())?;

    info!("ragdocs MCP server stopping.");
    Ok(())
}
