//! JSON-RPC 2.0 framing for the MCP stdio transport
//!
//! Incoming lines decode into a [`JsonRpcRequest`], which [`JsonRpcRequest::message`]
//! splits into calls (carry an id, expect a response) and notifications.
//! Tool results use the MCP `content` shape built by [`ToolResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard JSON-RPC error codes used by this server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
        }
    }
}

/// A request line as read from the client
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// What the client is asking for
#[derive(Debug)]
pub enum Message<'a> {
    /// Expects exactly one response with the same id
    Call {
        id: Value,
        method: &'a str,
        params: &'a Value,
    },
    /// Fire-and-forget; never answered
    Notification { method: &'a str },
}

impl JsonRpcRequest {
    /// Decode one line, or produce the parse-error response to send back
    pub fn parse(line: &str) -> Result<Self, JsonRpcResponse> {
        serde_json::from_str(line).map_err(|e| {
            JsonRpcResponse::error(Value::Null, ErrorCode::ParseError, format!("Parse error: {}", e))
        })
    }

    pub fn message(&self) -> Message<'_> {
        match &self.id {
            Some(id) => Message::Call {
                id: id.clone(),
                method: &self.method,
                params: &self.params,
            },
            None => Message::Notification {
                method: &self.method,
            },
        }
    }

    pub fn is_v2(&self) -> bool {
        self.jsonrpc == "2.0"
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: ErrorCode, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code: code.code(),
                message,
            }),
        }
    }
}

/// Result of a `tools/call`. Tool failures are reported in-band with
/// `isError` so the session keeps going.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    content: Vec<TextContent>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl ToolResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error: false,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: format!("Error: {}", message),
            }],
            is_error: true,
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_kinds() {
        let call = JsonRpcRequest::parse(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#).unwrap();
        assert!(matches!(call.message(), Message::Call { method: "ping", .. }));

        let note =
            JsonRpcRequest::parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(matches!(
            note.message(),
            Message::Notification { method: "notifications/initialized" }
        ));
    }

    #[test]
    fn test_parse_failure_becomes_response() {
        let response = JsonRpcRequest::parse("{not json").unwrap_err();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_tool_result_shapes() {
        assert_eq!(
            ToolResult::text("ok".to_string()).into_value(),
            json!({"content": [{"type": "text", "text": "ok"}]})
        );
        assert_eq!(
            ToolResult::error("boom").into_value(),
            json!({"content": [{"type": "text", "text": "Error: boom"}], "isError": true})
        );
    }
}
