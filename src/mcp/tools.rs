//! MCP tool arguments and definitions

use serde::Deserialize;
use serde_json::{json, Value};

pub const QUERY_DOCS: &str = "query_docs";
pub const GET_LATEST_VERSION: &str = "get_latest_version";
pub const LIST_AVAILABLE_VERSIONS: &str = "list_available_versions";
pub const LIST_AVAILABLE_LANGUAGES: &str = "list_available_languages";
pub const EMBED_QUERY: &str = "embed_query";

/// Retrieve documentation chunks for one version and language
#[derive(Debug, Deserialize)]
pub struct QueryDocsArgs {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub language: String,
    /// Number of chunks (default from config)
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLanguagesArgs {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbedQueryArgs {
    #[serde(default)]
    pub query: String,
}

/// `tools/list` payload
///
/// `versions` feeds the enum of the `version` parameter; it is omitted when
/// the database reports none.
pub fn tool_definitions(versions: &[String], default_version: &str, languages: &[String]) -> Value {
    let shown: Vec<&str> = versions.iter().take(5).map(String::as_str).collect();
    let mut version_property = json!({
        "type": "string",
        "description": format!(
            "Documentation version (e.g. '2025'). Available versions: {}",
            if shown.is_empty() { "None".to_string() } else { shown.join(", ") }
        ),
    });
    if !versions.is_empty() {
        version_property["enum"] = json!(versions);
    }

    json!({
        "tools": [
            {
                "name": QUERY_DOCS,
                "description": format!(
                    "Retrieve relevant documentation chunks for the specified version and language. \
                     Returns chunks with citation metadata that you can use to answer questions. \
                     This tool performs retrieval only - you generate the answer from the retrieved chunks. \
                     If unsure, use version '{}'.",
                    default_version
                ),
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string", "description": "The user's question" },
                        "version": version_property,
                        "language": {
                            "type": "string",
                            "description": "Programming language or documentation type",
                            "enum": languages
                        },
                        "top_k": { "type": "integer", "description": "Number of chunks to return", "minimum": 1 }
                    },
                    "required": ["question", "version", "language"]
                }
            },
            {
                "name": GET_LATEST_VERSION,
                "description": format!(
                    "Return the latest documentation version (defaults to '{}' if the database is empty)",
                    default_version
                ),
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": LIST_AVAILABLE_VERSIONS,
                "description": "List all documentation versions in the database",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": LIST_AVAILABLE_LANGUAGES,
                "description": "List available languages for a specific version (or all languages)",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "version": {
                            "type": "string",
                            "description": "Version (optional). If not provided, returns all languages."
                        }
                    }
                }
            },
            {
                "name": EMBED_QUERY,
                "description": "Generate the embedding vector for a query. Useful for caching embeddings or client-side similarity search.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "The text to embed" }
                    },
                    "required": ["query"]
                }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_definitions_list_five_tools() {
        let defs = tool_definitions(&strings(&["2025"]), "2025", &strings(&["Java"]));
        let names: Vec<&str> = defs["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                QUERY_DOCS,
                GET_LATEST_VERSION,
                LIST_AVAILABLE_VERSIONS,
                LIST_AVAILABLE_LANGUAGES,
                EMBED_QUERY
            ]
        );
    }

    #[test]
    fn test_version_enum_only_when_known() {
        let defs = tool_definitions(&[], "2025", &strings(&["Java"]));
        let version = &defs["tools"][0]["inputSchema"]["properties"]["version"];
        assert!(version.get("enum").is_none());
        assert!(version["description"].as_str().unwrap().ends_with("None"));

        let defs = tool_definitions(&strings(&["2025", "2024"]), "2025", &strings(&["Java"]));
        let version = &defs["tools"][0]["inputSchema"]["properties"]["version"];
        assert_eq!(version["enum"], json!(["2025", "2024"]));
    }

    #[test]
    fn test_query_args_defaults() {
        let args: QueryDocsArgs =
            serde_json::from_value(json!({"question": "q", "version": "2025"})).unwrap();
        assert_eq!(args.language, "");
        assert!(args.top_k.is_none());
    }
}
