//! Remote API types
//!
//! DTOs for the artifact server.

use serde::{Deserialize, Serialize};

/// Latest database version advertised by the server
/// (`GET <base>/database/version`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVersion {
    pub version: String,
    #[serde(default)]
    pub size_mb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
}

impl RemoteVersion {
    pub fn new(version: &str, size_mb: f64) -> Self {
        Self {
            version: version.to_string(),
            size_mb,
            changelog: None,
        }
    }

    /// Changelog text, treating an empty string as absent
    pub fn changelog(&self) -> Option<&str> {
        self.changelog
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_descriptor() {
        let v: RemoteVersion = serde_json::from_str(
            r#"{"version": "2025.2", "size_mb": 48.5, "changelog": "New command docs"}"#,
        )
        .unwrap();
        assert_eq!(v.version, "2025.2");
        assert_eq!(v.size_mb, 48.5);
        assert_eq!(v.changelog(), Some("New command docs"));
    }

    #[test]
    fn test_optional_fields() {
        let v: RemoteVersion = serde_json::from_str(r#"{"version": "2025.1", "changelog": ""}"#).unwrap();
        assert_eq!(v.size_mb, 0.0);
        assert_eq!(v.changelog(), None);
    }

    #[test]
    fn test_missing_version_is_rejected() {
        assert!(serde_json::from_str::<RemoteVersion>(r#"{"size_mb": 10}"#).is_err());
    }
}
