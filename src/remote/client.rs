//! Blocking HTTP clients for the artifact server
//!
//! The version check uses a short timeout because it runs on every startup;
//! the archive download uses a long one.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};
use url::Url;

use super::types::RemoteVersion;
use crate::core::source::{ArchiveDownloader, VersionResolver};
use crate::error::{SyncError, SyncResult};

const DOWNLOAD_SUFFIX: &str = "/database/download";
const VERSION_SUFFIX: &str = "/database/version";

/// Derive the version endpoint from a base URL or a download URL
///
/// `https://host/database/download` and `https://host/` both map to
/// `https://host/database/version`. Returns `None` for anything that is not
/// an http(s) URL.
pub fn version_url_for(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let base = trimmed.strip_suffix(DOWNLOAD_SUFFIX).unwrap_or(trimmed);
    let candidate = format!("{}{}", base, VERSION_SUFFIX);

    let parsed = Url::parse(&candidate).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(candidate)
}

fn build_client(timeout: Duration) -> SyncResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SyncError::RemoteUnavailable(format!("failed to create HTTP client: {}", e)))
}

/// Client for the version endpoint
#[derive(Debug, Clone)]
pub struct VersionClient {
    client: Client,
    url: String,
}

impl VersionClient {
    pub fn new(url: &str, timeout: Duration) -> SyncResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl VersionResolver for VersionClient {
    fn latest_version(&self) -> Option<RemoteVersion> {
        debug!(url = %self.url, "checking remote database version");

        let response = match self.client.get(&self.url).send() {
            Ok(response) => response,
            Err(e) => {
                warn!("Could not check remote database version: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Could not check remote database version: server returned {}",
                response.status()
            );
            return None;
        }

        match response.json::<RemoteVersion>() {
            Ok(version) => Some(version),
            Err(e) => {
                warn!("Error parsing remote version info: {}", e);
                None
            }
        }
    }
}

/// Client for the archive download endpoint. No authentication.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Client,
    url: String,
}

impl ArchiveClient {
    pub fn new(url: &str, timeout: Duration) -> SyncResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.to_string(),
        })
    }
}

impl ArchiveDownloader for ArchiveClient {
    fn download(&self, sink: &mut dyn Write) -> SyncResult<u64> {
        let mut response = self
            .client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                SyncError::RemoteUnavailable(format!("failed to download {}: {}", self.url, e))
            })?;

        let expected = response.content_length();
        let written = copy_body(&self.url, &mut response, sink)?;

        if let Some(expected) = expected {
            if written != expected {
                return Err(SyncError::RemoteUnavailable(format!(
                    "download from {} truncated: got {} of {} bytes",
                    self.url, written, expected
                )));
            }
        }

        debug!(bytes = written, "archive downloaded");
        Ok(written)
    }

    fn origin(&self) -> &str {
        &self.url
    }
}

/// Stream `body` into `sink`. Read failures are network trouble; write
/// failures are local disk trouble and surface as `SyncError::Io`.
fn copy_body(url: &str, body: &mut dyn Read, sink: &mut dyn Write) -> SyncResult<u64> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => return Ok(written),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(SyncError::RemoteUnavailable(format!(
                    "download from {} interrupted: {}",
                    url, e
                )))
            }
        };
        sink.write_all(&buf[..n])?;
        written += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{http_response, serve_once};
    use std::net::TcpListener;

    fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/database/version", addr)
    }

    #[test]
    fn test_version_url_from_download_url() {
        assert_eq!(
            version_url_for("http://97.0.0.1:3000/database/download").as_deref(),
            Some("http://97.0.0.1:3000/database/version")
        );
        assert_eq!(
            version_url_for("https://docs.example.com/database/download/").as_deref(),
            Some("https://docs.example.com/database/version")
        );
    }

    #[test]
    fn test_version_url_from_base_url() {
        assert_eq!(
            version_url_for("https://docs.example.com/").as_deref(),
            Some("https://docs.example.com/database/version")
        );
    }

    #[test]
    fn test_version_url_rejects_garbage() {
        assert!(version_url_for("").is_none());
        assert!(version_url_for("not a url").is_none());
        assert!(version_url_for("ftp://host/database/download").is_none());
    }

    #[test]
    fn test_latest_version_parses_descriptor() {
        let (base, _) = serve_once(http_response(
            "200 OK",
            br#"{"version": "2025.1", "size_mb": 50, "changelog": "initial"}"#,
        ));
        let client =
            VersionClient::new(&format!("{}/database/version", base), Duration::from_secs(5)).unwrap();

        let version = client.latest_version().unwrap();
        assert_eq!(version.version, "2025.1");
        assert_eq!(version.size_mb, 50.0);
    }

    #[test]
    fn test_latest_version_unreachable_is_none() {
        let client = VersionClient::new(&closed_port_url(), Duration::from_secs(2)).unwrap();
        assert!(client.latest_version().is_none());
    }

    #[test]
    fn test_latest_version_malformed_is_none() {
        let (base, _) = serve_once(http_response("200 OK", b"<html>oops</html>"));
        let client = VersionClient::new(&base, Duration::from_secs(5)).unwrap();
        assert!(client.latest_version().is_none());
    }

    #[test]
    fn test_latest_version_server_error_is_none() {
        let (base, _) = serve_once(http_response("503 Service Unavailable", b"{}"));
        let client = VersionClient::new(&base, Duration::from_secs(5)).unwrap();
        assert!(client.latest_version().is_none());
    }

    #[test]
    fn test_download_writes_body() {
        let (base, _) = serve_once(http_response("200 OK", b"archive-bytes"));
        let client = ArchiveClient::new(&base, Duration::from_secs(5)).unwrap();

        let mut sink = Vec::new();
        let written = client.download(&mut sink).unwrap();
        assert_eq!(written, 13);
        assert_eq!(sink, b"archive-bytes");
    }

    #[test]
    fn test_download_http_error() {
        let (base, _) = serve_once(http_response("404 Not Found", b"missing"));
        let client = ArchiveClient::new(&base, Duration::from_secs(5)).unwrap();

        let err = client.download(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable(_)));
    }

    #[test]
    fn test_download_truncated_body() {
        let mut response =
            b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(b"only a few bytes");
        let (base, _) = serve_once(response);
        let client = ArchiveClient::new(&base, Duration::from_secs(5)).unwrap();

        let err = client.download(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable(_)));
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct DroppedConnection;

    impl Read for DroppedConnection {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::ConnectionReset, "connection reset"))
        }
    }

    #[test]
    fn test_local_write_failure_is_io_error() {
        let err = copy_body("http://host/a", &mut &b"archive"[..], &mut FullDisk).unwrap_err();
        assert!(matches!(err, SyncError::Io(_)), "got {err:?}");
    }

    #[test]
    fn test_read_failure_is_remote_unavailable() {
        let err = copy_body("http://host/a", &mut DroppedConnection, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable(_)), "got {err:?}");
    }

    #[test]
    fn test_download_into_full_disk_is_io_error() {
        let (base, _) = serve_once(http_response("200 OK", b"archive-bytes"));
        let client = ArchiveClient::new(&base, Duration::from_secs(5)).unwrap();

        let err = client.download(&mut FullDisk).unwrap_err();
        assert!(matches!(err, SyncError::Io(_)), "got {err:?}");
    }
}
