//! Fixtures shared by core tests

use std::cell::RefCell;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::write::GzEncoder;
use flate2::Compression;

use super::source::{ArchiveDownloader, VersionResolver};
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteVersion;

/// Archive entry: a directory, or a file with contents
pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

/// Build an in-memory `.tar.gz`
pub fn tar_gz(entries: &[Entry<'_>]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry {
            Entry::Dir(path) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder
                    .append_data(&mut header, path, std::io::empty())
                    .unwrap();
            }
            Entry::File(path, data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o444);
                header.set_size(data.len() as u64);
                builder.append_data(&mut header, path, *data).unwrap();
            }
        }
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// A typical database bundle: `vector_db/` with the critical file inside
pub fn database_archive(marker: &str) -> Vec<u8> {
    tar_gz(&[
        Entry::Dir("vector_db"),
        Entry::File("vector_db/index.sqlite3", marker.as_bytes()),
        Entry::Dir("vector_db/segments"),
        Entry::File("vector_db/segments/data.bin", b"vectors"),
    ])
}

/// Downloader serving fixed bytes, optionally failing after a prefix
pub struct FakeDownloader {
    pub bytes: Vec<u8>,
    pub fail_after: Option<usize>,
    pub calls: AtomicUsize,
}

impl FakeDownloader {
    pub fn serving(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_after(bytes: Vec<u8>, offset: usize) -> Self {
        Self {
            bytes,
            fail_after: Some(offset),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArchiveDownloader for FakeDownloader {
    fn download(&self, sink: &mut dyn Write) -> SyncResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_after {
            Some(offset) => {
                let offset = offset.min(self.bytes.len());
                sink.write_all(&self.bytes[..offset])?;
                Err(SyncError::RemoteUnavailable(
                    "connection reset by peer".to_string(),
                ))
            }
            None => {
                sink.write_all(&self.bytes)?;
                Ok(self.bytes.len() as u64)
            }
        }
    }

    fn origin(&self) -> &str {
        "memory://archive"
    }
}

/// Resolver returning a fixed answer; the version can be swapped mid-test
pub struct FakeResolver {
    pub version: RefCell<Option<RemoteVersion>>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn reporting(version: &str, size_mb: f64) -> Self {
        Self {
            version: RefCell::new(Some(RemoteVersion::new(version, size_mb))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            version: RefCell::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VersionResolver for FakeResolver {
    fn latest_version(&self) -> Option<RemoteVersion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.version.borrow().clone()
    }
}

/// Names of all entries directly inside `dir`
pub fn dir_listing(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Serve exactly one canned HTTP response on an ephemeral port. The request
/// (headers and any `Content-Length` body) is drained first and handed back
/// through the returned receiver.
pub fn serve_once(response: Vec<u8>) -> (String, std::sync::mpsc::Receiver<String>) {
    use std::io::Read;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut buf = [0u8; 4096];
        let mut seen = Vec::new();
        let header_end = loop {
            if let Some(pos) = seen.windows(4).position(|w| w == b"\r\n\r\n") {
                break Some(pos + 4);
            }
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break None,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        };

        if let Some(header_end) = header_end {
            let headers = String::from_utf8_lossy(&seen[..header_end]).to_ascii_lowercase();
            let body_len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while seen.len() < header_end + body_len {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => seen.extend_from_slice(&buf[..n]),
                }
            }
        }

        let _ = tx.send(String::from_utf8_lossy(&seen).into_owned());
        let _ = stream.write_all(&response);
        let _ = stream.flush();
    });

    (format!("http://{}", addr), rx)
}

/// Minimal HTTP/1.1 response with a body
pub fn http_response(status: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}
