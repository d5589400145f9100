//! Best-effort debug artifacts for completions.
//!
//! Raw completion text is appended to `llm_debug_log.txt` and each decoded
//! reply is saved as its own `llm_response_<timestamp>.json` snapshot.
//! Write failures are logged and swallowed; they never fail a request.

use chrono::Local;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub const DEBUG_LOG_FILE: &str = "llm_debug_log.txt";

/// Attempts at finding an unused snapshot name before giving up
const SNAPSHOT_NAME_ATTEMPTS: usize = 4;

/// Destination for debug artifacts; a sink without a directory does nothing.
#[derive(Debug, Clone, Default)]
pub struct DebugSink {
    dir: Option<PathBuf>,
}

impl DebugSink {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Append one raw completion to the debug log.
    pub async fn record_raw(&self, raw: &str) {
        let Some(dir) = &self.dir else { return };
        if let Err(e) = append_entry(dir, raw).await {
            warn!(dir = %dir.display(), error = %e, "Failed to append to debug log");
        }
    }

    /// Save a decoded completion under a fresh timestamped name.
    pub async fn snapshot(&self, value: &Value) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        match write_snapshot(dir, value).await {
            Ok(path) => {
                debug!(path = %path.display(), "Saved completion snapshot");
                Some(path)
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to save completion snapshot");
                None
            }
        }
    }
}

async fn append_entry(dir: &Path, raw: &str) -> io::Result<()> {
    fs::create_dir_all(dir).await?;
    let entry = format!(
        "=== {} ===\n{}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        raw
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(DEBUG_LOG_FILE))
        .await?;
    // One write per entry so concurrent requests never interleave mid-entry
    file.write_all(entry.as_bytes()).await?;
    file.flush().await
}

fn snapshot_name() -> String {
    format!(
        "llm_response_{}_{:04x}.json",
        Local::now().format("%Y%m%d_%H%M%S_%3f"),
        rand::random::<u16>()
    )
}

async fn write_snapshot(dir: &Path, value: &Value) -> io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let body = serde_json::to_vec_pretty(value)?;

    for _ in 0..SNAPSHOT_NAME_ATTEMPTS {
        let path = dir.join(snapshot_name());
        let opened = OpenOptions::new().write(true).create_new(true).open(&path).await;
        match opened {
            Ok(mut file) => {
                file.write_all(&body).await?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no unused snapshot name available",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_raw_entries_are_appended() {
        let tmp = TempDir::new().unwrap();
        let sink = DebugSink::new(Some(tmp.path().to_path_buf()));

        sink.record_raw("first completion").await;
        sink.record_raw("second completion").await;

        let log = std::fs::read_to_string(tmp.path().join(DEBUG_LOG_FILE)).unwrap();
        let first = log.find("first completion").unwrap();
        let second = log.find("second completion").unwrap();
        assert!(first < second);
        assert_eq!(log.matches("=== ").count(), 2);
    }

    #[tokio::test]
    async fn test_snapshots_get_distinct_names() {
        let tmp = TempDir::new().unwrap();
        let sink = DebugSink::new(Some(tmp.path().join("debug")));
        let value = json!({"citation": {"title": "T"}});

        let a = sink.snapshot(&value).await.unwrap();
        let b = sink.snapshot(&value).await.unwrap();
        assert_ne!(a, b);

        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("llm_response_"));
        assert!(name.ends_with(".json"));

        let saved: Value = serde_json::from_slice(&std::fs::read(&a).unwrap()).unwrap();
        assert_eq!(saved, value);
    }

    #[tokio::test]
    async fn test_disabled_sink_writes_nothing() {
        let sink = DebugSink::default();
        assert!(!sink.is_enabled());
        sink.record_raw("ignored").await;
        assert!(sink.snapshot(&json!({})).await.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let sink = DebugSink::new(Some(blocker));
        sink.record_raw("raw").await;
        assert!(sink.snapshot(&json!({})).await.is_none());
    }
}
