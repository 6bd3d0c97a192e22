use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use common::RunEntry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Every post reformulated during a run, keyed by site id, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunBuffer {
    sites: BTreeMap<String, Vec<RunEntry>>,
}

impl RunBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, site_id: &str, entry: RunEntry) {
        self.sites.entry(site_id.to_string()).or_default().push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Number of entries across all sites
    pub fn len(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }

    pub fn entries(&self, site_id: &str) -> &[RunEntry] {
        self.sites.get(site_id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// File name for a run completed at the given instant, e.g. `log-2024-06-05T10:00:00.000Z.json`
pub fn log_file_name(completed_at: DateTime<Utc>) -> String {
    format!("log-{}.json", completed_at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Serializes the buffer as indented JSON into a new timestamped file under `dir`.
/// Nothing is written for an empty buffer. An existing file is never overwritten.
pub async fn write_log_file(buffer: &RunBuffer, dir: &Path) -> Result<Option<PathBuf>> {
    write_log_file_at(buffer, dir, Utc::now()).await
}

/// Same as [`write_log_file`] with an explicit completion time.
///
/// The JSON goes to a hidden temp file in `dir` first and is hard-linked under its final
/// name once fully written, so a crash never leaves a truncated log behind.
pub async fn write_log_file_at(
    buffer: &RunBuffer,
    dir: &Path,
    completed_at: DateTime<Utc>,
) -> Result<Option<PathBuf>> {
    if buffer.is_empty() {
        return Ok(None);
    }

    info!(dir = %dir.display(), entries = buffer.len(), "writing the new log file");
    let json = serde_json::to_string_pretty(buffer).context("failed to serialize run buffer")?;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let name = log_file_name(completed_at);
    let path = dir.join(&name);
    let tmp_path = dir.join(format!(".{}.tmp", name));

    let written = write_fully(&tmp_path, json.as_bytes()).await;
    let linked = match written {
        Ok(()) => tokio::fs::hard_link(&tmp_path, &path)
            .await
            .with_context(|| format!("failed to create log file: {}", path.display())),
        Err(e) => Err(e),
    };
    if let Err(e) = tokio::fs::remove_file(&tmp_path).await {
        warn!(path = %tmp_path.display(), error = %e, "failed to remove temporary log file");
    }
    linked?;

    info!(path = %path.display(), "new log file written successfully");
    Ok(Some(path))
}

async fn write_fully(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await
        .with_context(|| format!("failed to create temporary log file: {}", path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("failed to write log file: {}", path.display()))?;
    file.sync_all().await.context("failed to flush log file")?;
    Ok(())
}
