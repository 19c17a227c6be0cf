//! Capture-directory watcher.
//!
//! Capture tools drop `bookmark_*.json` files into a directory; the watcher
//! consumes each file through the [`Pipeline`] and deletes it on success.
//! Files present before startup are swept first, so nothing dropped while
//! the watcher was down is missed.
//!
//! A create notification can arrive while the writer is still flushing, so
//! parsing retries a few times with a short delay before a file is declared
//! malformed. Files that fail to parse, and files whose pipeline run fails,
//! are left in place for inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::{Config, WatcherConfig};
use crate::models::IngestionRecord;
use crate::pipeline::Pipeline;

/// Returns true when the file name matches the configured
/// `<prefix>*<suffix>` capture pattern.
pub fn is_capture_file(config: &WatcherConfig, path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(&config.prefix)
        && name.ends_with(&config.suffix)
        && name.len() >= config.prefix.len() + config.suffix.len()
}

/// Reads and parses a capture file, retrying on malformed content.
///
/// Each of the configured attempts re-reads the file from scratch; a short
/// delay between attempts gives a slow writer time to finish. The error
/// from the final attempt is returned if none succeed.
pub async fn read_capture_file(
    config: &WatcherConfig,
    path: &Path,
) -> anyhow::Result<IngestionRecord> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| {
                serde_json::from_str::<IngestionRecord>(&content).map_err(anyhow::Error::from)
            });

        match result {
            Ok(record) => return Ok(record),
            Err(err) if attempt < config.parse_retries => {
                tracing::debug!(
                    path = %path.display(),
                    attempt,
                    error = %err,
                    "capture file not readable yet, retrying"
                );
                tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "failed to parse capture file after {} attempts: {}",
                        config.parse_retries,
                        path.display()
                    )
                });
            }
        }
    }
}

/// Consumes one capture file: parse, process, delete.
///
/// The file is removed only after the pipeline reports success; a failed
/// run leaves it for the next sweep or manual intervention.
pub async fn consume_file(
    pipeline: &Pipeline,
    config: &WatcherConfig,
    path: &Path,
) -> anyhow::Result<()> {
    let record = read_capture_file(config, path).await?;
    tracing::info!(path = %path.display(), url = %record.url, "consuming capture file");

    pipeline
        .process(
            &record.url,
            record.html_content.as_deref(),
            record.screenshot.as_deref(),
        )
        .await
        .with_context(|| format!("processing failed for {}", record.url))?;

    std::fs::remove_file(path)
        .with_context(|| format!("failed to remove consumed capture file: {}", path.display()))?;
    Ok(())
}

/// Processes every matching file already sitting in the directory.
pub async fn sweep_existing(
    pipeline: &Pipeline,
    config: &WatcherConfig,
    dir: &Path,
) -> anyhow::Result<()> {
    let mut pending: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read watch directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_capture_file(config, p))
        .collect();
    pending.sort();

    for path in pending {
        if let Err(err) = consume_file(pipeline, config, &path).await {
            tracing::error!(path = %path.display(), error = %err, "sweep failed for capture file");
        }
    }
    Ok(())
}

/// Watches a directory for capture files until the process is terminated.
///
/// Existing files are swept before the notification loop starts.
pub async fn watch(pipeline: Arc<Pipeline>, config: &Config, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create watch directory: {}", dir.display()))?;

    sweep_existing(&pipeline, &config.watcher, dir).await?;

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Result<Event, notify::Error>>(64);
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        // Dropped events are fine: anything missed is picked up by the
        // next startup sweep.
        let _ = tx.blocking_send(res);
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    println!("Watching {} for capture files", dir.display());

    while let Some(event) = rx.recv().await {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "watch notification error");
                continue;
            }
        };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }
        for path in event.paths {
            if !is_capture_file(&config.watcher, &path) || !path.is_file() {
                continue;
            }
            if let Err(err) = consume_file(&pipeline, &config.watcher, &path).await {
                tracing::error!(
                    path = %path.display(),
                    error = %err,
                    "failed to consume capture file"
                );
            }
        }
    }

    Ok(())
}
