//! Core data models for the bookmark pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a bookmark. Stored as an integer; `Failed → New`
/// only via explicit reprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkStatus {
    New,
    Failed,
    Completed,
}

impl BookmarkStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            BookmarkStatus::New => 0,
            BookmarkStatus::Failed => 1,
            BookmarkStatus::Completed => 2,
        }
    }

    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => BookmarkStatus::Failed,
            2 => BookmarkStatus::Completed,
            _ => BookmarkStatus::New,
        }
    }
}

/// Persistent record tracking one URL's processing lifecycle.
/// One row per fingerprint — the idempotency key.
#[derive(Debug, Clone)]
pub struct Bookmark {
    pub fingerprint: String,
    pub url: String,
    pub title: String,
    pub status: BookmarkStatus,
    pub created_at: i64,
}

/// Append-only failure record; at most one per fingerprint, first-observed
/// wins.
#[derive(Debug, Clone)]
pub struct ProcessingError {
    pub fingerprint: String,
    pub url: String,
    pub title: String,
    /// Stable error kind (e.g. `fetch_not_found`).
    pub kind: String,
    /// Display rendering of the failure.
    pub exception: String,
    /// Debug rendering of the full error chain.
    pub detail: String,
    pub created_at: i64,
}

/// Persisted rendered note.
#[derive(Debug, Clone)]
pub struct Note {
    pub fingerprint: String,
    pub url: String,
    pub markdown: String,
    pub filename: String,
    pub folder: String,
    pub created_at: i64,
}

/// Readability output for one page. Cached as the `extract` stage artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub title: String,
    pub plain_text: String,
    /// Simplified HTML of the main content region.
    pub content_html: String,
}

/// Structured-completion output. Cached as the `summary` stage artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Topic-folder classification, e.g. `Research/Technology`.
    #[serde(default)]
    pub folder: String,
}

/// Transient capture-file payload consumed by the watcher and the HTTP
/// front door. Not persisted beyond the pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionRecord {
    pub url: String,
    #[serde(default)]
    pub html_content: Option<String>,
    /// Base64-encoded PNG, optionally with a `data:image/png;base64,` prefix.
    #[serde(default)]
    pub screenshot: Option<String>,
}

pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

pub fn now_datetime() -> DateTime<Utc> {
    Utc::now()
}
