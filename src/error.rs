//! Error taxonomy for the bookmark pipeline.
//!
//! Every stage failure maps to a distinct, stable variant so callers (and
//! the error ledger) can tell a 403 from a 404 from an empty extraction.
//! Stage errors are never swallowed: the orchestrator records them once and
//! re-raises.

use thiserror::Error;

/// Typed failure from the fetch stage. Non-200 responses are classified,
/// never silently retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("access forbidden (403): {url}")]
    Forbidden { url: String },

    #[error("url missing (404): {url}")]
    NotFound { url: String },

    #[error("server error ({status}): {url}")]
    ServerError { status: u16, url: String },

    #[error("unexpected status {status}: {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Top-level pipeline error. One of these per failed bookmark run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Readability produced no usable plain text.
    #[error("extraction produced no usable text for {url}")]
    EmptyExtraction { url: String },

    #[error("processor '{name}' failed: {message}")]
    Processor { name: String, message: String },

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Short machine-readable kind, recorded in the error ledger and used
    /// by the HTTP layer. Stable across runs for the same failure.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Fetch(FetchError::Forbidden { .. }) => "fetch_forbidden",
            PipelineError::Fetch(FetchError::NotFound { .. }) => "fetch_not_found",
            PipelineError::Fetch(FetchError::ServerError { .. }) => "fetch_server_error",
            PipelineError::Fetch(FetchError::UnexpectedStatus { .. }) => "fetch_unexpected_status",
            PipelineError::Fetch(FetchError::Transport { .. }) => "fetch_transport",
            PipelineError::EmptyExtraction { .. } => "extraction_empty",
            PipelineError::Processor { .. } => "processor",
            PipelineError::Summarization(_) => "summarization",
            PipelineError::Render(_) => "render",
            PipelineError::Storage(_) => "storage",
            PipelineError::Database(_) => "database",
            PipelineError::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_failures_have_distinct_kinds() {
        let forbidden: PipelineError = FetchError::Forbidden {
            url: "https://example.com".into(),
        }
        .into();
        let missing: PipelineError = FetchError::NotFound {
            url: "https://example.com".into(),
        }
        .into();
        let server: PipelineError = FetchError::ServerError {
            status: 500,
            url: "https://example.com".into(),
        }
        .into();

        let kinds = [forbidden.kind(), missing.kind(), server.kind()];
        assert_eq!(kinds[0], "fetch_forbidden");
        assert_eq!(kinds[1], "fetch_not_found");
        assert_eq!(kinds[2], "fetch_server_error");
    }
}
