//! Filesystem-backed stage cache.
//!
//! Every pipeline stage persists its artifact under
//! `<cache_dir>/<stage>/<fingerprint>`. Presence means the stage is already
//! computed; absence triggers recomputation. The cache is content-oblivious:
//! payloads are opaque strings (HTML for `raw`, JSON for structured stages),
//! each stage owns its own shape.
//!
//! `get_or_compute` writes before returning, so a crash mid-compute leaves
//! the stage incomplete and safe to retry. A failing compute propagates its
//! error and caches nothing.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Canonical stage names.
pub const STAGE_RAW: &str = "raw";
pub const STAGE_EXTRACT: &str = "extract";
pub const STAGE_SUMMARY: &str = "summary";

#[derive(Debug, Clone)]
pub struct StageCache {
    root: PathBuf,
}

impl StageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artifact_path(&self, stage: &str, fingerprint: &str) -> PathBuf {
        self.root.join(stage).join(fingerprint)
    }

    pub fn has(&self, stage: &str, fingerprint: &str) -> bool {
        self.artifact_path(stage, fingerprint).is_file()
    }

    pub fn get(&self, stage: &str, fingerprint: &str) -> Result<Option<String>, PipelineError> {
        let path = self.artifact_path(stage, fingerprint);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    /// Persists an artifact, overwriting any previous value. Overwrite is
    /// the explicit-invalidation path: fresh raw input supplied on
    /// reprocess supersedes a cached raw page.
    pub fn put(&self, stage: &str, fingerprint: &str, payload: &str) -> Result<(), PipelineError> {
        let path = self.artifact_path(stage, fingerprint);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, payload)?;
        Ok(())
    }

    pub fn invalidate(&self, stage: &str, fingerprint: &str) -> Result<(), PipelineError> {
        let path = self.artifact_path(stage, fingerprint);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read-through compute-once. Returns the cached artifact if present;
    /// otherwise runs `compute`, persists the result, and returns it.
    pub async fn get_or_compute<F, Fut>(
        &self,
        stage: &str,
        fingerprint: &str,
        compute: F,
    ) -> Result<String, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, PipelineError>>,
    {
        if let Some(cached) = self.get(stage, fingerprint)? {
            tracing::debug!(stage, fingerprint, "stage cache hit");
            return Ok(cached);
        }

        let payload = compute().await?;
        self.put(stage, fingerprint, &payload)?;
        Ok(payload)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[tokio::test]
    async fn computes_once_then_reads_through() {
        let tmp = TempDir::new().unwrap();
        let cache = StageCache::new(tmp.path());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let payload = cache
                .get_or_compute(STAGE_RAW, "fp1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("<html></html>".to_string())
                })
                .await
                .unwrap();
            assert_eq!(payload, "<html></html>");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let tmp = TempDir::new().unwrap();
        let cache = StageCache::new(tmp.path());

        let err = cache
            .get_or_compute(STAGE_RAW, "fp1", || async {
                Err(PipelineError::Summarization("boom".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "summarization");
        assert!(!cache.has(STAGE_RAW, "fp1"));

        // Next call retries from scratch and can succeed.
        let payload = cache
            .get_or_compute(STAGE_RAW, "fp1", || async { Ok("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(payload, "ok");
        assert!(cache.has(STAGE_RAW, "fp1"));
    }

    #[test]
    fn stages_are_isolated_per_fingerprint() {
        let tmp = TempDir::new().unwrap();
        let cache = StageCache::new(tmp.path());

        cache.put(STAGE_RAW, "a", "raw-a").unwrap();
        cache.put(STAGE_EXTRACT, "a", "extract-a").unwrap();

        assert_eq!(cache.get(STAGE_RAW, "a").unwrap().unwrap(), "raw-a");
        assert_eq!(
            cache.get(STAGE_EXTRACT, "a").unwrap().unwrap(),
            "extract-a"
        );
        assert!(cache.get(STAGE_RAW, "b").unwrap().is_none());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let cache = StageCache::new(tmp.path());

        cache.put(STAGE_SUMMARY, "a", "{}").unwrap();
        cache.invalidate(STAGE_SUMMARY, "a").unwrap();
        cache.invalidate(STAGE_SUMMARY, "a").unwrap();
        assert!(!cache.has(STAGE_SUMMARY, "a"));
    }
}
