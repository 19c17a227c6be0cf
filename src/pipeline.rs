//! Pipeline orchestration: the per-bookmark state machine.
//!
//! Runs the stage sequence for one URL — fetch → extract → domain
//! processing → summarize → render → persist — with every stage going
//! through the [`StageCache`], so a second run of the same fingerprint
//! costs nothing and a failed run resumes where it left off.
//!
//! Collaborators (fetcher, summarizer, processor routes) are injected,
//! which keeps the orchestrator deterministic under test: stub the network
//! and the completion service, count the calls.
//!
//! Concurrent submissions of the same URL serialize on a per-fingerprint
//! lease held for the whole run, so an uncached stage's external cost
//! (fetch, completion call) is paid at most once; the loser of the race
//! observes a completed bookmark and gets the stored note.
//!
//! Failure policy: the first error aborts the run, is recorded once in the
//! error ledger (first-observed wins), flips the bookmark to `Failed`, and
//! is re-raised to the caller.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::cache::{StageCache, STAGE_EXTRACT, STAGE_RAW, STAGE_SUMMARY};
use crate::config::Config;
use crate::error::PipelineError;
use crate::extract;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::fingerprint::fingerprint;
use crate::models::{
    now_ts, Bookmark, BookmarkStatus, ExtractedPage, Note, NoteSummary, ProcessingError,
};
use crate::processor::{NoteContext, ProcessorRegistry};
use crate::records;
use crate::render;
use crate::summarize::{create_summarizer, normalize_tag, truncate_to_token_budget, Summarizer};
use crate::{db, migrate};

pub struct Pipeline {
    config: Config,
    pool: SqlitePool,
    cache: StageCache,
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Arc<dyn Summarizer>,
    processors: ProcessorRegistry,
    /// Per-fingerprint in-flight leases. Entries live only while a run (or
    /// a waiter) holds the lease.
    leases: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Pipeline {
    /// Opens the record store and wires up the default collaborators.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        migrate::apply_schema(&pool).await?;

        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.fetch)?);
        let summarizer: Arc<dyn Summarizer> = create_summarizer(&config.summarize)?.into();
        let cache = StageCache::new(&config.storage.cache_dir);

        Ok(Self {
            config,
            pool,
            cache,
            fetcher,
            summarizer,
            processors: ProcessorRegistry::defaults(),
            leases: Mutex::new(HashMap::new()),
        })
    }

    /// Constructor with explicit collaborators, used by tests.
    pub fn with_collaborators(
        config: Config,
        pool: SqlitePool,
        fetcher: Arc<dyn PageFetcher>,
        summarizer: Arc<dyn Summarizer>,
        processors: ProcessorRegistry,
    ) -> Self {
        let cache = StageCache::new(&config.storage.cache_dir);
        Self {
            config,
            pool,
            cache,
            fetcher,
            summarizer,
            processors,
            leases: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquires (creating if needed) the in-flight lease for a fingerprint.
    async fn lease(&self, fingerprint: &str) -> Arc<Mutex<()>> {
        let mut leases = self.leases.lock().await;
        Arc::clone(leases.entry(fingerprint.to_string()).or_default())
    }

    /// Drops the lease entry once no other caller holds or awaits it. The
    /// strong count is stable here because cloning requires the map lock.
    async fn release(&self, fingerprint: &str, lease: &Arc<Mutex<()>>) {
        let mut leases = self.leases.lock().await;
        if Arc::strong_count(lease) == 2 {
            leases.remove(fingerprint);
        }
    }

    /// Processes a URL into a rendered markdown note.
    ///
    /// Caller-supplied HTML is authoritative: it is cached as the raw
    /// artifact and the network is never touched. A fingerprint that
    /// already has a completed note returns it as-is (cache-hit no-op); one
    /// that exists but never finished is reprocessed instead of erroring.
    ///
    /// Holds the fingerprint's lease for the whole run: a concurrent
    /// submission of the same URL waits, then resolves as a cache hit.
    pub async fn process(
        &self,
        url: &str,
        raw_html: Option<&str>,
        screenshot: Option<&str>,
    ) -> Result<String, PipelineError> {
        let fp = fingerprint(url);
        let lease = self.lease(&fp).await;
        let guard = lease.lock().await;
        let result = self.process_locked(&fp, url, raw_html, screenshot).await;
        drop(guard);
        self.release(&fp, &lease).await;
        result
    }

    async fn process_locked(
        &self,
        fp: &str,
        url: &str,
        raw_html: Option<&str>,
        screenshot: Option<&str>,
    ) -> Result<String, PipelineError> {
        let created = records::create_bookmark(&self.pool, fp, url).await?;

        if !created {
            let bookmark = records::find_bookmark(&self.pool, fp).await?;
            let completed = bookmark
                .as_ref()
                .map(|b| b.status == BookmarkStatus::Completed)
                .unwrap_or(false);
            if completed {
                if let Some(note) = records::find_note(&self.pool, fp).await? {
                    tracing::info!(url, fingerprint = %fp, "bookmark already completed");
                    return Ok(note.markdown);
                }
            }
            tracing::info!(url, fingerprint = %fp, "bookmark exists but unfinished, reprocessing");
            return self.reprocess_locked(fp, url, raw_html, screenshot).await;
        }

        if let Some(html) = raw_html {
            self.cache.put(STAGE_RAW, fp, html)?;
        }

        let bookmark = records::find_bookmark(&self.pool, fp)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound)?;
        self.run(bookmark, screenshot).await
    }

    /// Re-runs the pipeline for a URL that already has a bookmark record.
    ///
    /// Stages with intact cache entries are not recomputed. Fresh raw input
    /// supersedes the cached raw page and invalidates the downstream
    /// extraction and summary artifacts.
    pub async fn reprocess(
        &self,
        url: &str,
        raw_html: Option<&str>,
        screenshot: Option<&str>,
    ) -> Result<String, PipelineError> {
        let fp = fingerprint(url);
        let lease = self.lease(&fp).await;
        let guard = lease.lock().await;
        let result = self.reprocess_locked(&fp, url, raw_html, screenshot).await;
        drop(guard);
        self.release(&fp, &lease).await;
        result
    }

    async fn reprocess_locked(
        &self,
        fp: &str,
        url: &str,
        raw_html: Option<&str>,
        screenshot: Option<&str>,
    ) -> Result<String, PipelineError> {
        records::create_bookmark(&self.pool, fp, url).await?;
        records::reset_to_new(&self.pool, fp).await?;

        if let Some(html) = raw_html {
            self.cache.put(STAGE_RAW, fp, html)?;
            self.cache.invalidate(STAGE_EXTRACT, fp)?;
            self.cache.invalidate(STAGE_SUMMARY, fp)?;
        }

        let bookmark = records::find_bookmark(&self.pool, fp)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound)?;
        self.run(bookmark, screenshot).await
    }

    /// Runs the stages and settles the terminal status. Exactly one ledger
    /// write on failure, then the error is re-raised.
    async fn run(
        &self,
        bookmark: Bookmark,
        screenshot: Option<&str>,
    ) -> Result<String, PipelineError> {
        match self.run_stages(&bookmark, screenshot).await {
            Ok((markdown, title)) => {
                records::mark_completed(&self.pool, &bookmark.fingerprint, &title).await?;
                tracing::info!(url = %bookmark.url, title = %title, "bookmark completed");
                Ok(markdown)
            }
            Err(err) => {
                tracing::error!(url = %bookmark.url, error = %err, "bookmark processing failed");
                let ledger_entry = ProcessingError {
                    fingerprint: bookmark.fingerprint.clone(),
                    url: bookmark.url.clone(),
                    title: bookmark.title.clone(),
                    kind: err.kind().to_string(),
                    exception: err.to_string(),
                    detail: format!("{:?}", err),
                    created_at: now_ts(),
                };
                if let Err(ledger_err) = records::record_error(&self.pool, &ledger_entry).await {
                    tracing::warn!(error = %ledger_err, "error ledger write failed");
                }
                // The stage error is the one the caller must see; a failing
                // status write is logged, not substituted.
                if let Err(status_err) =
                    records::mark_failed(&self.pool, &bookmark.fingerprint).await
                {
                    tracing::warn!(error = %status_err, "status update failed");
                }
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        bookmark: &Bookmark,
        screenshot: Option<&str>,
    ) -> Result<(String, String), PipelineError> {
        let fp = &bookmark.fingerprint;
        let url = &bookmark.url;

        tracing::debug!(url, stage = "fetch", "entering stage");
        let html = self
            .cache
            .get_or_compute(STAGE_RAW, fp, || async {
                self.fetcher.fetch(url).await.map_err(PipelineError::from)
            })
            .await?;

        tracing::debug!(url, stage = "extract", "entering stage");
        let extract_json = self
            .cache
            .get_or_compute(STAGE_EXTRACT, fp, || async {
                let page = extract::extract_page(url, &html)?;
                Ok(serde_json::to_string(&page)?)
            })
            .await?;
        let page: ExtractedPage = serde_json::from_str(&extract_json)?;

        tracing::debug!(url, stage = "domain", "entering stage");
        let processor = self.processors.dispatch(url);
        let metadata = processor.extract_metadata(&page, &html)?;

        tracing::debug!(url, stage = "summarize", "entering stage");
        // Domain metadata can carry text richer than the page body (a video
        // watch page is mostly player chrome); lead the summarization source
        // with it.
        let source = match metadata.get("description") {
            Some(description) => format!("{}\n\n{}", description, page.plain_text),
            None => page.plain_text.clone(),
        };
        let content = truncate_to_token_budget(&source, self.config.summarize.max_content_tokens);
        let summary_json = self
            .cache
            .get_or_compute(STAGE_SUMMARY, fp, || async {
                let summary = self.summarizer.summarize(content).await?;
                Ok(serde_json::to_string(&summary)?)
            })
            .await?;
        let mut summary: NoteSummary = serde_json::from_str(&summary_json)?;

        summary.tags = processor
            .augment_tags(summary.tags)
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();

        let title = metadata
            .get("title")
            .cloned()
            .filter(|t| !t.is_empty())
            .or_else(|| Some(page.title.clone()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| url.clone());

        tracing::debug!(url, stage = "render", "entering stage");
        let ctx = NoteContext {
            url,
            fingerprint: fp,
            title: &title,
            page: &page,
            metadata: &metadata,
            summary: &summary,
        };
        let markdown = processor.render(&ctx);

        tracing::debug!(url, stage = "persist", "entering stage");
        let folder = render::sanitize_folder(&summary.folder);
        let filename = render::note_filename(&title, fp);
        let note_dir = self.note_dir(&folder);
        std::fs::create_dir_all(&note_dir)?;
        std::fs::write(note_dir.join(&filename), &markdown)?;

        if let Some(shot) = screenshot {
            self.save_screenshot(fp, &folder, shot)?;
        }

        records::upsert_note(
            &self.pool,
            &Note {
                fingerprint: fp.clone(),
                url: url.clone(),
                markdown: markdown.clone(),
                filename,
                folder,
                created_at: now_ts(),
            },
        )
        .await?;

        Ok((markdown, title))
    }

    fn note_dir(&self, folder: &str) -> PathBuf {
        if folder.is_empty() {
            self.config.storage.notes_dir.clone()
        } else {
            self.config.storage.notes_dir.join(folder)
        }
    }

    /// Decodes a captured screenshot and files it next to the note, under
    /// the classification-derived folder.
    fn save_screenshot(
        &self,
        fingerprint: &str,
        folder: &str,
        data: &str,
    ) -> Result<(), PipelineError> {
        let encoded = data
            .strip_prefix("data:image/png;base64,")
            .unwrap_or(data);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| PipelineError::Render(format!("invalid screenshot payload: {}", e)))?;

        let media_dir = self
            .note_dir(folder)
            .join(&self.config.storage.attachments_subdir);
        std::fs::create_dir_all(&media_dir)?;
        let short = &fingerprint[..fingerprint.len().min(12)];
        std::fs::write(media_dir.join(format!("{}.png", short)), bytes)?;
        Ok(())
    }
}
