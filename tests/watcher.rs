//! Capture-file consumption tests: the parse-retry window for slow writers,
//! delete-on-success, and the startup sweep.

use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use linknote::config::{Config, WatcherConfig};
use linknote::db;
use linknote::error::FetchError;
use linknote::fetch::PageFetcher;
use linknote::fingerprint::fingerprint;
use linknote::migrate;
use linknote::models::{BookmarkStatus, NoteSummary};
use linknote::pipeline::Pipeline;
use linknote::processor::ProcessorRegistry;
use linknote::records;
use linknote::summarize::Summarizer;
use linknote::watcher;

const ARTICLE_HTML: &str = r#"
    <html><head><title>Dropped Article</title></head><body>
      <article><p>Content dropped into the inbox.</p></article>
    </body></html>
"#;

struct NeverFetcher;

#[async_trait]
impl PageFetcher for NeverFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::NotFound {
            url: url.to_string(),
        })
    }
}

struct StubSummarizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, _content: &str) -> Result<NoteSummary, linknote::error::PipelineError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(NoteSummary {
            summary: "S".to_string(),
            key_points: vec![],
            tags: vec!["inbox".to_string()],
            folder: "Inbox".to_string(),
        })
    }
}

fn test_config(root: &Path) -> Config {
    toml::from_str(&format!(
        r#"
        [db]
        path = "{root}/data/linknote.sqlite"

        [storage]
        cache_dir = "{root}/cache"
        notes_dir = "{root}/notes"

        [summarize]
        provider = "disabled"

        [watcher]
        parse_retries = 3
        retry_delay_ms = 50
        "#,
        root = root.display()
    ))
    .unwrap()
}

async fn build_pipeline(config: &Config) -> Pipeline {
    let pool = db::connect(config).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    Pipeline::with_collaborators(
        config.clone(),
        pool,
        Arc::new(NeverFetcher),
        Arc::new(StubSummarizer {
            calls: AtomicUsize::new(0),
        }),
        ProcessorRegistry::defaults(),
    )
}

fn capture_json(url: &str) -> String {
    serde_json::json!({ "url": url, "html_content": ARTICLE_HTML }).to_string()
}

#[tokio::test]
async fn valid_capture_file_is_processed_and_deleted() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let pipeline = build_pipeline(&config).await;

    let url = "https://example.com/dropped";
    let path = tmp.path().join("bookmark_1.json");
    std::fs::write(&path, capture_json(url)).unwrap();

    watcher::consume_file(&pipeline, &config.watcher, &path)
        .await
        .unwrap();

    assert!(!path.exists());
    let fp = fingerprint(url);
    let bookmark = records::find_bookmark(pipeline.pool(), &fp)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bookmark.status, BookmarkStatus::Completed);
}

#[tokio::test]
async fn slow_writer_is_parsed_within_the_retry_window() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());

    let path = tmp.path().join("bookmark_slow.json");
    // Writer still flushing: first reads see a truncated document.
    std::fs::write(&path, r#"{"url": "https://exam"#).unwrap();

    let finish = path.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(&finish, capture_json("https://example.com/slow")).unwrap();
    });

    let record = watcher::read_capture_file(&config.watcher, &path)
        .await
        .unwrap();
    assert_eq!(record.url, "https://example.com/slow");
}

#[tokio::test]
async fn malformed_file_fails_after_all_retries_and_is_kept() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let pipeline = build_pipeline(&config).await;

    let path = tmp.path().join("bookmark_bad.json");
    std::fs::write(&path, "definitely not json").unwrap();

    let err = watcher::consume_file(&pipeline, &config.watcher, &path)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("after 3 attempts"));
    // Left in place for inspection.
    assert!(path.exists());
}

#[tokio::test]
async fn failed_processing_keeps_the_capture_file() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let pipeline = build_pipeline(&config).await;

    // No html_content and the fetcher always 404s.
    let path = tmp.path().join("bookmark_unfetchable.json");
    std::fs::write(
        &path,
        serde_json::json!({ "url": "https://example.com/404" }).to_string(),
    )
    .unwrap();

    watcher::consume_file(&pipeline, &config.watcher, &path)
        .await
        .unwrap_err();
    assert!(path.exists());
}

#[tokio::test]
async fn sweep_consumes_matching_files_and_skips_the_rest() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let pipeline = build_pipeline(&config).await;

    let inbox = tmp.path().join("inbox");
    std::fs::create_dir_all(&inbox).unwrap();
    let a = inbox.join("bookmark_a.json");
    let b = inbox.join("bookmark_b.json");
    let unrelated = inbox.join("notes.txt");
    std::fs::write(&a, capture_json("https://example.com/a")).unwrap();
    std::fs::write(&b, capture_json("https://example.com/b")).unwrap();
    std::fs::write(&unrelated, "keep me").unwrap();

    watcher::sweep_existing(&pipeline, &config.watcher, &inbox)
        .await
        .unwrap();

    assert!(!a.exists());
    assert!(!b.exists());
    assert!(unrelated.exists());

    for url in ["https://example.com/a", "https://example.com/b"] {
        let bookmark = records::find_bookmark(pipeline.pool(), &fingerprint(url))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bookmark.status, BookmarkStatus::Completed);
    }
}

#[test]
fn capture_pattern_is_prefix_and_suffix_bound() {
    let config = WatcherConfig::default();
    assert!(watcher::is_capture_file(
        &config,
        Path::new("/inbox/bookmark_1692900000.json")
    ));
    assert!(!watcher::is_capture_file(
        &config,
        Path::new("/inbox/export.json")
    ));
}
