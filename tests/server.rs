//! HTTP contract tests for the ingestion endpoint, served on an ephemeral
//! port with stubbed collaborators.

use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use linknote::config::Config;
use linknote::db;
use linknote::error::FetchError;
use linknote::fetch::PageFetcher;
use linknote::migrate;
use linknote::models::NoteSummary;
use linknote::pipeline::Pipeline;
use linknote::processor::ProcessorRegistry;
use linknote::server;
use linknote::summarize::Summarizer;

const ARTICLE_HTML: &str = r#"
    <html><head><title>Posted Article</title></head><body>
      <article><p>Posted through the API.</p></article>
    </body></html>
"#;

struct NotFoundFetcher;

#[async_trait]
impl PageFetcher for NotFoundFetcher {
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
            key_points: vec!["K".to_string()],
            tags: vec!["api".to_string()],
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
        "#,
        root = root.display()
    ))
    .unwrap()
}

async fn serve_stubbed(root: &Path) -> String {
    let config = test_config(root);
    let pool = db::connect(&config).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    let pipeline = Arc::new(Pipeline::with_collaborators(
        config,
        pool,
        Arc::new(NotFoundFetcher),
        Arc::new(StubSummarizer {
            calls: AtomicUsize::new(0),
        }),
        ProcessorRegistry::defaults(),
    ));

    let app = server::router(pipeline);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let tmp = TempDir::new().unwrap();
    let base = serve_stubbed(tmp.path()).await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn posting_a_capture_returns_the_rendered_note() {
    let tmp = TempDir::new().unwrap();
    let base = serve_stubbed(tmp.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/bookmark", base))
        .json(&serde_json::json!({
            "url": "https://example.com/posted",
            "html_content": ARTICLE_HTML,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["folder"], "Inbox");
    let markdown = body["markdown"].as_str().unwrap();
    assert!(markdown.contains("# Posted Article"));

    let note_path = tmp
        .path()
        .join("notes/Inbox")
        .join(body["filename"].as_str().unwrap());
    assert!(note_path.is_file());
}

#[tokio::test]
async fn empty_url_is_a_bad_request() {
    let tmp = TempDir::new().unwrap();
    let base = serve_stubbed(tmp.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/bookmark", base))
        .json(&serde_json::json!({ "url": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn processing_failures_are_server_errors() {
    let tmp = TempDir::new().unwrap();
    let base = serve_stubbed(tmp.path()).await;

    // Extraction finds no usable text: a processing exception, so 5xx.
    let response = reqwest::Client::new()
        .post(format!("{}/api/bookmark", base))
        .json(&serde_json::json!({
            "url": "https://example.com/blank",
            "html_content": "<html><body><div></div></body></html>",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "extraction_empty");
}

#[tokio::test]
async fn upstream_fetch_failure_maps_to_bad_gateway() {
    let tmp = TempDir::new().unwrap();
    let base = serve_stubbed(tmp.path()).await;

    // No html_content means the (always-404) fetcher runs.
    let response = reqwest::Client::new()
        .post(format!("{}/api/bookmark", base))
        .json(&serde_json::json!({ "url": "https://example.com/missing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "fetch_not_found");
}
