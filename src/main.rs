//! # Linknote CLI (`lnk`)
//!
//! The `lnk` binary drives the bookmark pipeline: database initialization,
//! one-shot URL processing, capture-directory watching, and the HTTP
//! ingestion server.
//!
//! ## Usage
//!
//! ```bash
//! lnk --config ./config/linknote.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lnk init` | Create the SQLite database and run schema migrations |
//! | `lnk process <url>` | Run the full pipeline for one URL |
//! | `lnk reprocess <url>` | Re-run a URL, reusing intact stage artifacts |
//! | `lnk fingerprint <url>` | Print the content-address of a URL |
//! | `lnk watch <dir>` | Consume capture files dropped into a directory |
//! | `lnk serve` | Start the HTTP ingestion server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! lnk init --config ./config/linknote.toml
//!
//! # Process a URL end to end
//! lnk process https://arxiv.org/abs/1706.03762
//!
//! # Re-run with fresh captured HTML
//! lnk reprocess https://x.com/user/status/1 --html capture.html
//!
//! # Watch an inbox directory for capture files
//! lnk watch ./inbox
//!
//! # Serve the browser-extension endpoint
//! lnk serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use linknote::config;
use linknote::fingerprint::fingerprint;
use linknote::migrate;
use linknote::pipeline::Pipeline;
use linknote::records;
use linknote::server;
use linknote::watcher;

/// Linknote CLI — a local-first bookmark curation pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/linknote.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lnk",
    about = "Linknote — turn bookmarked URLs into organized markdown notes",
    version,
    long_about = "Linknote walks each URL through a staged pipeline (fetch, readability \
    extraction, domain-specific processing, structured summarization, rendering) with every \
    stage cached by the URL's content-address, and files the resulting markdown note into a \
    topic folder. Ingestion runs via the CLI, a watched capture directory, or an HTTP endpoint."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/linknote.toml`. Database, storage, fetch,
    /// summarization, watcher, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/linknote.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (bookmarks, processing_errors, notes). This command is idempotent —
    /// running it multiple times is safe.
    Init,

    /// Process one URL into a markdown note.
    ///
    /// Fetches the page (unless `--html` supplies captured markup), extracts
    /// the readable content, summarizes it, and writes the rendered note
    /// into the configured notes directory. Repeating a URL whose note is
    /// already complete is a no-op.
    Process {
        /// The URL to process.
        url: String,

        /// Read page HTML from this file instead of fetching over HTTP.
        #[arg(long)]
        html: Option<PathBuf>,

        /// Attach a screenshot (PNG, or base64/data-URI text file).
        #[arg(long)]
        screenshot: Option<PathBuf>,
    },

    /// Re-run the pipeline for a URL that was already submitted.
    ///
    /// Stages with intact cached artifacts are reused; supplying `--html`
    /// replaces the cached page and invalidates the downstream stages.
    Reprocess {
        /// The URL to reprocess.
        url: String,

        /// Replace the cached page HTML with the contents of this file.
        #[arg(long)]
        html: Option<PathBuf>,

        /// Attach a screenshot (PNG, or base64/data-URI text file).
        #[arg(long)]
        screenshot: Option<PathBuf>,
    },

    /// Print the content-address (fingerprint) of a URL.
    ///
    /// The fingerprint keys the bookmark record, the error ledger, and all
    /// cached stage artifacts. Useful for locating cache entries by hand.
    Fingerprint {
        /// The URL to fingerprint.
        url: String,
    },

    /// Watch a directory for capture files.
    ///
    /// Consumes `bookmark_*.json` files dropped by capture tools, processing
    /// each and deleting it on success. Files already present at startup are
    /// swept first. Runs until interrupted.
    Watch {
        /// Directory to watch (created if missing).
        dir: PathBuf,
    },

    /// Start the HTTP ingestion server.
    ///
    /// Binds to the address configured in `[server].bind` and accepts
    /// capture payloads on `POST /api/bookmark`.
    Serve,
}

/// Loads screenshot input for the CLI: raw PNG bytes are re-encoded to
/// base64, text files are passed through as-is.
fn read_screenshot(path: &PathBuf) -> anyhow::Result<String> {
    use base64::Engine as _;
    let bytes = std::fs::read(path)?;
    if bytes.starts_with(b"\x89PNG") {
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    } else {
        Ok(String::from_utf8(bytes)?.trim().to_string())
    }
}

async fn run_and_report(
    pipeline: &Pipeline,
    url: &str,
    html: Option<PathBuf>,
    screenshot: Option<PathBuf>,
    reprocess: bool,
) -> anyhow::Result<()> {
    let html = html.map(std::fs::read_to_string).transpose()?;
    let screenshot = screenshot.as_ref().map(read_screenshot).transpose()?;

    let result = if reprocess {
        pipeline
            .reprocess(url, html.as_deref(), screenshot.as_deref())
            .await
    } else {
        pipeline
            .process(url, html.as_deref(), screenshot.as_deref())
            .await
    };

    match result {
        Ok(_) => {
            let fp = fingerprint(url);
            if let Some(note) = records::find_note(pipeline.pool(), &fp).await? {
                if note.folder.is_empty() {
                    println!("Note written: {}", note.filename);
                } else {
                    println!("Note written: {}/{}", note.folder, note.filename);
                }
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("Processing failed ({}): {}", err.kind(), err);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linknote=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Fingerprinting is pure; no config or database needed.
    if let Commands::Fingerprint { url } = &cli.command {
        println!("{}", fingerprint(url));
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Process {
            url,
            html,
            screenshot,
        } => {
            let pipeline = Pipeline::connect(cfg).await?;
            run_and_report(&pipeline, &url, html, screenshot, false).await?;
        }
        Commands::Reprocess {
            url,
            html,
            screenshot,
        } => {
            let pipeline = Pipeline::connect(cfg).await?;
            run_and_report(&pipeline, &url, html, screenshot, true).await?;
        }
        Commands::Watch { dir } => {
            let pipeline = Arc::new(Pipeline::connect(cfg.clone()).await?);
            watcher::watch(pipeline, &cfg, &dir).await?;
        }
        Commands::Serve => {
            let pipeline = Arc::new(Pipeline::connect(cfg.clone()).await?);
            server::run_server(&cfg, pipeline).await?;
        }
        Commands::Fingerprint { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
