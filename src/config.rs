use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// On-disk layout: stage caches, rendered notes, and binary attachments.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub cache_dir: PathBuf,
    pub notes_dir: PathBuf,
    #[serde(default = "default_attachments_subdir")]
    pub attachments_subdir: String,
}

fn default_attachments_subdir() -> String {
    "media".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            user_agents: default_user_agents(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.1 Safari/605.1.15",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizeConfig {
    /// `openai` or `disabled`. Disabled still allows cached summaries.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Endpoint base, overridable for OpenAI-compatible servers and tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Content is prefix-truncated to roughly this many tokens before the
    /// completion call.
    #[serde(default = "default_max_content_tokens")]
    pub max_content_tokens: usize,
    #[serde(default = "default_summarize_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_base: default_api_base(),
            max_content_tokens: default_max_content_tokens(),
            timeout_secs: default_summarize_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}
fn default_max_content_tokens() -> usize {
    10_000
}
fn default_summarize_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    /// Only files named `<prefix>*<suffix>` are consumed.
    #[serde(default = "default_watch_prefix")]
    pub prefix: String,
    #[serde(default = "default_watch_suffix")]
    pub suffix: String,
    /// JSON parse attempts before giving up on a capture file. A writer may
    /// still be flushing when the create notification arrives.
    #[serde(default = "default_parse_retries")]
    pub parse_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            prefix: default_watch_prefix(),
            suffix: default_watch_suffix(),
            parse_retries: default_parse_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_watch_prefix() -> String {
    "bookmark_".to_string()
}
fn default_watch_suffix() -> String {
    ".json".to_string()
}
fn default_parse_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5001".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.summarize.max_content_tokens == 0 {
        anyhow::bail!("summarize.max_content_tokens must be > 0");
    }

    if config.watcher.parse_retries == 0 {
        anyhow::bail!("watcher.parse_retries must be >= 1");
    }

    if config.fetch.user_agents.is_empty() {
        anyhow::bail!("fetch.user_agents must not be empty");
    }

    match config.summarize.provider.as_str() {
        "openai" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown summarize provider: '{}'. Must be openai or disabled.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [db]
            path = "data/linknote.sqlite"

            [storage]
            cache_dir = "data/cache"
            notes_dir = "notes"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.watcher.parse_retries, 3);
        assert_eq!(cfg.watcher.suffix, ".json");
        assert_eq!(cfg.summarize.max_content_tokens, 10_000);
        assert_eq!(cfg.server.bind, "127.0.0.1:5001");
        assert!(!cfg.fetch.user_agents.is_empty());
    }
}
