//! Page fetching with typed status classification.
//!
//! The [`PageFetcher`] trait is the seam that lets tests substitute a stub
//! and count network calls. The real [`HttpFetcher`] performs a GET with a
//! rotated browser user-agent and a bounded timeout, and classifies non-200
//! responses into distinct [`FetchError`] variants — a 403 is not a 404 is
//! not a 500, and none of them are silently retried.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::FetchError;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page body for `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    user_agents: Vec<String>,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
        })
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("linknote")
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.pick_user_agent())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        match status.as_u16() {
            200 => response.text().await.map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            }),
            403 => Err(FetchError::Forbidden {
                url: url.to_string(),
            }),
            404 => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
            code @ 500..=599 => Err(FetchError::ServerError {
                status: code,
                url: url.to_string(),
            }),
            code => {
                tracing::error!(status = code, url, "unexpected fetch status");
                Err(FetchError::UnexpectedStatus {
                    status: code,
                    url: url.to_string(),
                })
            }
        }
    }
}
