//! Structured summarization via an OpenAI-compatible chat completions API.
//!
//! The [`Summarizer`] trait is the injection seam for tests. The real
//! implementation sends the extracted content (prefix-truncated to a token
//! budget) with a curator system prompt and parses the JSON object reply
//! into a [`NoteSummary`] `{summary, key_points, tags, folder}`.
//!
//! Requires `OPENAI_API_KEY` in the environment; the endpoint base is
//! configurable for compatible servers and tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::SummarizeConfig;
use crate::error::PipelineError;
use crate::models::NoteSummary;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// One structured-completion call over already-truncated content.
    async fn summarize(&self, content: &str) -> Result<NoteSummary, PipelineError>;
}

/// Deterministic prefix truncation to an approximate token budget.
///
/// Uses a 4-chars-per-token heuristic and cuts on a char boundary. The
/// operation is idempotent: truncating already-short content is a no-op and
/// re-truncating truncated content yields the same result.
pub fn truncate_to_token_budget(content: &str, max_tokens: usize) -> &str {
    let max_chars = max_tokens.saturating_mul(4);
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &content[..byte_idx],
        None => content,
    }
}

/// Normalizes one tag: lowercase, trimmed, spaces replaced with hyphens.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace(' ', "-")
}

const SYSTEM_PROMPT: &str = "You are a highly skilled Research Information Specialist with \
expertise in library science, academic research, and knowledge management. Summarize the \
provided content for a personal knowledge base and classify it into a topic folder.\n\
\n\
Reply with a single JSON object, no prose, in exactly this shape:\n\
{\n\
  \"summary\": \"A concise summary of the text in 3-5 sentences.\",\n\
  \"key_points\": [\"Key point 1\", \"... up to 5 key points\"],\n\
  \"tags\": [\"tag1\", \"... up to 10 tags\"],\n\
  \"folder\": \"Topic/Subtopic folder classification, e.g. Research/Technology\"\n\
}";

const USER_PROMPT_PREFIX: &str = "Here is the content:\n\n";

pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(config: &SummarizeConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, content: &str) -> Result<NoteSummary, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("{}{}", USER_PROMPT_PREFIX, content) },
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Summarization(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Summarization(format!(
                "completion API returned {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Summarization(format!("malformed response: {}", e)))?;

        let message = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| PipelineError::Summarization("empty choices".to_string()))?;

        serde_json::from_str(message)
            .map_err(|e| PipelineError::Summarization(format!("malformed summary JSON: {}", e)))
    }
}

/// Always-failing summarizer for `provider = "disabled"`. Cached summaries
/// still satisfy the stage, so reprocessing completed bookmarks works
/// without credentials.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _content: &str) -> Result<NoteSummary, PipelineError> {
        Err(PipelineError::Summarization(
            "summarize provider is disabled".to_string(),
        ))
    }
}

pub fn create_summarizer(config: &SummarizeConfig) -> anyhow::Result<Box<dyn Summarizer>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiSummarizer::new(config)?)),
        "disabled" => Ok(Box::new(DisabledSummarizer)),
        other => anyhow::bail!("Unknown summarize provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn truncation_is_noop_on_short_content() {
        let content = "short content";
        assert_eq!(truncate_to_token_budget(content, 100), content);
    }

    #[test]
    fn truncation_is_idempotent_prefix() {
        let content = "word ".repeat(2000);
        let once = truncate_to_token_budget(&content, 100);
        assert!(once.len() < content.len());
        assert!(content.starts_with(once));
        let twice = truncate_to_token_budget(once, 100);
        assert_eq!(once, twice);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let content = "é".repeat(500);
        let truncated = truncate_to_token_budget(&content, 100);
        assert_eq!(truncated.chars().count(), 400);
    }

    #[test]
    fn tags_are_normalized() {
        assert_eq!(normalize_tag("  Tag One "), "tag-one");
        assert_eq!(normalize_tag("MACHINE LEARNING"), "machine-learning");
        assert_eq!(normalize_tag("rust"), "rust");
    }

    #[tokio::test]
    async fn parses_structured_completion() {
        let server = MockServer::start().await;
        let reply = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"summary\":\"S\",\"key_points\":[\"K1\"],\"tags\":[\"Tag One\"],\"folder\":\"Research/Technology\"}"
                }
            }]
        });
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let cfg = SummarizeConfig {
            api_base: server.uri(),
            ..SummarizeConfig::default()
        };
        let summarizer = OpenAiSummarizer::new(&cfg).unwrap();
        let summary = summarizer.summarize("some content").await.unwrap();

        assert_eq!(summary.summary, "S");
        assert_eq!(summary.key_points, vec!["K1"]);
        assert_eq!(summary.tags, vec!["Tag One"]);
        assert_eq!(summary.folder, "Research/Technology");
    }

    #[tokio::test]
    async fn api_failure_is_a_summarization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let cfg = SummarizeConfig {
            api_base: server.uri(),
            ..SummarizeConfig::default()
        };
        let summarizer = OpenAiSummarizer::new(&cfg).unwrap();
        let err = summarizer.summarize("some content").await.unwrap_err();
        assert_eq!(err.kind(), "summarization");
    }
}
