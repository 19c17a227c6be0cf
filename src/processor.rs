//! Domain-specific processor dispatch.
//!
//! A [`Processor`] is a stateless strategy for one family of URLs: it pulls
//! structured metadata out of the page markup, can widen the tag set, and
//! owns the markdown template for its note variant. Dispatch walks an
//! explicit ordered list of `(predicate, processor)` routes and falls back
//! to the generic processor — it is total and pure, selected once per URL.

use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

use crate::error::PipelineError;
use crate::models::{ExtractedPage, NoteSummary};
use crate::processor_arxiv::ArxivProcessor;
use crate::processor_generic::GenericProcessor;
use crate::processor_twitter::TwitterProcessor;
use crate::processor_youtube::YouTubeProcessor;

/// Domain metadata extracted from page markup (authors, ids, dates...).
/// A sorted map keeps rendering deterministic.
pub type Metadata = BTreeMap<String, String>;

/// Everything a processor template needs to render one note.
pub struct NoteContext<'a> {
    pub url: &'a str,
    pub fingerprint: &'a str,
    pub title: &'a str,
    pub page: &'a ExtractedPage,
    pub metadata: &'a Metadata,
    /// Structured summary with tags already normalized.
    pub summary: &'a NoteSummary,
}

pub trait Processor: Send + Sync {
    /// Stable variant name, also the template key (`generic`, `arxiv`, ...).
    fn name(&self) -> &'static str;

    /// Extracts domain-specific fields from the raw markup. The default
    /// relies entirely on readability output.
    fn extract_metadata(
        &self,
        _page: &ExtractedPage,
        _html: &str,
    ) -> Result<Metadata, PipelineError> {
        Ok(Metadata::new())
    }

    /// Lets a domain widen the summarizer's tag set (pre-normalization).
    fn augment_tags(&self, tags: Vec<String>) -> Vec<String> {
        tags
    }

    /// Renders the note body for this variant.
    fn render(&self, ctx: &NoteContext<'_>) -> String;
}

type Predicate = fn(&Url) -> bool;

/// Ordered `(predicate, processor)` routes with a generic fallback.
/// Injected into the orchestrator so tests can substitute strategies.
pub struct ProcessorRegistry {
    routes: Vec<(Predicate, Arc<dyn Processor>)>,
    fallback: Arc<dyn Processor>,
}

impl ProcessorRegistry {
    pub fn new(fallback: Arc<dyn Processor>) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    pub fn route(mut self, predicate: Predicate, processor: Arc<dyn Processor>) -> Self {
        self.routes.push((predicate, processor));
        self
    }

    /// The built-in routing table: arxiv, twitter/x, youtube, else generic.
    pub fn defaults() -> Self {
        Self::new(Arc::new(GenericProcessor))
            .route(is_arxiv_url, Arc::new(ArxivProcessor))
            .route(is_twitter_url, Arc::new(TwitterProcessor))
            .route(is_youtube_url, Arc::new(YouTubeProcessor))
    }

    /// First-matching-predicate dispatch. Unparseable or unmatched URLs get
    /// the generic fallback — never an error.
    pub fn dispatch(&self, url: &str) -> Arc<dyn Processor> {
        if let Ok(parsed) = Url::parse(url) {
            for (predicate, processor) in &self.routes {
                if predicate(&parsed) {
                    return Arc::clone(processor);
                }
            }
        }
        Arc::clone(&self.fallback)
    }
}

fn host_matches(url: &Url, domain: &str) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        }
        None => false,
    }
}

pub fn is_arxiv_url(url: &Url) -> bool {
    host_matches(url, "arxiv.org")
}

pub fn is_twitter_url(url: &Url) -> bool {
    host_matches(url, "twitter.com") || host_matches(url, "x.com")
}

pub fn is_youtube_url(url: &Url) -> bool {
    host_matches(url, "youtube.com") || host_matches(url, "youtu.be")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_is_deterministic_per_domain() {
        let registry = ProcessorRegistry::defaults();
        assert_eq!(
            registry.dispatch("https://arxiv.org/abs/1234.5678").name(),
            "arxiv"
        );
        assert_eq!(registry.dispatch("https://x.com/u/status/1").name(), "twitter");
        assert_eq!(
            registry.dispatch("https://youtube.com/watch?v=abc").name(),
            "youtube"
        );
        assert_eq!(
            registry.dispatch("https://example.com/page").name(),
            "generic"
        );
    }

    #[test]
    fn subdomains_match() {
        let registry = ProcessorRegistry::defaults();
        assert_eq!(
            registry.dispatch("https://www.youtube.com/watch?v=abc").name(),
            "youtube"
        );
        assert_eq!(
            registry.dispatch("https://mobile.twitter.com/u/status/1").name(),
            "twitter"
        );
    }

    #[test]
    fn lookalike_hosts_fall_back_to_generic() {
        let registry = ProcessorRegistry::defaults();
        assert_eq!(
            registry.dispatch("https://notarxiv.org/abs/1").name(),
            "generic"
        );
        assert_eq!(registry.dispatch("not a url").name(), "generic");
    }
}
