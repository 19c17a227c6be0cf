//! YouTube video processor.
//!
//! Extracts the video id from the URL-shaped metadata in the page head
//! (`og:url`, canonical link) and channel/description from the open-graph
//! tags, rendering a video note with an embed link.

use scraper::{Html, Selector};

use crate::error::PipelineError;
use crate::models::ExtractedPage;
use crate::processor::{Metadata, NoteContext, Processor};
use crate::render;
use url::Url;

pub struct YouTubeProcessor;

impl Processor for YouTubeProcessor {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn extract_metadata(
        &self,
        _page: &ExtractedPage,
        html: &str,
    ) -> Result<Metadata, PipelineError> {
        let document = Html::parse_document(html);
        let mut metadata = Metadata::new();

        if let Some(canonical) = meta_property(&document, "og:url")
            .or_else(|| link_href(&document, "canonical"))
        {
            if let Some(id) = video_id(&canonical) {
                metadata.insert("video_id".into(), id);
            }
        }
        if let Some(channel) = meta_selector_content(
            &document,
            r#"link[itemprop="name"]"#,
            "content",
        )
        .or_else(|| meta_property(&document, "og:site_name"))
        {
            metadata.insert("channel".into(), channel);
        }
        if let Some(description) = meta_property(&document, "og:description") {
            metadata.insert("description".into(), description);
        }

        Ok(metadata)
    }

    fn augment_tags(&self, mut tags: Vec<String>) -> Vec<String> {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case("video")) {
            tags.push("video".to_string());
        }
        tags
    }

    fn render(&self, ctx: &NoteContext<'_>) -> String {
        let mut out = render::frontmatter(ctx.title, ctx.url, ctx.fingerprint, &ctx.summary.tags);
        out.push_str(&format!("\n# {}\n\n", ctx.title));

        if let Some(channel) = ctx.metadata.get("channel") {
            out.push_str(&format!("**Channel:** {}\n\n", channel));
        }
        if let Some(id) = ctx.metadata.get("video_id") {
            out.push_str(&format!(
                "[![thumbnail](https://img.youtube.com/vi/{}/hqdefault.jpg)]({})\n\n",
                id, ctx.url
            ));
        }

        out.push_str(&render::summary_sections(ctx.summary));
        out.push_str(&format!("\n[Watch]({})\n", ctx.url));
        out
    }
}

/// Parses the video id from watch URLs and youtu.be short links.
pub fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host == "youtu.be" {
        return parsed
            .path_segments()
            .and_then(|mut segments| segments.next().map(|s| s.to_string()))
            .filter(|s| !s.is_empty());
    }
    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    meta_selector_content(
        document,
        &format!(r#"meta[property="{}"]"#, property),
        "content",
    )
}

fn link_href(document: &Html, rel: &str) -> Option<String> {
    meta_selector_content(document, &format!(r#"link[rel="{}"]"#, rel), "href")
}

fn meta_selector_content(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("head selector");
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
