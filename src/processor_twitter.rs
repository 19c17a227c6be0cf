//! Twitter/X post processor.
//!
//! Tweets are rendered from captured HTML (the live site requires a browser
//! session, so the capture tool supplies the markup and an optional
//! screenshot). Extraction targets the `data-testid` attributes of the
//! tweet article; the note embeds the post text verbatim.

use scraper::{Html, Selector};

use crate::error::PipelineError;
use crate::models::ExtractedPage;
use crate::processor::{Metadata, NoteContext, Processor};
use crate::render;

pub struct TwitterProcessor;

impl Processor for TwitterProcessor {
    fn name(&self) -> &'static str {
        "twitter"
    }

    fn extract_metadata(
        &self,
        _page: &ExtractedPage,
        html: &str,
    ) -> Result<Metadata, PipelineError> {
        let document = Html::parse_document(html);
        let mut metadata = Metadata::new();

        let article = Selector::parse(r#"article[data-testid="tweet"]"#).expect("tweet selector");
        let text_div = Selector::parse(r#"div[data-testid="tweetText"]"#).expect("text selector");
        let user_div = Selector::parse(r#"div[data-testid="User-Name"]"#).expect("user selector");

        let Some(tweet) = document.select(&article).next() else {
            return Err(PipelineError::Processor {
                name: "twitter".into(),
                message: "could not find tweet content in captured HTML".into(),
            });
        };

        if let Some(text) = tweet.select(&text_div).next() {
            let text = text.text().collect::<String>().trim().to_string();
            metadata.insert("tweet_text".into(), text);
        }
        if let Some(user) = tweet.select(&user_div).next() {
            let name = user
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !name.is_empty() {
                metadata.insert("author".into(), name);
            }
        }

        Ok(metadata)
    }

    fn augment_tags(&self, mut tags: Vec<String>) -> Vec<String> {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case("twitter")) {
            tags.push("twitter".to_string());
        }
        tags
    }

    fn render(&self, ctx: &NoteContext<'_>) -> String {
        let mut out = render::frontmatter(ctx.title, ctx.url, ctx.fingerprint, &ctx.summary.tags);
        out.push_str(&format!("\n# {}\n\n", ctx.title));

        if let Some(author) = ctx.metadata.get("author") {
            out.push_str(&format!("**Author:** {}\n\n", author));
        }
        if let Some(text) = ctx.metadata.get("tweet_text") {
            out.push_str("> ");
            out.push_str(&text.replace('\n', "\n> "));
            out.push_str("\n\n");
        }

        out.push_str(&render::summary_sections(ctx.summary));
        out.push_str(&format!("\n[Post]({})\n", ctx.url));
        out
    }
}
