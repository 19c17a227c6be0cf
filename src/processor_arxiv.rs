//! arXiv paper processor.
//!
//! Pulls paper metadata (id, authors, abstract, publication date) from the
//! abstract page markup — `citation_*` meta tags first, visible elements as
//! fallback — and renders an academic note. Always adds the base
//! `academic`/`research`/`arxiv` tags.

use scraper::{Html, Selector};

use crate::error::PipelineError;
use crate::models::ExtractedPage;
use crate::processor::{Metadata, NoteContext, Processor};
use crate::render;

pub struct ArxivProcessor;

impl Processor for ArxivProcessor {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn extract_metadata(
        &self,
        _page: &ExtractedPage,
        html: &str,
    ) -> Result<Metadata, PipelineError> {
        let document = Html::parse_document(html);
        let mut metadata = Metadata::new();

        if let Some(id) = extract_arxiv_id(&document) {
            metadata.insert("pdf_url".into(), format!("https://arxiv.org/pdf/{}", id));
            metadata.insert("arxiv_id".into(), id);
        }
        if let Some(title) = meta_content(&document, "citation_title") {
            metadata.insert("title".into(), title);
        }
        let authors = meta_contents(&document, "citation_author");
        if !authors.is_empty() {
            metadata.insert("authors".into(), authors.join(", "));
        }
        if let Some(date) = meta_content(&document, "citation_date") {
            metadata.insert("published".into(), date);
        }
        if let Some(abstract_text) = extract_abstract(&document) {
            metadata.insert("abstract".into(), abstract_text);
        }

        Ok(metadata)
    }

    fn augment_tags(&self, mut tags: Vec<String>) -> Vec<String> {
        for base in ["academic", "research", "arxiv"] {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(base)) {
                tags.push(base.to_string());
            }
        }
        tags
    }

    fn render(&self, ctx: &NoteContext<'_>) -> String {
        let mut out = render::frontmatter(ctx.title, ctx.url, ctx.fingerprint, &ctx.summary.tags);
        out.push_str(&format!("\n# {}\n\n", ctx.title));

        if let Some(authors) = ctx.metadata.get("authors") {
            out.push_str(&format!("**Authors:** {}\n\n", authors));
        }
        if let Some(id) = ctx.metadata.get("arxiv_id") {
            out.push_str(&format!("**arXiv:** [{}]({})\n\n", id, ctx.url));
        }
        if let Some(published) = ctx.metadata.get("published") {
            out.push_str(&format!("**Published:** {}\n\n", published));
        }

        out.push_str(&render::summary_sections(ctx.summary));

        if let Some(abstract_text) = ctx.metadata.get("abstract") {
            out.push_str("\n## Abstract\n\n");
            out.push_str(abstract_text);
            out.push('\n');
        }
        if let Some(pdf_url) = ctx.metadata.get("pdf_url") {
            out.push_str(&format!("\n[PDF]({})\n", pdf_url));
        }
        out
    }
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector =
        Selector::parse(&format!(r#"meta[name="{}"]"#, name)).expect("meta selector");
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn meta_contents(document: &Html, name: &str) -> Vec<String> {
    let selector =
        Selector::parse(&format!(r#"meta[name="{}"]"#, name)).expect("meta selector");
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn extract_arxiv_id(document: &Html) -> Option<String> {
    if let Some(id) = meta_content(document, "citation_arxiv_id") {
        return Some(id);
    }
    // Canonical link fallback: https://arxiv.org/abs/<id>
    let canonical = Selector::parse(r#"link[rel="canonical"]"#).expect("canonical selector");
    document
        .select(&canonical)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| href.rsplit("/abs/").next().map(|s| s.to_string()))
        .filter(|id| id.chars().any(|c| c.is_ascii_digit()))
}

fn extract_abstract(document: &Html) -> Option<String> {
    let selector = Selector::parse("blockquote.abstract").expect("abstract selector");
    document.select(&selector).next().map(|el| {
        let text = el.text().collect::<String>();
        text.trim()
            .trim_start_matches("Abstract:")
            .trim()
            .to_string()
    })
}
