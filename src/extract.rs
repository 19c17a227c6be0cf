//! Readability-style content extraction.
//!
//! Takes the raw page HTML and produces `{title, plain_text, content_html}`.
//! The main content region is the first of `article`, `main`, `body`; text
//! is gathered from block-level elements with whitespace collapsed. A page
//! with no usable plain text is a hard failure — there is nothing to
//! summarize or render.

use scraper::{ElementRef, Html, Selector};

use crate::error::PipelineError;
use crate::models::ExtractedPage;

/// Extracts the readable content from `html`. Fails with
/// [`PipelineError::EmptyExtraction`] when no usable text remains.
pub fn extract_page(url: &str, html: &str) -> Result<ExtractedPage, PipelineError> {
    let document = Html::parse_document(html);

    let root = content_root(&document);
    let plain_text = collect_text(root);
    if plain_text.trim().is_empty() {
        return Err(PipelineError::EmptyExtraction {
            url: url.to_string(),
        });
    }

    Ok(ExtractedPage {
        title: extract_title(&document),
        plain_text,
        content_html: root.html(),
    })
}

fn content_root<'a>(document: &'a Html) -> ElementRef<'a> {
    let article = Selector::parse("article").expect("article selector");
    let main = Selector::parse("main").expect("main selector");
    let body = Selector::parse("body").expect("body selector");

    document
        .select(&article)
        .next()
        .or_else(|| document.select(&main).next())
        .or_else(|| document.select(&body).next())
        .unwrap_or_else(|| document.root_element())
}

fn extract_title(document: &Html) -> String {
    let title = Selector::parse("title").expect("title selector");
    if let Some(el) = document.select(&title).next() {
        let text = collapse_whitespace(&el.text().collect::<String>());
        if !text.is_empty() {
            return text;
        }
    }

    let og_title = Selector::parse(r#"meta[property="og:title"]"#).expect("og:title selector");
    if let Some(content) = document
        .select(&og_title)
        .next()
        .and_then(|el| el.value().attr("content"))
    {
        let text = collapse_whitespace(content);
        if !text.is_empty() {
            return text;
        }
    }

    let h1 = Selector::parse("h1").expect("h1 selector");
    document
        .select(&h1)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Gathers text from block-level descendants, one block per line. Script
/// and style subtrees contribute nothing because `scraper`'s `.text()` on
/// block selectors walks only text nodes; we filter their containers out
/// by selecting content-bearing tags explicitly.
fn collect_text(root: ElementRef<'_>) -> String {
    let blocks =
        Selector::parse("p, h1, h2, h3, h4, h5, h6, li, pre, blockquote").expect("block selector");

    let mut lines: Vec<String> = Vec::new();
    for el in root.select(&blocks) {
        // Nested matches (e.g. a <p> inside a <blockquote>) would duplicate
        // text; skip elements whose ancestor also matches.
        if has_matching_ancestor(el, &blocks, root) {
            continue;
        }
        let text = collapse_whitespace(&el.text().collect::<String>());
        if !text.is_empty() {
            lines.push(text);
        }
    }

    if lines.is_empty() {
        // No block markup at all: fall back to the root's own text.
        return collapse_whitespace(&root.text().collect::<String>());
    }

    lines.join("\n\n")
}

fn has_matching_ancestor(el: ElementRef<'_>, selector: &Selector, root: ElementRef<'_>) -> bool {
    let mut current = el.parent();
    while let Some(node) = current {
        if node.id() == root.id() {
            break;
        }
        if let Some(parent_el) = ElementRef::wrap(node) {
            if selector.matches(&parent_el) {
                return true;
            }
        }
        current = node.parent();
    }
    false
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
