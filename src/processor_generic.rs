//! Generic article processor: readability text plus the structured summary,
//! rendered as a standard article note.

use crate::processor::{NoteContext, Processor};
use crate::render;

pub struct GenericProcessor;

impl Processor for GenericProcessor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn render(&self, ctx: &NoteContext<'_>) -> String {
        let mut out = render::frontmatter(ctx.title, ctx.url, ctx.fingerprint, &ctx.summary.tags);
        out.push_str(&format!("\n# {}\n\n", ctx.title));
        out.push_str(&render::summary_sections(ctx.summary));
        out.push_str(&format!("\n[Source]({})\n", ctx.url));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedPage, NoteSummary};
    use crate::processor::Metadata;

    #[test]
    fn renders_title_summary_and_tags() {
        let page = ExtractedPage {
            title: "Example Title".into(),
            plain_text: "Hello world".into(),
            content_html: "<p>Hello world</p>".into(),
        };
        let summary = NoteSummary {
            summary: "S".into(),
            key_points: vec!["K1".into()],
            tags: vec!["tag-one".into()],
            folder: "Research/Technology".into(),
        };
        let metadata = Metadata::new();
        let ctx = NoteContext {
            url: "https://example.com/article",
            fingerprint: "ff00",
            title: "Example Title",
            page: &page,
            metadata: &metadata,
            summary: &summary,
        };

        let markdown = GenericProcessor.render(&ctx);
        assert!(markdown.contains("# Example Title"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("* K1"));
        assert!(markdown.contains(" - tag-one"));
        assert!(markdown.contains("[Source](https://example.com/article)"));
    }
}
