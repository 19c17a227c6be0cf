//! Shared note-rendering helpers: filenames, folder paths, and the YAML
//! frontmatter block common to all processor templates.

use crate::models::{now_datetime, NoteSummary};

/// Converts a title to a clean filename stem: lowercase, punctuation
/// stripped, whitespace collapsed to single hyphens.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // swallow leading hyphens
    for ch in title.to_lowercase().chars() {
        if ch.is_alphanumeric() || ch == '_' {
            out.push(ch);
            last_was_hyphen = false;
        } else if (ch.is_whitespace() || ch == '-') && !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Deterministic, collision-avoided filename: length-capped sanitized title
/// plus the last 4 hex chars of the fingerprint.
pub fn note_filename(title: &str, fingerprint: &str) -> String {
    let capped: String = title.chars().take(50).collect();
    let base = sanitize_filename(&capped);
    let suffix = &fingerprint[fingerprint.len().saturating_sub(4)..];
    if base.is_empty() {
        format!("{}.md", suffix)
    } else {
        format!("{}-{}.md", base, suffix)
    }
}

/// Sanitizes a classification like `Research/Technology` into a relative
/// folder path: empty, absolute, and parent-traversal components dropped.
pub fn sanitize_folder(folder: &str) -> String {
    folder
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// YAML frontmatter shared by all note templates.
pub fn frontmatter(title: &str, url: &str, fingerprint: &str, tags: &[String]) -> String {
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&format!("title: \"{}\"\n", title.replace('"', "'")));
    out.push_str(&format!("url: {}\n", url));
    out.push_str(&format!("fingerprint: {}\n", fingerprint));
    out.push_str(&format!(
        "date: {}\n",
        now_datetime().format("%Y-%m-%dT%H:%M")
    ));
    out.push_str("tags:\n");
    for tag in tags {
        out.push_str(&format!(" - {}\n", tag));
    }
    out.push_str("---\n");
    out
}

/// `## Summary` and `## Key Points` sections from the structured output.
pub fn summary_sections(summary: &NoteSummary) -> String {
    let mut out = String::new();
    out.push_str("## Summary\n\n");
    out.push_str(&summary.summary);
    out.push('\n');
    if !summary.key_points.is_empty() {
        out.push_str("\n## Key Points\n\n");
        for point in &summary.key_points {
            out.push_str(&format!("* {}\n", point));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_punctuation_and_collapses_spaces() {
        assert_eq!(
            sanitize_filename("Hello, World: A Story!"),
            "hello-world-a-story"
        );
        assert_eq!(sanitize_filename("  spaced   out  "), "spaced-out");
        assert_eq!(sanitize_filename("already-hyphen--ated"), "already-hyphen-ated");
    }

    #[test]
    fn filename_caps_title_and_appends_fingerprint_suffix() {
        let fp = "aabbccddeeff00112233445566778899aabbccddeeff00112233445566778899";
        let name = note_filename(&"Long Title Word ".repeat(10), fp);
        assert!(name.ends_with("-8899.md"));
        // 50 title chars max before sanitization
        assert!(name.len() <= 50 + "-8899.md".len());
    }

    #[test]
    fn empty_title_still_yields_a_filename() {
        let fp = "0123456789abcdef";
        assert_eq!(note_filename("", fp), "cdef.md");
    }

    #[test]
    fn folder_sanitization_drops_traversal() {
        assert_eq!(
            sanitize_folder("Research/Technology"),
            "Research/Technology"
        );
        assert_eq!(sanitize_folder("../../etc"), "etc");
        assert_eq!(sanitize_folder("/absolute/path"), "absolute/path");
        assert_eq!(sanitize_folder(""), "");
    }

    #[test]
    fn frontmatter_lists_tags() {
        let fm = frontmatter(
            "T",
            "https://example.com",
            "ff",
            &["tag-one".to_string(), "rust".to_string()],
        );
        assert!(fm.starts_with("---\n"));
        assert!(fm.contains(" - tag-one\n"));
        assert!(fm.contains(" - rust\n"));
    }
}
