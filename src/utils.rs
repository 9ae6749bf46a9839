//! Utility functions for text extraction, string manipulation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Best-effort body extraction from arbitrary HTML pages
//! - Character-safe truncation for previews and logging
//! - Heading capitalisation
//! - File system validation for the data directory

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).expect("valid selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));
static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").expect("valid selector"));

/// Paragraphs shorter than this are treated as boilerplate.
const MEANINGFUL_PARAGRAPH_CHARS: usize = 50;
/// Cap on text taken from an `<article>` element.
const ARTICLE_FALLBACK_CHARS: usize = 500;

/// Extract a short body for a linked page.
///
/// Tried in order:
/// 1. `<meta name="description">`, then `<meta property="og:description">`
/// 2. Up to three of the first five paragraphs longer than 50 characters
/// 3. The first paragraph
/// 4. The first 500 characters of the `<article>` element
///
/// Returns `None` when nothing usable was found.
pub fn extract_body_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(description) = meta_description(&document, true) {
        return Some(description);
    }

    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .collect();

    if !paragraphs.is_empty() {
        let meaningful: Vec<&str> = paragraphs
            .iter()
            .take(5)
            .filter(|p| p.chars().count() > MEANINGFUL_PARAGRAPH_CHARS)
            .map(String::as_str)
            .take(3)
            .collect();
        let text = if meaningful.is_empty() {
            paragraphs[0].clone()
        } else {
            meaningful.join(" ")
        };
        if !text.is_empty() {
            return Some(text);
        }
    }

    document
        .select(&ARTICLE)
        .next()
        .map(|article| truncate_chars(&article.text().collect::<String>(), ARTICLE_FALLBACK_CHARS))
        .filter(|text| !text.trim().is_empty())
}

/// Extract page text for a feed entry that has no summary of its own:
/// the meta description, else the first five paragraphs joined by newlines.
pub fn extract_page_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(description) = meta_description(&document, false) {
        return Some(description);
    }

    let text = document
        .select(&PARAGRAPH)
        .take(5)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    (!text.trim().is_empty()).then_some(text)
}

fn meta_description(document: &Html, include_open_graph: bool) -> Option<String> {
    let element = document.select(&META_DESCRIPTION).next().or_else(|| {
        if include_open_graph {
            document.select(&OG_DESCRIPTION).next()
        } else {
            None
        }
    })?;
    element
        .value()
        .attr("content")
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// Strip markup from an HTML fragment (feed summaries, Hacker News text).
pub fn html_to_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    collapse_whitespace(&parsed.root_element().text().collect::<Vec<_>>().join(" "))
}

/// Replace every run of whitespace with a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Keep at most `max` characters of `s`, appending `...` when cut.
pub fn preview(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", truncate_chars(s, max))
    } else {
        s.to_string()
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Capitalize the first character of a string.
///
/// Used for section headings (e.g. "python" -> "Python").
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and removes a
/// probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Data directory is writable");
    Ok(())
}
