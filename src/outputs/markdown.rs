//! Markdown rendering of a [`Digest`].
//!
//! The shape is fixed because readers (and older tooling) rely on it:
//!
//! ```text
//! # {title}
//!
//! ## {section}
//!
//! ### [{item title}]({url})
//!
//! {detail lines}
//!
//! ---
//! ```
//!
//! Nested sections go one level deeper, and items always sit one level
//! below the section that holds them. Sections without items are omitted.

use crate::models::{Digest, Item, ItemDetail, Section};
use crate::utils::preview;

/// Story bodies are cut to this many characters.
const STORY_PREVIEW_CHARS: usize = 500;
/// Reddit self-text is cut to this many characters.
const POST_PREVIEW_CHARS: usize = 200;

/// Render a whole digest.
pub fn digest_to_markdown(digest: &Digest) -> String {
    let mut md = format!("# {}\n\n", digest.title);
    for section in &digest.sections {
        write_section(&mut md, section, 2);
    }
    md
}

fn write_section(md: &mut String, section: &Section, level: usize) {
    if section.item_count() == 0 {
        return;
    }
    md.push_str(&format!("{} {}\n\n", "#".repeat(level), section.heading));
    for item in &section.items {
        write_item(md, item, level + 1);
    }
    for sub in &section.subsections {
        write_section(md, sub, level + 1);
    }
}

fn write_item(md: &mut String, item: &Item, level: usize) {
    let heading = match &item.url {
        Some(url) => format!("[{}]({})", item.title, url),
        None => item.title.clone(),
    };
    md.push_str(&format!("{} {}\n\n", "#".repeat(level), heading));

    match &item.detail {
        ItemDetail::Repository { description, stars } => {
            if let Some(description) = description {
                md.push_str(&format!("{description}\n\n"));
            }
            md.push_str(&format!("⭐ Stars: {stars}\n\n"));
        }
        ItemDetail::Story { score, text } => {
            md.push_str(&format!("Score: {score}\n\n"));
            if let Some(text) = text {
                md.push_str(&format!("{}\n\n", preview(text, STORY_PREVIEW_CHARS)));
            }
        }
        ItemDetail::RedditPost {
            upvotes,
            text,
            link,
            summary,
            ..
        } => {
            if let Some(link) = link {
                md.push_str(&format!("Link: {link}\n\n"));
            }
            if !text.is_empty() {
                md.push_str(&format!("Text: {}\n\n", preview(text, POST_PREVIEW_CHARS)));
            }
            md.push_str(&format!("Upvotes: {upvotes}\n\n"));
            md.push_str(&format!("**Summary**:\n{summary}\n\n"));
        }
        ItemDetail::Article { feed_name, summary } => {
            md.push_str(&format!("**Feed**: {feed_name}\n\n"));
            md.push_str(&format!("**Summary**:\n{summary}\n\n"));
        }
        ItemDetail::Paper {
            abstract_text,
            summary,
        } => {
            md.push_str(&format!("**Abstract**:\n{abstract_text}\n\n"));
            md.push_str(&format!("**Summary**:\n{summary}\n\n"));
        }
    }

    md.push_str("---\n\n");
}
