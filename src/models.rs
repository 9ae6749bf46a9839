//! Data models for collected items and the documents built from them.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Digest`]: one day's output of one collector, the unit of persistence
//! - [`Section`] / [`Item`]: grouping and entries inside a digest
//! - [`ItemDetail`]: per-source payload of an item, as a tagged union
//! - [`PostKind`]: the classified type of a Reddit post
//! - [`ContentItem`]: the API-level view of a stored document
//!
//! Markdown is rendered from a [`Digest`] (see `outputs::markdown`); the
//! digest itself is stored as JSON next to the Markdown so downstream jobs
//! never have to re-parse rendered text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One collector's document for one date.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Digest {
    /// Service namespace the digest is stored under (e.g. `hacker_news`).
    pub service: String,
    /// Calendar date the digest belongs to.
    pub date: NaiveDate,
    /// Document title, rendered as the level-1 heading.
    pub title: String,
    /// Top-level groups, rendered as level-2 headings.
    pub sections: Vec<Section>,
}

impl Digest {
    pub fn new(service: &str, date: NaiveDate, title: impl Into<String>) -> Self {
        Self {
            service: service.to_string(),
            date,
            title: title.into(),
            sections: Vec::new(),
        }
    }

    /// Total number of items across all sections and subsections.
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(Section::item_count).sum()
    }

    /// Look up a top-level section by heading.
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }

    /// Every item in document order.
    pub fn items(&self) -> Vec<&Item> {
        let mut out = Vec::new();
        for section in &self.sections {
            section.collect_items(&mut out);
        }
        out
    }
}

/// A heading with its items and optional nested groups.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Section {
    pub heading: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            items: Vec::new(),
            subsections: Vec::new(),
        }
    }

    pub fn with_items(heading: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            heading: heading.into(),
            items,
            subsections: Vec::new(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len() + self.subsections.iter().map(Section::item_count).sum::<usize>()
    }

    fn collect_items<'a>(&'a self, out: &mut Vec<&'a Item>) {
        out.extend(self.items.iter());
        for sub in &self.subsections {
            sub.collect_items(out);
        }
    }
}

/// A single collected entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Item {
    pub title: String,
    pub url: Option<String>,
    pub detail: ItemDetail,
}

/// Source-specific payload of an [`Item`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDetail {
    /// A trending GitHub repository.
    Repository {
        description: Option<String>,
        stars: u64,
    },
    /// A Hacker News story.
    Story { score: i64, text: Option<String> },
    /// A Reddit post with its LLM summary.
    RedditPost {
        post_kind: PostKind,
        upvotes: i64,
        text: String,
        link: Option<String>,
        summary: String,
    },
    /// An article discovered through an RSS/Atom feed.
    Article { feed_name: String, summary: String },
    /// An arXiv paper.
    Paper {
        abstract_text: String,
        summary: String,
    },
}

/// Type of a Reddit post, as decided by `collectors::reddit_explorer::classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Image,
    Gallery,
    Video,
    Poll,
    Crosspost,
    Text,
    Link,
}

/// A stored document as served by the HTTP API.
///
/// Field names follow the JSON schema the dashboard consumes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentItem {
    /// Generated title, e.g. `"Hacker News - 2024-01-01"`.
    pub title: String,
    /// The whole Markdown document.
    pub content: String,
    /// Related URL; stored documents have none.
    pub url: Option<String>,
    /// Source key the item was requested under (e.g. `hackernews`).
    pub source: String,
}

/// Response body of `GET /api/content/{source}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentResponse {
    pub items: Vec<ContentItem>,
}
