//! Hacker News top stories.
//!
//! Uses the public Firebase API (`topstories.json`, `item/<id>.json`). When a
//! story links elsewhere and carries no text of its own, a short body is
//! extracted from the linked page (see [`crate::utils::extract_body_text`]).

use super::{Collector, Enricher, TranslationStyle, fetch_text};
use crate::config::HackerNewsConfig;
use crate::error::CollectorError;
use crate::llm::Generate;
use crate::models::{Digest, Item, ItemDetail, Section};
use crate::utils::{extract_body_text, html_to_text};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

pub const SERVICE: &str = "hacker_news";
pub const SECTION: &str = "Top Stories";
/// Story bodies longer than this are translated piecewise.
const TRANSLATION_CHUNK_CHARS: usize = 1000;

/// The fields of an HN item we use.
#[derive(Debug, Clone, Deserialize)]
pub struct HnItem {
    pub title: Option<String>,
    #[serde(default)]
    pub score: i64,
    pub url: Option<String>,
    /// HTML fragment (Ask HN, Show HN).
    pub text: Option<String>,
}

/// A story ready for enrichment.
#[derive(Debug, Clone, PartialEq)]
struct Story {
    title: String,
    score: i64,
    url: Option<String>,
    text: Option<String>,
}

pub struct HackerNews<'a, G> {
    config: &'a HackerNewsConfig,
    http: reqwest::Client,
    enricher: Enricher<'a, G>,
}

impl<'a, G: Generate> HackerNews<'a, G> {
    pub fn new(config: &'a HackerNewsConfig, http: reqwest::Client, enricher: Enricher<'a, G>) -> Self {
        Self { config, http, enricher }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    #[instrument(level = "info", skip(self))]
    async fn top_story_ids(&self, limit: usize) -> Result<Vec<u64>, CollectorError> {
        let ids: Vec<u64> = self
            .http
            .get(self.api("topstories.json"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(available = ids.len(), "Fetched top story ids");
        Ok(ids.into_iter().take(limit).collect())
    }

    async fn fetch_item(&self, id: u64) -> Result<Option<HnItem>, reqwest::Error> {
        self.http
            .get(self.api(&format!("item/{id}.json")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Best-effort body for a linked story; failures leave it empty.
    #[instrument(level = "debug", skip(self))]
    async fn linked_body(&self, url: &str) -> Option<String> {
        match fetch_text(&self.http, url).await {
            Ok(html) => extract_body_text(&html),
            Err(e) => {
                warn!(error = %e, %url, "Linked page fetch failed");
                None
            }
        }
    }

    async fn story(&self, id: u64) -> Option<Story> {
        let item = match self.fetch_item(id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                warn!(id, "Item not found");
                return None;
            }
            Err(e) => {
                error!(error = %e, id, "Item fetch failed");
                return None;
            }
        };
        let Some(title) = item.title else {
            debug!(id, "Item without title skipped");
            return None;
        };
        let mut text = item
            .text
            .as_deref()
            .map(html_to_text)
            .filter(|t| !t.is_empty());
        if text.is_none() {
            if let Some(url) = item.url.as_deref() {
                text = self.linked_body(url).await;
            }
        }
        Some(Story {
            title,
            score: item.score,
            url: item.url,
            text,
        })
    }

    async fn enrich(&self, story: Story) -> Item {
        let title = self.enricher.translate(&story.title, TranslationStyle::General).await;
        let text = match story.text {
            Some(text) => Some(
                self.enricher
                    .translate_chunked(&text, TranslationStyle::General, TRANSLATION_CHUNK_CHARS)
                    .await,
            ),
            None => None,
        };
        Item {
            title,
            url: story.url,
            detail: ItemDetail::Story {
                score: story.score,
                text,
            },
        }
    }
}

impl<G: Generate> Collector for HackerNews<'_, G> {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn collect(&self, limit: usize, today: NaiveDate) -> Result<Option<Digest>, CollectorError> {
        let ids = self.top_story_ids(limit).await?;

        let stories: Vec<Story> = stream::iter(ids)
            .then(|id| self.story(id))
            .filter_map(std::future::ready)
            .collect()
            .await;
        info!(count = stories.len(), "Fetched stories");

        let mut items = Vec::with_capacity(stories.len());
        for story in stories {
            items.push(self.enrich(story).await);
        }
        if items.is_empty() {
            warn!("No stories collected");
            return Ok(None);
        }

        let mut digest = Digest::new(SERVICE, today, format!("Hacker News Top Stories ({today})"));
        digest.sections.push(Section::with_items(SECTION, items));
        Ok(Some(digest))
    }
}
