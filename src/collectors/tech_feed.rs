//! Tech blog articles from RSS/Atom feeds.
//!
//! Feeds are grouped into categories. Each feed is filtered to recent
//! entries, then every entry's page is fetched for body text before the
//! article is translated and summarized.

use super::{Collector, Enricher, TranslationStyle, fetch_text};
use crate::config::TechFeedConfig;
use crate::error::CollectorError;
use crate::llm::Generate;
use crate::models::{Digest, Item, ItemDetail, Section};
use crate::utils::{extract_page_text, html_to_text, truncate_chars, upcase};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use feed_rs::model::Entry;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub const SERVICE: &str = "tech_feed";
/// Body text sent to the summarizer is capped at this many characters.
const SUMMARY_INPUT_CHARS: usize = 2000;

/// Keep entries published within `days` of `now`, capped at `limit`.
///
/// The published date is preferred over the updated date. Entries with
/// neither are kept.
pub fn filter_entries(entries: Vec<Entry>, days: i64, limit: usize, now: DateTime<Utc>) -> Vec<Entry> {
    let cutoff = now - Duration::days(days);
    entries
        .into_iter()
        .filter(|entry| match entry.published.or(entry.updated) {
            Some(date) => date >= cutoff,
            None => true,
        })
        .take(limit)
        .collect()
}

/// Resolve a possibly relative entry link against the feed URL.
pub fn resolve_link(feed_url: &str, href: &str) -> String {
    Url::parse(feed_url)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// `machine_learning` -> `Machine learning`.
pub fn category_heading(name: &str) -> String {
    upcase(&name.replace('_', " "))
}

/// An article before enrichment.
#[derive(Debug, Clone)]
struct RawArticle {
    title: String,
    url: String,
    text: String,
}

pub struct TechFeed<'a, G> {
    config: &'a TechFeedConfig,
    http: reqwest::Client,
    enricher: Enricher<'a, G>,
}

impl<'a, G: Generate> TechFeed<'a, G> {
    pub fn new(config: &'a TechFeedConfig, http: reqwest::Client, enricher: Enricher<'a, G>) -> Self {
        Self { config, http, enricher }
    }

    /// Feed name and its recent entries.
    #[instrument(level = "info", skip(self))]
    async fn load_feed(&self, feed_url: &str, limit: usize) -> Result<(String, Vec<Entry>), CollectorError> {
        let bytes = self
            .http
            .get(feed_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let feed = feed_rs::parser::parse(&bytes[..]).map_err(|e| CollectorError::Parse(e.to_string()))?;
        let name = feed
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| feed_url.to_string());
        let total = feed.entries.len();
        let entries = filter_entries(feed.entries, self.config.days, limit, Utc::now());
        info!(feed = %name, total, kept = entries.len(), "Parsed feed");
        Ok((name, entries))
    }

    /// Fetch the entry's page and pick its body text; `None` skips the entry.
    async fn article(&self, feed_url: &str, entry: Entry) -> Option<RawArticle> {
        let Some(url) = entry.links.first().map(|l| resolve_link(feed_url, &l.href)) else {
            debug!(id = %entry.id, "Entry without link skipped");
            return None;
        };
        let html = match fetch_text(&self.http, &url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, %url, "Article fetch failed");
                return None;
            }
        };
        let title = entry
            .title
            .map(|t| t.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string());
        let text = entry
            .summary
            .map(|s| html_to_text(&s.content))
            .filter(|s| !s.is_empty())
            .or_else(|| extract_page_text(&html))
            .unwrap_or_default();
        Some(RawArticle { title, url, text })
    }

    async fn enrich(&self, feed_name: &str, article: RawArticle) -> Item {
        let title = self.enricher.translate(&article.title, TranslationStyle::Technical).await;
        let text = self.enricher.translate(&article.text, TranslationStyle::Technical).await;
        let prompt = format!(
            "Summarize the following tech blog article.\n\n\
             Title: {title}\n\
             Body: {body}\n\n\
             Answer in {lang} using this outline:\n\
             1. Main content of the article (1-2 sentences)\n\
             2. Key points (3-5 bullet points)\n\
             3. Technical insights",
            body = truncate_chars(&text, SUMMARY_INPUT_CHARS),
            lang = self.enricher.target_language()
        );
        let summary = self
            .enricher
            .summarize(prompt, self.enricher.summary_system("tech blog articles"))
            .await;
        Item {
            title,
            url: Some(article.url),
            detail: ItemDetail::Article {
                feed_name: feed_name.to_string(),
                summary,
            },
        }
    }
}

impl<G: Generate> Collector for TechFeed<'_, G> {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn collect(&self, limit: usize, today: NaiveDate) -> Result<Option<Digest>, CollectorError> {
        let mut digest = Digest::new(SERVICE, today, format!("Tech Blog Articles ({today})"));

        for category in &self.config.categories {
            info!(category = %category.name, "Processing category");
            let mut items = Vec::new();
            for feed_url in &category.sources {
                let (feed_name, entries) = match self.load_feed(feed_url, limit).await {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        error!(error = %e, %feed_url, "Feed processing failed");
                        continue;
                    }
                };
                for entry in entries {
                    if let Some(article) = self.article(feed_url, entry).await {
                        items.push(self.enrich(&feed_name, article).await);
                    }
                }
            }
            digest
                .sections
                .push(Section::with_items(category_heading(&category.name), items));
        }

        info!(count = digest.item_count(), "Collected articles");
        if digest.item_count() == 0 {
            warn!("No articles to store");
            return Ok(None);
        }
        Ok(Some(digest))
    }
}
