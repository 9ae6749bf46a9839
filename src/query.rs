//! Read side: source key + date -> stored documents.
//!
//! Source keys are the short names the dashboard uses (`hackernews`,
//! `github`, ...); each maps to one service namespace. `all` covers every
//! namespace. When nothing is stored for the requested date the lookup is
//! retried once at the most recent date any relevant namespace has.

use crate::error::QueryError;
use crate::models::{ContentItem, ContentResponse};
use crate::store::{ContentStore, DATE_FORMAT};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument};

/// Key that selects every source.
pub const ALL: &str = "all";

/// A source key, its service namespace, and its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub key: &'static str,
    pub service: &'static str,
    pub display_name: &'static str,
}

/// Known sources, in the order `all` returns them.
pub const SOURCES: [Source; 5] = [
    Source {
        key: "reddit",
        service: "reddit_explorer",
        display_name: "Reddit",
    },
    Source {
        key: "hackernews",
        service: "hacker_news",
        display_name: "Hacker News",
    },
    Source {
        key: "github",
        service: "github_trending",
        display_name: "GitHub Trending",
    },
    Source {
        key: "techfeed",
        service: "tech_feed",
        display_name: "Tech Feed",
    },
    Source {
        key: "paper",
        service: "paper_summarizer",
        display_name: "Papers",
    },
];

/// Look up a source by key.
pub fn source(key: &str) -> Option<&'static Source> {
    SOURCES.iter().find(|s| s.key == key)
}

/// Resolve a key to the sources it covers.
fn resolve(key: &str) -> Result<Vec<&'static Source>, QueryError> {
    if key == ALL {
        return Ok(SOURCES.iter().collect());
    }
    source(key)
        .map(|s| vec![s])
        .ok_or_else(|| QueryError::UnknownSource(key.to_string()))
}

/// Parse a `YYYY-MM-DD` query parameter.
pub fn parse_date(raw: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| QueryError::InvalidDate(raw.to_string()))
}

#[derive(Debug, Clone)]
pub struct QueryFacade {
    store: ContentStore,
}

impl QueryFacade {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Documents for `key` on `date` (today when absent), falling back to the latest date.
    pub async fn get(&self, key: &str, date: Option<&str>) -> Result<ContentResponse, QueryError> {
        self.get_on(key, date, Local::now().date_naive()).await
    }

    /// [`get`](Self::get) with an explicit notion of today.
    #[instrument(level = "info", skip(self))]
    pub async fn get_on(
        &self,
        key: &str,
        date: Option<&str>,
        today: NaiveDate,
    ) -> Result<ContentResponse, QueryError> {
        let sources = resolve(key)?;
        let date = match date {
            Some(raw) => parse_date(raw)?,
            None => today,
        };

        let items = self.items_on(&sources, date).await?;
        if !items.is_empty() {
            return Ok(ContentResponse { items });
        }

        let Some(latest) = self.latest_date(&sources).await? else {
            info!("No content stored for any requested source");
            return Err(QueryError::NoContent);
        };
        debug!(requested = %date, %latest, "Falling back to latest date");
        let items = self.items_on(&sources, latest).await?;
        if items.is_empty() {
            return Err(QueryError::NoContent);
        }
        Ok(ContentResponse { items })
    }

    async fn items_on(&self, sources: &[&Source], date: NaiveDate) -> Result<Vec<ContentItem>, QueryError> {
        let mut items = Vec::new();
        for source in sources {
            // an empty document counts as absent
            let content = self.store.read(source.service, date).await?;
            if let Some(content) = content.filter(|c| !c.is_empty()) {
                items.push(ContentItem {
                    title: format!("{} - {}", source.display_name, date.format(DATE_FORMAT)),
                    content,
                    url: None,
                    source: source.key.to_string(),
                });
            }
        }
        Ok(items)
    }

    async fn latest_date(&self, sources: &[&Source]) -> Result<Option<NaiveDate>, QueryError> {
        let mut latest = None;
        for source in sources {
            // list_dates is newest-first
            let newest = self.store.list_dates(source.service).await?.into_iter().next();
            latest = latest.max(newest);
        }
        Ok(latest)
    }
}
