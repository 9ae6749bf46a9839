//! GitHub Trending repository scraper.
//!
//! Scrapes `https://github.com/trending[/<language>]` for each configured
//! language. Languages in the `general` tier get the full limit, those in
//! the `specific` tier half of it. Repository descriptions are translated.

use super::{Collector, Enricher, TranslationStyle, fetch_text};
use crate::config::GithubTrendingConfig;
use crate::error::CollectorError;
use crate::llm::Generate;
use crate::models::{Digest, Item, ItemDetail, Section};
use crate::utils::{collapse_whitespace, upcase};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument, warn};

pub const SERVICE: &str = "github_trending";
/// Heading for the language-agnostic listing.
pub const ALL_LANGUAGES: &str = "All languages";

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("article.Box-row").expect("valid selector"));
static NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("h2 a").expect("valid selector"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));
static STARS: Lazy<Selector> = Lazy::new(|| Selector::parse("a.Link--muted").expect("valid selector"));

/// One row of the trending listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingRepo {
    /// `owner/name`.
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub stars: u64,
}

/// Parse up to `limit` repositories from a trending page.
pub fn parse_trending_page(html: &str, limit: usize) -> Vec<TrendingRepo> {
    let document = Html::parse_document(html);
    document
        .select(&ROW)
        .filter_map(|row| {
            let link = row.select(&NAME).next()?;
            let name: String = link
                .text()
                .collect::<String>()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let href = link.value().attr("href")?;
            let description = row
                .select(&DESCRIPTION)
                .next()
                .map(|p| collapse_whitespace(&p.text().collect::<String>()))
                .filter(|d| !d.is_empty());
            let stars = row
                .select(&STARS)
                .next()
                .map(|a| parse_stars(&a.text().collect::<String>()))
                .unwrap_or(0);
            Some(TrendingRepo {
                name,
                url: format!("https://github.com{href}"),
                description,
                stars,
            })
        })
        .take(limit)
        .collect()
}

/// `" 12,345 "` -> 12345; anything non-numeric -> 0.
fn parse_stars(raw: &str) -> u64 {
    raw.trim().replace(',', "").parse().unwrap_or(0)
}

/// Heading used for a language filter.
pub fn language_heading(language: &str) -> String {
    if language.is_empty() {
        ALL_LANGUAGES.to_string()
    } else {
        upcase(language)
    }
}

pub struct GithubTrending<'a, G> {
    config: &'a GithubTrendingConfig,
    http: reqwest::Client,
    enricher: Enricher<'a, G>,
}

impl<'a, G: Generate> GithubTrending<'a, G> {
    pub fn new(config: &'a GithubTrendingConfig, http: reqwest::Client, enricher: Enricher<'a, G>) -> Self {
        Self { config, http, enricher }
    }

    fn language_url(&self, language: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if language.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{language}")
        }
    }

    #[instrument(level = "info", skip(self), fields(service = SERVICE))]
    async fn language_section(&self, language: &str, limit: usize) -> Option<Section> {
        let url = self.language_url(language);
        let html = match fetch_text(&self.http, &url).await {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, %url, "Trending page fetch failed");
                return None;
            }
        };
        let repos = parse_trending_page(&html, limit);
        info!(count = repos.len(), %url, "Parsed trending repositories");

        let mut items = Vec::with_capacity(repos.len());
        for repo in repos {
            let description = match repo.description {
                Some(d) => Some(self.enricher.translate(&d, TranslationStyle::Repository).await),
                None => None,
            };
            debug!(name = %repo.name, stars = repo.stars, "Repository");
            items.push(Item {
                title: repo.name,
                url: Some(repo.url),
                detail: ItemDetail::Repository {
                    description,
                    stars: repo.stars,
                },
            });
        }
        Some(Section::with_items(language_heading(language), items))
    }
}

impl<G: Generate> Collector for GithubTrending<'_, G> {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn collect(&self, limit: usize, today: NaiveDate) -> Result<Option<Digest>, CollectorError> {
        let mut digest = Digest::new(SERVICE, today, format!("GitHub Trending ({today})"));

        let tiers = [(&self.config.general, limit), (&self.config.specific, limit / 2)];
        for (languages, tier_limit) in tiers {
            for language in languages {
                if let Some(section) = self.language_section(language, tier_limit).await {
                    digest.sections.push(section);
                }
            }
        }

        if digest.item_count() == 0 {
            warn!("No trending repositories collected");
            return Ok(None);
        }
        Ok(Some(digest))
    }
}
