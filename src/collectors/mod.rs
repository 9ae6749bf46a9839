//! Collectors that turn one external source into one dated digest.
//!
//! Each collector follows the same pipeline:
//!
//! 1. **Fetching**: pull up to `limit` items (per language, subreddit or feed)
//! 2. **Enriching**: translate and summarize through the LLM, per item
//! 3. **Output**: build a [`Digest`] and publish it for today
//!
//! # Supported Sources
//!
//! | Source | Module | Service namespace | Method |
//! |--------|--------|-------------------|--------|
//! | GitHub Trending | [`github_trending`] | `github_trending` | HTML scraping |
//! | Hacker News | [`hacker_news`] | `hacker_news` | Firebase API + linked page |
//! | Reddit | [`reddit_explorer`] | `reddit_explorer` | OAuth API |
//! | Tech blogs | [`tech_feed`] | `tech_feed` | RSS/Atom feeds + linked page |
//! | arXiv papers | [`paper_summarizer`] | `paper_summarizer` | Curated listing + arXiv API |
//!
//! # Failure Policy
//!
//! A failed fetch of one item is logged and the item is skipped. A failed
//! translation keeps the original text; a failed summary becomes an inline
//! error string. Only failures that leave nothing to publish, and storage
//! failures, end a run with an error.

pub mod github_trending;
pub mod hacker_news;
pub mod paper_summarizer;
pub mod reddit_explorer;
pub mod tech_feed;

use crate::config::HttpConfig;
use crate::error::CollectorError;
use crate::llm::{Generate, GenerationRequest};
use crate::models::Digest;
use crate::outputs;
use crate::store::ContentStore;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Temperature used for translations and summaries.
const ENRICH_TEMPERATURE: f64 = 0.3;
const ENRICH_MAX_TOKENS: u32 = 1000;

/// One external source.
pub trait Collector {
    /// Service namespace the digest is stored under.
    fn service_name(&self) -> &'static str;

    /// Fetch and enrich up to `limit` items and build the digest for `today`.
    ///
    /// `Ok(None)` means there was nothing worth storing.
    async fn collect(&self, limit: usize, today: NaiveDate)
    -> Result<Option<Digest>, CollectorError>;

    /// Called once the outcome of [`collect`](Self::collect) is settled: after
    /// the digest was stored, or when there was nothing to store. Never called
    /// when storing failed.
    async fn commit(&self, _today: NaiveDate) -> Result<(), CollectorError> {
        Ok(())
    }
}

/// Run `collector` and publish its digest. Returns the written path, if any.
#[instrument(level = "info", skip_all, fields(service = collector.service_name(), limit))]
pub async fn run<C: Collector>(
    collector: &C,
    store: &ContentStore,
    limit: usize,
    today: NaiveDate,
) -> Result<Option<PathBuf>, CollectorError> {
    let started = std::time::Instant::now();
    let Some(digest) = collector.collect(limit, today).await? else {
        info!("Nothing to store");
        collector.commit(today).await?;
        return Ok(None);
    };
    let path = outputs::publish(store, &digest).await?;
    collector.commit(today).await?;
    info!(
        items = digest.item_count(),
        elapsed_ms = started.elapsed().as_millis(),
        "Collector run complete"
    );
    Ok(Some(path))
}

/// Run `collector` as one step of a batch.
///
/// Fetch and parse failures are logged and swallowed so the next collector
/// can run; storage failures are returned.
pub async fn run_step<C: Collector>(
    collector: &C,
    store: &ContentStore,
    limit: usize,
    today: NaiveDate,
) -> Result<Option<PathBuf>, CollectorError> {
    let service = collector.service_name();
    match run(collector, store, limit, today).await {
        Ok(Some(path)) => {
            info!(service, path = %path.display(), "Stored digest");
            Ok(Some(path))
        }
        Ok(None) => {
            warn!(service, "No items collected");
            Ok(None)
        }
        Err(CollectorError::Store(e)) => Err(CollectorError::Store(e)),
        Err(e) => {
            error!(service, error = %e, "Collector failed; continuing");
            Ok(None)
        }
    }
}

/// HTTP client shared by the scrapers.
pub fn http_client(config: &HttpConfig) -> Result<reqwest::Client, CollectorError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?)
}

/// GET `url` and return the body, failing on non-2xx statuses.
pub async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    http.get(url).send().await?.error_for_status()?.text().await
}

/// How a translation prompt should treat terminology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStyle {
    /// News titles and posts: keep the nuance, read naturally.
    General,
    /// Repository descriptions: technical terms may stay untranslated.
    Repository,
    /// Blog posts and forum threads: translate terms, keep the original in parentheses.
    Technical,
    /// Paper titles and abstracts.
    Academic,
}

/// LLM-backed translation and summarization with per-call fallback.
pub struct Enricher<'a, G> {
    llm: &'a G,
    target_language: String,
}

impl<'a, G: Generate> Enricher<'a, G> {
    pub fn new(llm: &'a G, target_language: &str) -> Self {
        Self {
            llm,
            target_language: target_language.to_string(),
        }
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Translate `text`; on failure the original text is returned unchanged.
    pub async fn translate(&self, text: &str, style: TranslationStyle) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        let request = GenerationRequest::new(self.translation_prompt(text, style))
            .temperature(ENRICH_TEMPERATURE)
            .max_tokens(ENRICH_MAX_TOKENS);
        match self.llm.generate(&request).await {
            Ok(translated) => translated.trim().to_string(),
            Err(e) => {
                warn!(error = %e, chars = text.chars().count(), "Translation failed; keeping original text");
                text.to_string()
            }
        }
    }

    /// Translate long text piecewise in `chunk_chars`-sized chunks.
    ///
    /// Each chunk falls back independently.
    pub async fn translate_chunked(
        &self,
        text: &str,
        style: TranslationStyle,
        chunk_chars: usize,
    ) -> String {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= chunk_chars {
            return self.translate(text, style).await;
        }
        let mut out = String::new();
        for chunk in chars.chunks(chunk_chars.max(1)) {
            let chunk: String = chunk.iter().collect();
            out.push_str(&self.translate(&chunk, style).await);
        }
        out
    }

    /// Ask for a summary; on failure an inline error message is returned.
    pub async fn summarize(&self, prompt: String, system_instruction: String) -> String {
        let request = GenerationRequest::new(prompt)
            .system(system_instruction)
            .temperature(ENRICH_TEMPERATURE)
            .max_tokens(ENRICH_MAX_TOKENS);
        match self.llm.generate(&request).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Summary generation failed");
                format!("Error while generating summary: {e}")
            }
        }
    }

    /// System instruction shared by every summary request.
    pub fn summary_system(&self, subject: &str) -> String {
        format!(
            "You are an assistant that summarizes {subject}.\n\
             Analyze the given material and write a concise, information-dense summary.\n\
             Keep technical content precise and general content easy to follow.\n\
             Always answer in {lang}. Translate technical terms appropriately and keep \
             the English term in parentheses where helpful.",
            lang = self.target_language
        )
    }

    fn translation_prompt(&self, text: &str, style: TranslationStyle) -> String {
        let lang = &self.target_language;
        let instruction = match style {
            TranslationStyle::General => format!(
                "Translate the following English text into natural {lang}. \
                 Keep the nuance of the original while making it read naturally in {lang}."
            ),
            TranslationStyle::Repository => format!(
                "Translate the following English text into natural {lang}. \
                 Technical terms may be left as they are."
            ),
            TranslationStyle::Technical => format!(
                "Translate the following English text into natural {lang}. \
                 Translate technical terms and proper nouns appropriately, keeping the \
                 English original in parentheses where needed."
            ),
            TranslationStyle::Academic => format!(
                "Translate the following text from an academic paper into natural {lang}. \
                 Translate technical terms appropriately, keeping the English original in \
                 parentheses where needed."
            ),
        };
        format!("{instruction}\n\n{text}")
    }
}
