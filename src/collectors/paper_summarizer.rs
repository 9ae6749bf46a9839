//! arXiv paper summaries.
//!
//! Paper identifiers come from a curated listing page. Identifiers already
//! processed today are skipped (see the `arxiv_ids` ledger), the rest are
//! looked up through the arXiv Atom API, translated and summarized.
//!
//! The ledger is only extended in [`Collector::commit`], so identifiers of
//! a run whose digest could not be stored are retried on the next run.

use super::{Collector, Enricher, TranslationStyle, fetch_text};
use crate::config::PaperSummarizerConfig;
use crate::error::CollectorError;
use crate::llm::Generate;
use crate::models::{Digest, Item, ItemDetail, Section};
use crate::store::ContentStore;
use crate::utils::collapse_whitespace;
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Mutex;
use tracing::{error, info, instrument, warn};

pub const SERVICE: &str = "paper_summarizer";
pub const SECTION: &str = "Papers";
/// Ledger of identifiers handled on a given day.
pub const LEDGER: &str = "arxiv_ids";

static PAPER_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href^='/papers/']").expect("valid selector"));
static PAPER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/papers/(\d+\.\d+)").expect("valid regex"));

/// Unique arXiv identifiers linked from the listing, in page order, at most `limit`.
pub fn extract_paper_ids(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&PAPER_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| PAPER_ID.captures(href).map(|c| c[1].to_string()))
        .unique()
        .take(limit)
        .collect()
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    title: String,
    #[serde(default)]
    summary: String,
}

/// Metadata of one paper.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperMeta {
    /// Entry id, e.g. `http://arxiv.org/abs/1706.03762v7`.
    pub url: String,
    pub title: String,
    pub abstract_text: String,
}

/// Parse the first entry of an arXiv API response.
pub fn parse_arxiv_response(xml: &str) -> Result<Option<PaperMeta>, CollectorError> {
    let feed: AtomFeed = quick_xml::de::from_str(xml).map_err(|e| CollectorError::Parse(e.to_string()))?;
    Ok(feed.entries.into_iter().next().map(|entry| PaperMeta {
        url: entry.id.trim().to_string(),
        title: collapse_whitespace(&entry.title),
        abstract_text: collapse_whitespace(&entry.summary),
    }))
}

pub struct PaperSummarizer<'a, G> {
    config: &'a PaperSummarizerConfig,
    store: &'a ContentStore,
    http: reqwest::Client,
    enricher: Enricher<'a, G>,
    /// Identifiers looked up by the last `collect`, awaiting `commit`.
    attempted: Mutex<Vec<String>>,
}

impl<'a, G: Generate> PaperSummarizer<'a, G> {
    pub fn new(
        config: &'a PaperSummarizerConfig,
        store: &'a ContentStore,
        http: reqwest::Client,
        enricher: Enricher<'a, G>,
    ) -> Self {
        Self {
            config,
            store,
            http,
            enricher,
            attempted: Mutex::new(Vec::new()),
        }
    }

    fn attempted(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.attempted.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[instrument(level = "info", skip(self))]
    async fn curated_ids(&self, limit: usize, today: NaiveDate) -> Result<Vec<String>, CollectorError> {
        let html = fetch_text(&self.http, &self.config.listing_url).await?;
        let ids = extract_paper_ids(&html, limit);
        let processed = self.store.load_ledger(SERVICE, LEDGER, today).await?;
        let fresh: Vec<String> = ids.into_iter().filter(|id| !processed.contains(id)).collect();
        info!(count = fresh.len(), already_processed = processed.len(), "Curated paper ids");
        Ok(fresh)
    }

    async fn paper(&self, id: &str) -> Option<PaperMeta> {
        let response = self
            .http
            .get(&self.config.arxiv_api_url)
            .query(&[("id_list", id)])
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let xml = match response {
            Ok(r) => match r.text().await {
                Ok(xml) => xml,
                Err(e) => {
                    error!(error = %e, id, "arXiv response unreadable");
                    return None;
                }
            },
            Err(e) => {
                error!(error = %e, id, "arXiv lookup failed");
                return None;
            }
        };
        match parse_arxiv_response(&xml) {
            Ok(Some(meta)) => Some(meta),
            Ok(None) => {
                warn!(id, "arXiv returned no entry");
                None
            }
            Err(e) => {
                error!(error = %e, id, "arXiv response malformed");
                None
            }
        }
    }

    async fn enrich(&self, meta: PaperMeta) -> Item {
        let title = self.enricher.translate(&meta.title, TranslationStyle::Academic).await;
        let abstract_text = self
            .enricher
            .translate(&meta.abstract_text, TranslationStyle::Academic)
            .await;
        let prompt = format!(
            "Summarize the following paper.\n\n\
             Title: {title}\n\
             Abstract: {abstract_text}\n\n\
             Answer in {lang} using this outline:\n\
             1. Purpose and background of the research\n\
             2. Overview of the proposed method\n\
             3. Main results and contributions\n\
             4. Implications for future research",
            lang = self.enricher.target_language()
        );
        let summary = self
            .enricher
            .summarize(prompt, self.enricher.summary_system("academic papers"))
            .await;
        Item {
            title,
            url: Some(meta.url),
            detail: ItemDetail::Paper { abstract_text, summary },
        }
    }
}

impl<G: Generate> Collector for PaperSummarizer<'_, G> {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn collect(&self, limit: usize, today: NaiveDate) -> Result<Option<Digest>, CollectorError> {
        let ids = self.curated_ids(limit, today).await?;

        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(meta) = self.paper(id).await {
                items.push(self.enrich(meta).await);
            }
        }
        *self.attempted() = ids;

        if items.is_empty() {
            warn!("No papers to store");
            return Ok(None);
        }
        let mut digest = Digest::new(SERVICE, today, format!("arXiv Paper Summaries ({today})"));
        digest.sections.push(Section::with_items(SECTION, items));
        Ok(Some(digest))
    }

    async fn commit(&self, today: NaiveDate) -> Result<(), CollectorError> {
        let ids = std::mem::take(&mut *self.attempted());
        if ids.is_empty() {
            return Ok(());
        }
        let ledger = self.store.append_ledger(SERVICE, LEDGER, today, &ids).await?;
        info!(recorded = ids.len(), total = ledger.len(), "Updated processed-id ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::test_support::FakeLlm;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = r#"<html><body>
        <a href="/papers/2405.00001">First</a>
        <a href="/papers/2405.00001#community">First again</a>
        <a href="/papers/trending">not a paper</a>
        <a href="/papers/2405.00002">Second</a>
        <a href="/models/foo">model</a>
        <a href="/papers/2405.00003">Third</a>
    </body></html>"#;

    fn atom(id: &str, title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
  <link href="http://arxiv.org/api/query?id_list={id}" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: id_list={id}</title>
  <id>http://arxiv.org/api/query-id</id>
  <updated>2025-05-06T00:00:00-04:00</updated>
  <opensearch:totalResults>1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/{id}v1</id>
    <updated>2025-05-01T17:59:59Z</updated>
    <published>2025-05-01T17:59:59Z</published>
    <title>{title}</title>
    <summary>  We study
      things.
    </summary>
    <author><name>A. Author</name></author>
    <link href="http://arxiv.org/abs/{id}v1" rel="alternate" type="text/html"/>
  </entry>
</feed>"#
        )
    }

    #[test]
    fn test_extract_paper_ids_unique_and_limited() {
        assert_eq!(
            extract_paper_ids(LISTING, 10),
            vec!["2405.00001", "2405.00002", "2405.00003"]
        );
        assert_eq!(extract_paper_ids(LISTING, 2), vec!["2405.00001", "2405.00002"]);
    }

    #[test]
    fn test_parse_arxiv_response() {
        let meta = parse_arxiv_response(&atom("2405.00001", "A  Title\n  Across Lines"))
            .unwrap()
            .unwrap();
        assert_eq!(meta.url, "http://arxiv.org/abs/2405.00001v1");
        assert_eq!(meta.title, "A Title Across Lines");
        assert_eq!(meta.abstract_text, "We study things.");
    }

    #[test]
    fn test_parse_arxiv_response_without_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        assert_eq!(parse_arxiv_response(xml).unwrap(), None);
    }

    async fn arxiv_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/papers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("id_list", "2405.00002"))
            .respond_with(ResponseTemplate::new(200).set_body_string(atom("2405.00002", "Second paper")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("id_list", "2405.00003"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer) -> PaperSummarizerConfig {
        PaperSummarizerConfig {
            listing_url: format!("{}/papers", server.uri()),
            arxiv_api_url: format!("{}/api/query", server.uri()),
            ..PaperSummarizerConfig::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    #[tokio::test]
    async fn test_collect_skips_processed_ids_and_updates_ledger() {
        let server = arxiv_server().await;
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        store
            .append_ledger(SERVICE, LEDGER, today(), &["2405.00001".to_string()])
            .await
            .unwrap();

        let config = config_for(&server);
        let llm = FakeLlm::default();
        let collector = PaperSummarizer::new(&config, &store, reqwest::Client::new(), Enricher::new(&llm, "Japanese"));

        let digest = collector.collect(5, today()).await.unwrap().unwrap();
        assert_eq!(digest.item_count(), 1);
        let item = &digest.section(SECTION).unwrap().items[0];
        assert_eq!(item.title, "[tr] Second paper");
        assert_eq!(item.url.as_deref(), Some("http://arxiv.org/abs/2405.00002v1"));
        match &item.detail {
            ItemDetail::Paper { abstract_text, summary } => {
                assert_eq!(abstract_text, "[tr] We study things.");
                assert_eq!(summary, "summary");
            }
            other => panic!("unexpected detail: {other:?}"),
        }

        // not recorded until committed
        let ledger = store.load_ledger(SERVICE, LEDGER, today()).await.unwrap();
        assert_eq!(ledger, vec!["2405.00001"]);

        collector.commit(today()).await.unwrap();
        let ledger = store.load_ledger(SERVICE, LEDGER, today()).await.unwrap();
        assert_eq!(ledger, vec!["2405.00001", "2405.00002", "2405.00003"]);
    }

    #[tokio::test]
    async fn test_failed_store_leaves_ids_for_next_run() {
        let server = arxiv_server().await;
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let config = config_for(&server);
        let llm = FakeLlm::default();
        let collector = PaperSummarizer::new(&config, &store, reqwest::Client::new(), Enricher::new(&llm, "Japanese"));

        // a directory where the document should go makes the write fail
        let blocker = store.document_path(SERVICE, today()).unwrap();
        std::fs::create_dir_all(&blocker).unwrap();

        let err = crate::collectors::run(&collector, &store, 5, today()).await.unwrap_err();
        assert!(matches!(err, CollectorError::Store(_)));
        assert!(store.load_ledger(SERVICE, LEDGER, today()).await.unwrap().is_empty());

        std::fs::remove_dir(&blocker).unwrap();
        let written = crate::collectors::run(&collector, &store, 5, today()).await.unwrap();
        assert_eq!(written, Some(blocker));
        let document = store.read(SERVICE, today()).await.unwrap().unwrap();
        assert!(document.contains("[tr] Second paper"));
        assert_eq!(
            store.load_ledger(SERVICE, LEDGER, today()).await.unwrap(),
            vec!["2405.00001", "2405.00002", "2405.00003"]
        );
    }

    #[tokio::test]
    async fn test_ledger_recorded_when_nothing_survives() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/papers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let config = config_for(&server);
        let llm = FakeLlm::default();
        let collector = PaperSummarizer::new(&config, &store, reqwest::Client::new(), Enricher::new(&llm, "Japanese"));

        let written = crate::collectors::run(&collector, &store, 2, today()).await.unwrap();
        assert_eq!(written, None);
        assert_eq!(store.read(SERVICE, today()).await.unwrap(), None);
        assert_eq!(
            store.load_ledger(SERVICE, LEDGER, today()).await.unwrap(),
            vec!["2405.00001", "2405.00002"]
        );
    }
}
