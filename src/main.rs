//! # nook
//!
//! A personal information hub. Collectors pull GitHub Trending, Hacker News,
//! Reddit, technology blog feeds and curated arXiv papers, have an LLM
//! translate and summarize them, and store one Markdown document per source
//! per day. An HTTP API serves the stored documents to a dashboard, answers
//! questions about them and reports the weather; a poster shares highlights
//! on X.
//!
//! ## Usage
//!
//! ```sh
//! nook run            # collect everything
//! nook serve          # HTTP API on server.bind
//! nook post           # share today's highlights
//! ```
//!
//! ## Architecture
//!
//! 1. **Collecting**: each collector fetches raw items from its source
//! 2. **Enriching**: titles and bodies are translated, summaries generated
//! 3. **Storing**: digests are rendered to `<data_dir>/<service>/<YYYY-MM-DD>.md`
//!    with a JSON sidecar
//! 4. **Serving**: the query layer reads documents back with latest-date fallback

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod collectors;
mod config;
mod error;
mod llm;
mod models;
mod outputs;
mod query;
mod server;
mod social;
mod store;
mod utils;

use cli::{Cli, Command, Credentials, ServiceChoice};
use collectors::github_trending::GithubTrending;
use collectors::hacker_news::HackerNews;
use collectors::paper_summarizer::PaperSummarizer;
use collectors::reddit_explorer::{RedditCredentials, RedditExplorer};
use collectors::tech_feed::TechFeed;
use collectors::{Enricher, run_step};
use config::Config;
use llm::{LlmClient, build_client};
use query::QueryFacade;
use server::AppState;
use social::XClient;
use store::ContentStore;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(command = ?args.command, "Parsed CLI arguments");

    let mut config = Config::load(args.config_path().as_deref())?;
    if let Some(data_dir) = args.data_dir.clone() {
        config.data_dir = data_dir;
    }

    if let Err(e) = ensure_writable_dir(&config.data_dir).await {
        error!(
            path = %config.data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }
    let store = ContentStore::new(&config.data_dir);

    match args.command {
        Command::Run { service, limit } => {
            run_collectors(&config, &args.credentials, &store, service, limit).await?;
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            serve(&config, &args.credentials, store, &bind).await?;
        }
        Command::Post { date } => {
            post(&config, &args.credentials, &store, date.as_deref()).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Run the selected collectors in order.
///
/// A collector that fails to fetch or parse is logged and the next one runs;
/// a storage failure aborts the whole run.
#[instrument(level = "info", skip(config, credentials, store))]
async fn run_collectors(
    config: &Config,
    credentials: &Credentials,
    store: &ContentStore,
    service: ServiceChoice,
    limit: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let llm = match build_client(&config.llm, credentials.grok_api_key.as_deref()) {
        Ok(llm) => llm,
        Err(e) => {
            warn!(error = %e, "GROK_API_KEY is not set; skipping all collectors");
            return Ok(());
        }
    };
    let http = collectors::http_client(&config.http)?;
    let today = Local::now().date_naive();
    let language = config.translation.target_language.as_str();
    let enricher = || Enricher::new(&llm, language);

    if service.includes(ServiceChoice::Github) {
        let collector = GithubTrending::new(&config.github_trending, http.clone(), enricher());
        let limit = limit.unwrap_or(config.github_trending.limit);
        run_step(&collector, store, limit, today).await?;
    }

    if service.includes(ServiceChoice::Hackernews) {
        let collector = HackerNews::new(&config.hacker_news, http.clone(), enricher());
        let limit = limit.unwrap_or(config.hacker_news.limit);
        run_step(&collector, store, limit, today).await?;
    }

    if service.includes(ServiceChoice::Reddit) {
        match reddit_credentials(credentials) {
            Some(creds) => {
                let collector = RedditExplorer::new(&config.reddit, creds, http.clone(), enricher());
                let limit = limit.unwrap_or(config.reddit.limit);
                run_step(&collector, store, limit, today).await?;
            }
            None => warn!("REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET not set; skipping Reddit"),
        }
    }

    if service.includes(ServiceChoice::Techfeed) {
        let collector = TechFeed::new(&config.tech_feed, http.clone(), enricher());
        let limit = limit.unwrap_or(config.tech_feed.limit);
        run_step(&collector, store, limit, today).await?;
    }

    if service.includes(ServiceChoice::Paper) {
        let collector = PaperSummarizer::new(&config.paper_summarizer, store, http.clone(), enricher());
        let limit = limit.unwrap_or(config.paper_summarizer.limit);
        run_step(&collector, store, limit, today).await?;
    }

    Ok(())
}

fn reddit_credentials(credentials: &Credentials) -> Option<RedditCredentials> {
    Some(RedditCredentials {
        client_id: credentials.reddit_client_id.clone()?,
        client_secret: credentials.reddit_client_secret.clone()?,
        user_agent: credentials.reddit_user_agent.clone(),
    })
}

async fn serve(
    config: &Config,
    credentials: &Credentials,
    store: ContentStore,
    bind: &str,
) -> Result<(), Box<dyn Error>> {
    let llm: Option<Arc<LlmClient>> = match credentials.grok_api_key.as_deref() {
        Some(key) => Some(Arc::new(build_client(&config.llm, Some(key))?)),
        None => {
            warn!("GROK_API_KEY is not set; chat will answer with a notice");
            None
        }
    };
    let state = AppState {
        query: Arc::new(QueryFacade::new(store)),
        llm,
        weather: Arc::new(config.weather.clone()),
        weather_api_key: credentials.openweathermap_api_key.clone(),
        http: collectors::http_client(&config.http)?,
    };
    info!(data_dir = %state.query.store().base_dir().display(), "Serving stored content");
    server::run_server(state, bind).await
}

#[instrument(level = "info", skip(config, credentials, store))]
async fn post(
    config: &Config,
    credentials: &Credentials,
    store: &ContentStore,
    date: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let Some(token) = credentials.x_access_token.clone() else {
        warn!("X_ACCESS_TOKEN is not set; skipping posts");
        return Ok(());
    };
    let date = match date {
        Some(raw) => query::parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let client = XClient::new(&config.social, token);
    let posted = social::run(store, &client, date).await;
    info!(posted, %date, "Posting complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_llm_key_skips_every_collector() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let store = ContentStore::new(dir.path());
        let credentials = Credentials {
            grok_api_key: None,
            reddit_client_id: Some("id".to_string()),
            reddit_client_secret: Some("secret".to_string()),
            ..Credentials::default()
        };

        run_collectors(&config, &credentials, &store, ServiceChoice::All, Some(1))
            .await
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_reddit_credentials_need_id_and_secret() {
        let mut credentials = Credentials {
            reddit_client_id: Some("id".to_string()),
            reddit_user_agent: "nook/test".to_string(),
            ..Credentials::default()
        };
        assert!(reddit_credentials(&credentials).is_none());

        credentials.reddit_client_secret = Some("secret".to_string());
        let creds = reddit_credentials(&credentials).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.user_agent, "nook/test");
    }
}
