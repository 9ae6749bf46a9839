//! Daily digest posts for social media.
//!
//! Reads the structured digests of one date and turns three of them into
//! short posts:
//!
//! - GitHub Trending: top 5 of the all-languages section
//! - Hacker News: every story with its score
//! - arXiv papers: top 3 with their abstracts
//!
//! Posts go out through a [`PostSink`]; [`XClient`] is the X API v2 sink.

use crate::collectors::{github_trending, hacker_news, paper_summarizer};
use crate::config::SocialConfig;
use crate::error::PostError;
use crate::models::{Digest, Item, ItemDetail};
use crate::outputs::json::read_digest;
use crate::store::ContentStore;
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

const GITHUB_TOP: usize = 5;
const PAPERS_TOP: usize = 3;

/// Destination for composed posts.
pub trait PostSink {
    async fn post(&self, text: &str) -> Result<(), PostError>;
}

/// X (Twitter) API v2 client authenticated with a user access token.
pub struct XClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

#[derive(Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
}

impl XClient {
    pub fn new(config: &SocialConfig, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token,
        }
    }
}

impl PostSink for XClient {
    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    async fn post(&self, text: &str) -> Result<(), PostError> {
        let response = self
            .http
            .post(format!("{}/tweets", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&TweetRequest { text })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostError::Status {
                status: status.as_u16(),
                body,
            });
        }
        info!(status = status.as_u16(), "Post published");
        Ok(())
    }
}

fn numbered<'a>(items: impl IntoIterator<Item = &'a Item>, mut entry: impl FnMut(&mut String, usize, &Item)) -> String {
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        entry(&mut out, i + 1, item);
    }
    out
}

/// Post for GitHub Trending; falls back to every section when the
/// all-languages section is missing.
pub fn compose_github(digest: &Digest) -> Option<String> {
    let items: Vec<&Item> = match digest.section(github_trending::ALL_LANGUAGES) {
        Some(section) if !section.items.is_empty() => section.items.iter().collect(),
        _ => {
            warn!("All-languages section missing; using every section");
            digest.items()
        }
    };
    if items.is_empty() {
        return None;
    }
    let body = numbered(items.into_iter().take(GITHUB_TOP), |out, i, item| {
        let stars = match &item.detail {
            ItemDetail::Repository { stars, .. } => stars.to_string(),
            _ => "N/A".to_string(),
        };
        out.push_str(&format!("{i}. {} ⭐{stars}\n", item.title));
        if let Some(url) = &item.url {
            out.push_str(&format!("   {url}\n"));
        }
    });
    Some(format!(
        "【GitHub Trending】{}\n\n{body}\n#GitHub #Trending #dev",
        digest.date
    ))
}

/// Post for Hacker News listing every story.
pub fn compose_hacker_news(digest: &Digest) -> Option<String> {
    let items = digest.items();
    if items.is_empty() {
        return None;
    }
    let body = numbered(items, |out, i, item| {
        let score = match &item.detail {
            ItemDetail::Story { score, .. } => score.to_string(),
            _ => "N/A".to_string(),
        };
        out.push_str(&format!("{i}. {} (score: {score})\n", item.title));
        if let Some(url) = &item.url {
            out.push_str(&format!("   {url}\n"));
        }
    });
    Some(format!(
        "【Hacker News】{}\n\n{body}\n#HackerNews #Tech #dev",
        digest.date
    ))
}

/// Post for the top papers, with abstracts.
pub fn compose_papers(digest: &Digest) -> Option<String> {
    let items = digest.items();
    if items.is_empty() {
        return None;
    }
    let body = numbered(items.into_iter().take(PAPERS_TOP), |out, i, item| {
        out.push_str(&format!("{i}. {}\n", item.title));
        if let Some(url) = &item.url {
            out.push_str(&format!("   {url}\n"));
        }
        if let ItemDetail::Paper { abstract_text, .. } = &item.detail {
            out.push_str(&format!("   {abstract_text}\n"));
        }
        out.push('\n');
    });
    Some(format!("【arXiv Papers】{}\n\n{body}#arXiv #Research #AI", digest.date))
}

type Composer = fn(&Digest) -> Option<String>;

/// Services that are posted, in order.
const POSTS: [(&str, Composer); 3] = [
    (github_trending::SERVICE, compose_github),
    (hacker_news::SERVICE, compose_hacker_news),
    (paper_summarizer::SERVICE, compose_papers),
];

/// Compose and publish every post for `date`. Returns how many were published.
///
/// A missing digest, an empty digest or a failed post skips that source.
#[instrument(level = "info", skip(store, sink))]
pub async fn run<S: PostSink>(store: &ContentStore, sink: &S, date: NaiveDate) -> usize {
    let mut published = 0;
    for (service, compose) in POSTS {
        let digest = match read_digest(store, service, date).await {
            Ok(Some(digest)) => digest,
            Ok(None) => {
                warn!(service, "No digest for date; skipping");
                continue;
            }
            Err(e) => {
                error!(error = %e, service, "Digest unreadable; skipping");
                continue;
            }
        };
        let Some(text) = compose(&digest) else {
            warn!(service, "Digest has no entries; skipping");
            continue;
        };
        match sink.post(&text).await {
            Ok(()) => published += 1,
            Err(e) => error!(error = %e, service, text = %truncate_for_log(&text, 80), "Post failed"),
        }
    }
    info!(published, "Social posting complete");
    published
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Section;
    use crate::outputs;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder {
        posts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl PostSink for Recorder {
        async fn post(&self, text: &str) -> Result<(), PostError> {
            self.posts.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(PostError::Status {
                    status: 403,
                    body: "forbidden".to_string(),
                });
            }
            Ok(())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    fn repo(name: &str, stars: u64) -> Item {
        Item {
            title: name.to_string(),
            url: Some(format!("https://github.com/{name}")),
            detail: ItemDetail::Repository { description: None, stars },
        }
    }

    fn github_digest() -> Digest {
        let mut digest = Digest::new(github_trending::SERVICE, date(), "GitHub Trending (2025-05-06)");
        digest.sections.push(Section::with_items(
            "All languages",
            (0..7).map(|i| repo(&format!("o/r{i}"), 100 - i)).collect(),
        ));
        digest.sections.push(Section::with_items("Rust", vec![repo("rust/x", 1)]));
        digest
    }

    #[test]
    fn test_compose_github_takes_top_five_of_all_languages() {
        let text = compose_github(&github_digest()).unwrap();
        assert!(text.starts_with("【GitHub Trending】2025-05-06\n\n1. o/r0 ⭐100\n   https://github.com/o/r0\n"));
        assert!(text.contains("5. o/r4 ⭐96"));
        assert!(!text.contains("o/r5"));
        assert!(!text.contains("rust/x"));
        assert!(text.ends_with("\n#GitHub #Trending #dev"));
    }

    #[test]
    fn test_compose_github_falls_back_to_all_sections() {
        let mut digest = Digest::new(github_trending::SERVICE, date(), "t");
        digest.sections.push(Section::with_items("Rust", vec![repo("rust/x", 1)]));
        let text = compose_github(&digest).unwrap();
        assert!(text.contains("1. rust/x ⭐1"));
    }

    #[test]
    fn test_compose_hacker_news_lists_every_story() {
        let mut digest = Digest::new(hacker_news::SERVICE, date(), "t");
        digest.sections.push(Section::with_items(
            hacker_news::SECTION,
            vec![
                Item {
                    title: "Linked".to_string(),
                    url: Some("https://example.com".to_string()),
                    detail: ItemDetail::Story { score: 120, text: None },
                },
                Item {
                    title: "Ask HN".to_string(),
                    url: None,
                    detail: ItemDetail::Story { score: 7, text: Some("?".to_string()) },
                },
            ],
        ));
        let text = compose_hacker_news(&digest).unwrap();
        assert_eq!(
            text,
            "【Hacker News】2025-05-06\n\n\
             1. Linked (score: 120)\n   https://example.com\n\
             2. Ask HN (score: 7)\n\
             \n#HackerNews #Tech #dev"
        );
    }

    #[test]
    fn test_compose_papers_top_three_with_abstract() {
        let mut digest = Digest::new(paper_summarizer::SERVICE, date(), "t");
        digest.sections.push(Section::with_items(
            paper_summarizer::SECTION,
            (0..4)
                .map(|i| Item {
                    title: format!("Paper {i}"),
                    url: Some(format!("http://arxiv.org/abs/2405.0000{i}v1")),
                    detail: ItemDetail::Paper {
                        abstract_text: format!("Abstract {i}"),
                        summary: String::new(),
                    },
                })
                .collect(),
        ));
        let text = compose_papers(&digest).unwrap();
        assert!(text.contains("3. Paper 2\n   http://arxiv.org/abs/2405.00002v1\n   Abstract 2\n\n"));
        assert!(!text.contains("Paper 3"));
        assert!(text.ends_with("#arXiv #Research #AI"));
    }

    #[test]
    fn test_compose_empty_digest_is_none() {
        let digest = Digest::new(hacker_news::SERVICE, date(), "t");
        assert_eq!(compose_hacker_news(&digest), None);
        assert_eq!(compose_papers(&digest), None);
        assert_eq!(compose_github(&digest), None);
    }

    #[tokio::test]
    async fn test_run_skips_missing_digests() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        outputs::publish(&store, &github_digest()).await.unwrap();

        let sink = Recorder::default();
        assert_eq!(run(&store, &sink, date()).await, 1);
        let posts = sink.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].starts_with("【GitHub Trending】"));
    }

    #[tokio::test]
    async fn test_run_survives_post_failures() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        outputs::publish(&store, &github_digest()).await.unwrap();

        let sink = Recorder {
            fail: true,
            ..Recorder::default()
        };
        assert_eq!(run(&store, &sink, date()).await, 0);
        assert_eq!(sink.posts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_x_client_posts_tweet() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("authorization", "Bearer user-token"))
            .and(body_json(serde_json::json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "1", "text": "hello"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = SocialConfig {
            api_base: format!("{}/2", server.uri()),
        };
        let client = XClient::new(&config, "user-token".to_string());
        client.post("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_x_client_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("duplicate content"))
            .mount(&server)
            .await;
        let config = SocialConfig { api_base: server.uri() };
        let client = XClient::new(&config, "t".to_string());
        match client.post("hello").await {
            Err(PostError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "duplicate content");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
