//! Reddit hot posts with comment-aware summaries.
//!
//! Authenticates with an application-only OAuth token, then for every
//! configured category and subreddit:
//!
//! 1. Fetches hot posts (stickied posts are skipped)
//! 2. Classifies each post with [`classify`]
//! 3. Fetches the top comments
//! 4. Translates title, body and comments, then asks for a summary
//!
//! The digest nests subreddits under their category.

use super::{Collector, Enricher, TranslationStyle};
use crate::config::RedditConfig;
use crate::error::CollectorError;
use crate::llm::Generate;
use crate::models::{Digest, Item, ItemDetail, PostKind, Section};
use crate::utils::upcase;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

pub const SERVICE: &str = "reddit_explorer";

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Application credentials for the Reddit API.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

/// A submission as returned by the listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub is_gallery: Option<bool>,
    #[serde(default)]
    pub poll_data: Option<serde_json::Value>,
    #[serde(default)]
    pub crosspost_parent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Decide the type of a post.
///
/// Checked in order: video, gallery, poll, crosspost, self text, image
/// extension, and anything else is a link.
pub fn classify(post: &RawPost) -> PostKind {
    if post.is_video {
        PostKind::Video
    } else if post.is_gallery.unwrap_or(false) {
        PostKind::Gallery
    } else if post.poll_data.as_ref().is_some_and(|p| !p.is_null()) {
        PostKind::Poll
    } else if post.crosspost_parent.as_deref().is_some_and(|p| !p.is_empty()) {
        PostKind::Crosspost
    } else if post.is_self {
        PostKind::Text
    } else if IMAGE_EXTENSIONS.iter().any(|ext| post.url.ends_with(ext)) {
        PostKind::Image
    } else {
        PostKind::Link
    }
}

pub struct RedditExplorer<'a, G> {
    config: &'a RedditConfig,
    credentials: RedditCredentials,
    http: reqwest::Client,
    enricher: Enricher<'a, G>,
}

impl<'a, G: Generate> RedditExplorer<'a, G> {
    pub fn new(
        config: &'a RedditConfig,
        credentials: RedditCredentials,
        http: reqwest::Client,
        enricher: Enricher<'a, G>,
    ) -> Self {
        Self {
            config,
            credentials,
            http,
            enricher,
        }
    }

    #[instrument(level = "info", skip_all)]
    async fn access_token(&self) -> Result<String, CollectorError> {
        let token: TokenResponse = self
            .http
            .post(&self.config.auth_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!("Obtained Reddit access token");
        Ok(token.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, reqwest::Error> {
        self.http
            .get(format!("{}{}", self.config.api_base.trim_end_matches('/'), path))
            .query(query)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    #[instrument(level = "info", skip(self, token))]
    async fn hot_posts(&self, token: &str, subreddit: &str, limit: usize) -> Result<Vec<RawPost>, reqwest::Error> {
        let listing: Listing<RawPost> = self
            .get_json(
                token,
                &format!("/r/{}/hot", urlencoding::encode(subreddit)),
                &[("limit", limit.to_string())],
            )
            .await?;
        let posts: Vec<RawPost> = listing
            .data
            .children
            .into_iter()
            .map(|thing| thing.data)
            .filter(|post| !post.stickied)
            .collect();
        info!(count = posts.len(), "Fetched hot posts");
        Ok(posts)
    }

    /// Bodies of the top comments; failures yield no comments.
    async fn top_comments(&self, token: &str, post_id: &str) -> Vec<String> {
        let query = [
            ("sort", "top".to_string()),
            ("limit", self.config.comment_limit.to_string()),
        ];
        let response: Result<(serde_json::Value, Listing<RawComment>), _> = self
            .get_json(token, &format!("/comments/{}", urlencoding::encode(post_id)), &query)
            .await;
        match response {
            Ok((_, comments)) => comments
                .data
                .children
                .into_iter()
                .filter(|thing| thing.kind == "t1")
                .filter_map(|thing| thing.data.body)
                .take(self.config.comment_limit)
                .collect(),
            Err(e) => {
                warn!(error = %e, post_id, "Comment fetch failed");
                Vec::new()
            }
        }
    }

    async fn enrich(&self, token: &str, post: RawPost) -> Item {
        let post_kind = classify(&post);
        let permalink = format!("https://www.reddit.com{}", post.permalink);
        let link = (!post.is_self && !post.url.is_empty() && post.url != permalink).then(|| post.url.clone());

        let title = self.enricher.translate(&post.title, TranslationStyle::Technical).await;
        let text = self.enricher.translate(&post.selftext, TranslationStyle::Technical).await;
        let mut comments = Vec::new();
        for body in self.top_comments(token, &post.id).await {
            comments.push(self.enricher.translate(&body, TranslationStyle::Technical).await);
        }

        let summary = self
            .enricher
            .summarize(
                self.summary_prompt(&title, &text, link.as_deref(), &comments),
                self.enricher.summary_system("Reddit posts and their comment threads"),
            )
            .await;

        Item {
            title,
            url: Some(permalink),
            detail: ItemDetail::RedditPost {
                post_kind,
                upvotes: post.score,
                text,
                link,
                summary,
            },
        }
    }

    fn summary_prompt(&self, title: &str, text: &str, link: Option<&str>, comments: &[String]) -> String {
        let body = if text.is_empty() { "(no body)" } else { text };
        let comments: String = comments.iter().map(|c| format!("- {c}\n")).collect();
        format!(
            "Summarize the following Reddit post.\n\n\
             Title: {title}\n\
             Body: {body}\n\
             URL: {url}\n\n\
             Top comments:\n{comments}\n\
             Answer in {lang} using this outline:\n\
             1. Main content of the post (1-2 sentences)\n\
             2. Key points (3-5 bullet points)\n\
             3. Tendency of the discussion (from the comments)",
            url = link.unwrap_or("(no URL)"),
            lang = self.enricher.target_language()
        )
    }
}

impl<G: Generate> Collector for RedditExplorer<'_, G> {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn collect(&self, limit: usize, today: NaiveDate) -> Result<Option<Digest>, CollectorError> {
        let token = self.access_token().await?;
        let mut digest = Digest::new(SERVICE, today, format!("Reddit Hot Posts ({today})"));

        for category in &self.config.categories {
            let mut section = Section::new(upcase(&category.name));
            for subreddit in &category.sources {
                let posts = match self.hot_posts(&token, subreddit, limit).await {
                    Ok(posts) => posts,
                    Err(e) => {
                        error!(error = %e, %subreddit, "Hot posts fetch failed");
                        continue;
                    }
                };
                let mut items = Vec::with_capacity(posts.len());
                for post in posts {
                    items.push(self.enrich(&token, post).await);
                }
                section
                    .subsections
                    .push(Section::with_items(format!("r/{subreddit}"), items));
            }
            digest.sections.push(section);
        }

        if digest.item_count() == 0 {
            warn!("No Reddit posts collected");
            return Ok(None);
        }
        Ok(Some(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::test_support::FakeLlm;
    use crate::config::Category;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post() -> RawPost {
        RawPost {
            id: "abc".to_string(),
            title: "t".to_string(),
            url: "https://example.com/page".to_string(),
            ..RawPost::default()
        }
    }

    #[test]
    fn test_classify_precedence() {
        let mut p = post();
        assert_eq!(classify(&p), PostKind::Link);

        p.url = "https://i.redd.it/cat.png".to_string();
        assert_eq!(classify(&p), PostKind::Image);

        p.is_self = true;
        assert_eq!(classify(&p), PostKind::Text);

        p.crosspost_parent = Some("t3_xyz".to_string());
        assert_eq!(classify(&p), PostKind::Crosspost);

        p.poll_data = Some(json!({"options": []}));
        assert_eq!(classify(&p), PostKind::Poll);

        p.is_gallery = Some(true);
        assert_eq!(classify(&p), PostKind::Gallery);

        p.is_video = true;
        assert_eq!(classify(&p), PostKind::Video);
    }

    #[test]
    fn test_classify_ignores_null_poll_and_empty_crosspost() {
        let mut p = post();
        p.poll_data = Some(serde_json::Value::Null);
        p.crosspost_parent = Some(String::new());
        p.is_gallery = Some(false);
        assert_eq!(classify(&p), PostKind::Link);
    }

    #[tokio::test]
    async fn test_collect_nests_subreddits_and_skips_stickied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/rust/hot"))
            .and(query_param("limit", "3"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": {"children": [
                    {"kind": "t3", "data": {"id": "s1", "title": "Weekly thread", "stickied": true,
                        "permalink": "/r/rust/comments/s1/", "url": "https://www.reddit.com/r/rust/comments/s1/"}},
                    {"kind": "t3", "data": {"id": "p1", "title": "Rust 1.90", "is_self": true,
                        "selftext": "Release notes", "score": 321,
                        "permalink": "/r/rust/comments/p1/rust_190/",
                        "url": "https://www.reddit.com/r/rust/comments/p1/rust_190/"}},
                    {"kind": "t3", "data": {"id": "p2", "title": "Blog post", "score": 12,
                        "permalink": "/r/rust/comments/p2/blog/", "url": "https://blog.example.com/x"}}
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/comments/p1"))
            .and(query_param("sort", "top"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"kind": "Listing", "data": {"children": []}},
                {"kind": "Listing", "data": {"children": [
                    {"kind": "t1", "data": {"body": "Great release"}},
                    {"kind": "more", "data": {"count": 10}}
                ]}}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/comments/p2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = RedditConfig {
            auth_url: format!("{}/api/v1/access_token", server.uri()),
            api_base: server.uri(),
            categories: vec![Category {
                name: "tech".to_string(),
                sources: vec!["rust".to_string()],
            }],
            ..RedditConfig::default()
        };
        let credentials = RedditCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "nook-test".to_string(),
        };
        let llm = FakeLlm::default();
        let collector = RedditExplorer::new(&config, credentials, reqwest::Client::new(), Enricher::new(&llm, "Japanese"));
        let today = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();

        let digest = collector.collect(3, today).await.unwrap().unwrap();
        assert_eq!(digest.sections[0].heading, "Tech");
        let sub = &digest.sections[0].subsections[0];
        assert_eq!(sub.heading, "r/rust");
        assert_eq!(sub.items.len(), 2);

        let first = &sub.items[0];
        assert_eq!(first.title, "[tr] Rust 1.90");
        assert_eq!(first.url.as_deref(), Some("https://www.reddit.com/r/rust/comments/p1/rust_190/"));
        match &first.detail {
            ItemDetail::RedditPost { post_kind, upvotes, text, link, summary } => {
                assert_eq!(*post_kind, PostKind::Text);
                assert_eq!(*upvotes, 321);
                assert_eq!(text, "[tr] Release notes");
                assert_eq!(*link, None);
                assert_eq!(summary, "summary");
            }
            other => panic!("unexpected detail: {other:?}"),
        }
        match &sub.items[1].detail {
            ItemDetail::RedditPost { post_kind, link, .. } => {
                assert_eq!(*post_kind, PostKind::Link);
                assert_eq!(link.as_deref(), Some("https://blog.example.com/x"));
            }
            other => panic!("unexpected detail: {other:?}"),
        }

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts.iter().any(|p| p.contains("- [tr] Great release")));
    }
}
