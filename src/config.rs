//! Runtime configuration.
//!
//! Configuration is an explicit object handed to every collector and to the
//! HTTP server. It is read from an optional YAML file; every field has a
//! default, so an empty (or absent) file yields a working setup. Secrets
//! never live here: API keys come from the CLI / environment (see
//! [`crate::cli::Credentials`]).
//!
//! ```yaml
//! data_dir: data
//! translation:
//!   target_language: Japanese
//! tech_feed:
//!   days: 2
//!   categories:
//!     - name: rust
//!       sources: ["https://blog.rust-lang.org/feed.xml"]
//! ```

use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub llm: LlmConfig,
    pub translation: TranslationConfig,
    pub github_trending: GithubTrendingConfig,
    pub hacker_news: HackerNewsConfig,
    pub reddit: RedditConfig,
    pub tech_feed: TechFeedConfig,
    pub paper_summarizer: PaperSummarizerConfig,
    pub weather: WeatherConfig,
    pub social: SocialConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            server: ServerConfig::default(),
            http: HttpConfig::default(),
            llm: LlmConfig::default(),
            translation: TranslationConfig::default(),
            github_trending: GithubTrendingConfig::default(),
            hacker_news: HackerNewsConfig::default(),
            reddit: RedditConfig::default(),
            tech_feed: TechFeedConfig::default(),
            paper_summarizer: PaperSummarizerConfig::default(),
            weather: WeatherConfig::default(),
            social: SocialConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            None => {
                info!("No configuration file; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Settings for outbound scraping requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,
    pub model: String,
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.x.ai/v1".to_string(),
            model: "grok-2-latest".to_string(),
            max_retries: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 10_000,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Language every title, body and summary is rendered in.
    pub target_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: "Japanese".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubTrendingConfig {
    pub limit: usize,
    pub base_url: String,
    /// Languages scraped with the full limit; `""` means all languages.
    pub general: Vec<String>,
    /// Languages scraped with half the limit.
    pub specific: Vec<String>,
}

impl Default for GithubTrendingConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            base_url: "https://github.com/trending".to_string(),
            general: vec!["".to_string(), "python".to_string()],
            specific: vec![
                "rust".to_string(),
                "go".to_string(),
                "typescript".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub limit: usize,
    pub api_base: String,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            limit: 30,
            api_base: "https://hacker-news.firebaseio.com/v0".to_string(),
        }
    }
}

/// A named group of sources (subreddits or feed URLs).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Category {
    pub name: String,
    pub sources: Vec<String>,
}

impl Category {
    fn new(name: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub limit: usize,
    pub comment_limit: usize,
    pub auth_url: String,
    pub api_base: String,
    pub categories: Vec<Category>,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            comment_limit: 5,
            auth_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
            categories: vec![
                Category::new("tech", &["programming", "rust", "MachineLearning"]),
                Category::new("news", &["technology", "worldnews"]),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TechFeedConfig {
    pub limit: usize,
    /// Only entries published within this many days are kept.
    pub days: i64,
    pub categories: Vec<Category>,
}

impl Default for TechFeedConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            days: 1,
            categories: vec![
                Category::new(
                    "tech_blogs",
                    &[
                        "https://blog.rust-lang.org/feed.xml",
                        "https://github.blog/feed/",
                    ],
                ),
                Category::new("machine_learning", &["https://huggingface.co/blog/feed.xml"]),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaperSummarizerConfig {
    pub limit: usize,
    /// Curated listing scraped for arXiv identifiers.
    pub listing_url: String,
    pub arxiv_api_url: String,
}

impl Default for PaperSummarizerConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            listing_url: "https://huggingface.co/papers".to_string(),
            arxiv_api_url: "http://export.arxiv.org/api/query".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub city: String,
    pub api_base: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            city: "Tokyo".to_string(),
            api_base: "https://api.openweathermap.org/data/2.5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub api_base: String,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/2".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.hacker_news.limit, 30);
        assert_eq!(config.llm.model, "grok-2-latest");
        assert_eq!(config.translation.target_language, "Japanese");
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
data_dir: /var/lib/nook
tech_feed:
  days: 3
  categories:
    - name: rust
      sources: ["https://blog.rust-lang.org/feed.xml"]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/nook"));
        assert_eq!(config.tech_feed.days, 3);
        assert_eq!(config.tech_feed.limit, 3);
        assert_eq!(
            config.tech_feed.categories,
            vec![Category::new("rust", &["https://blog.rust-lang.org/feed.xml"])]
        );
        assert_eq!(config.reddit.limit, 3);
    }

    #[test]
    fn test_general_languages_include_all() {
        let config = Config::default();
        assert!(config.github_trending.general.contains(&String::new()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  bind: 127.0.0.1:9000\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }
}
