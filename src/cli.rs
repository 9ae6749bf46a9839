//! Command-line interface definitions for nook.
//!
//! Secrets are read from flags or environment variables (a `.env` file in
//! the working directory is loaded first); everything else lives in the
//! YAML configuration.
//!
//! # Examples
//!
//! ```sh
//! # Collect every source into ./data
//! nook run
//!
//! # Only Hacker News, ten stories
//! nook run --service hackernews --limit 10
//!
//! # Serve the API
//! nook serve --bind 0.0.0.0:8000
//!
//! # Post yesterday's highlights
//! nook post --date 2024-01-01
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Configuration file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true, env = "NOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Content directory; overrides `data_dir` from the config file
    #[arg(short, long, global = true, env = "NOOK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The explicit config path, or `config.yaml` when it exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        })
    }
}

/// API keys and tokens. All optional; features needing a missing one are skipped.
#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    /// Key for the OpenAI-compatible LLM endpoint
    #[arg(long, global = true, env = "GROK_API_KEY", hide_env_values = true)]
    pub grok_api_key: Option<String>,

    #[arg(long, global = true, env = "REDDIT_CLIENT_ID", hide_env_values = true)]
    pub reddit_client_id: Option<String>,

    #[arg(long, global = true, env = "REDDIT_CLIENT_SECRET", hide_env_values = true)]
    pub reddit_client_secret: Option<String>,

    #[arg(long, global = true, env = "REDDIT_USER_AGENT", default_value = "nook/0.1")]
    pub reddit_user_agent: String,

    #[arg(long, global = true, env = "OPENWEATHERMAP_API_KEY", hide_env_values = true)]
    pub openweathermap_api_key: Option<String>,

    /// OAuth 2.0 user token for posting to X
    #[arg(long, global = true, env = "X_ACCESS_TOKEN", hide_env_values = true)]
    pub x_access_token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect, enrich and store today's digests
    Run {
        /// Which collector to run
        #[arg(short, long, value_enum, default_value_t = ServiceChoice::All)]
        service: ServiceChoice,

        /// Item limit; each collector's configured limit when omitted
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Serve the HTTP API
    Serve {
        /// Listen address; `server.bind` from the config when omitted
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Post highlights of a stored day to X
    Post {
        /// Day to post (YYYY-MM-DD); today when omitted
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceChoice {
    All,
    Github,
    Hackernews,
    Reddit,
    Techfeed,
    Paper,
}

impl ServiceChoice {
    pub fn includes(self, other: ServiceChoice) -> bool {
        self == ServiceChoice::All || self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults_to_all() {
        let cli = Cli::parse_from(["nook", "run"]);
        match cli.command {
            Command::Run { service, limit } => {
                assert_eq!(service, ServiceChoice::All);
                assert_eq!(limit, None);
                assert!(service.includes(ServiceChoice::Paper));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_single_service_with_limit() {
        let cli = Cli::parse_from(["nook", "run", "--service", "hackernews", "-l", "10", "--data-dir", "/tmp/nook"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/nook")));
        match cli.command {
            Command::Run { service, limit } => {
                assert_eq!(service, ServiceChoice::Hackernews);
                assert_eq!(limit, Some(10));
                assert!(service.includes(ServiceChoice::Hackernews));
                assert!(!service.includes(ServiceChoice::Reddit));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_serve_and_post_flags() {
        let cli = Cli::parse_from(["nook", "--config", "custom.yaml", "serve", "--bind", "0.0.0.0:9000"]);
        assert_eq!(cli.config_path(), Some(PathBuf::from("custom.yaml")));
        assert!(matches!(cli.command, Command::Serve { bind: Some(ref b) } if b == "0.0.0.0:9000"));

        let cli = Cli::parse_from(["nook", "post", "--date", "2024-01-01"]);
        assert!(matches!(cli.command, Command::Post { date: Some(ref d) } if d == "2024-01-01"));
    }

    #[test]
    fn test_credentials_accepted_after_subcommand() {
        let cli = Cli::parse_from(["nook", "run", "--grok-api-key", "K", "--x-access-token", "T"]);
        assert_eq!(cli.credentials.grok_api_key.as_deref(), Some("K"));
        assert_eq!(cli.credentials.x_access_token.as_deref(), Some("T"));

        let cli = Cli::parse_from(["nook", "--openweathermap-api-key", "W", "serve"]);
        assert_eq!(cli.credentials.openweathermap_api_key.as_deref(), Some("W"));
    }

    #[test]
    fn test_unknown_service_is_rejected() {
        assert!(Cli::try_parse_from(["nook", "run", "--service", "myspace"]).is_err());
    }
}
