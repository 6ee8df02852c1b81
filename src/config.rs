//! Resolved crawl settings.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command-line flags. Only the traversal and render gateway read
//! [`CrawlConfig`]; output paths stay on the CLI.
//!
//! ```yaml
//! # crawl.yaml
//! start_url: https://aiweekly.co/
//! archive_base_url: https://aiweekly.co/issues
//! settle_delay_ms: 2000
//! record_failure: abort-page
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use clap::ValueEnum;
use serde::Deserialize;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

/// How a story missing a required field affects the rest of its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RecordFailurePolicy {
    /// Drop only the malformed story.
    #[default]
    SkipRecord,
    /// Treat the page as failed.
    AbortPage,
}

/// Runtime settings for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Landing page; always shows the newest issue.
    pub start_url: String,
    /// Issue `n` lives at `{archive_base_url}/{n}{anchor_suffix}`.
    pub archive_base_url: String,
    pub anchor_suffix: String,
    /// Pause after every render before the markup is parsed.
    pub settle_delay: Duration,
    /// Bound on fetching a page before its readiness marker is checked.
    pub ready_timeout: Duration,
    pub record_failure: RecordFailurePolicy,
    pub user_agent: Option<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_url: "https://aiweekly.co/".to_string(),
            archive_base_url: "https://aiweekly.co/issues".to_string(),
            anchor_suffix: "#start".to_string(),
            settle_delay: Duration::from_secs(5),
            ready_timeout: Duration::from_secs(10),
            record_failure: RecordFailurePolicy::SkipRecord,
            user_agent: None,
        }
    }
}

/// Subset of [`CrawlConfig`] that may appear in a YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub start_url: Option<String>,
    pub archive_base_url: Option<String>,
    pub anchor_suffix: Option<String>,
    pub settle_delay_ms: Option<u64>,
    pub ready_timeout_secs: Option<u64>,
    pub record_failure: Option<RecordFailurePolicy>,
    pub user_agent: Option<String>,
}

impl CrawlConfig {
    /// Canonical URL of an archived issue.
    pub fn issue_url(&self, issue: u32) -> String {
        format!(
            "{}/{}{}",
            self.archive_base_url.trim_end_matches('/'),
            issue,
            self.anchor_suffix
        )
    }

    /// Layer file values over the defaults, then CLI flags over both.
    pub fn layered(file: FileConfig, cli: &Cli) -> Self {
        let mut config = Self::default();
        config.apply(file);
        config.apply(FileConfig {
            start_url: cli.start_url.clone(),
            archive_base_url: cli.archive_base_url.clone(),
            anchor_suffix: cli.anchor_suffix.clone(),
            settle_delay_ms: cli.settle_delay_ms,
            ready_timeout_secs: cli.ready_timeout_secs,
            record_failure: cli.record_failure,
            user_agent: cli.user_agent.clone(),
        });
        config
    }

    fn apply(&mut self, layer: FileConfig) {
        if let Some(v) = layer.start_url {
            self.start_url = v;
        }
        if let Some(v) = layer.archive_base_url {
            self.archive_base_url = v;
        }
        if let Some(v) = layer.anchor_suffix {
            self.anchor_suffix = v;
        }
        if let Some(ms) = layer.settle_delay_ms {
            self.settle_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = layer.ready_timeout_secs {
            self.ready_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = layer.record_failure {
            self.record_failure = v;
        }
        if layer.user_agent.is_some() {
            self.user_agent = layer.user_agent;
        }
    }

    /// Both URLs must be absolute before any page is requested.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("start_url", &self.start_url),
            ("archive_base_url", &self.archive_base_url),
        ] {
            if Url::parse(value).is_err() {
                return Err(ConfigError::InvalidUrl {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Parse a YAML config document.
pub fn parse_file_config(path: &str, contents: &str) -> Result<FileConfig, ConfigError> {
    serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml {
        path: path.to_string(),
        source,
    })
}

/// Resolve the crawl settings for this run.
///
/// # Errors
///
/// Fails if the config file named on the CLI cannot be read or parsed, or if
/// the resulting URLs are not absolute.
#[instrument(level = "info", skip_all, fields(config = ?cli.config))]
pub async fn load(cli: &Cli) -> Result<CrawlConfig, ConfigError> {
    let file = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path, "Loaded config file");
            parse_file_config(path, &contents)?
        }
        None => FileConfig::default(),
    };

    let config = CrawlConfig::layered(file, cli);
    config.validate()?;
    debug!(?config, "Resolved crawl config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_issue_url() {
        let config = CrawlConfig::default();
        assert_eq!(config.issue_url(119), "https://aiweekly.co/issues/119#start");

        let config = CrawlConfig {
            archive_base_url: "https://mirror.example/issues/".to_string(),
            anchor_suffix: String::new(),
            ..CrawlConfig::default()
        };
        assert_eq!(config.issue_url(7), "https://mirror.example/issues/7");
    }

    #[test]
    fn test_cli_wins_over_file() {
        let file = parse_file_config(
            "crawl.yaml",
            "settle_delay_ms: 2000\nrecord_failure: abort-page\nanchor_suffix: '#top'\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["aiweekly_archive", "--settle-delay-ms", "0"]);

        let config = CrawlConfig::layered(file, &cli);
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.record_failure, RecordFailurePolicy::AbortPage);
        assert_eq!(config.anchor_suffix, "#top");
        assert_eq!(config.ready_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_file_keys_rejected() {
        let err = parse_file_config("crawl.yaml", "depth_limit: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_validate_rejects_relative_url() {
        let config = CrawlConfig {
            start_url: "aiweekly.co".to_string(),
            ..CrawlConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { field: "start_url", .. })
        ));
        assert!(CrawlConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_without_file_uses_defaults() {
        let cli = Cli::parse_from(["aiweekly_archive"]);
        let config = load(&cli).await.unwrap();
        assert_eq!(config.start_url, "https://aiweekly.co/");
        assert_eq!(config.settle_delay, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let cli = Cli::parse_from(["aiweekly_archive", "-c", "/nonexistent/crawl.yaml"]);
        assert!(matches!(load(&cli).await, Err(ConfigError::Io { .. })));
    }
}
