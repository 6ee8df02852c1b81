//! Render gateway: turning a URL into ready markup and a capture time.
//!
//! The traversal only needs [`RenderGateway`]. [`HttpRenderer`] is the
//! production implementation: it fetches the page once with `reqwest`,
//! bounded by a hard timeout, and checks the fetched markup for the readiness
//! marker. A plain HTTP fetch returns the markup as served, so a page lacking
//! the marker will not grow one on a later fetch; it fails with
//! [`RenderFault::Timeout`] straight away instead of waiting out the budget.
//!
//! # Capture time
//!
//! Each [`Snapshot`] carries the page's last-modified instant when the site
//! reports one in a recognised format, otherwise the wall-clock time at which
//! the fetch completed.

use crate::config::CrawlConfig;
use crate::error::RenderFault;
use crate::models::Snapshot;
use crate::scrapers::aiweekly;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use reqwest::header::{LAST_MODIFIED, USER_AGENT};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Locale formats a document's last-modified value is reported in.
const LAST_MODIFIED_FORMATS: [&str; 2] = ["%m/%d/%Y, %I:%M:%S %p", "%m/%d/%Y %H:%M:%S"];

/// A single exclusively-owned rendering session.
///
/// Callers thread one session through a whole traversal by `&mut`, so pages
/// are rendered strictly one after another. [`RenderGateway::close`] consumes
/// the session; it can only be released once.
pub trait RenderGateway {
    /// Fetch `url`, wait for the page to become ready and snapshot it.
    async fn render(&mut self, url: &str) -> Result<Snapshot, RenderFault>;

    /// Release the session.
    async fn close(self) -> Result<(), RenderFault>
    where
        Self: Sized;
}

/// HTTP-backed render gateway.
#[derive(Debug)]
pub struct HttpRenderer {
    client: reqwest::Client,
    user_agent: Option<String>,
    ready_timeout: Duration,
    pages_rendered: usize,
}

impl HttpRenderer {
    /// Open a session using the timeouts and user agent from `config`.
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.ready_timeout)
            .build()?;
        info!(
            ready_timeout_ms = config.ready_timeout.as_millis() as u64,
            "Opened render session"
        );
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            ready_timeout: config.ready_timeout,
            pages_rendered: 0,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<(String, Option<String>), RenderFault> {
        let mut request = self.client.get(url);
        if let Some(agent) = &self.user_agent {
            request = request.header(USER_AGENT, agent);
        }

        let response = request.send().await.map_err(|source| RenderFault::Http {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderFault::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let markup = response.text().await.map_err(|source| RenderFault::Http {
            url: url.to_string(),
            source,
        })?;
        if markup.trim().is_empty() {
            return Err(RenderFault::Unavailable {
                url: url.to_string(),
                reason: "empty document".to_string(),
            });
        }
        Ok((markup, last_modified))
    }

}

/// Accept fetched markup only if it carries the readiness marker.
fn require_ready(url: &str, markup: String, started: Instant) -> Result<String, RenderFault> {
    if aiweekly::is_ready(&markup) {
        debug!(bytes = markup.len(), "Readiness marker present");
        return Ok(markup);
    }
    warn!(
        preview = %truncate_for_log(&markup, 200),
        "Readiness marker absent from fetched page"
    );
    Err(RenderFault::Timeout {
        url: url.to_string(),
        waited_ms: started.elapsed().as_millis(),
    })
}

impl RenderGateway for HttpRenderer {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn render(&mut self, url: &str) -> Result<Snapshot, RenderFault> {
        let started = Instant::now();
        let (markup, last_modified) = match timeout(self.ready_timeout, self.fetch_once(url)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(waited_ms = started.elapsed().as_millis() as u64, "Page fetch timed out");
                return Err(RenderFault::Timeout {
                    url: url.to_string(),
                    waited_ms: started.elapsed().as_millis(),
                });
            }
        };
        let markup = require_ready(url, markup, started)?;

        self.pages_rendered += 1;
        let captured_at = capture_timestamp(last_modified.as_deref(), Utc::now());
        info!(
            bytes = markup.len(),
            captured_at,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered page"
        );
        Ok(Snapshot {
            markup,
            captured_at,
        })
    }

    async fn close(self) -> Result<(), RenderFault> {
        info!(pages_rendered = self.pages_rendered, "Closed render session");
        Ok(())
    }
}

/// Parse a document-reported last-modified value into epoch seconds.
///
/// Locale formats are read as local time; the HTTP header form carries its
/// own offset.
pub fn parse_last_modified(value: &str) -> Option<i64> {
    let value = value.trim();
    for format in LAST_MODIFIED_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp());
        }
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.timestamp())
}

/// Capture time for a snapshot: last-modified if usable, else `fetched_at`.
pub fn capture_timestamp(last_modified: Option<&str>, fetched_at: DateTime<Utc>) -> i64 {
    match last_modified.and_then(parse_last_modified) {
        Some(ts) => ts,
        None => {
            debug!(?last_modified, "No usable last-modified; using fetch time");
            fetched_at.timestamp()
        }
    }
}
