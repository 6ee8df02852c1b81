//! Typed errors for configuration, rendering, extraction, traversal and output.
//!
//! Page-level faults ([`RenderFault`], [`ExtractionError`]) are recoverable
//! while walking historical issues and fatal on the starting page. The
//! traversal wraps them in [`CrawlError`] so callers can tell the two apart.

use thiserror::Error;

/// The page could not be fetched or never became ready.
#[derive(Debug, Error)]
pub enum RenderFault {
    /// Transport-level failure talking to the site
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// Readiness marker never appeared within the bounded wait
    #[error("{url} not ready after {waited_ms} ms")]
    Timeout { url: String, waited_ms: u128 },

    /// Scripted or otherwise unavailable page
    #[error("{url} unavailable: {reason}")]
    Unavailable { url: String, reason: String },
}

/// Required structural markup was missing on a rendered page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The header navigation anchor carrying the issue link is absent
    #[error("issue anchor missing from page header")]
    MissingIssueAnchor,

    /// The anchor exists but its href does not embed an issue number
    #[error("issue href {href:?} does not carry an issue number")]
    MalformedIssueHref { href: String },

    /// A story element lacks one of its four required fields
    #[error("story #{index} in #{container} is missing {field}")]
    MissingField {
        field: &'static str,
        container: &'static str,
        index: usize,
    },
}

/// Errors surfaced by [`crate::traversal::collect`].
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Render(#[from] RenderFault),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// More history was requested than can exist up to the current issue
    #[error("requested depth {requested} exceeds the {available} issues published so far")]
    Range { requested: u32, available: u32 },

    #[error("requested depth must be at least 1")]
    ZeroDepth,

    /// A historical page declared an ordinal outside the remaining walk
    #[error("expected an issue in {lowest}..{expected_below}, page declared {found}")]
    OrdinalOutOfOrder {
        lowest: u32,
        expected_below: u32,
        found: u32,
    },
}

/// Invalid or unreadable runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{field} is not a valid absolute URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// Failures writing the assembled rows out.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// Whether the fault belongs to one page rather than to the request itself.
    pub fn is_page_fault(&self) -> bool {
        matches!(
            self,
            CrawlError::Render(_) | CrawlError::Extraction(_) | CrawlError::OrdinalOutOfOrder { .. }
        )
    }
}
