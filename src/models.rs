//! Data models for archive snapshots, extracted stories and output rows.
//!
//! - [`Snapshot`]: rendered markup plus the instant it was captured
//! - [`NewsRecord`]: one story pulled from an issue page
//! - [`IssuePage`]: the records of one issue, tagged with its ordinal
//! - [`ResultSet`]: issue pages in traversal order (newest first)
//! - [`OutputRow`]: an indexed, validated record ready for tabular output

use serde::{Deserialize, Serialize};

/// Rendered markup for one URL, consumed by the extractor and then dropped.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Full page markup after client-side rendering.
    pub markup: String,
    /// Epoch seconds at which this snapshot was taken.
    pub captured_at: i64,
}

/// A single story extracted from an issue page.
///
/// `timestamp` is the capture time of the page the story came from, not the
/// story's own publication time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsRecord {
    pub title: String,
    pub text: String,
    pub website: String,
    pub link: String,
    pub timestamp: i64,
}

/// All stories successfully extracted from one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePage {
    /// Ordinal parsed from the page's own markup.
    pub issue: u32,
    /// URL the page was rendered from.
    pub url: String,
    /// Stories in page order (primary list first, then "also mentioned").
    pub records: Vec<NewsRecord>,
}

/// Ordered issue pages produced by one traversal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pages: Vec<IssuePage>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an issue page after every page already held.
    pub fn push(&mut self, page: IssuePage) {
        self.pages.push(page);
    }

    pub fn pages(&self) -> &[IssuePage] {
        &self.pages
    }

    /// Ordinals represented, in traversal order.
    pub fn issues(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.issue).collect()
    }

    /// Every record in traversal order.
    pub fn records(&self) -> impl Iterator<Item = &NewsRecord> {
        self.pages.iter().flat_map(|p| p.records.iter())
    }

    pub fn into_records(self) -> impl Iterator<Item = NewsRecord> {
        self.pages.into_iter().flat_map(|p| p.records.into_iter())
    }

    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// Column names of the tabular output, in order.
pub const COLUMNS: [&str; 6] = ["id", "title", "text", "website", "link", "timestamp"];

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputRow {
    pub id: usize,
    pub title: String,
    pub text: String,
    pub website: String,
    pub link: String,
    pub timestamp: i64,
}

impl OutputRow {
    pub fn from_record(id: usize, record: NewsRecord) -> Self {
        Self {
            id,
            title: record.title,
            text: record.text,
            website: record.website,
            link: record.link,
            timestamp: record.timestamp,
        }
    }
}
