//! Turning a traversal's result set into indexed output rows.
//!
//! Rows keep traversal order and get consecutive ids starting at zero. Stories
//! listed in both the primary and "also mentioned" sections are kept twice;
//! nothing is deduplicated here.

use crate::models::{NewsRecord, OutputRow, ResultSet};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Why a record was left out of the output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowRejection {
    #[error("{0} is empty")]
    EmptyField(&'static str),

    #[error("timestamp {0} is before the epoch")]
    NegativeTimestamp(i64),
}

/// Check a record against the output row shape.
pub fn validate(record: &NewsRecord) -> Result<(), RowRejection> {
    for (name, value) in [
        ("title", &record.title),
        ("text", &record.text),
        ("website", &record.website),
        ("link", &record.link),
    ] {
        if value.trim().is_empty() {
            return Err(RowRejection::EmptyField(name));
        }
    }
    if record.timestamp < 0 {
        return Err(RowRejection::NegativeTimestamp(record.timestamp));
    }
    Ok(())
}

/// Validate and index every record in `results`.
///
/// Invalid records are logged and dropped; the ids of the remaining rows are
/// `0..n` with no gaps.
#[instrument(level = "info", skip_all, fields(records = results.record_count()))]
pub fn assemble(results: ResultSet) -> Vec<OutputRow> {
    let mut rows = Vec::with_capacity(results.record_count());
    let mut dropped = 0usize;

    for (position, record) in results.into_records().enumerate() {
        match validate(&record) {
            Ok(()) => rows.push(OutputRow::from_record(rows.len(), record)),
            Err(reason) => {
                dropped += 1;
                warn!(position, title = %record.title, %reason, "Dropping record");
            }
        }
    }

    info!(rows = rows.len(), dropped, "Assembled output rows");
    rows
}
