//! CSV export of the assembled rows.
//!
//! The header row is always written, so an empty crawl still produces a
//! well-formed file.

use crate::error::OutputError;
use crate::models::{COLUMNS, OutputRow};
use crate::utils::ensure_parent_dir;
use tokio::fs;
use tracing::{info, instrument};

/// Render rows as CSV bytes with a fixed header.
pub fn to_csv(rows: &[OutputRow]) -> Result<Vec<u8>, OutputError> {
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| OutputError::Io {
        path: "<memory>".to_string(),
        source: e.into_error(),
    })
}

/// Write rows to `path` as CSV, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(%path, rows = rows.len()))]
pub async fn write_rows(rows: &[OutputRow], path: &str) -> Result<(), OutputError> {
    let bytes = to_csv(rows)?;
    ensure_parent_dir(path).await?;
    fs::write(path, bytes).await.map_err(|source| OutputError::Io {
        path: path.to_string(),
        source,
    })?;
    info!("Wrote CSV records");
    Ok(())
}
