//! JSON export of the assembled rows.
//!
//! Writes a single pretty-printed array, one object per row:
//!
//! ```text
//! [
//!   { "id": 0, "title": "...", "text": "...", "website": "...", "link": "...", "timestamp": 1700000000 },
//!   ...
//! ]
//! ```

use crate::error::OutputError;
use crate::models::OutputRow;
use crate::utils::ensure_parent_dir;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write rows to `path` as a JSON array.
///
/// # Output Path
///
/// Parent directories of `path` are created if missing.
#[instrument(level = "info", skip_all, fields(%path, rows = rows.len()))]
pub async fn write_rows(rows: &[OutputRow], path: &str) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(rows)?;

    ensure_parent_dir(path).await?;
    if let Err(source) = fs::write(path, json).await {
        error!(error = %source, "Failed writing JSON");
        return Err(OutputError::Io {
            path: path.to_string(),
            source,
        });
    }
    info!("Wrote JSON records");
    Ok(())
}
