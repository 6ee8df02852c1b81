//! Writers for the assembled output rows.
//!
//! # Submodules
//!
//! - [`csv`]: the primary tabular export, one row per story
//! - [`json`]: the same rows as a JSON array
//!
//! Both writers take rows in final order and write them unchanged, with
//! columns `id, title, text, website, link, timestamp`.

pub mod csv;
pub mod json;

use crate::error::OutputError;
use crate::models::OutputRow;

/// Write the CSV file and, when requested, the JSON copy.
///
/// Either write failing fails the whole call.
pub async fn write_all(
    rows: &[OutputRow],
    csv_path: &str,
    json_path: Option<&str>,
) -> Result<(), OutputError> {
    csv::write_rows(rows, csv_path).await?;
    if let Some(path) = json_path {
        json::write_rows(rows, path).await?;
    }
    Ok(())
}
