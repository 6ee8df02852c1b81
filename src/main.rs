//! # AI Weekly Archive
//!
//! Walks the [AI Weekly](https://aiweekly.co) newsletter archive backward
//! from the newest issue and exports every story as a flat record table.
//!
//! ## Usage
//!
//! ```sh
//! aiweekly_archive --depth 50 -o ./records.csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Rendering**: fetch a page and wait until its issue anchor is present
//! 2. **Extraction**: read the issue number and stories from fixed markup paths
//! 3. **Traversal**: step back one issue number at a time, skipping bad pages
//! 4. **Assembly**: validate and index records, then write CSV (and JSON)

use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod assembler;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod render;
mod scrapers;
mod traversal;
mod utils;

use cli::Cli;
use render::HttpRenderer;
use traversal::collect_with_session;
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("aiweekly_archive starting up");

    let args = Cli::parse();
    debug!(depth = args.depth, csv_output = %args.csv_output, json_output = ?args.json_output, "Parsed CLI arguments");

    let config = match config::load(&args).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // Fail before crawling if the results could not be saved anyway.
    for path in std::iter::once(&args.csv_output).chain(args.json_output.as_ref()) {
        if let Err(e) = ensure_writable_parent(path).await {
            error!(%path, error = %e, "Output location is not writable");
            return Err(e.into());
        }
    }

    // ---- Crawl ----
    let session = HttpRenderer::new(&config)?;
    let results = match collect_with_session(session, &config.start_url, args.depth, &config).await {
        Ok(results) => results,
        Err(e) => {
            if e.is_page_fault() {
                error!(url = %config.start_url, error = %e, "Start page could not be read; nothing to walk from");
            } else {
                error!(depth = args.depth, error = %e, "Crawl request rejected");
            }
            return Err(e.into());
        }
    };

    info!(
        issues = %results.issues().iter().join(", "),
        requested = args.depth,
        collected = results.pages().len(),
        "Collected issues"
    );
    if results.is_empty() {
        warn!("No stories were extracted");
    }

    // ---- Assemble & write ----
    let rows = assembler::assemble(results);

    if let Err(e) = outputs::write_all(&rows, &args.csv_output, args.json_output.as_deref()).await {
        error!(error = %e, "Failed to write records");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        rows = rows.len(),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
