//! Command-line interface definitions for the archive crawler.
//!
//! Every crawl setting can come from a flag, an environment variable or the
//! optional YAML config file. Flags left unset fall through to the file and
//! then to the built-in defaults in [`crate::config::CrawlConfig`].

use crate::config::RecordFailurePolicy;
use clap::Parser;

/// Command-line arguments for the archive crawler.
///
/// # Examples
///
/// ```sh
/// # Current issue plus the 49 before it
/// aiweekly_archive --depth 50 -o ./records.csv
///
/// # Also emit JSON, no settle delay
/// aiweekly_archive -d 5 -j ./records.json --settle-delay-ms 0
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Number of issues to collect: the current one plus up to depth-1 older ones
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub depth: u32,

    /// Output path for the CSV record file
    #[arg(short = 'o', long, default_value = "./aiweekly_records.csv")]
    pub csv_output: String,

    /// Optional output path for a JSON copy of the records
    #[arg(short, long)]
    pub json_output: Option<String>,

    /// Optional path to a YAML crawl config file
    #[arg(short, long, env = "AIWEEKLY_CONFIG")]
    pub config: Option<String>,

    /// Landing page of the archive [default: https://aiweekly.co/]
    #[arg(long, env = "AIWEEKLY_START_URL")]
    pub start_url: Option<String>,

    /// Base URL that issue numbers are appended to [default: https://aiweekly.co/issues]
    #[arg(long, env = "AIWEEKLY_ARCHIVE_BASE_URL")]
    pub archive_base_url: Option<String>,

    /// Suffix appended after the issue number [default: #start]
    #[arg(long)]
    pub anchor_suffix: Option<String>,

    /// Pause after each render before parsing, in milliseconds [default: 5000]
    #[arg(long)]
    pub settle_delay_ms: Option<u64>,

    /// Bound on fetching each page, in seconds [default: 10]
    #[arg(long)]
    pub ready_timeout_secs: Option<u64>,

    /// What a malformed story does to its page [default: skip-record]
    #[arg(long, value_enum)]
    pub record_failure: Option<RecordFailurePolicy>,

    /// User-Agent header sent with every request
    #[arg(long, env = "AIWEEKLY_USER_AGENT")]
    pub user_agent: Option<String>,
}
