//! Utility functions for log formatting and output path checks.

use crate::error::OutputError;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes, on a character boundary, with
/// an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Create the parent directory of `path` if it does not exist yet.
pub async fn ensure_parent_dir(path: &str) -> Result<(), OutputError> {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| OutputError::Io {
                    path: parent.display().to_string(),
                    source,
                })
        }
        _ => Ok(()),
    }
}

/// Ensure the directory that will hold `path` exists and is writable.
///
/// Run before crawling so an unwritable destination is reported before any
/// page is fetched. A scratch file is created next to `path` and removed again.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_parent(path: &str) -> Result<(), OutputError> {
    ensure_parent_dir(path).await?;

    let check_path = format!("{path}.__write_check__");
    match stdfs::File::create(&check_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&check_path);
            info!("Output location is writable");
            Ok(())
        }
        Err(source) => Err(OutputError::Io {
            path: check_path,
            source,
        }),
    }
}

/// Scratch path under the system temp dir, unique per test.
#[cfg(test)]
pub(crate) fn scratch_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("aiweekly_archive_{}_{name}", std::process::id()))
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // 'é' is two bytes; cutting at 3 would split the second one.
        let result = truncate_for_log("éééé", 3);
        assert_eq!(result, "é…(+6 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_directories() {
        let dir = scratch_path("nested_out");
        let target = format!("{dir}/deeper/records.csv");
        ensure_writable_parent(&target).await.unwrap();

        assert!(Path::new(&format!("{dir}/deeper")).is_dir());
        assert!(!Path::new(&format!("{target}.__write_check__")).exists());
        let _ = stdfs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_ensure_parent_dir_bare_filename() {
        ensure_parent_dir("records.csv").await.unwrap();
    }
}
