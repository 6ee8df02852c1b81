//! Backward walk through the issue archive.
//!
//! The walk starts at the landing page, which always shows the newest issue,
//! and then requests each older issue by number. Faults on the landing page
//! end the crawl; faults on any older issue only drop that issue.
//!
//! ```text
//! start_url ──render──▶ issue N ──▶ N-1 ──▶ N-2 ──▶ … ──▶ N-(depth-1)
//!   fatal on fault       each step: Ok(page) kept, Err(_) logged and skipped
//! ```

use crate::config::{CrawlConfig, RecordFailurePolicy};
use crate::error::{CrawlError, ExtractionError};
use crate::models::{IssuePage, NewsRecord, ResultSet, Snapshot};
use crate::render::RenderGateway;
use crate::scrapers::aiweekly;
use scraper::Html;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Collect the current issue plus up to `depth - 1` older ones.
///
/// Issues appear in the result newest first. Any older issue that fails to
/// render or parse, or whose page declares an ordinal outside
/// `[newest - depth + 1, last kept)`, is skipped and the walk moves on to the
/// next older number.
///
/// # Errors
///
/// - [`CrawlError::ZeroDepth`] before anything is rendered when `depth` is 0
/// - any render or extraction fault on `start_url`
/// - [`CrawlError::Range`] when `depth` exceeds the current issue number; no
///   older issue has been requested at that point
#[instrument(level = "info", skip(session, config))]
pub async fn collect<G: RenderGateway>(
    session: &mut G,
    start_url: &str,
    depth: u32,
    config: &CrawlConfig,
) -> Result<ResultSet, CrawlError> {
    if depth == 0 {
        return Err(CrawlError::ZeroDepth);
    }

    let current = fetch_issue(session, start_url, depth, config).await?;
    let newest = current.issue;
    info!(issue = newest, records = current.records.len(), "Collected current issue");

    let mut results = ResultSet::new();
    results.push(current);

    let lowest = newest - (depth - 1);
    let mut last_kept = newest;
    for n in 1..depth {
        let previous = newest - n;
        let url = config.issue_url(previous);
        let step = fetch_issue(session, &url, 1, config)
            .await
            .and_then(|page| ensure_in_window(page, lowest, last_kept));

        match step {
            Ok(page) => {
                info!(
                    issue = page.issue,
                    url = %page.url,
                    records = page.records.len(),
                    "Collected older issue"
                );
                last_kept = page.issue;
                results.push(page);
            }
            Err(e) => {
                warn!(issue = previous, %url, error = %e, "Skipping older issue");
            }
        }
    }

    info!(
        issues = results.pages().len(),
        records = results.record_count(),
        "Traversal complete"
    );
    Ok(results)
}

/// Run [`collect`] on `session` and release the session afterwards.
///
/// The session is closed exactly once whether or not the traversal
/// succeeded. A failure to close is logged and never replaces the
/// traversal's own outcome.
pub async fn collect_with_session<G: RenderGateway>(
    mut session: G,
    start_url: &str,
    depth: u32,
    config: &CrawlConfig,
) -> Result<ResultSet, CrawlError> {
    let outcome = collect(&mut session, start_url, depth, config).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close render session");
    }
    outcome
}

/// Render one page, let it settle, and read it as an issue.
async fn fetch_issue<G: RenderGateway>(
    session: &mut G,
    url: &str,
    depth: u32,
    config: &CrawlConfig,
) -> Result<IssuePage, CrawlError> {
    debug!(%url, "Requesting issue page");
    let snapshot = session.render(url).await?;
    if !config.settle_delay.is_zero() {
        debug!(delay_ms = config.settle_delay.as_millis() as u64, "Settling");
        sleep(config.settle_delay).await;
    }
    read_issue(url, snapshot, depth, config.record_failure)
}

fn read_issue(
    url: &str,
    snapshot: Snapshot,
    depth: u32,
    policy: RecordFailurePolicy,
) -> Result<IssuePage, CrawlError> {
    let document = Html::parse_document(&snapshot.markup);
    let issue = aiweekly::extract_issue_number(&document)?;
    if depth > issue {
        return Err(CrawlError::Range {
            requested: depth,
            available: issue,
        });
    }

    let extracted = aiweekly::extract_records(&document, snapshot.captured_at);
    let records = keep_records(extracted, policy, issue)?;
    Ok(IssuePage {
        issue,
        url: url.to_string(),
        records,
    })
}

fn keep_records(
    extracted: Vec<Result<NewsRecord, ExtractionError>>,
    policy: RecordFailurePolicy,
    issue: u32,
) -> Result<Vec<NewsRecord>, ExtractionError> {
    let mut records = Vec::with_capacity(extracted.len());
    for result in extracted {
        match result {
            Ok(record) => records.push(record),
            Err(e) => match policy {
                RecordFailurePolicy::AbortPage => return Err(e),
                RecordFailurePolicy::SkipRecord => {
                    warn!(issue, error = %e, "Dropping malformed story");
                }
            },
        }
    }
    Ok(records)
}

/// Older pages must land in `[lowest, last_kept)` to keep ordinals strictly
/// decreasing and inside the requested window.
fn ensure_in_window(page: IssuePage, lowest: u32, last_kept: u32) -> Result<IssuePage, CrawlError> {
    if (lowest..last_kept).contains(&page.issue) {
        Ok(page)
    } else {
        Err(CrawlError::OrdinalOutOfOrder {
            lowest,
            expected_below: last_kept,
            found: page.issue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderFault;
    use crate::scrapers::aiweekly::fixtures::{issue_page, story};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    const START: &str = "https://aiweekly.co/";

    /// In-memory gateway serving canned markup per URL.
    #[derive(Default)]
    struct ScriptedGateway {
        pages: HashMap<String, String>,
        requested: Vec<String>,
        closed: Rc<Cell<usize>>,
    }

    impl ScriptedGateway {
        fn page(mut self, url: &str, markup: String) -> Self {
            self.pages.insert(url.to_string(), markup);
            self
        }
    }

    impl RenderGateway for ScriptedGateway {
        async fn render(&mut self, url: &str) -> Result<Snapshot, RenderFault> {
            self.requested.push(url.to_string());
            match self.pages.get(url) {
                Some(markup) => Ok(Snapshot {
                    markup: markup.clone(),
                    captured_at: 1_700_000_000,
                }),
                None => Err(RenderFault::Unavailable {
                    url: url.to_string(),
                    reason: "not scripted".to_string(),
                }),
            }
        }

        async fn close(self) -> Result<(), RenderFault> {
            self.closed.set(self.closed.get() + 1);
            Ok(())
        }
    }

    fn config() -> CrawlConfig {
        CrawlConfig {
            settle_delay: Duration::ZERO,
            ..CrawlConfig::default()
        }
    }

    fn simple_issue(issue: u32) -> String {
        issue_page(issue, &[story(&format!("Story {issue}"))], &[])
    }

    fn archive(newest: u32, oldest: u32) -> ScriptedGateway {
        let config = config();
        let mut gateway = ScriptedGateway::default().page(START, simple_issue(newest));
        for issue in oldest..newest {
            gateway = gateway.page(&config.issue_url(issue), simple_issue(issue));
        }
        gateway
    }

    fn titles(set: &ResultSet) -> Vec<String> {
        set.records().map(|r| r.title.clone()).collect()
    }

    #[tokio::test]
    async fn test_walks_backward_from_current_issue() {
        let mut gateway = archive(120, 100);
        let set = collect(&mut gateway, START, 3, &config()).await.unwrap();

        assert_eq!(set.issues(), vec![120, 119, 118]);
        assert_eq!(titles(&set), vec!["Story 120", "Story 119", "Story 118"]);
        assert_eq!(
            gateway.requested,
            vec![
                START.to_string(),
                "https://aiweekly.co/issues/119#start".to_string(),
                "https://aiweekly.co/issues/118#start".to_string(),
            ]
        );
        assert!(set.records().all(|r| r.timestamp == 1_700_000_000));
    }

    #[tokio::test]
    async fn test_render_fault_on_older_issue_is_skipped() {
        let config = config();
        let mut gateway = archive(120, 118);
        gateway.pages.remove(&config.issue_url(119));

        let set = collect(&mut gateway, START, 3, &config).await.unwrap();
        assert_eq!(set.issues(), vec![120, 118]);
        assert_eq!(titles(&set), vec!["Story 120", "Story 118"]);
        assert_eq!(gateway.requested.len(), 3);
    }

    #[tokio::test]
    async fn test_depth_one_fetches_only_current() {
        let mut gateway = archive(120, 100);
        let set = collect(&mut gateway, START, 1, &config()).await.unwrap();
        assert_eq!(set.issues(), vec![120]);
        assert_eq!(gateway.requested, vec![START.to_string()]);
    }

    #[tokio::test]
    async fn test_depth_beyond_current_issue_is_range_error() {
        let mut gateway = archive(3, 1);
        let err = collect(&mut gateway, START, 4, &config()).await.unwrap_err();

        assert!(matches!(
            err,
            CrawlError::Range {
                requested: 4,
                available: 3
            }
        ));
        assert_eq!(gateway.requested, vec![START.to_string()]);
    }

    #[tokio::test]
    async fn test_depth_equal_to_current_issue_reaches_issue_one() {
        let mut gateway = archive(3, 1);
        let set = collect(&mut gateway, START, 3, &config()).await.unwrap();
        assert_eq!(set.issues(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_zero_depth_renders_nothing() {
        let mut gateway = archive(120, 119);
        let err = collect(&mut gateway, START, 0, &config()).await.unwrap_err();
        assert!(matches!(err, CrawlError::ZeroDepth));
        assert!(gateway.requested.is_empty());
    }

    #[tokio::test]
    async fn test_missing_anchor_on_start_page_is_fatal() {
        let mut gateway = archive(120, 118)
            .page(START, "<html><body><p>maintenance</p></body></html>".to_string());
        let err = collect(&mut gateway, START, 3, &config()).await.unwrap_err();

        assert!(matches!(
            err,
            CrawlError::Extraction(ExtractionError::MissingIssueAnchor)
        ));
        assert_eq!(gateway.requested.len(), 1);
    }

    #[tokio::test]
    async fn test_render_fault_on_start_page_is_fatal() {
        let mut gateway = ScriptedGateway::default();
        let err = collect(&mut gateway, START, 2, &config()).await.unwrap_err();
        assert!(matches!(err, CrawlError::Render(RenderFault::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_missing_anchor_on_older_issue_is_skipped() {
        let config = config();
        let mut gateway = archive(120, 117).page(
            &config.issue_url(118),
            "<html><body><div id=\"news\"></div></body></html>".to_string(),
        );
        let set = collect(&mut gateway, START, 4, &config).await.unwrap();
        assert_eq!(set.issues(), vec![120, 119, 117]);
    }

    #[tokio::test]
    async fn test_malformed_story_dropped_under_skip_record() {
        let broken = (Some("No body"), None, Some("wired.com"), Some("https://wired.com/x"));
        let mut gateway = ScriptedGateway::default().page(
            START,
            issue_page(50, &[story("Kept"), broken], &[story("Also kept")]),
        );
        let set = collect(&mut gateway, START, 1, &config()).await.unwrap();
        assert_eq!(titles(&set), vec!["Kept", "Also kept"]);
    }

    #[tokio::test]
    async fn test_abort_page_policy() {
        let config = CrawlConfig {
            record_failure: RecordFailurePolicy::AbortPage,
            ..config()
        };
        let broken = (Some("No body"), None, Some("wired.com"), Some("https://wired.com/x"));

        // Fatal on the start page.
        let mut gateway = ScriptedGateway::default()
            .page(START, issue_page(50, &[story("Kept"), broken], &[]));
        let err = collect(&mut gateway, START, 1, &config).await.unwrap_err();
        assert!(matches!(
            err,
            CrawlError::Extraction(ExtractionError::MissingField { field: "text", .. })
        ));

        // Skipped on an older issue.
        let mut gateway = archive(50, 47).page(
            &config.issue_url(49),
            issue_page(49, &[broken], &[story("Lost with its page")]),
        );
        let set = collect(&mut gateway, START, 3, &config).await.unwrap();
        assert_eq!(set.issues(), vec![50, 48]);
    }

    #[tokio::test]
    async fn test_older_page_declaring_newer_ordinal_is_skipped() {
        let config = config();
        // Archive serves the landing page again for a retired issue number.
        let mut gateway = archive(120, 117).page(&config.issue_url(119), simple_issue(120));
        let set = collect(&mut gateway, START, 3, &config).await.unwrap();
        assert_eq!(set.issues(), vec![120, 118]);
    }

    #[tokio::test]
    async fn test_declared_ordinal_is_authoritative() {
        let config = config();
        // Issue 119 was never published; its URL shows 118.
        let mut gateway = archive(120, 116).page(&config.issue_url(119), simple_issue(118));
        let set = collect(&mut gateway, START, 4, &config).await.unwrap();

        // 118's own URL then repeats an ordinal already kept and is skipped.
        assert_eq!(set.issues(), vec![120, 118, 117]);
    }

    #[tokio::test]
    async fn test_older_page_declaring_ordinal_below_window_is_skipped() {
        let config = config();
        // Retired issue number redirects far back in the archive.
        let mut gateway = archive(120, 110).page(&config.issue_url(119), simple_issue(50));
        let set = collect(&mut gateway, START, 4, &config).await.unwrap();

        assert_eq!(set.issues(), vec![120, 118, 117]);
        assert_eq!(titles(&set), vec!["Story 120", "Story 118", "Story 117"]);
    }

    #[test]
    fn test_window_bounds() {
        let page = |issue: u32| IssuePage {
            issue,
            url: format!("https://aiweekly.co/issues/{issue}#start"),
            records: Vec::new(),
        };

        assert!(ensure_in_window(page(117), 117, 118).is_ok());
        assert!(ensure_in_window(page(119), 117, 120).is_ok());
        assert!(matches!(
            ensure_in_window(page(116), 117, 118),
            Err(CrawlError::OrdinalOutOfOrder {
                lowest: 117,
                expected_below: 118,
                found: 116
            })
        ));
        assert!(ensure_in_window(page(118), 117, 118).is_err());
    }

    #[tokio::test]
    async fn test_session_closed_once_on_success() {
        let gateway = archive(120, 118);
        let closed = Rc::clone(&gateway.closed);
        let set = collect_with_session(gateway, START, 2, &config()).await.unwrap();
        assert_eq!(set.issues(), vec![120, 119]);
        assert_eq!(closed.get(), 1);
    }

    #[tokio::test]
    async fn test_session_closed_once_on_failure() {
        let gateway = archive(2, 1);
        let closed = Rc::clone(&gateway.closed);
        let result = collect_with_session(gateway, START, 5, &config()).await;
        assert!(matches!(result, Err(CrawlError::Range { .. })));
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_keep_records_skip_vs_abort() {
        let ok = NewsRecord {
            title: "t".to_string(),
            text: "b".to_string(),
            website: "w".to_string(),
            link: "l".to_string(),
            timestamp: 0,
        };
        let bad = ExtractionError::MissingField {
            field: "title",
            container: "news",
            index: 1,
        };

        let kept = keep_records(
            vec![Ok(ok.clone()), Err(bad.clone()), Ok(ok.clone())],
            RecordFailurePolicy::SkipRecord,
            9,
        )
        .unwrap();
        assert_eq!(kept.len(), 2);

        let aborted = keep_records(
            vec![Ok(ok), Err(bad.clone())],
            RecordFailurePolicy::AbortPage,
            9,
        );
        assert_eq!(aborted, Err(bad));
    }
}
