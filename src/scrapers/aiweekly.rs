//! AI Weekly issue page extractor.
//!
//! Issue pages on [AI Weekly](https://aiweekly.co) are rendered client-side
//! but, once rendered, follow a fixed and unversioned shape. Extraction uses
//! exact structural paths rather than text heuristics, so a layout change on
//! the site means editing the tables below, not the logic.
//!
//! # Page shape
//!
//! ```text
//! body
//! ├── header > div[1] > div > div[1] > a[1]   href=".../issues/120#start"
//! ├── #news        > div*   primary stories
//! └── #inthenews2  > div*   "also mentioned" stories
//!
//! story div
//! ├── h3 > a               title
//! ├── p                    summary text
//! └── span > span > a      source site (text) and link (href)
//! ```
//!
//! # Text values
//!
//! A text field is every descendant text node of its element, concatenated
//! in document order and trimmed at the ends. Inline markup inside a title
//! such as `<a><b>Big</b> news</a>` reads as `Big news`, not only the text
//! nodes sitting directly under the `a`. Whitespace inside the value is kept
//! as served.

use crate::error::ExtractionError;
use crate::models::NewsRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// First link inside the header navigation block; its href names the issue.
const ISSUE_ANCHOR_PATH: &str =
    "body > header > div:nth-of-type(1) > div > div:nth-of-type(1) > a:nth-of-type(1)";

/// Story containers by element id, in the order their stories are emitted.
const STORY_CONTAINERS: [&str; 2] = ["news", "inthenews2"];

/// Where a field's value is read from once its element is located.
#[derive(Debug, Clone, Copy)]
enum Source {
    /// All descendant text, joined and trimmed.
    Text,
    Attr(&'static str),
}

/// Logical field name mapped to a child-element path inside a story div.
#[derive(Debug)]
struct FieldPath {
    field: &'static str,
    path: &'static [&'static str],
    source: Source,
}

const STORY_FIELDS: [FieldPath; 4] = [
    FieldPath {
        field: "title",
        path: &["h3", "a"],
        source: Source::Text,
    },
    FieldPath {
        field: "text",
        path: &["p"],
        source: Source::Text,
    },
    FieldPath {
        field: "website",
        path: &["span", "span", "a"],
        source: Source::Text,
    },
    FieldPath {
        field: "link",
        path: &["span", "span", "a"],
        source: Source::Attr("href"),
    },
];

static ISSUE_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(ISSUE_ANCHOR_PATH).expect("issue anchor selector"));

static CONTAINER_CHILDREN: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    STORY_CONTAINERS
        .iter()
        .map(|id| {
            let selector = Selector::parse(&format!("#{id} > div")).expect("container selector");
            (*id, selector)
        })
        .collect()
});

static ISSUE_HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"issues/(\d+)#").expect("issue regex"));

/// Whether rendered markup already carries the readiness marker.
///
/// The issue anchor is the last thing client-side rendering fills in, so its
/// presence is what the render gateway waits for.
pub fn is_ready(markup: &str) -> bool {
    let document = Html::parse_document(markup);
    document.select(&ISSUE_ANCHOR).next().is_some()
}

/// Parse the current issue's ordinal from the header anchor.
///
/// # Errors
///
/// [`ExtractionError::MissingIssueAnchor`] when the anchor or its href is
/// absent, [`ExtractionError::MalformedIssueHref`] when the href does not
/// embed `issues/<n>#`.
pub fn extract_issue_number(document: &Html) -> Result<u32, ExtractionError> {
    let href = document
        .select(&ISSUE_ANCHOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or(ExtractionError::MissingIssueAnchor)?
        .trim();

    ISSUE_HREF
        .captures(href)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .ok_or_else(|| ExtractionError::MalformedIssueHref {
            href: href.to_string(),
        })
}

/// Extract every story on the page, one result per story element.
///
/// Stories from the primary list come first, then the "also mentioned" list,
/// each in document order. A story missing any field yields an error in its
/// slot without affecting its neighbours.
pub fn extract_records(
    document: &Html,
    captured_at: i64,
) -> Vec<Result<NewsRecord, ExtractionError>> {
    let mut results = Vec::new();
    for (container, selector) in CONTAINER_CHILDREN.iter() {
        let container: &'static str = *container;
        let before = results.len();
        for (index, story) in document.select(selector).enumerate() {
            results.push(extract_story(story, container, index, captured_at));
        }
        debug!(container, count = results.len() - before, "Scanned story container");
    }
    results
}

fn extract_story(
    story: ElementRef<'_>,
    container: &'static str,
    index: usize,
    captured_at: i64,
) -> Result<NewsRecord, ExtractionError> {
    let [title, text, website, link] = STORY_FIELDS.each_ref().map(|entry| {
        field_value(story, entry).ok_or(ExtractionError::MissingField {
            field: entry.field,
            container,
            index,
        })
    });

    Ok(NewsRecord {
        title: title?,
        text: text?,
        website: website?,
        link: link?,
        timestamp: captured_at,
    })
}

fn field_value(story: ElementRef<'_>, entry: &FieldPath) -> Option<String> {
    let element = resolve(story, entry.path)?;
    let raw = match entry.source {
        Source::Text => element.text().collect::<String>(),
        Source::Attr(name) => element.value().attr(name)?.to_string(),
    };
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// First element reached by following `path` through direct children, in
/// document order.
fn resolve<'a>(element: ElementRef<'a>, path: &[&str]) -> Option<ElementRef<'a>> {
    let Some((head, rest)) = path.split_first() else {
        return Some(element);
    };
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == *head)
        .find_map(|child| resolve(child, rest))
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Render a minimal issue page with the given stories.
    ///
    /// Each story is `(title, text, website, link)`; a `None` drops that
    /// part of the markup.
    pub fn issue_page(
        issue: u32,
        news: &[(Option<&str>, Option<&str>, Option<&str>, Option<&str>)],
        also: &[(Option<&str>, Option<&str>, Option<&str>, Option<&str>)],
    ) -> String {
        format!(
            r#"<!DOCTYPE html>
<html><head><title>AI Weekly</title></head>
<body>
<header>
  <div><div><div>
    <a href="https://aiweekly.co/issues/{issue}#start">Issue {issue}</a>
    <a href="/subscribe">Subscribe</a>
  </div></div></div>
</header>
<main>
  <section id="news">{}</section>
  <section id="inthenews2">{}</section>
</main>
</body></html>"#,
            stories(news),
            stories(also)
        )
    }

    fn stories(items: &[(Option<&str>, Option<&str>, Option<&str>, Option<&str>)]) -> String {
        items
            .iter()
            .map(|(title, text, website, link)| {
                let mut html = String::from("<div>");
                if let Some(title) = title {
                    html.push_str(&format!(r#"<h3><a href="/story">{title}</a></h3>"#));
                }
                if let Some(text) = text {
                    html.push_str(&format!("<p>\n{text}\n</p>"));
                }
                if website.is_some() || link.is_some() {
                    let href = link.map(|l| format!(r#" href="{l}""#)).unwrap_or_default();
                    html.push_str(&format!(
                        "<span><span><a{href}>{}</a></span></span>",
                        website.unwrap_or("")
                    ));
                }
                html.push_str("</div>");
                html
            })
            .collect()
    }

    pub fn story<'a>(
        title: &'a str,
    ) -> (Option<&'a str>, Option<&'a str>, Option<&'a str>, Option<&'a str>) {
        (
            Some(title),
            Some("Summary of the story."),
            Some("techcrunch.com"),
            Some("https://techcrunch.com/story"),
        )
    }
}
