//! Article content extraction.
//!
//! Turns a fetched document into (title, body) with boilerplate stripped.
//! The result is a tagged present/absent value: `None` means no article
//! could be produced at all, while `Some` with empty content means the page
//! parsed but carried no body text. Callers rely on that distinction.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use civicore_shared::NewsArticle;

/// Content-region selectors tried in order, most specific first.
const CONTENT_SELECTORS: [&str; 4] = ["article", "main", r#"[role="main"]"#, ".content"];

/// Elements that are page chrome, not article content.
const CHROME_SELECTOR: &str = "nav, header, footer, aside, script, style, noscript, .sidebar";

/// Extract an article from a fetched document.
///
/// - `document` absent, or blank markup: `None` — the URL alone cannot
///   manufacture a record.
/// - Parsed page without a discoverable title: title is empty, the article
///   is still produced.
/// - Parsed page without body text: `Some` with empty content.
pub fn extract_article(document: Option<&str>, url: &Url) -> Option<NewsArticle> {
    let raw = document?;
    if raw.trim().is_empty() {
        return None;
    }

    let doc = Html::parse_document(raw);
    let title = extract_title(&doc).unwrap_or_default();
    let content = extract_body_text(&doc);
    Some(NewsArticle::new(title, url.to_string(), content))
}

/// Title from `<title>`, falling back to the first `<h1>`.
fn extract_title(doc: &Html) -> Option<String> {
    let title_sel = Selector::parse("title").unwrap();
    if let Some(el) = doc.select(&title_sel).next() {
        let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() {
            return Some(text);
        }
    }

    let h1_sel = Selector::parse("h1").unwrap();
    doc.select(&h1_sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
}

/// Body text of the main content region, chrome removed.
fn extract_body_text(doc: &Html) -> String {
    for sel_str in CONTENT_SELECTORS {
        let sel = Selector::parse(sel_str).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            return region_text(el);
        }
    }

    // Last resort: the whole body, minus chrome.
    let body_sel = Selector::parse("body").unwrap();
    doc.select(&body_sel)
        .next()
        .map(region_text)
        .unwrap_or_default()
}

/// Text content of a region after stripping chrome elements.
fn region_text(el: ElementRef) -> String {
    let stripped = strip_chrome(&el.inner_html());
    let frag = Html::parse_fragment(&stripped);
    let text = frag.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Remove navigation/chrome elements from an HTML fragment.
fn strip_chrome(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let chrome_sel = Selector::parse(CHROME_SELECTOR).unwrap();

    let mut result = html.to_string();
    for el in doc.select(&chrome_sel) {
        let outer = el.html();
        result = result.replace(&outer, "");
    }
    result
}

/// Collapse whitespace runs to single spaces and trim.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
