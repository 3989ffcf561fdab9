// src/page/html.rs
// =============================================================================
// This module turns downloaded pages into documents and pulls links out of them.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Can serialize the parsed tree back into HTML (our "rendered" page)
//
// We also use the `url` crate to:
// - Parse and validate URLs
// - Resolve relative links against the page that referenced them
//
// Rust concepts:
// - BTreeSet: a sorted set, so duplicate hrefs collapse and order is stable
// - Option<T>: for links that can't be turned into a crawlable URL
// =============================================================================

use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

use crate::error::CrawlError;

// A parsed page. Only lives long enough to pull links out and render it.
pub struct Document {
    html: Html,
}

impl Document {
    // Parses a page body into a document
    //
    // Parameters:
    //   url: where the body came from (only used in error messages)
    //   body: the response text, already decoded from the server's charset
    //   content_type: the Content-Type header, if the server sent one
    //
    // Returns: Err(Parse) when the server says the body isn't markup
    pub fn parse(url: &str, body: &str, content_type: Option<&str>) -> Result<Self, CrawlError> {
        if let Some(content_type) = content_type {
            if !is_markup(content_type) {
                return Err(CrawlError::Parse {
                    url: url.to_string(),
                    reason: format!("unsupported content type {}", content_type),
                });
            }
        }

        Ok(Document {
            html: Html::parse_document(body),
        })
    }

    // Serializes the parsed tree back to HTML. This is what gets stored.
    pub fn render(&self) -> String {
        self.html.html()
    }
}

// Extracts every link on the page that contains `pattern`
//
// Parameters:
//   document: the parsed page
//   base: the URL of the page (for resolving relative links)
//   pattern: plain substring the raw href must contain (not a regex)
//
// Returns: set of absolute http(s) URLs. Duplicate hrefs collapse to one entry.
//
// Example:
//   href = "/Tea/c=NumiTeaStore@ByType?p=2", pattern = "NumiTeaStore"
//   base = "http://shop.numitea.com/Tea-by-Type"
//   result = {"http://shop.numitea.com/Tea/c=NumiTeaStore@ByType?p=2"}
pub fn extract_links(document: &Document, base: &Url, pattern: &str) -> BTreeSet<String> {
    let mut links = BTreeSet::new();

    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return links,
    };

    for element in document.html.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            // Match against what the page author wrote, before resolution
            if !href.contains(pattern) {
                continue;
            }

            match resolve_url(base, href) {
                Some(absolute_url) => {
                    links.insert(absolute_url);
                }
                None => log::debug!("Skipping malformed link '{}' on {}", href, base),
            }
        }
    }

    links
}

// Resolves a possibly-relative href to an absolute, crawlable URL
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs" -> Some("https://example.com/docs")
//   href = "https://other.com" -> Some("https://other.com/")
//   href = "javascript:void(0)" -> None (not HTTP)
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    // Url::join keeps absolute hrefs as they are and fills in the
    // scheme and host for everything else
    let url = base.join(href.trim()).ok()?;

    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url.to_string()),
        _ => None,
    }
}

fn is_markup(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    // text/css and text/javascript are text, but not pages
    mime.is_empty()
        || mime == "text/html"
        || mime == "application/xhtml+xml"
        || mime.ends_with("/xml")
        || mime.ends_with("+xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Document {
        Document::parse("https://example.com", html, Some("text/html")).unwrap()
    }

    #[test]
    fn test_keeps_absolute_and_resolves_relative() {
        let html = r#"
            <a href="http://shop.numitea.com/Green/c=NumiTeaStore@ByType">Green</a>
            <a href="/Black/c=NumiTeaStore@ByType?page=2">Black</a>
            <a href="/about-us">About</a>
        "#;
        let base = Url::parse("http://shop.numitea.com/Tea-by-Type/c/NumiTeaStore@ByType").unwrap();
        let links = extract_links(&doc(html), &base, "NumiTeaStore");

        let expected: BTreeSet<String> = [
            "http://shop.numitea.com/Green/c=NumiTeaStore@ByType".to_string(),
            "http://shop.numitea.com/Black/c=NumiTeaStore@ByType?page=2".to_string(),
        ]
        .into_iter()
        .collect();
        assert_eq!(links, expected);
    }

    #[test]
    fn test_relative_link_uses_base_scheme_and_host() {
        let html = r#"<a href="/p/NUMIS-10430&c=NumiTeaStore">Tea</a>"#;
        let base = Url::parse("https://shop.example.com:8443/catalog/list").unwrap();
        let links = extract_links(&doc(html), &base, "NUMIS");
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec!["https://shop.example.com:8443/p/NUMIS-10430&c=NumiTeaStore".to_string()]
        );
    }

    #[test]
    fn test_duplicate_hrefs_collapse() {
        let html = r#"
            <a href="/item/NUMIS-1">One</a>
            <a href="/item/NUMIS-1">One again</a>
            <a href="https://example.com/item/NUMIS-1">Absolute one</a>
        "#;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract_links(&doc(html), &base, "NUMIS");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_skip_non_http_links() {
        let html = r#"
            <a href="mailto:NUMIS@example.com">Email</a>
            <a href="javascript:open('NUMIS')">Script</a>
        "#;
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract_links(&doc(html), &base, "NUMIS");
        assert!(links.is_empty());
    }

    #[test]
    fn test_anchor_without_href_is_ignored() {
        let html = r#"<a name="NUMIS-7">Bookmark</a>"#;
        let base = Url::parse("https://example.com/").unwrap();
        assert!(extract_links(&doc(html), &base, "NUMIS").is_empty());
    }

    #[test]
    fn test_parse_rejects_images() {
        let result = Document::parse("https://example.com/logo.png", "\u{fffd}PNG", Some("image/png"));
        assert!(matches!(result, Err(CrawlError::Parse { .. })));
    }

    #[test]
    fn test_parse_rejects_stylesheets_and_scripts() {
        for content_type in ["text/css", "text/javascript; charset=utf-8", "text/plain"] {
            let result = Document::parse("https://example.com/site.css", "body {}", Some(content_type));
            assert!(
                matches!(result, Err(CrawlError::Parse { .. })),
                "{} should not be parsed as a page",
                content_type
            );
        }
    }

    #[test]
    fn test_parse_accepts_xhtml_and_xml() {
        for content_type in ["application/xhtml+xml", "application/xml", "text/xml", "TEXT/HTML"] {
            assert!(Document::parse("https://example.com", "<p>hi</p>", Some(content_type)).is_ok());
        }
    }

    #[test]
    fn test_parse_without_content_type() {
        assert!(Document::parse("https://example.com", "<p>Caf\u{e9}</p>", None).is_ok());
    }

    #[test]
    fn test_query_only_href_keeps_base_path() {
        // Resolved the way a browser does: against the referencing page,
        // so the page path survives and only the query is replaced
        let html = r#"<a href="?c=NumiTeaStore&page=2">Next</a>"#;
        let base = Url::parse("http://shop.numitea.com/Tea-by-Type/list?c=NumiTeaStore").unwrap();
        let links = extract_links(&doc(html), &base, "NumiTeaStore");
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec!["http://shop.numitea.com/Tea-by-Type/list?c=NumiTeaStore&page=2".to_string()]
        );
    }

    #[test]
    fn test_path_relative_href_resolves_against_base_directory() {
        let html = r#"<a href="p/NUMIS-1">Tea</a>"#;
        let base = Url::parse("http://shop.numitea.com/catalog/list").unwrap();
        let links = extract_links(&doc(html), &base, "NUMIS");
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec!["http://shop.numitea.com/catalog/p/NUMIS-1".to_string()]
        );
    }

    #[test]
    fn test_parse_accepts_charset_parameter() {
        let result = Document::parse(
            "https://example.com",
            "<p>hi</p>",
            Some("text/html; charset=utf-8"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_render_contains_page_content() {
        let rendered = doc("<title>Numi</title><p>Jasmine Green</p>").render();
        assert!(rendered.contains("<title>Numi</title>"));
        assert!(rendered.contains("Jasmine Green"));
    }
}
