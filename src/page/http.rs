// src/page/http.rs
// =============================================================================
// This module downloads pages.
//
// Key functionality:
// - Fetch: the "download this URL" capability, as a trait so tests can swap it
// - HttpFetcher: the real implementation on top of reqwest
// - Loader: wraps any fetcher with a deadline and parses the result
//
// The loader never retries. Retrying is the crawler's decision.
//
// Rust concepts:
// - Traits + trait objects: Arc<dyn Fetch> lets us plug in any fetcher
// - async-trait: async methods on trait objects
// - tokio::time::timeout: cancels a future that takes too long
// =============================================================================

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::html::Document;
use crate::error::CrawlError;

// How long a single fetch may take before it's abandoned
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// What came back from the server for one URL
#[derive(Debug, Clone)]
pub struct FetchedPage {
    // Decoded using the charset the server declared
    pub body: String,
    pub content_type: Option<String>,
}

// Downloads the raw bytes behind a URL
//
// Implementations take the URL per call and hold no per-request state,
// so one fetcher can be shared by every task in a layer.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError>;
}

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    // Creates a fetcher with a pooled HTTP client
    //
    // The client's own timeout matches the loader's so slow bodies are cut
    // off at the socket too, not only at the future.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5));

        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent.to_string());
        }

        Ok(HttpFetcher {
            client: builder.build()?,
            timeout,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| categorize_error(url, e, self.timeout))?;

        if !response.status().is_success() {
            return Err(CrawlError::Fetch {
                url: url.to_string(),
                cause: format!("HTTP {}", response.status()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        // text() honours the charset in Content-Type (UTF-8 if none is given)
        let body = response
            .text()
            .await
            .map_err(|e| categorize_error(url, e, self.timeout))?;

        Ok(FetchedPage { body, content_type })
    }
}

// Sorts reqwest failures into our two network error kinds
fn categorize_error(url: &str, error: reqwest::Error, timeout: Duration) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
            after: timeout,
        }
    } else if error.is_redirect() {
        CrawlError::Fetch {
            url: url.to_string(),
            cause: "Too many redirects".to_string(),
        }
    } else if error.is_connect() {
        CrawlError::Fetch {
            url: url.to_string(),
            cause: format!("Connection failed: {}", error),
        }
    } else {
        CrawlError::Fetch {
            url: url.to_string(),
            cause: error.to_string(),
        }
    }
}

// Fetches pages with a deadline and hands back parsed documents
#[derive(Clone)]
pub struct Loader {
    fetcher: Arc<dyn Fetch>,
    timeout: Duration,
}

impl Loader {
    pub fn new(fetcher: Arc<dyn Fetch>, timeout: Duration) -> Self {
        Loader { fetcher, timeout }
    }

    // Fetches `url` and parses it into a Document
    //
    // Errors:
    //   Timeout if the fetch doesn't finish within the deadline (the fetch is dropped)
    //   Fetch for network/HTTP failures
    //   Parse if the server says the body isn't markup
    pub async fn load(&self, url: &str) -> Result<Document, CrawlError> {
        let page = match tokio::time::timeout(self.timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CrawlError::Timeout {
                    url: url.to_string(),
                    after: self.timeout,
                })
            }
        };

        Document::parse(url, &page.body, page.content_type.as_deref())
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why is the timeout applied here and not only in reqwest?
//    - Fetch is a trait; not every implementation has a built-in deadline
//    - tokio::time::timeout works on any future, so every fetcher gets one
//    - When the deadline passes the inner future is dropped, which cancels it
//
// 2. Why Arc<dyn Fetch>?
//    - Every task in a layer needs the same fetcher
//    - Arc is a shared, reference-counted pointer; cloning it is cheap
//    - dyn Fetch means "any type that implements Fetch", chosen at runtime
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn loader(timeout: Duration) -> Loader {
        let fetcher = HttpFetcher::new(Duration::from_secs(30), Some("layer-crawl-test")).unwrap();
        Loader::new(Arc::new(fetcher), timeout)
    }

    #[tokio::test]
    async fn test_load_html_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tea"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "<html><body><a href=\"/p/NUMIS-1\">One</a></body></html>",
                    "text/html; charset=utf-8",
                ),
            )
            .mount(&mock_server)
            .await;

        let document = loader(DEFAULT_TIMEOUT)
            .load(&format!("{}/tea", mock_server.uri()))
            .await
            .unwrap();
        assert!(document.render().contains("NUMIS-1"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_fetch_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = loader(DEFAULT_TIMEOUT)
            .load(&format!("{}/missing", mock_server.uri()))
            .await;
        match result {
            Err(CrawlError::Fetch { cause, .. }) => assert!(cause.contains("404")),
            other => panic!("expected fetch error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&mock_server)
            .await;

        let result = loader(Duration::from_millis(200))
            .load(&format!("{}/slow", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(CrawlError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_latin1_page_is_decoded() {
        let mock_server = MockServer::start().await;

        // "Caf\xe9" is "Café" in ISO-8859-1 and invalid as UTF-8
        let mut body = b"<html><body><p>Caf\xe9</p>".to_vec();
        body.extend_from_slice(b"<a href=\"/p/NUMIS-1&c=NumiTeaStore\">Tea</a></body></html>");

        Mock::given(method("GET"))
            .and(path("/tea"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-1"),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/tea", mock_server.uri());
        let document = loader(DEFAULT_TIMEOUT).load(&url).await.unwrap();

        assert!(document.render().contains("Caf\u{e9}"));

        let base = url::Url::parse(&url).unwrap();
        let links = crate::page::extract_links(&document, &base, "NumiTeaStore");
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec![format!("{}/p/NUMIS-1&c=NumiTeaStore", mock_server.uri())]
        );
    }

    #[tokio::test]
    async fn test_non_html_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"),
            )
            .mount(&mock_server)
            .await;

        let result = loader(DEFAULT_TIMEOUT)
            .load(&format!("{}/logo.png", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(CrawlError::Parse { .. })));
    }
}
