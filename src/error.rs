// src/error.rs
// =============================================================================
// This module defines every error the crawler can produce.
//
// Error kinds:
// - InvalidUrl / InvalidPattern: bad input, reported before crawling starts
// - Fetch / Timeout: a single page could not be downloaded
// - Parse: a page was downloaded but is not a usable HTML document
// - Io: the output file could not be written (this stops the whole crawl)
//
// Rust concepts:
// - thiserror: derive macro that implements std::error::Error for us
// - #[source]: keeps the underlying error so it shows up in error chains
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid identifier pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Fetch failed for {url}: {cause}")]
    Fetch { url: String, cause: String },

    #[error("Timeout: fetching {url} took longer than {}s", .after.as_secs_f64())]
    Timeout { url: String, after: Duration },

    #[error("Could not parse {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Failed to write to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CrawlError {
    // Network trouble is worth another attempt; everything else is not
    pub fn is_retryable(&self) -> bool {
        matches!(self, CrawlError::Fetch { .. } | CrawlError::Timeout { .. })
    }

    // Only storage failures abort the crawl. Page-level failures are isolated
    // to the URL that caused them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::Io { .. })
    }
}
