// src/page/mod.rs
// =============================================================================
// This module loads pages and reads links out of them.
//
// Submodules:
// - http: downloads a URL (with a deadline) and parses it into a Document
// - html: the Document type and link extraction
//
// Rust concepts:
// - pub use: Re-export items so callers can write `page::Loader`
// =============================================================================

mod html;
mod http;

pub use html::{extract_links, Document};
pub use http::{Fetch, FetchedPage, HttpFetcher, Loader, DEFAULT_TIMEOUT};
