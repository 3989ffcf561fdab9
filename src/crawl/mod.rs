// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Breadth-first crawling, one layer at a time, starting from a seed URL
// - Only follows links containing a configured substring
// - Deduplicates pages by an identifier pulled out of the URL
// - Bounded concurrency inside each layer
//
// Rust concepts:
// - Async programming: For concurrent network requests
// - Collections: HashSet for seen identifiers, VecDeque for the frontier
// =============================================================================

mod queue;
mod seen;

pub use queue::{CrawlConfig, CrawlReport, Crawler};
