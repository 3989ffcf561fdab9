// src/crawl/queue.rs
// =============================================================================
// This module implements the crawl itself: a breadth-first walk, one layer at
// a time.
//
// How it works:
// 1. Start with the seed URL as layer 0
// 2. Fetch every page in the layer at once (up to `concurrency` in flight)
// 3. Wait for the whole layer to finish (nobody in layer d+1 starts early)
// 4. Merge all links found in the layer into one set
// 5. Reserve the identifiers of the new links; the winners become the next layer
// 6. Repeat until a layer comes out empty
//
// Each identifier can only be reserved once, so even a link graph full of
// cycles runs out of new pages eventually.
//
// Failures:
// - A page that can't be fetched or parsed is logged and dropped. Its siblings
//   carry on.
// - A failure writing the output file stops the crawl.
//
// Rust concepts:
// - VecDeque: a FIFO queue, so pages come out in the order they were found
// - buffer_unordered: runs a bounded number of futures at the same time
// - Arc: shared ownership of the fetcher and sink across tasks
// =============================================================================

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::seen::{Deduplicator, SeenSet};
use crate::error::CrawlError;
use crate::page::{extract_links, Document, Loader, DEFAULT_TIMEOUT};
use crate::sink::PageSink;

// Knobs for one crawl
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Substring an href must contain to be followed
    pub link_pattern: String,
    /// Regex that pulls the identifier out of a URL
    pub id_pattern: String,
    /// Deadline for a single fetch
    pub timeout: Duration,
    /// How many pages of one layer may be in flight at once
    pub concurrency: usize,
    /// Extra attempts for a page whose fetch failed or timed out
    pub retries: usize,
    /// Stop after this layer has been merged (the seed is layer 0)
    pub max_depth: Option<usize>,
    /// Stop reserving identifiers once this many have been seen
    pub max_pages: Option<usize>,
    /// Also print every stored page to stdout
    pub inspect: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            link_pattern: String::new(),
            id_pattern: String::new(),
            timeout: DEFAULT_TIMEOUT,
            concurrency: 8,
            retries: 0,
            max_depth: None,
            max_pages: None,
            inspect: false,
        }
    }
}

// A page waiting in the frontier
#[derive(Debug, Clone)]
struct CrawlItem {
    url: String,
    depth: usize,
    // None only for a seed that has no identifier: fetched for its links,
    // never stored
    identifier: Option<String>,
}

// What one finished page contributes to the next layer
struct PageVisit {
    links: BTreeSet<String>,
    stored: bool,
}

// A page that was dropped from the crawl
#[derive(Debug, Clone, Serialize)]
pub struct PageFailure {
    pub url: String,
    pub error: String,
}

// Summary of a finished crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    /// Every identifier committed to visitation, sorted
    pub identifiers: Vec<String>,
    /// Pages whose content made it into the sink
    pub pages_written: usize,
    /// Number of layers that were fetched (the seed counts as one)
    pub layers: usize,
    pub failures: Vec<PageFailure>,
}

// The crawl context: owns the loader, the sink handle and the rules for
// following links. Each call to `crawl` gets its own frontier and seen set.
pub struct Crawler {
    loader: Loader,
    sink: Arc<dyn PageSink>,
    dedup: Deduplicator,
    config: CrawlConfig,
}

impl Crawler {
    // Builds a crawler
    //
    // Fails with InvalidPattern if `config.id_pattern` isn't a valid regex.
    pub fn new(
        loader: Loader,
        sink: Arc<dyn PageSink>,
        config: CrawlConfig,
    ) -> Result<Self, CrawlError> {
        let dedup = Deduplicator::new(&config.id_pattern)?;
        Ok(Crawler {
            loader,
            sink,
            dedup,
            config,
        })
    }

    // Crawls everything reachable from `seed_url`
    //
    // Returns: the report once a layer comes out empty (or a bound is hit)
    // Errors: InvalidUrl for a bad seed, Io if the sink fails
    pub async fn crawl(&self, seed_url: &str) -> Result<CrawlReport, CrawlError> {
        let seed = Url::parse(seed_url).map_err(|e| CrawlError::InvalidUrl {
            url: seed_url.to_string(),
            reason: e.to_string(),
        })?;
        if seed.host().is_none() {
            return Err(CrawlError::InvalidUrl {
                url: seed_url.to_string(),
                reason: "URL has no host".to_string(),
            });
        }

        let seen = SeenSet::new();
        let mut frontier = VecDeque::new();
        frontier.push_back(CrawlItem {
            url: seed.to_string(),
            depth: 0,
            identifier: self.dedup.reserve(seed.as_str(), &seen),
        });

        let mut report = CrawlReport {
            seed: seed.to_string(),
            identifiers: Vec::new(),
            pages_written: 0,
            layers: 0,
            failures: Vec::new(),
        };

        let mut depth = 0;
        loop {
            // Everything in the frontier belongs to the current depth: the
            // next layer is only pushed after this one has been merged
            let layer: Vec<CrawlItem> = frontier.drain(..).collect();
            if layer.is_empty() {
                break;
            }

            log::info!("Layer {}: visiting {} page(s)", depth, layer.len());
            report.layers += 1;

            let discovered = self.visit_layer(layer, &mut report).await?;

            if self.config.max_depth.is_some_and(|max| depth >= max) {
                log::info!("Reached max depth {}, stopping", depth);
                break;
            }

            // Filter through the deduplicator, then claim what's left. A URL
            // can still lose its reservation here if an earlier link in this
            // merge carried the same identifier.
            let candidates: Vec<String> = discovered
                .into_iter()
                .filter(|url| !self.dedup.is_duplicate(url, &seen))
                .collect();
            log::debug!("{} candidate link(s) after deduplication", candidates.len());

            for url in candidates {
                if self.config.max_pages.is_some_and(|max| seen.len() >= max) {
                    log::info!("Reached max pages ({}), not queueing more", seen.len());
                    break;
                }

                if let Some(identifier) = self.dedup.reserve(&url, &seen) {
                    frontier.push_back(CrawlItem {
                        url,
                        depth: depth + 1,
                        identifier: Some(identifier),
                    });
                }
            }

            depth += 1;
        }

        report.identifiers = seen.into_sorted_vec();
        log::info!(
            "Crawl finished: {} identifier(s), {} page(s) written, {} failure(s)",
            report.identifiers.len(),
            report.pages_written,
            report.failures.len()
        );

        Ok(report)
    }

    // Fetches every page in a layer and returns the union of their links
    //
    // Returns as soon as a fatal error comes back; the pages still in flight
    // are dropped (cancelled).
    async fn visit_layer(
        &self,
        layer: Vec<CrawlItem>,
        report: &mut CrawlReport,
    ) -> Result<BTreeSet<String>, CrawlError> {
        let mut in_flight = stream::iter(layer.into_iter().map(|item| async move {
            let result = self.visit(&item).await;
            (item, result)
        }))
        .buffer_unordered(self.config.concurrency.max(1));

        let mut discovered = BTreeSet::new();
        while let Some((item, result)) = in_flight.next().await {
            match result {
                Ok(visit) => {
                    log::debug!(
                        "  [depth {}] {}: {} matching link(s)",
                        item.depth,
                        item.url,
                        visit.links.len()
                    );
                    if visit.stored {
                        report.pages_written += 1;
                    }
                    discovered.extend(visit.links);
                }
                Err(e) if e.is_fatal() => {
                    log::error!("Stopping crawl: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    log::warn!("Dropping {}: {}", item.url, e);
                    report.failures.push(PageFailure {
                        url: item.url,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(discovered)
    }

    // Fetches one page, stores it if it has an identifier, and returns its links
    async fn visit(&self, item: &CrawlItem) -> Result<PageVisit, CrawlError> {
        // The document is parsed and dropped before we touch the sink
        let (links, rendered) = {
            let document = self.load_with_retries(&item.url).await?;
            let base = Url::parse(&item.url).map_err(|e| CrawlError::InvalidUrl {
                url: item.url.clone(),
                reason: e.to_string(),
            })?;
            let links = extract_links(&document, &base, &self.config.link_pattern);
            let rendered = item.identifier.as_ref().map(|_| document.render());
            (links, rendered)
        };

        let stored = match rendered {
            Some(content) => {
                if self.config.inspect {
                    println!("{}", content);
                }
                self.sink.append(&content).await?;
                true
            }
            None => false,
        };

        Ok(PageVisit { links, stored })
    }

    async fn load_with_retries(&self, url: &str) -> Result<Document, CrawlError> {
        let mut attempt = 0;
        loop {
            match self.loader.load(url).await {
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    log::debug!(
                        "Retrying {} ({}/{}): {}",
                        url,
                        attempt,
                        self.config.retries,
                        e
                    );
                }
                result => return result,
            }
        }
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why reserve identifiers before fetching?
//    - Two different URLs can carry the same identifier
//    - If both show up in the same layer, only the first reservation wins
//    - So the same product is never fetched twice, even concurrently
//
// 2. Why a loop instead of recursion?
//    - Each layer is one trip round the loop
//    - Deep or wide sites can't blow the call stack
//
// 3. What does buffer_unordered do here?
//    - Runs up to `concurrency` page visits at the same time
//    - Yields each result as soon as it's ready, in any order
//    - The while-let drains it completely, which is our end-of-layer barrier
// -----------------------------------------------------------------------------
