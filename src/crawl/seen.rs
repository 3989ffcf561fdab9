// src/crawl/seen.rs
// =============================================================================
// This module decides whether a URL is new.
//
// URLs are compared by identifier, not by their full text. The identifier is
// the first match of a regex inside the URL, so these two URLs are the same
// page as far as the crawler is concerned:
//   /p/NUMIS-10430&c=NumiTeaStore@ByType
//   /p/NUMIS-10430&c=NumiTeaStore@Gifts
//
// A URL with no identifier counts as a duplicate. We never store a page we
// can't name.
//
// Rust concepts:
// - Mutex: lets concurrent tasks share the set safely
// - HashSet::insert returns false if the value was already there, so
//   "check and insert" is a single step under one lock
// =============================================================================

use regex::Regex;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::error::CrawlError;

// Every identifier committed to visitation during one crawl.
// Only grows. Inserting an identifier twice is a no-op.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    // Inserts `id`, returning true only if it wasn't already present
    pub fn insert(&self, id: &str) -> bool {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if ids.contains(id) {
            return false;
        }
        ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    // Consumes the set and returns its identifiers in sorted order
    pub fn into_sorted_vec(self) -> Vec<String> {
        let ids = self.ids.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();
        ids
    }
}

// Pulls identifiers out of URLs using a configured regex
#[derive(Debug, Clone)]
pub struct Deduplicator {
    pattern: Regex,
}

impl Deduplicator {
    // Compiles the identifier pattern (e.g. "NUMIS-[0-9]*")
    pub fn new(pattern: &str) -> Result<Self, CrawlError> {
        let pattern = Regex::new(pattern).map_err(|source| CrawlError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Deduplicator { pattern })
    }

    // Returns the first match of the pattern inside `url`, if any.
    // An empty match doesn't name anything, so it counts as no match.
    //
    // Example:
    //   url = ".../NUMIS-10430&c=..." with pattern "NUMIS-[0-9]*"
    //   result = Some("NUMIS-10430")
    pub fn extract_identifier(&self, url: &str) -> Option<String> {
        self.pattern
            .find(url)
            .map(|m| m.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    // True when the URL has no identifier, or its identifier was already seen
    pub fn is_duplicate(&self, url: &str, seen: &SeenSet) -> bool {
        match self.extract_identifier(url) {
            Some(id) => seen.contains(&id),
            None => true,
        }
    }

    // Claims the URL's identifier for visitation
    //
    // Returns Some(identifier) only for the one caller that inserted it.
    // Everyone else (including URLs without an identifier) gets None.
    pub fn reserve(&self, url: &str, seen: &SeenSet) -> Option<String> {
        let id = self.extract_identifier(url)?;
        if seen.insert(&id) {
            Some(id)
        } else {
            None
        }
    }
}
