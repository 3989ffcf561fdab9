// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Usage:
//   layer-crawl crawl --seed <URL> --match <SUBSTR> --id <REGEX> --out <PATH>
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "layer-crawl",
    version = "0.1.0",
    about = "Crawl a website layer by layer and store every newly identified page",
    long_about = "layer-crawl follows links that contain a given text, names each page by an \
                  identifier pulled out of its URL, and appends every new page to one output file. \
                  It stops when a whole layer of links turns up nothing new."
)]
pub struct Cli {
    /// Show per-page progress (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a site starting from a seed page
    ///
    /// Example: layer-crawl crawl --seed http://shop.numitea.com/Tea-by-Type/c/NumiTeaStore@ByType
    ///          --match NumiTeaStore --id 'NUMIS-[0-9]*' --out tea_corpus.html
    Crawl {
        /// URL to start crawling from
        #[arg(long)]
        seed: String,

        /// Only follow links whose href contains this text (plain substring)
        #[arg(long = "match", value_name = "SUBSTR")]
        link_pattern: String,

        /// Regex that extracts a page identifier from a URL
        ///
        /// Links without a match are never visited or stored.
        #[arg(long = "id", value_name = "REGEX")]
        id_pattern: String,

        /// File to append the pages to (created if missing)
        #[arg(long = "out", value_name = "PATH")]
        out: PathBuf,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// How many pages of one layer to fetch at the same time
        #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: u16,

        /// Extra attempts for pages that fail to download or time out
        #[arg(long, default_value_t = 0)]
        retries: usize,

        /// Stop after this many link hops from the seed
        #[arg(long)]
        max_depth: Option<usize>,

        /// Stop queueing new pages once this many identifiers have been seen
        #[arg(long)]
        max_pages: Option<usize>,

        /// Custom user agent
        #[arg(long)]
        user_agent: Option<String>,

        /// Also print every stored page to stdout
        #[arg(long)]
        inspect: bool,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
}
