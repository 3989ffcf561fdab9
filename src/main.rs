// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging
// 3. Build the crawler (fetcher, output file, settings) and run it
// 4. Print a summary
// 5. Exit with proper code (0 = crawl finished, 2 = error)
// =============================================================================

mod cli;
mod crawl;
mod error;
mod page;
mod sink;

use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crawl::{CrawlConfig, CrawlReport, Crawler};
use page::{Fetch, HttpFetcher, Loader};
use sink::FileSink;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logging defaults to info; --verbose and --quiet move it, RUST_LOG wins over both
fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Crawl {
            seed,
            link_pattern,
            id_pattern,
            out,
            timeout,
            concurrency,
            retries,
            max_depth,
            max_pages,
            user_agent,
            inspect,
            json,
        } => {
            let config = CrawlConfig {
                link_pattern,
                id_pattern,
                timeout: Duration::from_secs(timeout),
                concurrency: usize::from(concurrency),
                retries,
                max_depth,
                max_pages,
                inspect,
            };
            handle_crawl(&seed, config, out, user_agent.as_deref(), json).await
        }
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(
    seed: &str,
    config: CrawlConfig,
    out: PathBuf,
    user_agent: Option<&str>,
    json: bool,
) -> Result<i32> {
    log::info!("Crawling from {}", seed);
    log::info!(
        "Following links containing '{}', identifying pages by /{}/",
        config.link_pattern,
        config.id_pattern
    );

    let fetcher: Arc<dyn Fetch> = Arc::new(
        HttpFetcher::new(config.timeout, user_agent).context("Failed to create HTTP client")?,
    );
    let loader = Loader::new(fetcher, config.timeout);

    let sink = FileSink::open(&out).await?;
    log::info!("Appending pages to {}", sink.path().display());

    let crawler = Crawler::new(loader, Arc::new(sink), config)?;
    let report = crawler.crawl(seed).await?;

    print_report(&report, json)?;
    Ok(0)
}

// Prints the report either as a summary or JSON
fn print_report(report: &CrawlReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Summary:");
    println!("   Seed: {}", report.seed);
    println!("   Layers: {}", report.layers);
    println!("   Identifiers: {}", report.identifiers.len());
    println!("   Pages written: {}", report.pages_written);
    println!("   Failed: {}", report.failures.len());

    for failure in &report.failures {
        println!("     {}  {}", failure.url, failure.error);
    }

    Ok(())
}
