use std::io;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use super::crawl::{CrawlSettings, crawl};
use super::data_io::{detect_data_format, load_prior_records, merge, save_records, seen_urls};
use super::fetch::HttpFetcher;
use super::types::{Cli, DataFormat};

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn crawl_settings(cli: &Cli) -> io::Result<CrawlSettings> {
    let site_root = Url::parse(&cli.site_root).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid site root {}: {err}", cli.site_root),
        )
    })?;
    let listing_url = site_root.join(&cli.listing_path).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid listing path {}: {err}", cli.listing_path),
        )
    })?;

    Ok(CrawlSettings {
        listing_url: listing_url.to_string(),
        site_root,
        page_size: cli.page_size.max(1),
        max_empty_pages: cli.max_empty_pages.max(1),
        max_offset: cli.max_offset,
        page_delay: Duration::from_millis(cli.delay_ms),
        detail_delay: Duration::from_millis(cli.detail_delay_ms),
        fetch_details: !cli.no_details,
        budget: cli.budget,
    })
}

pub async fn run() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let settings = crawl_settings(&cli)?;
    let output_format = detect_data_format(&cli.output, DataFormat::from(cli.format));
    let output_path = Path::new(&cli.output);

    let prior = load_prior_records(output_path, output_format);
    let seen = seen_urls(&prior);
    info!(records = prior.len(), urls = seen.len(), "loaded prior dataset");

    let fetcher = HttpFetcher::new(
        &cli.user_agent,
        Duration::from_secs(cli.timeout_secs),
        cli.attempts,
    )
    .map_err(io::Error::other)?;
    let outcome = crawl(&fetcher, &settings, seen).await;

    let prior_count = prior.len();
    let new_count = outcome.records.len();
    let (records, columns) = merge(prior, outcome.records);
    save_records(output_path, output_format, &records, &columns).map_err(io::Error::other)?;

    info!(
        "finished crawl: prior={} new={} total={} columns={} pages={} skipped={} invalid={} stop={} output={}",
        prior_count,
        new_count,
        records.len(),
        columns.len(),
        outcome.pages,
        outcome.skipped,
        outcome.invalid,
        outcome.stop,
        output_path.display()
    );
    Ok(())
}
