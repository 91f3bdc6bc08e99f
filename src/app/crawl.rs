use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use super::detail::extract_fields;
use super::fetch::Fetch;
use super::listing::extract_items;
use super::types::Record;

#[derive(Debug, Clone)]
pub(crate) struct CrawlSettings {
    pub(crate) listing_url: String,
    pub(crate) site_root: Url,
    pub(crate) page_size: usize,
    pub(crate) max_empty_pages: usize,
    pub(crate) max_offset: usize,
    pub(crate) page_delay: Duration,
    pub(crate) detail_delay: Duration,
    pub(crate) fetch_details: bool,
    pub(crate) budget: Option<usize>,
}

impl CrawlSettings {
    fn budget_reached(&self, collected: usize) -> bool {
        self.budget.is_some_and(|budget| collected >= budget)
    }

    fn page_query(&self, offset: usize) -> [(&'static str, String); 2] {
        [
            ("limit", self.page_size.to_string()),
            ("limitstart", offset.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    EmptyPages,
    Budget,
    OffsetCeiling,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::EmptyPages => "empty_pages",
            StopReason::Budget => "budget",
            StopReason::OffsetCeiling => "offset_ceiling",
        })
    }
}

#[derive(Debug)]
pub(crate) struct CrawlOutcome {
    pub(crate) records: Vec<Record>,
    pub(crate) stop: StopReason,
    pub(crate) pages: usize,
    pub(crate) skipped: usize,
    pub(crate) invalid: usize,
}

/// Walks the listing pages from offset zero and returns the valid records whose
/// URL is not in `seen`.
///
/// Fetch failures never abort the walk: a failed listing page counts as an
/// empty page and a failed detail page leaves the record unenriched.
pub(crate) async fn crawl<F: Fetch>(
    fetcher: &F,
    settings: &CrawlSettings,
    mut seen: HashSet<String>,
) -> CrawlOutcome {
    let page_size = settings.page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0usize;
    let mut empty_pages = 0usize;
    let mut pages = 0usize;
    let mut skipped = 0usize;
    let mut invalid = 0usize;
    let mut details_fetched = 0usize;

    let stop = loop {
        if settings.budget_reached(records.len()) {
            info!(budget = ?settings.budget, "record budget reached");
            break StopReason::Budget;
        }
        if offset > settings.max_offset {
            info!(max_offset = settings.max_offset, "reached offset safeguard");
            break StopReason::OffsetCeiling;
        }

        if pages > 0 {
            tokio::time::sleep(settings.page_delay).await;
        }
        pages += 1;
        info!(from = offset + 1, to = offset + page_size, "fetching listing page");
        let items = match fetcher
            .fetch(&settings.listing_url, &settings.page_query(offset))
            .await
        {
            Ok(html) => extract_items(&html, &settings.site_root),
            Err(err) => {
                warn!(offset, error = %err, "listing page unavailable");
                Vec::new()
            }
        };

        if items.is_empty() {
            empty_pages += 1;
            info!(offset, empty_pages, "no items on listing page");
            if empty_pages >= settings.max_empty_pages {
                info!(empty_pages, "stopping after consecutive empty pages");
                break StopReason::EmptyPages;
            }
            offset += page_size;
            continue;
        }
        empty_pages = 0;

        for mut item in items {
            if settings.budget_reached(records.len()) {
                break;
            }
            if item.product_url.is_empty() {
                debug!(name = %item.strain_name, "skipping item without product url");
                invalid += 1;
                continue;
            }
            if !seen.insert(item.product_url.clone()) {
                debug!(url = %item.product_url, "already seen");
                skipped += 1;
                continue;
            }

            if settings.fetch_details {
                if details_fetched > 0 {
                    tokio::time::sleep(settings.detail_delay).await;
                }
                details_fetched += 1;
                match fetcher.fetch(&item.product_url, &[]).await {
                    Ok(html) => item.absorb(extract_fields(&html)),
                    Err(err) => {
                        warn!(url = %item.product_url, error = %err, "detail page unavailable")
                    }
                }
            }

            item.sanitize();
            if !item.is_valid() {
                debug!(url = %item.product_url, name = %item.strain_name, "dropping invalid record");
                invalid += 1;
                continue;
            }
            records.push(item);
        }

        offset += page_size;
    };

    CrawlOutcome {
        records,
        stop,
        pages,
        skipped,
        invalid,
    }
}
