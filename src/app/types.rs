use std::collections::BTreeMap;

use clap::{Parser, ValueEnum};

use super::text::sanitize;

pub(crate) const DEFAULT_SITE_ROOT: &str = "https://www.seed-city.com";
pub(crate) const DEFAULT_LISTING_PATH: &str = "/en/list-all-products";
pub(crate) const DEFAULT_OUTPUT: &str = "cannabis-strains.csv";
pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "seedcat",
    version,
    about = "Incremental Seed City catalogue scraper with CSV/JSON output"
)]
pub(crate) struct Cli {
    /// Stop once this many new records were collected. Omit for an unlimited crawl.
    #[arg(value_name = "BUDGET")]
    pub(crate) budget: Option<usize>,

    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    pub(crate) output: String,

    #[arg(long, value_enum, default_value_t = FileFormatArg::Csv)]
    pub(crate) format: FileFormatArg,

    #[arg(long, value_name = "URL", default_value = DEFAULT_SITE_ROOT)]
    pub(crate) site_root: String,

    #[arg(long, value_name = "PATH", default_value = DEFAULT_LISTING_PATH)]
    pub(crate) listing_path: String,

    #[arg(long, value_name = "N", default_value_t = 30)]
    pub(crate) page_size: usize,

    #[arg(long, value_name = "MS", default_value_t = 600)]
    pub(crate) delay_ms: u64,

    #[arg(long, value_name = "MS", default_value_t = 600)]
    pub(crate) detail_delay_ms: u64,

    #[arg(long, default_value_t = false)]
    pub(crate) no_details: bool,

    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub(crate) timeout_secs: u64,

    #[arg(long, value_name = "N", default_value_t = 5)]
    pub(crate) attempts: usize,

    #[arg(long, value_name = "N", default_value_t = 10_000)]
    pub(crate) max_offset: usize,

    #[arg(long, value_name = "N", default_value_t = 3)]
    pub(crate) max_empty_pages: usize,

    #[arg(long, value_name = "UA", default_value = DEFAULT_USER_AGENT)]
    pub(crate) user_agent: String,

    #[arg(long, value_name = "FILTER", default_value = "info")]
    pub(crate) log_level: String,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub(crate) enum FileFormatArg {
    Csv,
    Json,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum DataFormat {
    Csv,
    Json,
}

impl From<FileFormatArg> for DataFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Csv => DataFormat::Csv,
            FileFormatArg::Json => DataFormat::Json,
        }
    }
}

/// One catalogue item.
///
/// `product_url` is the identity key. `extra` holds detail-page fields keyed by
/// their canonical name; keys are only ever added, never replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Record {
    pub(crate) strain_name: String,
    pub(crate) breeder: String,
    pub(crate) description: String,
    pub(crate) current_price: Option<f64>,
    pub(crate) original_price: Option<f64>,
    pub(crate) discount_percent: Option<f64>,
    pub(crate) pack_options: String,
    pub(crate) product_url: String,
    pub(crate) image_url: String,
    pub(crate) extra: BTreeMap<String, String>,
}

impl Record {
    pub(crate) fn is_valid(&self) -> bool {
        !self.strain_name.is_empty()
            && self.strain_name.chars().any(char::is_alphanumeric)
            && !self.product_url.is_empty()
    }

    pub(crate) fn sanitize(&mut self) {
        for field in [
            &mut self.strain_name,
            &mut self.breeder,
            &mut self.description,
            &mut self.pack_options,
            &mut self.product_url,
            &mut self.image_url,
        ] {
            *field = sanitize(field);
        }
        for value in self.extra.values_mut() {
            *value = sanitize(value);
        }
    }

    /// Merges detail fields without overwriting keys that are already set.
    pub(crate) fn absorb(&mut self, fields: BTreeMap<String, String>) {
        for (key, value) in fields {
            self.extra.entry(key).or_insert(value);
        }
    }
}
