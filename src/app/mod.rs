mod crawl;
mod data_io;
mod detail;
mod fetch;
mod listing;
mod runtime;
mod text;
mod types;
mod vocabulary;

pub use runtime::run;
