//! Crawler module for page traversal and image harvesting
//!
//! This module contains the core harvesting logic, including:
//! - Image downloading with size filtering and format conversion
//! - Depth-bounded, same-domain page traversal
//! - Render session lifecycle and the top-level crawl entry points

mod download;
mod fetcher;
mod session;
mod traversal;

pub use download::{file_name_of, OutputFile};
pub use fetcher::{build_http_client, FetchOutcome, FetchedImage, ImageFetcher};
pub use session::{
    run_harvest, run_harvest_with, strip_automation_tokens, CrawlReport, CrawlSession,
};
pub use traversal::{CrawlOptions, DownloadMap};
