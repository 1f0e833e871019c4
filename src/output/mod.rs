//! Output module for persisting harvest results
//!
//! This module handles:
//! - Writing the filename to source URL manifest as JSON
//! - Generating markdown summaries of a harvest run
//! - Recording and printing crawl statistics

mod manifest;
mod markdown;
pub mod stats;

pub use manifest::write_manifest;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, CrawlStatistics, CrawlStats};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
