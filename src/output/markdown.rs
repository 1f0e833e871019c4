//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a harvest run,
//! including run metadata, statistics, and the list of downloaded images.

use crate::crawler::CrawlReport;
use crate::output::OutputResult;
use crate::state::PageState;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary of a harvest run
///
/// # Arguments
///
/// * `report` - The crawl report
/// * `config_hash` - Hash of the configuration the run used, if known
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    report: &CrawlReport,
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport, config_hash: Option<&str>) -> String {
    let mut md = String::new();
    let stats = &report.stats;

    md.push_str("# Sumi-Harvest Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    let duration = report.duration_seconds();
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        duration,
        duration as f64 / 60.0
    ));
    let status = if report.cancelled {
        "cancelled"
    } else {
        "completed"
    };
    md.push_str(&format!("- **Status**: {}\n", status));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    if !report.seeds.is_empty() {
        md.push_str("## Seeds\n\n");
        for seed in &report.seeds {
            md.push_str(&format!("- {}\n", seed));
        }
        md.push('\n');
    }

    // Overall statistics
    md.push_str("## Statistics\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Pages rendered | {} |\n", stats.pages_rendered()));
    md.push_str(&format!("| Pages skipped | {} |\n", stats.pages_skipped()));
    md.push_str(&format!("| Images downloaded | {} |\n", stats.images_downloaded));
    md.push_str(&format!("| Images below minimum size | {} |\n", stats.images_filtered));
    md.push_str(&format!("| Images failed | {} |\n", stats.images_failed));
    md.push_str(&format!("| Duplicate images skipped | {} |\n", stats.images_duplicate));
    md.push_str(&format!("| Links rejected | {} |\n\n", stats.links_rejected));

    // State breakdown
    if !stats.pages_by_state.is_empty() {
        md.push_str("## Page State Breakdown\n\n");
        md.push_str("| State | Count |\n");
        md.push_str("|-------|-------|\n");
        for state in PageState::all_states() {
            let count = stats.pages(state);
            if count > 0 {
                md.push_str(&format!("| {} | {} |\n", state, count));
            }
        }
        md.push('\n');
    }

    // Downloads
    md.push_str("## Downloads\n\n");
    if report.downloads.is_empty() {
        md.push_str("No images were downloaded.\n");
    } else {
        md.push_str(&format!("Total: {}\n\n", report.downloads.len()));
        md.push_str("| File | Source |\n");
        md.push_str("|------|--------|\n");
        for (file, source) in &report.downloads {
            md.push_str(&format!("| {} | {} |\n", escape_cell(file), source));
        }
    }

    md
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}
