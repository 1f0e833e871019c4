//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest image harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config_with_hash, validate, Config};
use sumi_harvest::crawler::{run_harvest, CrawlOptions};
use sumi_harvest::output::print_statistics;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a depth-bounded image harvester
///
/// Sumi-Harvest renders seed pages, follows same-domain links up to a
/// configured depth and downloads every image it finds. HEIC photos are
/// converted to JPEG and SVG graphics to PNG. A JSON manifest maps each
/// downloaded file to its source.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A depth-bounded image harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the configured maximum depth
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Override the configured image output directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(&config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(depth) = cli.max_depth {
        tracing::info!("Overriding max depth: {}", depth);
        config.crawler.max_depth = depth;
    }
    if let Some(dir) = &cli.output_dir {
        tracing::info!("Overriding output directory: {}", dir.display());
        config.images.output_dir = dir.to_string_lossy().into_owned();
    }
}

/// Handles the --dry-run mode: shows the effective plan without launching a renderer
fn handle_dry_run(config: &Config) {
    let options = CrawlOptions::from_config(config);

    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", options.max_depth);
    println!("  Page timeout: {}s", options.page_timeout.as_secs());
    if options.base_url.is_empty() {
        println!("  Base URL: (none)");
    } else {
        println!("  Base URL: {}", options.base_url);
    }
    println!(
        "  Mapping values: {}",
        if options.use_page_url { "page URL" } else { "image URL" }
    );
    println!("  Image concurrency: {}", options.image_concurrency);
    match options.crawl_timeout {
        Some(limit) => println!("  Crawl timeout: {}s", limit.as_secs()),
        None => println!("  Crawl timeout: (none)"),
    }

    println!("\nImages:");
    println!("  Output directory: {}", options.output_dir.display());
    match options.min_size {
        Some(min) => println!("  Minimum size: {}x{}", min.width, min.height),
        None => println!("  Minimum size: (none)"),
    }
    println!("  SVG raster size: {}x{}", options.svg_size.0, options.svg_size.1);

    println!("\nRenderer:");
    println!("  Engine: {:?}", config.browser.engine);
    println!("  Viewport: {}x{}", config.browser.width, config.browser.height);

    println!("\nOutput:");
    println!("  Manifest: {}", config.output.manifest_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing up");
            interrupt.cancel();
        }
    });

    tracing::info!("Total seed URLs: {}", config.seeds.len());

    let report = run_harvest(config, Some(config_hash), cancel)
        .await
        .context("harvest failed")?;

    if !report.cancelled {
        tracing::info!("Harvest completed successfully");
    }

    println!();
    print_statistics(&report.stats);
    println!("\nManifest written to: {}", config.output.manifest_path);

    Ok(())
}
