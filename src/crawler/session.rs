//! Crawl session lifecycle
//!
//! A [`CrawlSession`] owns the render sessions and the state that outlives a
//! single run (visited pages, attempted images). It launches a throwaway probe
//! session to learn the backend's default user agent, strips automation
//! markers from it, and launches the working session with the cleaned value.

use crate::config::{BrowserConfig, Config};
use crate::crawler::fetcher::{build_http_client, ImageFetcher};
use crate::crawler::traversal::{CrawlOptions, DownloadMap, Traversal};
use crate::output::{generate_markdown_summary, write_manifest, CrawlStatistics, CrawlStats};
use crate::render::{launcher_for, LaunchOptions, RenderLauncher, Renderer};
use crate::state::MemoSet;
use crate::url::parse_http_url;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Outcome of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Downloaded file name to credited source URL
    pub downloads: DownloadMap,
    pub stats: CrawlStatistics,
    /// Seeds the run was started with, as given
    pub seeds: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True if the run stopped early (Ctrl-C or crawl timeout)
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn duration_seconds(&self) -> u64 {
        (self.finished_at - self.started_at).num_seconds().max(0) as u64
    }
}

/// Removes tokens that advertise browser automation from a user agent
///
/// # Examples
///
/// ```
/// use sumi_harvest::crawler::strip_automation_tokens;
///
/// let ua = "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/120.0.0.0 Safari/537.36";
/// assert_eq!(
///     strip_automation_tokens(ua),
///     "Mozilla/5.0 (X11; Linux x86_64) Chrome/120.0.0.0 Safari/537.36"
/// );
/// ```
pub fn strip_automation_tokens(user_agent: &str) -> String {
    user_agent.replace("Headless", "").replace("headless", "")
}

/// Render sessions plus the crawl state shared by every run
pub struct CrawlSession {
    probe: Option<Box<dyn Renderer>>,
    renderer: Option<Box<dyn Renderer>>,
    user_agent: String,
    client: Client,
    visited: MemoSet,
    attempted: MemoSet,
    cancel: CancellationToken,
}

impl CrawlSession {
    /// Launches the probe and working render sessions
    ///
    /// Any session already opened is closed again if a later step fails.
    ///
    /// # Errors
    ///
    /// * `HarvestError::Render` - A session could not be launched or probed
    /// * `HarvestError::Reqwest` - The image HTTP client could not be built
    pub async fn launch(launcher: &dyn RenderLauncher, config: &BrowserConfig) -> Result<Self> {
        let mut probe = launcher.launch(&LaunchOptions::probe(config)).await?;

        let default_agent = match probe.user_agent().await {
            Ok(agent) => agent,
            Err(e) => {
                probe.close().await;
                return Err(e.into());
            }
        };
        let user_agent = strip_automation_tokens(&default_agent);
        tracing::debug!("Session user agent: {}", user_agent);

        let options = LaunchOptions::working(config, user_agent.clone());
        let mut renderer = match launcher.launch(&options).await {
            Ok(renderer) => renderer,
            Err(e) => {
                probe.close().await;
                return Err(e.into());
            }
        };

        let client = match build_http_client(&user_agent) {
            Ok(client) => client,
            Err(e) => {
                renderer.close().await;
                probe.close().await;
                return Err(e.into());
            }
        };

        tracing::info!("Render session ready ({}x{})", config.width, config.height);

        Ok(Self {
            probe: Some(probe),
            renderer: Some(renderer),
            user_agent,
            client,
            visited: MemoSet::new(),
            attempted: MemoSet::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the session's cancellation token, e.g. with one wired to Ctrl-C
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The sanitized user agent presented by both the renderer and image client
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn visited(&self) -> &MemoSet {
        &self.visited
    }

    pub fn attempted(&self) -> &MemoSet {
        &self.attempted
    }

    pub fn is_closed(&self) -> bool {
        self.renderer.is_none() && self.probe.is_none()
    }

    /// Crawls every seed in order and returns the aggregated download mapping
    ///
    /// The queued-link set and the mapping start empty; visited pages and
    /// attempted images carry over from earlier runs on the same session.
    /// Invalid seeds are skipped with a warning. On cancellation the mapping
    /// collected so far is returned with `cancelled` set.
    ///
    /// # Errors
    ///
    /// * `HarvestError::Session` - The session was already closed
    /// * `HarvestError::Io` - The output directory could not be created
    pub async fn crawl_all(&self, seeds: &[String], options: &CrawlOptions) -> Result<CrawlReport> {
        let renderer = self
            .renderer
            .as_deref()
            .ok_or_else(|| HarvestError::Session("render session is closed".to_string()))?;

        tokio::fs::create_dir_all(&options.output_dir).await?;

        let started_at = Utc::now();
        let run_cancel = self.cancel.child_token();
        let timer = options.crawl_timeout.map(|limit| {
            let token = run_cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => {
                        tracing::warn!("Crawl timeout of {:?} reached, stopping", limit);
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let fetcher = ImageFetcher::new(self.client.clone(), &options.output_dir, options.min_size)
            .with_attempted(self.attempted.clone())
            .with_svg_size(options.svg_size.0, options.svg_size.1)
            .with_cancellation(run_cancel.clone());
        let stats = CrawlStats::new();

        tracing::info!(
            "Crawling {} seed(s), max depth {}, into {}",
            seeds.len(),
            options.max_depth,
            options.output_dir.display()
        );

        let mut traversal = Traversal::new(
            renderer,
            &fetcher,
            options,
            &self.visited,
            &stats,
            &run_cancel,
        );
        for seed in seeds {
            if run_cancel.is_cancelled() {
                break;
            }
            match parse_http_url(seed) {
                Ok(url) => {
                    let state = traversal.visit(url, 0).await;
                    tracing::info!("Seed {} finished: {}", seed, state);
                }
                Err(e) => tracing::warn!("Skipping invalid seed {}: {}", seed, e),
            }
        }
        let downloads = traversal.into_downloads();

        let cancelled = run_cancel.is_cancelled();
        if let Some(timer) = timer {
            timer.abort();
        }

        let report = CrawlReport {
            downloads,
            stats: stats.snapshot(),
            seeds: seeds.to_vec(),
            started_at,
            finished_at: Utc::now(),
            cancelled,
        };

        tracing::info!(
            "Crawl {}: {} image(s) in {} seconds",
            if cancelled { "cancelled" } else { "completed" },
            report.downloads.len(),
            report.duration_seconds()
        );

        Ok(report)
    }

    /// Closes both render sessions; later calls do nothing
    pub async fn close(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.close().await;
        }
        if let Some(mut probe) = self.probe.take() {
            probe.close().await;
        }
    }
}

impl Drop for CrawlSession {
    fn drop(&mut self) {
        if !self.is_closed() {
            tracing::warn!("Crawl session dropped without close(); render sessions may leak");
        }
    }
}

/// Runs a complete harvest for a configuration
///
/// This is the main entry point for a harvest. It will:
/// 1. Launch the render sessions for the configured engine
/// 2. Crawl every seed
/// 3. Close the render sessions, whether or not the crawl succeeded
/// 4. Write the JSON manifest and, if configured, the markdown summary
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `config_hash` - Hash recorded in the summary, if known
/// * `cancel` - Token that stops the crawl early when cancelled
pub async fn run_harvest(
    config: &Config,
    config_hash: Option<&str>,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let launcher = launcher_for(&config.browser)?;
    run_harvest_with(launcher.as_ref(), config, config_hash, cancel).await
}

/// [`run_harvest`] with an explicit render launcher
pub async fn run_harvest_with(
    launcher: &dyn RenderLauncher,
    config: &Config,
    config_hash: Option<&str>,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let options = CrawlOptions::from_config(config);
    let mut session = CrawlSession::launch(launcher, &config.browser)
        .await?
        .with_cancellation(cancel);

    let result = session.crawl_all(&config.seeds, &options).await;
    session.close().await;
    let report = result?;

    write_manifest(&report.downloads, Path::new(&config.output.manifest_path))?;
    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_summary(&report, config_hash, Path::new(summary_path))?;
        tracing::info!("Wrote summary to {}", summary_path);
    }

    Ok(report)
}
