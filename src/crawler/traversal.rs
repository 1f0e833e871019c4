//! Depth-bounded page traversal
//!
//! A [`Traversal`] walks one crawl run: it renders a page, hands the page's
//! images to the [`ImageFetcher`], then follows same-domain links depth-first.
//! Every visit ends in exactly one terminal [`PageState`].

use crate::config::Config;
use crate::crawler::fetcher::{FetchOutcome, ImageFetcher};
use crate::media::{MinSize, DEFAULT_SVG_HEIGHT, DEFAULT_SVG_WIDTH};
use crate::output::CrawlStats;
use crate::render::Renderer;
use crate::state::{MemoSet, PageState};
use crate::url::{is_same_domain, looks_like_image, normalize_base_url, resolve_url};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Mapping from downloaded file name to the URL credited as its source
pub type DownloadMap = BTreeMap<String, String>;

/// Parameters of one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    /// Directory images are written into
    pub output_dir: PathBuf,
    /// Images smaller than this in either dimension are dropped
    pub min_size: Option<MinSize>,
    /// Links must start with this URL prefix (in parsed form); empty disables the check
    pub base_url: String,
    /// Seeds are depth 0; pages deeper than this are not rendered
    pub max_depth: u32,
    /// Credit the page an image was found on instead of the image URL
    pub use_page_url: bool,
    /// How long a render may wait for anchors or images to appear
    pub page_timeout: Duration,
    /// Concurrent image fetches per page
    pub image_concurrency: usize,
    /// Size SVG images are rasterized to
    pub svg_size: (u32, u32),
    /// Cancel the run after this long
    pub crawl_timeout: Option<Duration>,
}

impl CrawlOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            min_size: None,
            base_url: String::new(),
            max_depth: 0,
            use_page_url: false,
            page_timeout: Duration::from_secs(60),
            image_concurrency: 4,
            svg_size: (DEFAULT_SVG_WIDTH, DEFAULT_SVG_HEIGHT),
            crawl_timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let crawl_timeout = match config.crawler.crawl_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            output_dir: PathBuf::from(&config.images.output_dir),
            min_size: MinSize::from_parts(config.images.min_width, config.images.min_height),
            base_url: normalize_base_url(&config.crawler.base_url),
            max_depth: config.crawler.max_depth,
            use_page_url: config.crawler.use_page_url,
            page_timeout: Duration::from_secs(config.crawler.page_timeout_secs),
            image_concurrency: config.crawler.image_concurrency,
            svg_size: (config.images.svg_width, config.images.svg_height),
            crawl_timeout,
        }
    }
}

/// State of a single crawl run
///
/// `visited` outlives the run (it belongs to the session); the queued-link
/// set and the download mapping start empty for every run.
pub(crate) struct Traversal<'a> {
    renderer: &'a dyn Renderer,
    fetcher: &'a ImageFetcher,
    options: &'a CrawlOptions,
    visited: &'a MemoSet,
    stats: &'a CrawlStats,
    cancel: &'a CancellationToken,
    queued: MemoSet,
    downloads: DownloadMap,
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(
        renderer: &'a dyn Renderer,
        fetcher: &'a ImageFetcher,
        options: &'a CrawlOptions,
        visited: &'a MemoSet,
        stats: &'a CrawlStats,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            renderer,
            fetcher,
            options,
            visited,
            stats,
            cancel,
            queued: MemoSet::new(),
            downloads: DownloadMap::new(),
        }
    }

    pub(crate) fn into_downloads(self) -> DownloadMap {
        self.downloads
    }

    /// Visits a page and, depth-first, every same-domain page it links to
    pub(crate) fn visit(&mut self, page: Url, depth: u32) -> BoxFuture<'_, PageState> {
        async move {
            let state = self.visit_page(&page, depth).await;
            self.stats.record_page(state);
            tracing::debug!("{} (depth {}): {}", page, depth, state);
            state
        }
        .boxed()
    }

    async fn visit_page(&mut self, page: &Url, depth: u32) -> PageState {
        if self.cancel.is_cancelled() {
            return PageState::Cancelled;
        }

        if depth > self.options.max_depth {
            return PageState::DepthExceeded;
        }

        // Claimed before rendering so a page is never rendered twice
        if !self.visited.insert(page.as_str()) {
            return PageState::AlreadyVisited;
        }

        let rendered = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return PageState::Cancelled,
            result = self.renderer.render(page, self.options.page_timeout) => result,
        };

        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) if e.is_empty_yield() => {
                tracing::debug!("{}", e);
                return PageState::NoYield;
            }
            Err(e) => {
                tracing::warn!("Failed to render {}: {}", page, e);
                return PageState::Failed;
            }
        };

        let images: Vec<Url> = rendered
            .images
            .iter()
            .filter_map(|src| resolve_url(page, src))
            .collect();
        self.fetch_images(page, &images).await;

        for href in &rendered.anchors {
            if self.cancel.is_cancelled() {
                break;
            }

            let Some(link) = resolve_url(page, href) else {
                tracing::trace!("Unresolvable link on {}: {}", page, href);
                continue;
            };

            if !is_same_domain(page, &link, &self.options.base_url) {
                tracing::trace!("Rejected off-domain link: {}", link);
                self.stats.record_link_rejected();
                continue;
            }

            if !self.queued.insert(link.as_str()) {
                continue;
            }

            if looks_like_image(&link) {
                self.fetch_images(page, std::slice::from_ref(&link)).await;
            } else {
                self.visit(link, depth + 1).await;
            }
        }

        PageState::Visited
    }

    /// Fetches images concurrently and applies the results in input order
    async fn fetch_images(&mut self, page: &Url, images: &[Url]) {
        if images.is_empty() {
            return;
        }

        let fetcher = self.fetcher;
        let outcomes: Vec<FetchOutcome> = stream::iter(images.to_vec())
            .map(move |url| async move { fetcher.fetch(&url).await })
            .buffered(self.options.image_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            self.record_outcome(page, outcome);
        }
    }

    fn record_outcome(&mut self, page: &Url, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Downloaded(image) => {
                self.stats.record_image_downloaded();
                let source = if self.options.use_page_url {
                    page.to_string()
                } else {
                    image.source_url
                };
                self.record_download(image.filename, source);
            }
            FetchOutcome::AlreadyAttempted => self.stats.record_image_duplicate(),
            FetchOutcome::Filtered => self.stats.record_image_filtered(),
            FetchOutcome::Failed { .. } => self.stats.record_image_failed(),
            FetchOutcome::Cancelled => {}
        }
    }

    /// First writer wins for a given file name
    fn record_download(&mut self, filename: String, source: String) {
        match self.downloads.entry(filename) {
            Entry::Vacant(entry) => {
                entry.insert(source);
            }
            Entry::Occupied(entry) => {
                tracing::debug!(
                    "Keeping existing source for {}; ignoring {}",
                    entry.key(),
                    source
                );
            }
        }
    }
}
