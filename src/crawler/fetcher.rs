//! Image fetcher implementation
//!
//! This module handles downloading a single image, including:
//! - Building the HTTP client shared by all downloads
//! - Claiming the image URL so it is fetched at most once per session
//! - Size-checking raster images in memory before writing them
//! - Converting HEIC downloads to JPEG and SVG downloads to PNG
//! - Abandoning in-flight downloads on cancellation

use crate::crawler::download::{file_name_of, OutputFile};
use crate::media::{
    convert_svg_to_raster, convert_to_raster, passes_size_filter, probe_dimensions,
    probe_dimensions_from_bytes, Dimensions, MinSize, DEFAULT_SVG_HEIGHT, DEFAULT_SVG_WIDTH,
};
use crate::state::MemoSet;
use crate::url::ImageKind;
use reqwest::{redirect::Policy, Client};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// An image that made it to disk and passed every filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// File name of the final artifact inside the output directory
    pub filename: String,
    /// Full path of the final artifact
    pub path: PathBuf,
    /// The image URL it was downloaded from
    pub source_url: String,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Image written (and converted where needed)
    Downloaded(FetchedImage),

    /// URL was already attempted earlier in the session; nothing was done
    AlreadyAttempted,

    /// Image was smaller than the minimum size, or could not be measured
    Filtered,

    /// Network, status, write or conversion failure
    Failed {
        /// Error description
        error: String,
    },

    /// The crawl was cancelled while the fetch was in flight
    Cancelled,
}

impl FetchOutcome {
    fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }
}

/// Builds the HTTP client used for image downloads
///
/// # Arguments
///
/// * `user_agent` - The identification string to send
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::crawler::build_http_client;
///
/// let client = build_http_client("Mozilla/5.0 (X11; Linux x86_64)").unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads images into an output directory
///
/// Cheap to share by reference across concurrent fetches; all mutable state
/// lives in the [`MemoSet`] of attempted URLs.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    attempted: MemoSet,
    output_dir: PathBuf,
    min_size: Option<MinSize>,
    svg_size: (u32, u32),
    cancel: CancellationToken,
}

impl ImageFetcher {
    pub fn new(client: Client, output_dir: impl Into<PathBuf>, min_size: Option<MinSize>) -> Self {
        Self {
            client,
            attempted: MemoSet::new(),
            output_dir: output_dir.into(),
            min_size,
            svg_size: (DEFAULT_SVG_WIDTH, DEFAULT_SVG_HEIGHT),
            cancel: CancellationToken::new(),
        }
    }

    /// Shares an existing attempted-image set, e.g. across crawl invocations
    pub fn with_attempted(mut self, attempted: MemoSet) -> Self {
        self.attempted = attempted;
        self
    }

    /// Size SVG images are rasterized to
    pub fn with_svg_size(mut self, width: u32, height: u32) -> Self {
        self.svg_size = (width, height);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn attempted(&self) -> &MemoSet {
        &self.attempted
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fetches an image at most once per session
    ///
    /// The URL is claimed before any I/O, so a repeat call (or a concurrent
    /// call for the same URL) returns `AlreadyAttempted` without touching the
    /// network. Every failure is reported in the outcome; nothing here aborts
    /// the crawl.
    pub async fn fetch(&self, image_url: &Url) -> FetchOutcome {
        if !self.attempted.insert(image_url.as_str()) {
            tracing::trace!("Image already attempted: {}", image_url);
            return FetchOutcome::AlreadyAttempted;
        }

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => FetchOutcome::Cancelled,
            outcome = self.fetch_claimed(image_url) => outcome,
        };

        match &outcome {
            FetchOutcome::Downloaded(image) => {
                tracing::debug!("Downloaded {} -> {}", image_url, image.filename)
            }
            FetchOutcome::Filtered => tracing::debug!("Below minimum size: {}", image_url),
            FetchOutcome::Failed { error } => {
                tracing::warn!("Failed to fetch image {}: {}", image_url, error)
            }
            FetchOutcome::Cancelled => tracing::debug!("Abandoned image fetch: {}", image_url),
            FetchOutcome::AlreadyAttempted => {}
        }

        outcome
    }

    async fn fetch_claimed(&self, url: &Url) -> FetchOutcome {
        let kind = ImageKind::from_url(url);
        if kind.needs_conversion() {
            self.fetch_and_convert(url, kind).await
        } else {
            self.fetch_raster(url).await
        }
    }

    /// Downloads a raster image, checking its size before writing anything
    async fn fetch_raster(&self, url: &Url) -> FetchOutcome {
        let bytes = match self.get_bytes(url).await {
            Ok(bytes) => bytes,
            Err(error) => return FetchOutcome::failed(error),
        };

        let dims = probe_dimensions_from_bytes(&bytes);
        if !passes_size_filter(dims, self.min_size) {
            return FetchOutcome::Filtered;
        }

        match self.write_file(url, &bytes).await {
            Ok(path) => FetchOutcome::Downloaded(FetchedImage {
                filename: file_name_of(&path),
                path,
                source_url: url.to_string(),
            }),
            Err(error) => FetchOutcome::failed(error),
        }
    }

    /// Downloads a HEIC or SVG image and converts it to a raster file
    async fn fetch_and_convert(&self, url: &Url, kind: ImageKind) -> FetchOutcome {
        let bytes = match self.get_bytes(url).await {
            Ok(bytes) => bytes,
            Err(error) => return FetchOutcome::failed(error),
        };

        let downloaded = match self.write_file(url, &bytes).await {
            Ok(path) => path,
            Err(error) => return FetchOutcome::failed(error),
        };

        let svg_size = self.svg_size;
        let measure = self.min_size.is_some();
        let converted = tokio::task::spawn_blocking(move || {
            convert_downloaded(&downloaded, kind, svg_size, measure)
        })
        .await;

        let (path, dims) = match converted {
            Ok(Some(result)) => result,
            Ok(None) => return FetchOutcome::failed(format!("{:?} conversion failed", kind)),
            Err(e) => return FetchOutcome::failed(format!("conversion task failed: {}", e)),
        };

        if !keeps_converted(kind, dims, self.min_size) {
            return FetchOutcome::Filtered;
        }

        FetchOutcome::Downloaded(FetchedImage {
            filename: file_name_of(&path),
            path,
            source_url: url.to_string(),
        })
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string())
    }

    async fn write_file(&self, url: &Url, bytes: &[u8]) -> Result<PathBuf, String> {
        let mut file = OutputFile::create(&self.output_dir, url)
            .await
            .map_err(|e| format!("cannot create output file: {}", e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| format!("write to {} failed: {}", file.path().display(), e))?;
        file.commit().await.map_err(|e| e.to_string())
    }
}

/// Runs the format conversion for a downloaded file
///
/// Returns the converted path (and its dimensions when `measure` is set), or
/// None when no converted file was produced.
fn convert_downloaded(
    downloaded: &Path,
    kind: ImageKind,
    svg_size: (u32, u32),
    measure: bool,
) -> Option<(PathBuf, Option<Dimensions>)> {
    let converted = match kind {
        ImageKind::Svg => {
            let mut png = downloaded.as_os_str().to_owned();
            png.push(".png");
            convert_svg_to_raster(downloaded, Path::new(&png), svg_size.0, svg_size.1)?
        }
        ImageKind::Heic | ImageKind::Raster => convert_to_raster(downloaded)?,
    };

    let dims = if measure {
        probe_dimensions(&converted)
    } else {
        None
    };
    Some((converted, dims))
}

/// Decides whether a converted image is kept under the minimum size filter
///
/// Rasterized SVGs always have the configured raster size, so only HEIC
/// conversions are measured.
fn keeps_converted(kind: ImageKind, dims: Option<Dimensions>, min_size: Option<MinSize>) -> bool {
    match kind {
        ImageKind::Svg => true,
        ImageKind::Heic | ImageKind::Raster => passes_size_filter(dims, min_size),
    }
}

fn classify_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    }
}
