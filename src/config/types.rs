use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Pages the crawl starts from, visited in order at depth 0
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    pub images: ImageConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of link hops from a seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Time to wait for a page to render anchors or images (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Only links starting with this URL are followed (empty = no restriction)
    #[serde(rename = "base-url", default)]
    pub base_url: String,

    /// Map downloaded files to the page they were found on instead of the image URL
    #[serde(rename = "use-page-url", default)]
    pub use_page_url: bool,

    /// Number of images fetched concurrently per page
    #[serde(rename = "image-concurrency", default = "default_image_concurrency")]
    pub image_concurrency: usize,

    /// Global crawl timeout in seconds (0 = unbounded)
    #[serde(rename = "crawl-timeout-secs", default)]
    pub crawl_timeout_secs: u64,
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// Directory downloaded and converted images are written into
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Minimum accepted image width in pixels
    #[serde(rename = "min-width", default)]
    pub min_width: Option<u32>,

    /// Minimum accepted image height in pixels
    #[serde(rename = "min-height", default)]
    pub min_height: Option<u32>,

    /// Width SVG images are rasterized to
    #[serde(rename = "svg-width", default = "default_width")]
    pub svg_width: u32,

    /// Height SVG images are rasterized to
    #[serde(rename = "svg-height", default = "default_height")]
    pub svg_height: u32,
}

/// Which render backend drives page rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEngine {
    /// Fetch the HTML over HTTP and parse it without running scripts
    #[default]
    Http,
    /// Drive a headless Chrome instance (requires the `browser` feature)
    Chrome,
}

/// Render session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub engine: RenderEngine,

    /// Viewport width
    #[serde(default = "default_width")]
    pub width: u32,

    /// Viewport height
    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Path to the Chrome/Chromium executable (auto-detected when absent)
    #[serde(rename = "chrome-path", default)]
    pub chrome_path: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: RenderEngine::default(),
            width: default_width(),
            height: default_height(),
            headless: default_headless(),
            chrome_path: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON filename-to-source manifest
    #[serde(rename = "manifest-path")]
    pub manifest_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_page_timeout() -> u64 {
    60
}

fn default_image_concurrency() -> usize {
    4
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_headless() -> bool {
    true
}
