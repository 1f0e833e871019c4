//! Page rendering backends
//!
//! A render backend loads a page and reports the anchors and images it
//! contains. The crawler only talks to the [`Renderer`] trait, so the static
//! HTTP renderer and the headless Chrome renderer are interchangeable.
//!
//! # Components
//!
//! - `HttpRenderer`: fetches the HTML and extracts elements with `scraper`
//! - `ChromeRenderer`: drives headless Chrome (cargo feature `browser`)

#[cfg(feature = "browser")]
mod browser;
mod http;

#[cfg(feature = "browser")]
pub use browser::{ChromeLauncher, ChromeRenderer};
pub use http::{extract_elements, HttpLauncher, HttpRenderer, DEFAULT_USER_AGENT};

use crate::config::{BrowserConfig, RenderEngine};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors produced by render backends
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Timed out waiting for anchors or images on {url}")]
    Timeout { url: String },

    #[error("No anchors or images found on {url}")]
    NoElements { url: String },

    #[error("HTTP error rendering {url}: {message}")]
    Http { url: String, message: String },

    #[error("Failed to launch render session: {0}")]
    Launch(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

impl RenderError {
    /// Returns true if the page simply had nothing to yield in time
    ///
    /// Such pages are processed with zero yield rather than logged as failures.
    pub fn is_empty_yield(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NoElements { .. })
    }
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Elements exposed by a rendered page, in document order
///
/// Values are the raw `href`/`src` strings; they may be relative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub anchors: Vec<String>,
    pub images: Vec<String>,
}

impl RenderedPage {
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty() && self.images.is_empty()
    }
}

/// Options a render session is launched with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    /// User agent override; the backend's own identity is used when None
    pub user_agent: Option<String>,
    /// Viewport size (width, height)
    pub viewport: Option<(u32, u32)>,
    /// Browser executable, for backends that launch one
    pub chrome_path: Option<String>,
}

impl LaunchOptions {
    /// Options for the throwaway session used to read the default user agent
    pub fn probe(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            user_agent: None,
            viewport: None,
            chrome_path: config.chrome_path.clone(),
        }
    }

    /// Options for the working session
    pub fn working(config: &BrowserConfig, user_agent: String) -> Self {
        Self {
            headless: config.headless,
            user_agent: Some(user_agent),
            viewport: Some((config.width, config.height)),
            chrome_path: config.chrome_path.clone(),
        }
    }
}

/// A live render session
#[async_trait]
pub trait Renderer: Send + Sync {
    /// The client identification string the session presents
    async fn user_agent(&self) -> RenderResult<String>;

    /// Loads a page and waits up to `timeout` for anchors or images to appear
    ///
    /// Returns `RenderError::Timeout` or `RenderError::NoElements` when the
    /// page has nothing to offer within the timeout.
    async fn render(&self, url: &Url, timeout: Duration) -> RenderResult<RenderedPage>;

    /// Shuts the session down; calling it more than once is harmless
    async fn close(&mut self);
}

/// Creates render sessions
#[async_trait]
pub trait RenderLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> RenderResult<Box<dyn Renderer>>;
}

/// Picks the launcher for the configured render engine
pub fn launcher_for(config: &BrowserConfig) -> RenderResult<Box<dyn RenderLauncher>> {
    match config.engine {
        RenderEngine::Http => Ok(Box::new(HttpLauncher)),
        #[cfg(feature = "browser")]
        RenderEngine::Chrome => Ok(Box::new(ChromeLauncher)),
        #[cfg(not(feature = "browser"))]
        RenderEngine::Chrome => Err(RenderError::Launch(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        )),
    }
}
