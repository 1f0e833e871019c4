//! Static HTML renderer
//!
//! Fetches a page over HTTP and reads `<a href>` and `<img src>` straight out
//! of the markup. Scripts are not executed, so pages that build their DOM on
//! the client yield nothing here.

use super::{LaunchOptions, RenderError, RenderLauncher, RenderResult, RenderedPage, Renderer};
use crate::crawler::build_http_client;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// User agent presented when no override is configured
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; sumi-harvest/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Launches [`HttpRenderer`] sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpLauncher;

#[async_trait]
impl RenderLauncher for HttpLauncher {
    async fn launch(&self, options: &LaunchOptions) -> RenderResult<Box<dyn Renderer>> {
        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        Ok(Box::new(HttpRenderer::new(user_agent)?))
    }
}

/// Renders pages by fetching and parsing their HTML
pub struct HttpRenderer {
    client: Client,
    user_agent: String,
}

impl HttpRenderer {
    pub fn new(user_agent: String) -> RenderResult<Self> {
        let client = build_http_client(&user_agent)
            .map_err(|e| RenderError::Launch(format!("HTTP client: {}", e)))?;
        Ok(Self { client, user_agent })
    }

    async fn fetch_html(&self, url: &Url) -> RenderResult<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| RenderError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Http {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| RenderError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn user_agent(&self) -> RenderResult<String> {
        Ok(self.user_agent.clone())
    }

    async fn render(&self, url: &Url, timeout: Duration) -> RenderResult<RenderedPage> {
        let html = tokio::time::timeout(timeout, self.fetch_html(url))
            .await
            .map_err(|_| RenderError::Timeout {
                url: url.to_string(),
            })??;

        let page = extract_elements(&html);
        if page.is_empty() {
            return Err(RenderError::NoElements {
                url: url.to_string(),
            });
        }

        Ok(page)
    }

    async fn close(&mut self) {}
}

/// Extracts anchor hrefs and image sources from an HTML document
///
/// Values are returned verbatim in document order; resolution against the
/// page URL is left to the caller.
///
/// # Example
///
/// ```
/// use sumi_harvest::render::extract_elements;
///
/// let html = r#"<html><body><a href="/page2">Next</a><img src="/a.png"></body></html>"#;
/// let page = extract_elements(html);
/// assert_eq!(page.anchors, vec!["/page2".to_string()]);
/// assert_eq!(page.images, vec!["/a.png".to_string()]);
/// ```
pub fn extract_elements(html: &str) -> RenderedPage {
    let document = Html::parse_document(html);

    RenderedPage {
        anchors: collect_attr(&document, "a[href]", "href"),
        images: collect_attr(&document, "img[src]", "src"),
    }
}

fn collect_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
