//! Headless Chrome renderer
//!
//! Drives a Chrome/Chromium instance over the DevTools protocol so pages that
//! build their DOM with scripts are seen the way a visitor sees them.

use super::{LaunchOptions, RenderError, RenderLauncher, RenderResult, RenderedPage, Renderer};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// Resolved `href` of every anchor currently in the DOM
const ANCHORS_SCRIPT: &str =
    "Array.from(document.querySelectorAll('a[href]'), a => a.href).filter(h => h)";

/// Resolved `src` of every image currently in the DOM
const IMAGES_SCRIPT: &str =
    "Array.from(document.querySelectorAll('img[src]'), i => i.src).filter(s => s)";

/// Interval between DOM polls while waiting for elements
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches [`ChromeRenderer`] sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl RenderLauncher for ChromeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> RenderResult<Box<dyn Renderer>> {
        Ok(Box::new(ChromeRenderer::launch(options).await?))
    }
}

/// A Chrome instance with a single reusable tab
pub struct ChromeRenderer {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeRenderer {
    pub async fn launch(options: &LaunchOptions) -> RenderResult<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some((width, height)) = options.viewport {
            builder = builder.window_size(width, height);
        }
        if let Some(ref user_agent) = options.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }
        if let Some(ref path) = options.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| RenderError::Launch(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Launch(format!("Failed to open tab: {}", e)))?;

        tracing::debug!("Launched Chrome (headless: {})", options.headless);

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
        })
    }

    async fn collect(&self, script: &str) -> RenderResult<Vec<String>> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?
            .into_value::<Vec<String>>()
            .map_err(|e| RenderError::Browser(e.to_string()))
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn user_agent(&self) -> RenderResult<String> {
        let browser = self.browser.lock().await;
        let browser = browser
            .as_ref()
            .ok_or_else(|| RenderError::Browser("browser already closed".to_string()))?;
        let version = browser
            .version()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        Ok(version.user_agent)
    }

    async fn render(&self, url: &Url, timeout: Duration) -> RenderResult<RenderedPage> {
        let started = Instant::now();

        match tokio::time::timeout(timeout, self.page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(RenderError::Http {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                })
            }
        }

        loop {
            let page = RenderedPage {
                anchors: self.collect(ANCHORS_SCRIPT).await?,
                images: self.collect(IMAGES_SCRIPT).await?,
            };
            if !page.is_empty() {
                return Ok(page);
            }
            if started.elapsed() >= timeout {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();
    }
}
