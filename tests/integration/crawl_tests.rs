//! Integration tests for the harvester
//!
//! These tests drive whole crawl runs against wiremock servers. Most use a
//! scripted in-memory renderer so render invocations can be counted; one runs
//! the real HTTP renderer end-to-end.

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sumi_harvest::config::{BrowserConfig, Config, CrawlerConfig, ImageConfig, OutputConfig};
use sumi_harvest::crawler::{run_harvest_with, CrawlOptions, CrawlSession};
use sumi_harvest::render::{
    HttpLauncher, LaunchOptions, RenderError, RenderLauncher, RenderResult, RenderedPage, Renderer,
};
use sumi_harvest::{MinSize, PageState};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Canned pages plus everything the tests want to observe
#[derive(Default)]
struct Script {
    pages: HashMap<String, RenderedPage>,
    render_delay: Option<Duration>,
    renders: Mutex<Vec<String>>,
    launches: Mutex<Vec<LaunchOptions>>,
    closed: AtomicUsize,
}

impl Script {
    fn render_count(&self, url: &str) -> usize {
        self.renders
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    fn renders(&self) -> Vec<String> {
        self.renders.lock().unwrap().clone()
    }
}

/// Builds a [`Script`] with page URLs relative to a server origin
struct ScriptBuilder {
    origin: String,
    script: Script,
}

impl ScriptBuilder {
    fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            script: Script::default(),
        }
    }

    fn page(mut self, path: &str, anchors: &[&str], images: &[&str]) -> Self {
        self.script.pages.insert(
            format!("{}{}", self.origin, path),
            RenderedPage {
                anchors: anchors.iter().map(|s| s.to_string()).collect(),
                images: images.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    fn render_delay(mut self, delay: Duration) -> Self {
        self.script.render_delay = Some(delay);
        self
    }

    fn build(self) -> Arc<Script> {
        Arc::new(self.script)
    }
}

struct ScriptedRenderer {
    script: Arc<Script>,
    user_agent: String,
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn user_agent(&self) -> RenderResult<String> {
        Ok(self.user_agent.clone())
    }

    async fn render(&self, url: &Url, _timeout: Duration) -> RenderResult<RenderedPage> {
        self.script.renders.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.script.render_delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.pages.get(url.as_str()) {
            Some(page) => Ok(page.clone()),
            None => Err(RenderError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    async fn close(&mut self) {
        self.script.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedLauncher(Arc<Script>);

#[async_trait]
impl RenderLauncher for ScriptedLauncher {
    async fn launch(&self, options: &LaunchOptions) -> RenderResult<Box<dyn Renderer>> {
        self.0.launches.lock().unwrap().push(options.clone());
        let user_agent = options.user_agent.clone().unwrap_or_else(|| {
            "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/120.0.0.0 Safari/537.36".to_string()
        });
        Ok(Box::new(ScriptedRenderer {
            script: self.0.clone(),
            user_agent,
        }))
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

async fn serve_png(server: &MockServer, route: &str, width: u32, height: u32) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes(width, height))
                .insert_header("content-type", "image/png"),
        )
        .mount(server)
        .await;
}

fn options(dir: &Path, max_depth: u32) -> CrawlOptions {
    let mut options = CrawlOptions::new(dir.join("images"));
    options.max_depth = max_depth;
    options.page_timeout = Duration::from_secs(5);
    options
}

async fn launch(script: &Arc<Script>) -> CrawlSession {
    CrawlSession::launch(&ScriptedLauncher(script.clone()), &BrowserConfig::default())
        .await
        .expect("scripted launch cannot fail")
}

fn create_test_config(seeds: Vec<String>, dir: &Path, max_depth: u32) -> Config {
    Config {
        seeds,
        crawler: CrawlerConfig {
            max_depth,
            page_timeout_secs: 5,
            base_url: String::new(),
            use_page_url: true,
            image_concurrency: 4,
            crawl_timeout_secs: 0,
        },
        images: ImageConfig {
            output_dir: dir.join("images").to_string_lossy().into_owned(),
            min_width: None,
            min_height: None,
            svg_width: 1920,
            svg_height: 1080,
        },
        browser: BrowserConfig::default(),
        output: OutputConfig {
            manifest_path: dir.join("manifest.json").to_string_lossy().into_owned(),
            summary_path: Some(dir.join("summary.md").to_string_lossy().into_owned()),
        },
    }
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let server = MockServer::start().await;
    let origin = server.uri();
    serve_png(&server, "/a.png", 64, 64).await;

    let script = ScriptBuilder::new(&origin)
        .page("/", &["/page2"], &["/a.png"])
        .page("/page2", &["/page3"], &[])
        .page("/page3", &[], &["/never.png"])
        .build();
    let dir = TempDir::new().unwrap();
    let mut options = options(dir.path(), 1);
    options.use_page_url = true;

    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/", origin)], &options)
        .await
        .unwrap();
    session.close().await;

    let seed = format!("{}/", origin);
    assert_eq!(report.downloads.len(), 1);
    assert_eq!(report.downloads.get("a.png"), Some(&seed));
    assert!(dir.path().join("images").join("a.png").exists());

    assert_eq!(
        script.renders(),
        vec![seed.clone(), format!("{}/page2", origin)]
    );
    assert_eq!(report.stats.pages(PageState::Visited), 2);
    assert_eq!(report.stats.pages(PageState::DepthExceeded), 1);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_image_url_credited_by_default() {
    let server = MockServer::start().await;
    let origin = server.uri();
    serve_png(&server, "/a.png", 16, 16).await;

    let script = ScriptBuilder::new(&origin).page("/", &[], &["a.png"]).build();
    let dir = TempDir::new().unwrap();

    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/", origin)], &options(dir.path(), 0))
        .await
        .unwrap();
    session.close().await;

    assert_eq!(report.downloads["a.png"], format!("{}/a.png", origin));
}

#[tokio::test]
async fn test_page_single_visit() {
    let server = MockServer::start().await;
    let origin = server.uri();

    // "/shared" is reachable via "/left" and "/right"
    let script = ScriptBuilder::new(&origin)
        .page("/", &["/left", "/right"], &[])
        .page("/left", &["/shared"], &[])
        .page("/right", &["/shared", "/left"], &[])
        .page("/shared", &["/", "/left"], &[])
        .build();
    let dir = TempDir::new().unwrap();

    let mut session = launch(&script).await;
    session
        .crawl_all(&[format!("{}/", origin)], &options(dir.path(), 5))
        .await
        .unwrap();
    session.close().await;

    for page in ["/", "/left", "/right", "/shared"] {
        assert_eq!(script.render_count(&format!("{}{}", origin, page)), 1, "{}", page);
    }
}

#[tokio::test]
async fn test_pages_not_rerendered_across_seeds() {
    let server = MockServer::start().await;
    let origin = server.uri();

    let script = ScriptBuilder::new(&origin)
        .page("/", &["/about"], &[])
        .page("/about", &[], &[])
        .build();
    let dir = TempDir::new().unwrap();
    let seeds = vec![format!("{}/", origin), format!("{}/about", origin)];

    let mut session = launch(&script).await;
    let report = session.crawl_all(&seeds, &options(dir.path(), 1)).await.unwrap();
    session.close().await;

    assert_eq!(script.render_count(&format!("{}/about", origin)), 1);
    assert_eq!(report.stats.pages(PageState::AlreadyVisited), 1);
}

#[tokio::test]
async fn test_depth_zero_renders_only_seed() {
    let server = MockServer::start().await;
    let origin = server.uri();

    let script = ScriptBuilder::new(&origin)
        .page("/", &["/child"], &[])
        .page("/child", &[], &[])
        .build();
    let dir = TempDir::new().unwrap();

    let mut session = launch(&script).await;
    session
        .crawl_all(&[format!("{}/", origin)], &options(dir.path(), 0))
        .await
        .unwrap();
    session.close().await;

    assert_eq!(script.renders(), vec![format!("{}/", origin)]);
}

#[tokio::test]
async fn test_domain_scoping() {
    let server = MockServer::start().await;
    let origin = server.uri();

    let script = ScriptBuilder::new(&origin)
        .page(
            "/blog",
            &["/shop/item", "https://other.test/x", "/blog/post2"],
            &[],
        )
        .page("/blog/post2", &[], &[])
        .page("/shop/item", &[], &[])
        .build();
    let dir = TempDir::new().unwrap();
    let mut options = options(dir.path(), 3);
    options.base_url = format!("{}/blog", origin);

    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/blog", origin)], &options)
        .await
        .unwrap();
    session.close().await;

    assert_eq!(
        script.renders(),
        vec![format!("{}/blog", origin), format!("{}/blog/post2", origin)]
    );
    assert_eq!(report.stats.links_rejected, 2);
}

#[tokio::test]
async fn test_size_filter() {
    let server = MockServer::start().await;
    let origin = server.uri();
    serve_png(&server, "/small.png", 400, 300).await;
    serve_png(&server, "/large.png", 1024, 768).await;

    let script = ScriptBuilder::new(&origin)
        .page("/", &[], &["/small.png", "/large.png"])
        .build();
    let dir = TempDir::new().unwrap();
    let mut options = options(dir.path(), 0);
    options.min_size = Some(MinSize::new(800, 600));

    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/", origin)], &options)
        .await
        .unwrap();
    session.close().await;

    assert_eq!(report.downloads.keys().collect::<Vec<_>>(), vec!["large.png"]);
    assert_eq!(report.stats.images_filtered, 1);
    assert!(!dir.path().join("images").join("small.png").exists());
}

#[tokio::test]
async fn test_dedup_idempotence() {
    let server = MockServer::start().await;
    let origin = server.uri();
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(32, 32)))
        .expect(1)
        .mount(&server)
        .await;

    let script = ScriptBuilder::new(&origin)
        .page("/", &["/other"], &["/logo.png"])
        .page("/other", &["/logo.png"], &["/logo.png", "/logo.png"])
        .build();
    let dir = TempDir::new().unwrap();

    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/", origin)], &options(dir.path(), 1))
        .await
        .unwrap();
    session.close().await;

    assert_eq!(report.downloads.len(), 1);
    assert_eq!(report.stats.images_downloaded, 1);
    // Twice as an <img> on /other, once as a link
    assert_eq!(report.stats.images_duplicate, 3);
    assert!(session.attempted().contains(&format!("{}/logo.png", origin)));
    server.verify().await;
}

#[tokio::test]
async fn test_image_links_are_fetched_not_rendered() {
    let server = MockServer::start().await;
    let origin = server.uri();
    serve_png(&server, "/gallery/photo.JPG", 20, 20).await;

    let script = ScriptBuilder::new(&origin)
        .page("/", &["/gallery/photo.JPG"], &[])
        .build();
    let dir = TempDir::new().unwrap();

    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/", origin)], &options(dir.path(), 2))
        .await
        .unwrap();
    session.close().await;

    assert_eq!(script.renders(), vec![format!("{}/", origin)]);
    assert!(report.downloads.contains_key("photo.JPG"));
}

#[tokio::test]
async fn test_failed_images_do_not_abort_crawl() {
    let server = MockServer::start().await;
    let origin = server.uri();
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    serve_png(&server, "/fine.png", 10, 10).await;

    let script = ScriptBuilder::new(&origin)
        .page("/", &["/next"], &["/broken.png", "/fine.png"])
        .page("/next", &[], &[])
        .build();
    let dir = TempDir::new().unwrap();

    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/", origin)], &options(dir.path(), 1))
        .await
        .unwrap();
    session.close().await;

    assert_eq!(report.downloads.keys().collect::<Vec<_>>(), vec!["fine.png"]);
    assert_eq!(report.stats.images_failed, 1);
    assert_eq!(script.render_count(&format!("{}/next", origin)), 1);
}

#[tokio::test]
async fn test_user_agent_sanitized_and_sessions_closed() {
    let server = MockServer::start().await;
    let origin = server.uri();
    let script = ScriptBuilder::new(&origin).page("/", &[], &[]).build();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![format!("{}/", origin)], dir.path(), 0);

    run_harvest_with(
        &ScriptedLauncher(script.clone()),
        &config,
        None,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let launches = script.launches.lock().unwrap().clone();
    assert_eq!(launches.len(), 2);
    assert_eq!(launches[0].user_agent, None);
    assert_eq!(
        launches[1].user_agent.as_deref(),
        Some("Mozilla/5.0 (X11; Linux x86_64) Chrome/120.0.0.0 Safari/537.36")
    );
    assert_eq!(launches[1].viewport, Some((1920, 1080)));
    assert_eq!(script.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_crawl_timeout_returns_partial_result() {
    let server = MockServer::start().await;
    let origin = server.uri();
    let script = ScriptBuilder::new(&origin)
        .page("/", &["/slow"], &[])
        .page("/slow", &[], &[])
        .render_delay(Duration::from_secs(30))
        .build();
    let dir = TempDir::new().unwrap();
    let mut options = options(dir.path(), 1);
    options.crawl_timeout = Some(Duration::from_millis(200));

    let started = Instant::now();
    let mut session = launch(&script).await;
    let report = session
        .crawl_all(&[format!("{}/", origin)], &options)
        .await
        .unwrap();
    session.close().await;

    assert!(report.cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(report.downloads.is_empty());
    assert_eq!(report.stats.pages(PageState::Cancelled), 1);
}

#[tokio::test]
async fn test_cancelled_harvest_still_writes_manifest() {
    let server = MockServer::start().await;
    let origin = server.uri();
    let script = ScriptBuilder::new(&origin).page("/", &[], &[]).build();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![format!("{}/", origin)], dir.path(), 1);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_harvest_with(&ScriptedLauncher(script.clone()), &config, None, cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(script.renders().is_empty());
    let manifest = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
    assert_eq!(manifest, "{}");
    assert_eq!(script.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_full_harvest_with_http_renderer() {
    let server = MockServer::start().await;
    let origin = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body>
                    <img src="/a.png">
                    <a href="/page2">Page 2</a>
                    <a href="https://elsewhere.test/">Elsewhere</a>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/page3">deeper</a></body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    serve_png(&server, "/a.png", 48, 48).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![format!("{}/", origin)], dir.path(), 1);

    let report = run_harvest_with(&HttpLauncher, &config, Some("abc123"), CancellationToken::new())
        .await
        .unwrap();

    let seed = format!("{}/", origin);
    assert_eq!(report.downloads.get("a.png"), Some(&seed));
    assert_eq!(report.stats.links_rejected, 1);

    let manifest: HashMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest.get("a.png"), Some(&seed));

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("abc123"));
    assert!(summary.contains("| a.png |"));

    server.verify().await;
}
