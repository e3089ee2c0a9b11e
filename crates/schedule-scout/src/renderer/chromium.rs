//! Chromium-based renderer using chromiumoxide.

use super::responses::{ResponseEvent, ResponseMeta, ResponseTracker};
use super::{
    decode_accessor_result, decode_script_texts, NavigationResult, RenderContext, Renderer,
    INLINE_SCRIPTS_JS,
};
use crate::acquisition::collector::{NetworkExchange, TransportKind};
use crate::acquisition::extractor::PageEnvironment;
use crate::acquisition::path::PathExpr;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, Headers, RequestId, ResourceType, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Language preference sent with every request.
const ACCEPT_LANGUAGE: &str = "uk-UA,uk;q=0.9,en-US;q=0.8,en;q=0.7";

/// Responses buffered between the browser and the collector.
const EXCHANGE_BUFFER: usize = 64;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SCHEDULE_SCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SCHEDULE_SCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.schedule-scout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = [
            home.join(".schedule-scout/chromium/chrome-linux64/chrome"),
            home.join(".schedule-scout/chromium/chrome"),
        ];
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Create a new ChromiumRenderer, launching a headless Chromium instance.
    pub async fn new() -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Set SCHEDULE_SCOUT_CHROMIUM_PATH or install Chrome.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1920, 1080)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        page.execute(EnableParams::default())
            .await
            .context("failed to enable network domain")?;
        let headers: Headers =
            serde_json::from_value(serde_json::json!({ "Accept-Language": ACCEPT_LANGUAGE }))
                .context("invalid extra headers")?;
        page.execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .context("failed to set extra headers")?;

        Ok(Box::new(ChromiumContext {
            page,
            listeners: Vec::new(),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close Chromium")?;
        let _ = browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    listeners: Vec<JoinHandle<()>>,
}

/// Metadata of a response, from its `responseReceived` event.
fn response_meta(event: &EventResponseReceived) -> ResponseMeta {
    let response = &event.response;
    let headers = serde_json::to_value(&response.headers).unwrap_or_default();
    let content_type = header_value(&headers, "content-type")
        .or_else(|| Some(response.mime_type.clone()).filter(|m| !m.is_empty()));

    ResponseMeta {
        status: u16::try_from(response.status).unwrap_or(0),
        url: response.url.clone(),
        content_type,
        transport: transport_kind(&event.r#type),
    }
}

fn header_value(headers: &Value, name: &str) -> Option<String> {
    headers.as_object()?.iter().find_map(|(k, v)| {
        if k.eq_ignore_ascii_case(name) {
            v.as_str().map(String::from)
        } else {
            None
        }
    })
}

fn transport_kind(resource: &ResourceType) -> TransportKind {
    match resource {
        ResourceType::Document => TransportKind::Document,
        ResourceType::Xhr => TransportKind::Xhr,
        ResourceType::Fetch => TransportKind::Fetch,
        ResourceType::Script => TransportKind::Script,
        ResourceType::Stylesheet => TransportKind::Stylesheet,
        ResourceType::Image => TransportKind::Image,
        ResourceType::Font => TransportKind::Font,
        ResourceType::Media => TransportKind::Media,
        _ => TransportKind::Other,
    }
}

async fn fetch_body(page: &Page, request_id: RequestId) -> Result<String> {
    let returns = page
        .execute(GetResponseBodyParams::new(request_id))
        .await
        .context("failed to fetch response body")?;
    let body = &returns.result;

    if body.base64_encoded {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&body.body)
            .context("invalid base64 response body")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        Ok(body.body.clone())
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn subscribe_responses(&mut self) -> Result<mpsc::Receiver<NetworkExchange>> {
        let mut received = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to listen for responses")?;
        let mut finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("failed to listen for finished loads")?;
        let mut failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .context("failed to listen for failed loads")?;

        let (tx, rx) = mpsc::channel(EXCHANGE_BUFFER);
        let page = self.page.clone();

        let listener = tokio::spawn(async move {
            let mut tracker: ResponseTracker<RequestId> = ResponseTracker::new();
            loop {
                // Headers before outcomes, so a ready pair is completed early.
                let event = tokio::select! {
                    biased;
                    Some(event) = received.next() => {
                        ResponseEvent::Received(event.request_id.clone(), response_meta(&event))
                    }
                    Some(event) = failed.next() => ResponseEvent::Failed(event.request_id.clone()),
                    Some(event) = finished.next() => ResponseEvent::Finished(event.request_id.clone()),
                    else => break,
                };

                let Some((request_id, meta)) = tracker.apply(event) else {
                    continue;
                };
                let body = if meta.needs_body() {
                    match fetch_body(&page, request_id).await {
                        Ok(body) => body,
                        Err(e) => {
                            trace!("skipping response without body: {e:#}");
                            continue;
                        }
                    }
                } else {
                    String::new()
                };
                if tx.send(meta.into_exchange(body)).await.is_err() {
                    break;
                }
            }
            debug!(in_flight = tracker.in_flight(), "response listener stopped");
        });
        self.listeners.push(listener);

        Ok(rx)
    }

    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            async {
                self.page.goto(url).await?;
                // Wait for page to be loaded
                self.page.wait_for_navigation().await?;
                Ok::<_, chromiumoxide::error::CdpError>(())
            },
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        let mut params = EvaluateParams::new(script);
        params.return_by_value = Some(true);
        params.await_promise = Some(true);

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .context("JS execution failed")?;

        match result.value() {
            Some(value) => Ok(value.clone()),
            None => Ok(Value::Null),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        for listener in &self.listeners {
            listener.abort();
        }
        let _ = self.page.close().await;
        Ok(())
    }
}

#[async_trait]
impl PageEnvironment for ChromiumContext {
    async fn read_path(&self, path: &PathExpr) -> Result<Option<Value>> {
        let raw = self.execute_js(&path.to_page_accessor()).await?;
        Ok(decode_accessor_result(raw))
    }

    async fn script_texts(&self) -> Result<Vec<String>> {
        let raw = self.execute_js(INLINE_SCRIPTS_JS).await?;
        Ok(decode_script_texts(raw))
    }
}
