use super::driver::{Bounds, BrowserDriver, ElementRef};
use crate::domain::model::{Cookie, LocatorCandidate, LocatorStrategy};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Chromium browser driver using chromiumoxide.
pub struct ChromiumDriver {
    browser: RwLock<Option<Browser>>,
    page: RwLock<Option<Arc<Mutex<Page>>>>,
    handler_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
    /// Resolved elements by handle. Cleared on navigation.
    elements: Mutex<ElementTable>,
    user_data_dir: PathBuf,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
}

#[derive(Default)]
struct ElementTable {
    next: u64,
    map: HashMap<u64, Arc<Element>>,
}

impl ElementTable {
    fn insert(&mut self, element: Element) -> ElementRef {
        self.next += 1;
        self.map.insert(self.next, Arc::new(element));
        ElementRef(self.next)
    }
}

/// Render a string as an XPath 1.0 literal. XPath has no escape sequences,
/// so text containing apostrophes is split into a `concat(...)` of
/// single-quoted pieces joined by double-quoted apostrophes.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(r#", "'", "#))
}

impl ChromiumDriver {
    /// Create a new driver with a persistent user data directory so profile
    /// data (cache, cookies, localStorage) survives across sessions.
    pub fn new(user_data_dir: PathBuf, headless: bool, viewport: (u32, u32)) -> Self {
        Self {
            browser: RwLock::new(None),
            page: RwLock::new(None),
            handler_handle: RwLock::new(None),
            elements: Mutex::new(ElementTable::default()),
            user_data_dir,
            headless,
            viewport_width: viewport.0,
            viewport_height: viewport.1,
        }
    }

    async fn page(&self) -> Result<Arc<Mutex<Page>>> {
        self.page
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("Browser not started"))
    }

    /// Clean stale lockfiles left by crashed browser instances. Chrome
    /// creates "SingletonLock" files that prevent reusing a profile dir.
    fn clean_stale_lockfiles(&self) {
        let lockfile_names = ["SingletonLock", "SingletonSocket", "SingletonCookie"];
        for name in lockfile_names {
            let lockfile = self.user_data_dir.join(name);
            if lockfile.exists() {
                if let Err(e) = std::fs::remove_file(&lockfile) {
                    tracing::warn!("Failed to remove stale lockfile {:?}: {}", lockfile, e);
                } else {
                    tracing::debug!("Removed stale lockfile: {:?}", lockfile);
                }
            }
        }
    }

    async fn find_on_page(
        &self,
        page: &Page,
        candidate: &LocatorCandidate,
    ) -> Result<Option<Element>> {
        let found = match candidate.strategy {
            LocatorStrategy::Css => page.find_element(&candidate.expression).await,
            LocatorStrategy::XPath => page.find_xpath(&candidate.expression).await,
            LocatorStrategy::Text => {
                let query = format!(
                    "//*[contains(normalize-space(text()), {})]",
                    xpath_literal(&candidate.expression)
                );
                page.find_xpath(&query).await
            }
        };
        // Absence is not an error; a single query either matches or it doesn't.
        Ok(found.ok())
    }

    async fn element(&self, el: ElementRef) -> Result<Arc<Element>> {
        let table = self.elements.lock().await;
        table
            .map
            .get(&el.0)
            .cloned()
            .ok_or_else(|| anyhow!("Stale element handle {:?}", el))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn start(&self) -> Result<()> {
        if let Err(e) = std::fs::create_dir_all(&self.user_data_dir) {
            return Err(anyhow!("Failed to create user data dir: {}", e));
        }

        self.clean_stale_lockfiles();

        tracing::info!(profile = ?self.user_data_dir, headless = self.headless, "Starting browser");

        let mut config = BrowserConfig::builder()
            .window_size(self.viewport_width, self.viewport_height)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: self.viewport_width,
                height: self.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .user_data_dir(&self.user_data_dir)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--mute-audio")
            .arg("--hide-scrollbars");
        if self.headless {
            config = config.arg("--headless=new");
        }
        let config = config
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        let handler_handle = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {
                // Events are handled internally by chromiumoxide
            }
        });

        let page = browser.new_page("about:blank").await?;

        *self.browser.write().await = Some(browser);
        *self.page.write().await = Some(Arc::new(Mutex::new(page)));
        *self.handler_handle.write().await = Some(handler_handle);

        tracing::info!("Browser started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        tracing::info!("Stopping browser");

        if let Some(mut browser) = self.browser.write().await.take() {
            let _ = browser.close().await;
        }

        if let Some(handle) = self.handler_handle.write().await.take() {
            handle.abort();
        }

        *self.page.write().await = None;
        self.elements.lock().await.map.clear();

        // Profile directory is kept so cached session state speeds up the
        // next start.
        tracing::info!(profile = ?self.user_data_dir, "Browser stopped");
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page().await?;
        let page = page.lock().await;
        page.goto(url).await?;
        // Handles issued against the previous document are now invalid.
        self.elements.lock().await.map.clear();
        tracing::debug!("Navigated to {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page().await?;
        let page = page.lock().await;
        Ok(page.url().await?.unwrap_or_default())
    }

    async fn query(&self, candidate: &LocatorCandidate) -> Result<Option<ElementRef>> {
        let page = self.page().await?;
        let page = page.lock().await;
        match self.find_on_page(&page, candidate).await? {
            Some(element) => {
                let mut table = self.elements.lock().await;
                Ok(Some(table.insert(element)))
            }
            None => Ok(None),
        }
    }

    async fn query_within(
        &self,
        root: ElementRef,
        candidate: &LocatorCandidate,
    ) -> Result<Option<ElementRef>> {
        let root = self.element(root).await?;
        // Element-scoped lookup only supports CSS; other strategies fall back
        // to document scope.
        let found = match candidate.strategy {
            LocatorStrategy::Css => root.find_element(&candidate.expression).await.ok(),
            _ => {
                let page = self.page().await?;
                let page = page.lock().await;
                self.find_on_page(&page, candidate).await?
            }
        };
        match found {
            Some(element) => {
                let mut table = self.elements.lock().await;
                Ok(Some(table.insert(element)))
            }
            None => Ok(None),
        }
    }

    async fn is_interactable(&self, el: ElementRef) -> Result<bool> {
        let element = self.element(el).await?;
        let ret = element
            .call_js_fn(
                r#"function() {
                    const style = window.getComputedStyle(this);
                    const rect = this.getBoundingClientRect();
                    const visible = style.visibility !== 'hidden'
                        && style.display !== 'none'
                        && rect.width > 0 && rect.height > 0;
                    return visible && !this.disabled;
                }"#,
                false,
            )
            .await?;
        Ok(matches!(ret.result.value, Some(serde_json::Value::Bool(true))))
    }

    async fn click(&self, el: ElementRef) -> Result<()> {
        let element = self.element(el).await?;
        element.click().await?;
        tracing::debug!("Clicked element {:?}", el);
        Ok(())
    }

    async fn click_scripted(&self, el: ElementRef) -> Result<()> {
        let element = self.element(el).await?;
        element
            .call_js_fn("function() { this.click(); }", false)
            .await?;
        tracing::debug!("Scripted click on element {:?}", el);
        Ok(())
    }

    async fn click_pointer(&self, el: ElementRef) -> Result<()> {
        let element = self.element(el).await?;
        let point = element.clickable_point().await?;
        self.click_at(point.x, point.y).await
    }

    async fn scroll_into_view(&self, el: ElementRef) -> Result<()> {
        let element = self.element(el).await?;
        element.scroll_into_view().await?;
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        let page = self.page().await?;
        let page = page.lock().await;

        let move_params = DispatchMouseEventParams::new(DispatchMouseEventType::MouseMoved, x, y);
        page.execute(move_params).await?;

        let mut down_params =
            DispatchMouseEventParams::new(DispatchMouseEventType::MousePressed, x, y);
        down_params.button = Some(MouseButton::Left);
        down_params.click_count = Some(1);
        page.execute(down_params).await?;

        let mut up_params =
            DispatchMouseEventParams::new(DispatchMouseEventType::MouseReleased, x, y);
        up_params.button = Some(MouseButton::Left);
        up_params.click_count = Some(1);
        page.execute(up_params).await?;

        tracing::trace!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    async fn type_text(&self, el: ElementRef, text: &str) -> Result<()> {
        let element = self.element(el).await?;
        element.click().await?;
        element.type_str(text).await?;
        tracing::debug!("Typed text into element {:?}", el);
        Ok(())
    }

    async fn upload_file(&self, el: ElementRef, path: &Path) -> Result<()> {
        let element = self.element(el).await?;
        let page = self.page().await?;
        let page = page.lock().await;
        let params = SetFileInputFilesParams::builder()
            .files(vec![path.display().to_string()])
            .backend_node_id(element.backend_node_id.clone())
            .build()
            .map_err(|e| anyhow!("Failed to build file input params: {}", e))?;
        page.execute(params).await?;
        tracing::debug!(file = ?path, "Attached file to input");
        Ok(())
    }

    async fn bounds(&self, el: ElementRef) -> Result<Option<Bounds>> {
        let element = self.element(el).await?;
        let ret = element
            .call_js_fn(
                r#"function() {
                    const r = this.getBoundingClientRect();
                    return JSON.stringify({ x: r.x, y: r.y, width: r.width, height: r.height });
                }"#,
                false,
            )
            .await?;
        let Some(serde_json::Value::String(raw)) = ret.result.value else {
            return Ok(None);
        };
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let get = |key: &str| value.get(key).and_then(serde_json::Value::as_f64);
        match (get("x"), get("y"), get("width"), get("height")) {
            (Some(x), Some(y), Some(width), Some(height)) => Ok(Some(Bounds {
                x,
                y,
                width,
                height,
            })),
            _ => Ok(None),
        }
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        let page = self.page().await?;
        let page = page.lock().await;

        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            let mut param = CookieParam::builder()
                .name(&cookie.name)
                .value(&cookie.value)
                .domain(&cookie.domain)
                .path(&cookie.path)
                .secure(cookie.secure)
                .build()
                .map_err(|e| anyhow!("Invalid cookie '{}': {}", cookie.name, e))?;
            param.expires = cookie.expiry.map(TimeSinceEpoch::new);
            params.push(param);
        }

        page.set_cookies(params).await?;
        tracing::debug!(count = cookies.len(), "Cookies injected");
        Ok(())
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let page = self.page().await?;
        let page = page.lock().await;

        let cookies = page
            .get_cookies()
            .await?
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                expiry: (c.expires >= 0.0).then_some(c.expires),
            })
            .collect();
        Ok(cookies)
    }

    async fn capture_screen(&self) -> Result<Vec<u8>> {
        let page = self.page().await?;
        let page = page.lock().await;

        let data = page
            .screenshot(
                CaptureScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await?;
        Ok(data)
    }
}
