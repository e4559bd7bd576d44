//! Scripted in-memory driver for exercising workflow logic without a
//! browser. Queries resolve against a set of known expressions; every call
//! is recorded so tests can assert ordering.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use super::driver::{Bounds, BrowserDriver, ElementRef};
use crate::domain::model::{Cookie, LocatorCandidate};

#[derive(Default)]
struct FakeState {
    url: String,
    /// Expressions that currently resolve to an element.
    present: HashSet<String>,
    /// Expressions resolvable but not visible/enabled.
    inert: HashSet<String>,
    /// Expression -> remaining number of clicks that raise.
    failing_clicks: HashMap<String, u32>,
    /// Click methods that always raise ("direct", "scripted", "pointer").
    failing_strategies: HashSet<&'static str>,
    cookies: Vec<Cookie>,
    /// URL installed after a click on this expression (e.g. login submit).
    url_on_click: HashMap<String, String>,
    /// Expressions added to `present` after cookies are injected.
    present_after_cookies: Vec<String>,
    calls: Vec<String>,
    refs: HashMap<u64, String>,
    next_ref: u64,
}

#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_present(&self, expr: &str) {
        self.state.lock().unwrap().present.insert(expr.to_string());
    }

    pub fn remove_present(&self, expr: &str) {
        self.state.lock().unwrap().present.remove(expr);
    }

    pub fn add_inert(&self, expr: &str) {
        let mut state = self.state.lock().unwrap();
        state.present.insert(expr.to_string());
        state.inert.insert(expr.to_string());
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().unwrap().url = url.to_string();
    }

    pub fn set_url_on_click(&self, expr: &str, url: &str) {
        self.state
            .lock()
            .unwrap()
            .url_on_click
            .insert(expr.to_string(), url.to_string());
    }

    pub fn fail_clicks(&self, expr: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .failing_clicks
            .insert(expr.to_string(), times);
    }

    pub fn fail_strategy(&self, strategy: &'static str) {
        self.state.lock().unwrap().failing_strategies.insert(strategy);
    }

    pub fn grant_login_after_cookies(&self, marker_expr: &str) {
        self.state
            .lock()
            .unwrap()
            .present_after_cookies
            .push(marker_expr.to_string());
    }

    pub fn seed_cookies(&self, cookies: Vec<Cookie>) {
        self.state.lock().unwrap().cookies = cookies;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn expr_of(&self, el: ElementRef) -> String {
        self.state
            .lock()
            .unwrap()
            .refs
            .get(&el.0)
            .cloned()
            .unwrap_or_default()
    }

    fn do_click(&self, method: &'static str, el: ElementRef) -> anyhow::Result<()> {
        let expr = self.expr_of(el);
        self.record(format!("{method}:{expr}"));
        let mut state = self.state.lock().unwrap();
        if state.failing_strategies.contains(method) {
            anyhow::bail!("{method} click intercepted on '{expr}'");
        }
        if let Some(remaining) = state.failing_clicks.get_mut(&expr) {
            if *remaining > 0 {
                *remaining -= 1;
                anyhow::bail!("click intercepted on '{expr}'");
            }
        }
        if let Some(url) = state.url_on_click.get(&expr).cloned() {
            state.url = url;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn start(&self) -> anyhow::Result<()> {
        self.record("start".to_string());
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.record("stop".to_string());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> anyhow::Result<()> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn current_url(&self) -> anyhow::Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn query(&self, candidate: &LocatorCandidate) -> anyhow::Result<Option<ElementRef>> {
        self.record(format!("query:{}", candidate.expression));
        let mut state = self.state.lock().unwrap();
        if state.present.contains(&candidate.expression) {
            state.next_ref += 1;
            let id = state.next_ref;
            state.refs.insert(id, candidate.expression.clone());
            Ok(Some(ElementRef(id)))
        } else {
            Ok(None)
        }
    }

    async fn query_within(
        &self,
        root: ElementRef,
        candidate: &LocatorCandidate,
    ) -> anyhow::Result<Option<ElementRef>> {
        let root_expr = self.expr_of(root);
        self.record(format!("query_within:{root_expr}:{}", candidate.expression));
        let scoped = format!("{root_expr} {}", candidate.expression);
        let mut state = self.state.lock().unwrap();
        if state.present.contains(&scoped) {
            state.next_ref += 1;
            let id = state.next_ref;
            state.refs.insert(id, scoped);
            Ok(Some(ElementRef(id)))
        } else {
            Ok(None)
        }
    }

    async fn is_interactable(&self, el: ElementRef) -> anyhow::Result<bool> {
        let expr = self.expr_of(el);
        let state = self.state.lock().unwrap();
        Ok(!state.inert.contains(&expr))
    }

    async fn click(&self, el: ElementRef) -> anyhow::Result<()> {
        self.do_click("direct", el)
    }

    async fn click_scripted(&self, el: ElementRef) -> anyhow::Result<()> {
        self.do_click("scripted", el)
    }

    async fn click_pointer(&self, el: ElementRef) -> anyhow::Result<()> {
        self.do_click("pointer", el)
    }

    async fn scroll_into_view(&self, el: ElementRef) -> anyhow::Result<()> {
        let expr = self.expr_of(el);
        self.record(format!("scroll:{expr}"));
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> anyhow::Result<()> {
        self.record(format!("click_at:{x},{y}"));
        Ok(())
    }

    async fn type_text(&self, el: ElementRef, text: &str) -> anyhow::Result<()> {
        let expr = self.expr_of(el);
        self.record(format!("type:{expr}:{text}"));
        Ok(())
    }

    async fn upload_file(&self, el: ElementRef, path: &Path) -> anyhow::Result<()> {
        let expr = self.expr_of(el);
        self.record(format!("upload:{expr}:{}", path.display()));
        Ok(())
    }

    async fn bounds(&self, el: ElementRef) -> anyhow::Result<Option<Bounds>> {
        let _ = self.expr_of(el);
        Ok(Some(Bounds {
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 80.0,
        }))
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> anyhow::Result<()> {
        self.record(format!("set_cookies:{}", cookies.len()));
        let mut state = self.state.lock().unwrap();
        state.cookies.extend_from_slice(cookies);
        let grants: Vec<String> = state.present_after_cookies.drain(..).collect();
        for expr in grants {
            state.present.insert(expr);
        }
        Ok(())
    }

    async fn get_cookies(&self) -> anyhow::Result<Vec<Cookie>> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn capture_screen(&self) -> anyhow::Result<Vec<u8>> {
        self.record("capture".to_string());
        // A real (tiny) PNG so grid composition can decode it.
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img).write_to(&mut out, image::ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}
