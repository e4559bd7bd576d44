use async_trait::async_trait;
use std::path::Path;

use crate::domain::model::{Cookie, LocatorCandidate};

/// Opaque handle to a resolved element. Issued by the driver; valid until the
/// next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub u64);

/// Element bounding box in page coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Browser driver trait abstracting the live session.
///
/// All workflow logic runs against this trait; the chromium implementation
/// drives a real headless browser, and tests script a fake.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Start the browser instance.
    async fn start(&self) -> anyhow::Result<()>;

    /// Stop the browser instance.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Navigate to a URL. Invalidates previously issued element handles.
    async fn navigate(&self, url: &str) -> anyhow::Result<()>;

    /// URL of the current page after any redirects.
    async fn current_url(&self) -> anyhow::Result<String>;

    /// Evaluate a single candidate once against current DOM state.
    /// `Ok(None)` means no match right now; polling is the caller's concern.
    async fn query(&self, candidate: &LocatorCandidate) -> anyhow::Result<Option<ElementRef>>;

    /// Evaluate a candidate scoped to a previously resolved element.
    async fn query_within(
        &self,
        root: ElementRef,
        candidate: &LocatorCandidate,
    ) -> anyhow::Result<Option<ElementRef>>;

    /// Whether the element is visible and enabled.
    async fn is_interactable(&self, el: ElementRef) -> anyhow::Result<bool>;

    /// Direct element click.
    async fn click(&self, el: ElementRef) -> anyhow::Result<()>;

    /// Programmatic click dispatched from script inside the page.
    async fn click_scripted(&self, el: ElementRef) -> anyhow::Result<()>;

    /// Simulated pointer interaction at the element's clickable point.
    async fn click_pointer(&self, el: ElementRef) -> anyhow::Result<()>;

    /// Scroll the element into view.
    async fn scroll_into_view(&self, el: ElementRef) -> anyhow::Result<()>;

    /// Raw click at page coordinates.
    async fn click_at(&self, x: f64, y: f64) -> anyhow::Result<()>;

    /// Focus the element and type text into it.
    async fn type_text(&self, el: ElementRef, text: &str) -> anyhow::Result<()>;

    /// Attach a local file to a file-input element.
    async fn upload_file(&self, el: ElementRef, path: &Path) -> anyhow::Result<()>;

    /// Bounding box of the element, if it is rendered.
    async fn bounds(&self, el: ElementRef) -> anyhow::Result<Option<Bounds>>;

    /// Inject cookies into the browser.
    async fn set_cookies(&self, cookies: &[Cookie]) -> anyhow::Result<()>;

    /// Read all cookies from the browser.
    async fn get_cookies(&self) -> anyhow::Result<Vec<Cookie>>;

    /// Capture the current page as PNG bytes.
    async fn capture_screen(&self) -> anyhow::Result<Vec<u8>>;
}
